// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    fs::{read_to_string, File},
    io::Write,
};

use tempfile::TempDir;

use super::assert_narrowband_flags;
use crate::{autoflag, read_vis_file, write_vis_file};

#[test]
fn test_toml_arg_file() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cal = write_vis_file(tmp_dir.path(), "cal.json", "CALIBRATOR", 0, true);
    let args_file = tmp_dir.path().join("args.toml");
    let mut f = File::create(&args_file).unwrap();
    writeln!(f, "cal = [\"{}\"]", cal.display()).unwrap();
    writeln!(f, "options = [\"nosingle\"]").unwrap();
    drop(f);

    let cmd = autoflag()
        .args([&args_file.display().to_string(), "--no-progress-bars"])
        .ok();
    assert!(cmd.is_ok(), "autoflag failed: {:?}", cmd.err());

    let contents = read_vis_file(&cal);
    assert_narrowband_flags(&contents);
    assert!(contents.history[0].ends_with("options=nosingle"));
}

#[test]
fn test_cli_options_override_the_arg_file() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cal = write_vis_file(tmp_dir.path(), "cal.json", "CALIBRATOR", 0, true);
    let before = read_to_string(&cal).unwrap();
    let args_file = tmp_dir.path().join("args.json");
    let mut f = File::create(&args_file).unwrap();
    write!(f, r#"{{"cal": ["{}"], "options": ["time"]}}"#, cal.display()).unwrap();
    drop(f);

    #[rustfmt::skip]
    let cmd = autoflag()
        .args([
            &args_file.display().to_string(),
            "--options", "noflag",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "autoflag failed: {:?}", cmd.err());
    assert_eq!(read_to_string(&cal).unwrap(), before);
}

#[test]
fn test_save_toml() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cal = write_vis_file(tmp_dir.path(), "cal.json", "CALIBRATOR", 0, true);
    let saved = tmp_dir.path().join("saved.toml");

    #[rustfmt::skip]
    let cmd = autoflag()
        .args([
            "--cal", &cal.display().to_string(),
            "--options", "noflag",
            "--save-toml", &saved.display().to_string(),
            "--dry-run",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "autoflag failed: {:?}", cmd.err());

    let contents = read_to_string(&saved).unwrap();
    assert!(contents.contains("cal.json"), "{contents}");
    assert!(contents.contains("noflag"), "{contents}");
}
