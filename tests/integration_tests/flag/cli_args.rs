// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fs::read_to_string;

use tempfile::TempDir;

use super::assert_narrowband_flags;
use crate::{autoflag, get_cmd_output, read_vis_file, write_vis_file};

#[test]
fn test_help_is_printed() {
    let cmd = autoflag().arg("--help").ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("--cal"));
    assert!(stdout.contains("--vis"));
    assert!(stdout.contains("noflag"));
}

#[test]
fn test_no_calibrators_fails() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let target = write_vis_file(tmp_dir.path(), "target.json", "TARGET", 0, false);

    let cmd = autoflag()
        .args(["--vis", &target.display().to_string(), "--no-progress-bars"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("No calibrator"), "{stderr}");
}

#[test]
fn test_unrecognised_option_fails() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cal = write_vis_file(tmp_dir.path(), "cal.json", "CALIBRATOR", 0, true);

    #[rustfmt::skip]
    let cmd = autoflag()
        .args([
            "--cal", &cal.display().to_string(),
            "--options", "bogus",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("bogus"), "{stderr}");

    // Nothing was touched.
    let contents = read_vis_file(&cal);
    assert!(contents.history.is_empty());
    assert!(contents.records.iter().all(|r| r.flags.iter().all(|&f| f)));
}

#[test]
fn test_unsupported_file_type_fails() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cal = tmp_dir.path().join("cal.ms");
    std::fs::write(&cal, "").unwrap();

    let cmd = autoflag()
        .args(["--cal", &cal.display().to_string(), "--no-progress-bars"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.starts_with("Error: "), "{stderr}");
}

#[test]
fn test_flags_and_history_are_written() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cal = write_vis_file(tmp_dir.path(), "cal.json", "CALIBRATOR", 0, true);
    let target = write_vis_file(tmp_dir.path(), "target.json", "TARGET", 100, false);

    #[rustfmt::skip]
    let cmd = autoflag()
        .args([
            "--cal", &cal.display().to_string(),
            "--vis", &target.display().to_string(),
            "--options", "nosingle",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "autoflag failed: {:?}", cmd.err());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("autoflag complete."), "{stdout}");

    let contents = read_vis_file(&cal);
    assert_narrowband_flags(&contents);
    assert_eq!(contents.history.len(), 1);
    assert!(contents.history[0].starts_with("autoflag "));
    assert!(contents.history[0].ends_with("options=nosingle"));

    // Targets always get history once their flags are written.
    let contents = read_vis_file(&target);
    assert_eq!(contents.history.len(), 1);
    assert_eq!(contents.records.len(), 60);
}

#[test]
fn test_noflag_leaves_files_alone() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cal = write_vis_file(tmp_dir.path(), "cal.json", "CALIBRATOR", 0, true);
    let before = read_to_string(&cal).unwrap();

    #[rustfmt::skip]
    let cmd = autoflag()
        .args([
            "--cal", &cal.display().to_string(),
            "--options", "noflag",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "autoflag failed: {:?}", cmd.err());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("(not written)"), "{stdout}");
    assert_eq!(read_to_string(&cal).unwrap(), before);
}

#[test]
fn test_dry_run_leaves_files_alone() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cal = write_vis_file(tmp_dir.path(), "cal.json", "CALIBRATOR", 0, true);
    let before = read_to_string(&cal).unwrap();

    let cmd = autoflag()
        .args([
            "--cal",
            &cal.display().to_string(),
            "--dry-run",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "autoflag failed: {:?}", cmd.err());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Dry run"), "{stdout}");
    assert!(stdout.contains("Calibrator dataset"), "{stdout}");
    assert_eq!(read_to_string(&cal).unwrap(), before);
}

#[test]
fn test_globbed_calibrators() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cal1 = write_vis_file(tmp_dir.path(), "cal1.json", "CALIBRATOR", 0, true);
    let cal2 = write_vis_file(tmp_dir.path(), "cal2.json", "CALIBRATOR", 200, true);

    let cmd = autoflag()
        .args([
            "--cal",
            &format!("{}/cal*.json", tmp_dir.path().display()),
            "--options",
            "nosingle",
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "autoflag failed: {:?}", cmd.err());
    for cal in [cal1, cal2] {
        let contents = read_vis_file(&cal);
        assert_narrowband_flags(&contents);
        assert_eq!(contents.history.len(), 1);
    }
}
