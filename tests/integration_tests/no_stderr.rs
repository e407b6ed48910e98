// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests to ensure there is no stderr output for successful commands.

use tempfile::TempDir;

use crate::{autoflag, get_cmd_output, write_vis_file};

#[test]
fn test_flag_no_stderr() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cal = write_vis_file(tmp_dir.path(), "cal.json", "CALIBRATOR", 0, true);
    let target = write_vis_file(tmp_dir.path(), "target.json", "TARGET", 100, false);

    #[rustfmt::skip]
    let cmd = autoflag()
        .args([
            "--cal", &cal.display().to_string(),
            "--vis", &target.display().to_string(),
            "--no-progress-bars",
        ])
        .ok();
    assert!(
        cmd.is_ok(),
        "autoflag failed on simple test data: {}",
        cmd.err().unwrap()
    );
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
}
