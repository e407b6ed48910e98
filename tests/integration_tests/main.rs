// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod flag;
mod no_stderr;

use std::{
    path::{Path, PathBuf},
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};

use autoflag::{
    c32,
    io::{encode_baseline, JsonVisContents, JsonVisFile, VisRecord},
};

const NUM_ANTS: u32 = 3;
const NUM_CHANS: usize = 8;
const INT_TIME: f32 = 8.0;
const JD0: f64 = 2459000.5;
const XX: i32 = -5;
const YY: i32 = -6;

/// The channel made bright on baseline (1, 2) of the calibrator.
const RFI_CHAN: usize = 5;

fn autoflag() -> Command {
    Command::cargo_bin("autoflag").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

/// Ten integrations of every cross baseline in XX and YY, starting at
/// integration `start`. If `rfi` is set, channel [`RFI_CHAN`] of baseline
/// (1, 2) is 100 times brighter for the first seven integrations.
fn make_records(start: usize, rfi: bool) -> Vec<VisRecord> {
    let a = c32::new(1.0, 0.5);
    let mut records = vec![];
    for i in 0..10 {
        let wobble = if i % 2 == 0 { 1.01 } else { 0.99 };
        let time = JD0 + (start + i) as f64 * f64::from(INT_TIME) / 86400.0;
        for (ant1, ant2) in [(1, 2), (1, 3), (2, 3)] {
            for pol in [XX, YY] {
                let mut data = vec![a * wobble; NUM_CHANS];
                if rfi && (ant1, ant2) == (1, 2) && i < 7 {
                    data[RFI_CHAN] *= 100.0;
                }
                records.push(VisRecord {
                    u: 10.0,
                    v: -20.0,
                    time,
                    baseline: encode_baseline(ant1, ant2),
                    pol,
                    data,
                    flags: vec![true; NUM_CHANS],
                    num_ants: NUM_ANTS,
                    int_time: INT_TIME,
                    ra: 0.0,
                    dec: 0.0,
                    variance: 1.0,
                });
            }
        }
    }
    records
}

/// Write a JSON visibility file into `dir`.
fn write_vis_file(dir: &Path, name: &str, obs_type: &str, start: usize, rfi: bool) -> PathBuf {
    let path = dir.join(name);
    JsonVisContents {
        obs_type: Some(obs_type.to_string()),
        history: vec![],
        records: make_records(start, rfi),
    }
    .write(&path)
    .unwrap();
    path
}

fn read_vis_file(path: &Path) -> JsonVisContents {
    JsonVisFile::open(path).unwrap().contents().clone()
}
