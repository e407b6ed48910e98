// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests against the flagging command.

mod arg_files;
mod cli_args;

use autoflag::io::{encode_baseline, JsonVisContents};

use crate::RFI_CHAN;

/// Check that only the channels around the bright channel on baseline (1, 2)
/// were flagged. The synthetic spectra are flat, so the single-sample check
/// must be turned off with `nosingle` for this to hold.
fn assert_narrowband_flags(contents: &JsonVisContents) {
    let rfi_baseline = encode_baseline(1, 2);
    for (i, record) in contents.records.iter().enumerate() {
        for (chan, &good) in record.flags.iter().enumerate() {
            let expected = !(record.baseline == rfi_baseline
                && (RFI_CHAN - 1..=RFI_CHAN + 1).contains(&chan));
            assert_eq!(good, expected, "record {i} chan {chan}");
        }
    }
}
