// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from reading visibilities into scans.

use thiserror::Error;

use crate::io::VisReadError;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("'{file}' contains no visibilities")]
    Empty { file: String },

    #[error("The number of channels in '{file}' changed from {from} to {to}")]
    ChannelCountChanged { file: String, from: usize, to: usize },

    #[error("Record {record} of '{file}' has {num_chans} channels but {num_flags} flags")]
    FlagCountMismatch {
        file: String,
        record: usize,
        num_chans: usize,
        num_flags: usize,
    },

    #[error("The number of antennas in '{file}' changed from {from} to {to}")]
    AntennaCountChanged { file: String, from: usize, to: usize },

    #[error("Visibilities in '{file}' are not in time order: a visibility at {time} days precedes the current scan's start ({scan_start} days)")]
    OutOfOrder {
        file: String,
        time: f64,
        scan_start: f64,
    },

    #[error("Too many parallel-hand polarisations found in '{file}': {pols}")]
    TooManyParallelPols { file: String, pols: String },

    #[error(transparent)]
    VisRead(#[from] VisReadError),
}
