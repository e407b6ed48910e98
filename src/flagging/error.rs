// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from flagging scans and writing their flags.

use thiserror::Error;

use crate::{
    bandpass::BandpassError,
    io::{FlagWriteError, VisReadError},
};

#[derive(Error, Debug)]
pub enum FlagError {
    #[error("Flag grids have different shapes (pols, baselines, channels): expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        got: (usize, usize, usize),
    },

    #[error("Insufficient memory available to flag a scan; need {need_gib} GiB of memory")]
    InsufficientMemory { need_gib: usize },

    #[error("Unflagged data found outside of any scan boundary in '{file}' (time offset {time} days)")]
    OutsideScans { file: String, time: f64 },

    #[error("The number of channels in '{file}' changed from {expected} to {got} between reads")]
    ChannelMismatch {
        file: String,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    Bandpass(#[from] BandpassError),

    #[error(transparent)]
    VisRead(#[from] VisReadError),

    #[error(transparent)]
    FlagWrite(#[from] FlagWriteError),
}
