// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from reading visibilities and writing flags.

use thiserror::Error;

use super::VIS_FILE_EXTENSIONS;

#[derive(Error, Debug)]
pub enum VisReadError {
    #[error("Visibility file '{file}' doesn't have a recognised extension; supported extensions: {}", *VIS_FILE_EXTENSIONS)]
    UnsupportedFormat { file: String },

    #[error("Couldn't decode visibility file '{file}':\n{err}")]
    Decode {
        file: String,
        err: serde_json::Error,
    },

    #[error("Record {index} of '{file}' has {num_samples} samples but {num_flags} flags")]
    FlagCountMismatch {
        file: String,
        index: usize,
        num_samples: usize,
        num_flags: usize,
    },

    #[error("Couldn't read '{file}': {err}")]
    IO { file: String, err: std::io::Error },
}

#[derive(Error, Debug)]
pub enum FlagWriteError {
    #[error("Tried to write flags to '{file}' before any record was read")]
    NoRecord { file: String },

    #[error("Tried to write {got} flags to '{file}', but its record has {expected} channels")]
    WrongLength {
        file: String,
        got: usize,
        expected: usize,
    },

    #[error(transparent)]
    Encode(#[from] serde_json::Error),

    #[error("Couldn't write flags to '{file}': {err}")]
    IO { file: String, err: std::io::Error },
}
