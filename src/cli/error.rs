// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all autoflag-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use super::flag::FlagArgsError;
use crate::{
    bandpass::BandpassError,
    dataset::IngestError,
    flagging::FlagError,
    io::{FlagWriteError, GlobError, VisReadError},
    params::ParamsError,
};

/// The *only* publicly visible error from autoflag. Variants categorise the
/// lower-level errors by what the user needs to look at.
#[derive(Error, Debug)]
pub enum AutoflagError {
    /// A problem with the arguments given to autoflag.
    #[error("{0}\n\nSee `autoflag --help` for the available arguments.")]
    Args(String),

    /// A problem with `--options`.
    #[error("{0}")]
    Options(String),

    /// An error related to argument files.
    #[error("{0}")]
    ArgFile(String),

    /// An error related to reading visibilities.
    #[error("{0}")]
    VisRead(String),

    /// A visibility file that can't be flagged as it stands, e.g. its
    /// structure changes part way through.
    #[error("{0}\n\nThe visibility file must be fixed before it can be flagged.")]
    Dataset(String),

    /// An error raised while flagging.
    #[error("{0}")]
    Flag(String),

    /// An error related to writing flags.
    #[error("{0}")]
    FlagWrite(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<FlagArgsError> for AutoflagError {
    fn from(e: FlagArgsError) -> Self {
        match e {
            FlagArgsError::NoCalibrators => Self::Args(e.to_string()),
            FlagArgsError::Glob(e) => Self::from(e),
            FlagArgsError::Params(e) => Self::from(e),
        }
    }
}

impl From<ParamsError> for AutoflagError {
    fn from(e: ParamsError) -> Self {
        match e {
            ParamsError::UnrecognisedOption { .. } | ParamsError::AmbiguousOption { .. } => {
                Self::Options(e.to_string())
            }
            ParamsError::VisRead(e) => Self::from(e),
            ParamsError::Ingest(e) => Self::from(e),
            ParamsError::Flag(e) => Self::from(e),
        }
    }
}

impl From<IngestError> for AutoflagError {
    fn from(e: IngestError) -> Self {
        let s = e.to_string();
        match e {
            IngestError::Empty { .. }
            | IngestError::ChannelCountChanged { .. }
            | IngestError::FlagCountMismatch { .. }
            | IngestError::AntennaCountChanged { .. }
            | IngestError::OutOfOrder { .. }
            | IngestError::TooManyParallelPols { .. } => Self::Dataset(s),
            IngestError::VisRead(e) => Self::from(e),
        }
    }
}

impl From<FlagError> for AutoflagError {
    fn from(e: FlagError) -> Self {
        let s = e.to_string();
        match e {
            FlagError::OutsideScans { .. } | FlagError::ChannelMismatch { .. } => Self::Dataset(s),
            FlagError::ShapeMismatch { .. } | FlagError::InsufficientMemory { .. } => Self::Flag(s),
            FlagError::Bandpass(e) => Self::from(e),
            FlagError::VisRead(e) => Self::from(e),
            FlagError::FlagWrite(e) => Self::from(e),
        }
    }
}

impl From<BandpassError> for AutoflagError {
    fn from(e: BandpassError) -> Self {
        Self::Flag(e.to_string())
    }
}

impl From<VisReadError> for AutoflagError {
    fn from(e: VisReadError) -> Self {
        Self::VisRead(e.to_string())
    }
}

impl From<FlagWriteError> for AutoflagError {
    fn from(e: FlagWriteError) -> Self {
        Self::FlagWrite(e.to_string())
    }
}

impl From<GlobError> for AutoflagError {
    fn from(e: GlobError) -> Self {
        Self::Args(e.to_string())
    }
}

impl From<std::io::Error> for AutoflagError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
