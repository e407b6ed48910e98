// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::{dataset::IngestError, flagging::FlagError, io::VisReadError};

#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("Unrecognised option '{word}'; valid options are: {valid}")]
    UnrecognisedOption { word: String, valid: String },

    #[error("Option '{word}' is ambiguous; it could be any of: {matches}")]
    AmbiguousOption { word: String, matches: String },

    #[error(transparent)]
    VisRead(#[from] VisReadError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Flag(#[from] FlagError),
}
