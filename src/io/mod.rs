// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! File stuff. Visibility records are streamed from a file and flag vectors are
//! written back to the same file; nothing else about the container format is
//! needed.

mod error;
mod glob;
mod json;
mod memory;

pub use error::{FlagWriteError, VisReadError};
pub(crate) use glob::get_all_matches_from_glob;
pub use glob::GlobError;
pub use json::{JsonVisContents, JsonVisFile};
pub use memory::MemoryVisFile;

use std::{path::Path, str::FromStr};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::c32;

#[derive(Debug, Display, EnumIter, EnumString, Clone, Copy)]
/// All supported visibility file formats.
pub(crate) enum VisFileType {
    #[strum(serialize = "json")]
    Json,
}

lazy_static::lazy_static! {
    pub(crate) static ref VIS_FILE_EXTENSIONS: String = VisFileType::iter().join(", ");
}

/// One correlator record: a single baseline, polarisation and time, across all
/// channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisRecord {
    pub u: f64,
    pub v: f64,

    /// [Julian date]
    pub time: f64,

    /// The encoded antenna pair (see [`decode_baseline`]).
    pub baseline: u32,

    /// The polarisation code (see [`crate::pol::Pol`]).
    pub pol: i32,

    pub data: Vec<c32>,

    /// One per channel; `true` is good.
    pub flags: Vec<bool>,

    pub num_ants: u32,

    /// [seconds]
    pub int_time: f32,

    /// Pointing centre [radians].
    #[serde(default)]
    pub ra: f64,
    #[serde(default)]
    pub dec: f64,

    /// Thermal-noise variance estimate.
    #[serde(default)]
    pub variance: f64,
}

/// Stream visibility records out of a dataset.
pub trait VisRead {
    /// A name for the dataset, e.g. its path.
    fn name(&self) -> &str;

    /// The observation type recorded in the dataset's header, if any.
    fn obs_type(&self) -> Option<&str>;

    /// Read the next record. `None` is returned at the end of the dataset.
    fn read_record(&mut self) -> Result<Option<VisRecord>, VisReadError>;

    /// Start reading from the first record again.
    fn rewind(&mut self) -> Result<(), VisReadError>;
}

/// Write flags back to a dataset.
pub trait FlagWrite {
    /// Replace the flags of the most recently read record. `true` is good.
    fn write_flags(&mut self, flags: &[bool]) -> Result<(), FlagWriteError>;

    /// Add a line to the dataset's history.
    fn add_history(&mut self, _line: String) {}

    /// Make any written flags persistent.
    fn finish(&mut self) -> Result<(), FlagWriteError>;
}

/// A dataset that can be both streamed and have its flags rewritten.
pub trait VisFile: VisRead + FlagWrite {}

impl<T: VisRead + FlagWrite> VisFile for T {}

/// Open a visibility file for reading and flag writing, using its extension to
/// determine its type.
pub fn open_vis_file(path: &Path) -> Result<Box<dyn VisFile>, VisReadError> {
    let file_type = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .and_then(|e| VisFileType::from_str(&e).ok());
    match file_type {
        Some(VisFileType::Json) => Ok(Box::new(JsonVisFile::open(path)?)),
        None => Err(VisReadError::UnsupportedFormat {
            file: path.display().to_string(),
        }),
    }
}

/// Decode an antenna pair from a baseline number. The returned antennas are
/// 1-indexed.
///
/// Small antenna numbers use `256 * ant1 + ant2`; larger ones are offset by
/// 65536 and use `2048 * ant1 + ant2`.
pub fn decode_baseline(baseline: u32) -> (u32, u32) {
    if baseline > 65536 {
        let b = baseline - 65536;
        (b / 2048, b % 2048)
    } else {
        (baseline / 256, baseline % 256)
    }
}

/// The inverse of [`decode_baseline`]. Antennas are 1-indexed.
pub fn encode_baseline(ant1: u32, ant2: u32) -> u32 {
    if ant1 > 255 || ant2 > 255 {
        2048 * ant1 + ant2 + 65536
    } else {
        256 * ant1 + ant2
    }
}
