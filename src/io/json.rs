// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Visibility files stored as JSON.
//!
//! The whole file is read into memory when opened. Written flags are kept in
//! memory until [`FlagWrite::finish`] is called, at which point the file is
//! rewritten in place.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::debug;
use serde::{Deserialize, Serialize};

use super::{FlagWrite, FlagWriteError, VisRead, VisReadError, VisRecord};

/// The contents of a JSON visibility file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonVisContents {
    #[serde(default)]
    pub obs_type: Option<String>,

    #[serde(default)]
    pub history: Vec<String>,

    pub records: Vec<VisRecord>,
}

impl JsonVisContents {
    /// Write these contents to a file, replacing anything that was there.
    pub fn write(&self, path: &Path) -> Result<(), FlagWriteError> {
        let io_err = |err| FlagWriteError::IO {
            file: path.display().to_string(),
            err,
        };
        let mut f = BufWriter::new(File::create(path).map_err(io_err)?);
        serde_json::to_writer(&mut f, self)?;
        f.flush().map_err(io_err)?;
        Ok(())
    }
}

pub struct JsonVisFile {
    path: PathBuf,
    name: String,
    contents: JsonVisContents,

    /// The index of the next record to be read.
    next: usize,

    /// Have flags or history been changed since the file was opened?
    modified: bool,
}

impl JsonVisFile {
    pub fn open(path: &Path) -> Result<JsonVisFile, VisReadError> {
        let name = path.display().to_string();
        debug!("Reading JSON visibility file {name}");
        let f = File::open(path).map_err(|err| VisReadError::IO {
            file: name.clone(),
            err,
        })?;
        let contents: JsonVisContents = serde_json::from_reader(BufReader::new(f))
            .map_err(|err| VisReadError::Decode {
                file: name.clone(),
                err,
            })?;
        for (index, record) in contents.records.iter().enumerate() {
            if record.data.len() != record.flags.len() {
                return Err(VisReadError::FlagCountMismatch {
                    file: name,
                    index,
                    num_samples: record.data.len(),
                    num_flags: record.flags.len(),
                });
            }
        }

        Ok(JsonVisFile {
            path: path.to_path_buf(),
            name,
            contents,
            next: 0,
            modified: false,
        })
    }

    pub fn contents(&self) -> &JsonVisContents {
        &self.contents
    }
}

impl VisRead for JsonVisFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn obs_type(&self) -> Option<&str> {
        self.contents.obs_type.as_deref()
    }

    fn read_record(&mut self) -> Result<Option<VisRecord>, VisReadError> {
        let record = self.contents.records.get(self.next).cloned();
        if record.is_some() {
            self.next += 1;
        }
        Ok(record)
    }

    fn rewind(&mut self) -> Result<(), VisReadError> {
        self.next = 0;
        Ok(())
    }
}

impl FlagWrite for JsonVisFile {
    fn write_flags(&mut self, flags: &[bool]) -> Result<(), FlagWriteError> {
        let record = match self.next.checked_sub(1) {
            Some(i) => &mut self.contents.records[i],
            None => {
                return Err(FlagWriteError::NoRecord {
                    file: self.name.clone(),
                })
            }
        };
        if record.flags.len() != flags.len() {
            return Err(FlagWriteError::WrongLength {
                file: self.name.clone(),
                got: flags.len(),
                expected: record.flags.len(),
            });
        }
        if record.flags != flags {
            record.flags.copy_from_slice(flags);
            self.modified = true;
        }
        Ok(())
    }

    fn add_history(&mut self, line: String) {
        self.contents.history.push(line);
        self.modified = true;
    }

    fn finish(&mut self) -> Result<(), FlagWriteError> {
        if self.modified {
            debug!("Rewriting {}", self.name);
            self.contents.write(&self.path)?;
            self.modified = false;
        }
        Ok(())
    }
}
