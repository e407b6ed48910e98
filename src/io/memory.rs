// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Visibilities held in memory.

use super::{FlagWrite, FlagWriteError, VisRead, VisReadError, VisRecord};

pub struct MemoryVisFile {
    name: String,
    obs_type: Option<String>,
    records: Vec<VisRecord>,
    history: Vec<String>,
    next: usize,
}

impl MemoryVisFile {
    pub fn new(name: &str, obs_type: Option<&str>, records: Vec<VisRecord>) -> MemoryVisFile {
        MemoryVisFile {
            name: name.to_string(),
            obs_type: obs_type.map(|s| s.to_string()),
            records,
            history: vec![],
            next: 0,
        }
    }

    pub fn records(&self) -> &[VisRecord] {
        &self.records
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl VisRead for MemoryVisFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn obs_type(&self) -> Option<&str> {
        self.obs_type.as_deref()
    }

    fn read_record(&mut self) -> Result<Option<VisRecord>, VisReadError> {
        let record = self.records.get(self.next).cloned();
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

impl FlagWrite for MemoryVisFile {
    fn write_flags(&mut self, flags: &[bool]) -> Result<(), FlagWriteError> {
        let i = self.next.checked_sub(1).ok_or_else(|| FlagWriteError::NoRecord {
            file: self.name.clone(),
        })?;
        let record = &mut self.records[i];
        if record.flags.len() != flags.len() {
            return Err(FlagWriteError::WrongLength {
                file: self.name.clone(),
                got: flags.len(),
                expected: record.flags.len(),
            });
        }
        record.flags.copy_from_slice(flags);
        Ok(())
    }

    fn add_history(&mut self, line: String) {
        self.history.push(line);
    }

    fn finish(&mut self) -> Result<(), FlagWriteError> {
        Ok(())
    }
}
