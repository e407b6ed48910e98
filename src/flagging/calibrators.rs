// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A time-ordered index of flagged calibrator scans.

use log::warn;

use super::{FlagError, FlagGrid};
use crate::{bandpass::Gains, dataset::Dataset};

#[derive(Debug, Clone)]
struct CalibratorScan {
    /// [Julian date]
    first_time: f64,
    /// [Julian date]
    last_time: f64,
    flags: FlagGrid,
    gains: Option<Gains>,
}

/// The scans of every calibrator dataset, sorted by start time. Target scans
/// take their gains (and optionally flags) from the calibrator scans around
/// them.
#[derive(Debug, Clone, Default)]
pub struct CalibratorIndex {
    scans: Vec<CalibratorScan>,
}

impl CalibratorIndex {
    pub fn new() -> CalibratorIndex {
        CalibratorIndex::default()
    }

    /// Add the scans of a flagged calibrator dataset.
    pub fn add_dataset(&mut self, dataset: &Dataset) {
        self.scans.extend(dataset.bins.iter().map(|bin| CalibratorScan {
            first_time: dataset.time0 + bin.first_time,
            last_time: dataset.time0 + bin.last_time,
            flags: bin.flags.clone(),
            gains: bin.gains.clone(),
        }));
        self.scans
            .sort_by(|a, b| a.first_time.total_cmp(&b.first_time));
    }

    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    /// The calibrator scans starting at or before and after `time` [Julian
    /// date], among those satisfying `predicate`.
    fn bracket<F>(&self, time: f64, predicate: F) -> (Option<&CalibratorScan>, Option<&CalibratorScan>)
    where
        F: Fn(&CalibratorScan) -> bool,
    {
        let split = self.scans.partition_point(|s| s.first_time <= time);
        let prev = self.scans[..split].iter().rev().find(|s| predicate(s));
        let next = self.scans[split..].iter().find(|s| predicate(s));
        (prev, next)
    }

    /// The gains of the calibrator scan closest in time to a target scan
    /// spanning `first_time` to `last_time` [Julian dates]. Only the nearest
    /// calibrator scan on either side is considered; ties go to the earlier
    /// scan.
    pub fn nearest_gains(&self, first_time: f64, last_time: f64) -> Option<&Gains> {
        match self.bracket(first_time, |s| s.gains.is_some()) {
            (Some(prev), Some(next)) => {
                let before = first_time - prev.last_time;
                let after = next.first_time - last_time;
                if before <= after {
                    prev.gains.as_ref()
                } else {
                    next.gains.as_ref()
                }
            }
            (Some(only), None) | (None, Some(only)) => only.gains.as_ref(),
            (None, None) => None,
        }
    }

    /// OR the flags of the calibrator scans either side of a target scan
    /// starting at `first_time` [Julian date] into `flags`. Returns the number
    /// of newly flagged cells.
    pub fn interpolate_flags(&self, first_time: f64, flags: &mut FlagGrid) -> Result<usize, FlagError> {
        let before = flags.count();
        let (prev, next) = self.bracket(first_time, |_| true);
        match next {
            Some(scan) => flags.merge(&scan.flags)?,
            None => warn!("The last scan is not a calibrator"),
        }
        match prev {
            Some(scan) => flags.merge(&scan.flags)?,
            None => warn!("The first scan is not a calibrator"),
        }
        Ok(flags.count() - before)
    }
}
