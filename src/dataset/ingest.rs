// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading a visibility stream into scans.

use std::collections::BTreeSet;

use itertools::Itertools;
use log::{debug, trace, warn};

use super::{ChannelFlags, Dataset, IngestError, Visibility};
use crate::{
    io::{decode_baseline, VisRead, VisRecord},
    math::baseline_index,
    pol::{is_parallel_hand, pol_name},
};

/// Running totals kept while reading a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestCounts {
    /// Every record read.
    pub num_records: usize,

    /// Records accepted into scans.
    pub num_accepted: usize,

    /// Records rejected because they had no good channels (or their antennas
    /// were out of range).
    pub num_bad: usize,

    /// Records rejected because of their polarisation.
    pub num_bad_pol: usize,

    /// The total number of flagged channels over all accepted records.
    pub num_flagged_vischan: usize,

    /// Records with a non-positive variance, which was clamped to 0.
    pub num_bad_variance: usize,
}

impl IngestCounts {
    /// The mean number of flagged channels per accepted record.
    pub fn mean_flagged_chans(&self) -> f64 {
        if self.num_accepted == 0 {
            0.0
        } else {
            self.num_flagged_vischan as f64 / self.num_accepted as f64
        }
    }
}

/// Read every record of `file` and group the accepted ones into scans.
///
/// A record is accepted if both of its antennas are in range, its polarisation
/// is parallel-hand and it has at least one good channel. The number of
/// channels and antennas must not change throughout the file, and records must
/// be in time order, and every record must have one flag per channel.
pub fn load_dataset<R: VisRead + ?Sized>(file: &mut R) -> Result<Dataset, IngestError> {
    file.rewind()?;
    let mut dataset = Dataset::new(
        file.name().to_string(),
        file.obs_type().unwrap_or("crosscorrelation").to_string(),
    );
    let mut parallel_pols = BTreeSet::new();

    while let Some(record) = file.read_record()? {
        if record.flags.len() != record.data.len() {
            return Err(IngestError::FlagCountMismatch {
                file: dataset.name,
                record: dataset.counts.num_records,
                num_chans: record.data.len(),
                num_flags: record.flags.len(),
            });
        }
        if dataset.counts.num_records == 0 {
            dataset.num_chans = record.data.len();
            dataset.set_num_ants(record.num_ants as usize);
            dataset.int_time = record.int_time;
            dataset.time0 = record.time;
            dataset.ra = record.ra;
            dataset.dec = record.dec;
        } else {
            check_header(&mut dataset, &record)?;
        }
        dataset.counts.num_records += 1;

        // Polarisations count as present even if none of their records are
        // usable.
        let pol_ok = is_parallel_hand(record.pol);
        if pol_ok {
            parallel_pols.insert(record.pol);
        }
        let num_good = record.flags.iter().filter(|&&f| f).count();
        let ants = ants_in_range(record.baseline, dataset.num_ants);
        let ants = match ants {
            Some(ants) if pol_ok && num_good > 0 => ants,
            _ => {
                if pol_ok {
                    dataset.counts.num_bad += 1;
                } else {
                    dataset.counts.num_bad_pol += 1;
                }
                continue;
            }
        };

        dataset.counts.num_accepted += 1;
        dataset.counts.num_flagged_vischan += dataset.num_chans - num_good;

        let vis = to_visibility(&mut dataset, record, ants);
        dataset.insert(vis)?;
    }

    if dataset.counts.num_records == 0 {
        return Err(IngestError::Empty { file: dataset.name });
    }
    if parallel_pols.len() > 2 {
        return Err(IngestError::TooManyParallelPols {
            file: dataset.name,
            pols: parallel_pols.iter().map(|&p| pol_name(p)).join(", "),
        });
    }
    for (slot, &pol) in dataset.pols.iter_mut().zip(parallel_pols.iter()) {
        *slot = Some(pol);
    }
    if dataset.counts.num_bad_variance > 0 {
        warn!(
            "'{}': {} records had a non-positive variance; using 0 instead",
            dataset.name, dataset.counts.num_bad_variance
        );
    }
    if dataset.bins.is_empty() {
        warn!("'{}': no usable visibilities were found", dataset.name);
    }
    debug!(
        "'{}': {} records read, {} accepted into {} scans",
        dataset.name,
        dataset.counts.num_records,
        dataset.counts.num_accepted,
        dataset.bins.len()
    );

    Ok(dataset)
}

/// Compare a record's header values against those already established for the
/// dataset.
fn check_header(dataset: &mut Dataset, record: &VisRecord) -> Result<(), IngestError> {
    if record.data.len() != dataset.num_chans {
        return Err(IngestError::ChannelCountChanged {
            file: dataset.name.clone(),
            from: dataset.num_chans,
            to: record.data.len(),
        });
    }
    if record.num_ants as usize != dataset.num_ants {
        return Err(IngestError::AntennaCountChanged {
            file: dataset.name.clone(),
            from: dataset.num_ants,
            to: record.num_ants as usize,
        });
    }
    if record.int_time != dataset.int_time {
        warn!(
            "'{}': integration time changed from {}s to {}s",
            dataset.name, dataset.int_time, record.int_time
        );
        dataset.int_time = record.int_time;
    }
    if record.ra != dataset.ra || record.dec != dataset.dec {
        debug!(
            "'{}': pointing centre changed to RA {} Dec {} (rad)",
            dataset.name, record.ra, record.dec
        );
        dataset.ra = record.ra;
        dataset.dec = record.dec;
    }
    Ok(())
}

/// Decode a baseline into 0-indexed, ordered antennas. `None` if either
/// antenna is out of range.
fn ants_in_range(baseline: u32, num_ants: usize) -> Option<(usize, usize)> {
    let (ant1, ant2) = decode_baseline(baseline);
    let in_range = |a: u32| a >= 1 && (a as usize) <= num_ants;
    if in_range(ant1) && in_range(ant2) {
        Some((ant1 as usize - 1, ant2 as usize - 1))
    } else {
        trace!("Baseline {baseline} has antennas out of range");
        None
    }
}

fn to_visibility(dataset: &mut Dataset, record: VisRecord, ants: (usize, usize)) -> Visibility {
    let VisRecord {
        u,
        v,
        time,
        pol,
        mut data,
        flags,
        variance,
        ..
    } = record;

    // Baselines are stored with the lower antenna first; swapping the pair
    // conjugates the visibility.
    let (ants, u, v) = if ants.0 > ants.1 {
        data.iter_mut().for_each(|d| *d = d.conj());
        ((ants.1, ants.0), -u, -v)
    } else {
        (ants, u, v)
    };

    let variance = if variance > 0.0 {
        variance
    } else {
        dataset.counts.num_bad_variance += 1;
        0.0
    };

    Visibility {
        time: time - dataset.time0,
        u,
        v,
        ants,
        baseline: baseline_index(dataset.num_ants, ants.0, ants.1),
        pol,
        data,
        flags: ChannelFlags::from_good(&flags),
        variance,
    }
}
