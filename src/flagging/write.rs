// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Writing scan flags back to visibility files.

use log::debug;

use super::{make_flagging_progress_bar, stats::Layout, FlagError, NUM_POLS};
use crate::{
    c32,
    constants::SINGLE_SAMPLE_SIGMA,
    dataset::{Bin, Dataset},
    io::{decode_baseline, VisFile},
    math::baseline_index,
    params::FlagOptions,
    PROGRESS_BARS,
};

/// Counts gathered while writing flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub num_records: usize,
    /// Every channel of every record.
    pub num_correlations: usize,
    pub good_before: usize,
    pub good_after: usize,
    /// Channels flagged by the single-sample check.
    pub num_single_sample: usize,
}

impl WriteSummary {
    /// Correlations that were good before and are now flagged.
    pub fn num_additional(&self) -> usize {
        self.good_before.saturating_sub(self.good_after)
    }

    /// [`WriteSummary::num_additional`] as a percentage of the previously good
    /// correlations.
    pub fn additional_percent(&self) -> f64 {
        if self.good_before == 0 {
            0.0
        } else {
            self.num_additional() as f64 * 100.0 / self.good_before as f64
        }
    }

    /// The percentage of all correlations that are good.
    pub fn retention_percent(&self) -> f64 {
        if self.num_correlations == 0 {
            0.0
        } else {
            self.good_after as f64 * 100.0 / self.num_correlations as f64
        }
    }
}

/// Re-reads a dataset and writes its scans' flags into each record.
pub struct FlagWriter<'a> {
    options: &'a FlagOptions,
}

impl<'a> FlagWriter<'a> {
    pub fn new(options: &'a FlagOptions) -> FlagWriter<'a> {
        FlagWriter { options }
    }

    /// Stream every record of `file`, combine its flags with those of its
    /// scan in `dataset` and (unless `noflag` was given) write them back. A
    /// parallel-hand channel stays good only if it was good and its scan cell
    /// is unflagged; a cross-hand channel additionally needs both
    /// parallel-hand cells to be unflagged. `history` is added to the file's
    /// history when flags are written.
    pub fn write(
        &self,
        dataset: &Dataset,
        file: &mut dyn VisFile,
        history: Option<String>,
    ) -> Result<WriteSummary, FlagError> {
        let layout = Layout::of(dataset);
        let check_single = self.options.check_single_samples();
        let apply_gains = !self.options.no_band;
        let progress = make_flagging_progress_bar(
            dataset.counts.num_records,
            format!("Writing flags to '{}'", dataset.name),
            PROGRESS_BARS.load(),
        );

        file.rewind()?;
        let mut summary = WriteSummary::default();
        let mut cursor = 0;
        while let Some(mut record) = file.read_record()? {
            if record.data.len() != layout.num_chans {
                return Err(FlagError::ChannelMismatch {
                    file: dataset.name.clone(),
                    expected: layout.num_chans,
                    got: record.data.len(),
                });
            }
            let mut good = record.flags.clone();
            let num_good = good.iter().filter(|&&g| g).count();
            summary.num_records += 1;
            summary.num_correlations += layout.num_chans;
            summary.good_before += num_good;
            progress.inc(1);

            let time = record.time - layout.time0;
            let bin = find_bin(&dataset.bins, &mut cursor, time);
            let ants = ants_in_range(record.baseline, layout.num_ants);
            match (bin, ants) {
                (None, _) if num_good > 0 => {
                    return Err(FlagError::OutsideScans {
                        file: dataset.name.clone(),
                        time,
                    });
                }

                // Records that were never ingested keep their flags.
                (None, _) | (_, None) => (),

                (Some(bin), Some((mut ant1, mut ant2))) => {
                    if ant1 > ant2 {
                        std::mem::swap(&mut ant1, &mut ant2);
                        record.data.iter_mut().for_each(|d| *d = d.conj());
                    }
                    let bl = baseline_index(layout.num_ants, ant1, ant2);
                    let pol = layout.pol_index(record.pol);
                    for (chan, g) in good.iter_mut().enumerate().filter(|(_, g)| **g) {
                        *g = match pol {
                            Some(p) => !bin.flags.get(p, bl, chan),
                            None => (0..NUM_POLS).all(|p| !bin.flags.get(p, bl, chan)),
                        };
                    }

                    if let (true, Some(p), Some(stats)) = (check_single, pol, &bin.stats) {
                        let median = stats.median[[p, bl]];
                        let limit = SINGLE_SAMPLE_SIGMA * stats.deviation[[p, bl]].norm();
                        let gains = bin.gains.as_ref().filter(|_| apply_gains && ant1 != ant2);
                        for (chan, g) in good.iter_mut().enumerate().filter(|(_, g)| **g) {
                            let factor = gains
                                .map(|gains| gains.baseline_factor(p, ant1, ant2, chan))
                                .unwrap_or(c32::new(1.0, 0.0));
                            if (record.data[chan] * factor - median).norm() > limit {
                                *g = false;
                                summary.num_single_sample += 1;
                            }
                        }
                    }
                }
            }

            summary.good_after += good.iter().filter(|&&g| g).count();
            if !self.options.no_flag {
                file.write_flags(&good)?;
            }
        }
        progress.abandon_with_message(format!("Finished writing flags to '{}'", dataset.name));

        if !self.options.no_flag {
            if let Some(line) = history {
                file.add_history(line);
            }
            file.finish()?;
        }
        debug!("'{}': {summary:?}", dataset.name);
        Ok(summary)
    }
}

/// Find the scan containing `time`. The search starts at `cursor`, as records
/// are mostly visited in the same order as the scans, and falls back to
/// earlier scans.
fn find_bin<'b>(bins: &'b [Bin], cursor: &mut usize, time: f64) -> Option<&'b Bin> {
    let start = (*cursor).min(bins.len());
    let found = bins[start..]
        .iter()
        .position(|b| b.contains(time))
        .map(|i| i + start)
        .or_else(|| bins[..start].iter().position(|b| b.contains(time)));
    found.map(|i| {
        *cursor = i;
        &bins[i]
    })
}

/// 0-indexed antennas of a baseline, as stored in the file (not reordered).
fn ants_in_range(baseline: u32, num_ants: usize) -> Option<(usize, usize)> {
    let (ant1, ant2) = decode_baseline(baseline);
    let in_range = |a: u32| a >= 1 && (a as usize) <= num_ants;
    (in_range(ant1) && in_range(ant2)).then(|| (ant1 as usize - 1, ant2 as usize - 1))
}
