// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per-scan statistics, and the sample lists they're computed from.

use log::debug;
use ndarray::prelude::*;

use super::{FlagError, FlagGrid, NUM_POLS};
use crate::{
    bandpass::Gains,
    c32,
    dataset::{Bin, Dataset},
    math::{cross_baselines, median_deviation_cmplx, NAN_C32},
};

/// The shape of a dataset's scans.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Layout {
    pub(crate) num_ants: usize,
    pub(crate) num_baselines: usize,
    pub(crate) num_chans: usize,
    pub(crate) pols: [Option<i32>; 2],
    pub(crate) time0: f64,
}

impl Layout {
    pub(crate) fn of(dataset: &Dataset) -> Layout {
        Layout {
            num_ants: dataset.num_ants,
            num_baselines: dataset.num_baselines,
            num_chans: dataset.num_chans,
            pols: dataset.pols,
            time0: dataset.time0,
        }
    }

    pub(crate) fn pol_index(&self, pol: i32) -> Option<usize> {
        self.pols.iter().position(|&p| p == Some(pol))
    }

    pub(crate) fn shape(&self) -> (usize, usize, usize) {
        (NUM_POLS, self.num_baselines, self.num_chans)
    }
}

/// Robust statistics of a scan. Cells without any good samples are NaN.
#[derive(Debug, Clone)]
pub struct BinStats {
    /// The median of each (pol, baseline, channel) over time.
    pub med_spec: Array3<c32>,
    /// The deviation of each (pol, baseline, channel) over time.
    pub rms_spec: Array3<c32>,
    /// The mean of each (pol, baseline, channel) over time.
    pub vec_avg: Array3<c32>,
    /// The median of `med_spec` over channels for each (pol, baseline).
    pub median: Array2<c32>,
    /// The deviation of `med_spec` over channels for each (pol, baseline).
    pub deviation: Array2<c32>,
    /// The number of good samples in each (pol, baseline, channel).
    pub num_samples: Array3<u32>,
}

impl BinStats {
    /// Forget the statistics of a cell.
    pub(crate) fn clear(&mut self, pol: usize, baseline: usize, chan: usize) {
        let cell = [pol, baseline, chan];
        self.num_samples[cell] = 0;
        self.med_spec[cell] = NAN_C32;
        self.rms_spec[cell] = NAN_C32;
        self.vec_avg[cell] = NAN_C32;
    }
}

/// The samples of a scan that are being flagged, sorted into their
/// (pol, baseline, channel) cells.
pub(crate) struct Workspace {
    pub(crate) samples: Array3<Vec<c32>>,
    pub(crate) stats: BinStats,
}

impl Workspace {
    /// Move the visibilities of a bin into per-cell sample lists. Channels
    /// that are flagged in the visibility or in the bin are left out. The bin's
    /// visibilities are dropped.
    pub(crate) fn materialise(bin: &mut Bin, layout: &Layout) -> Result<Workspace, FlagError> {
        let shape = layout.shape();
        let vis = std::mem::take(&mut bin.vis);

        let mut num_samples = Array3::<u32>::zeros(shape);
        for v in &vis {
            let pol = match layout.pol_index(v.pol) {
                Some(p) => p,
                None => continue,
            };
            for chan in 0..layout.num_chans {
                if v.flags.is_good(chan) && !bin.flags.get(pol, v.baseline, chan) {
                    num_samples[[pol, v.baseline, chan]] += 1;
                }
            }
        }

        let total: usize = num_samples.iter().map(|&n| n as usize).sum();
        let need_gib = total * std::mem::size_of::<c32>() / 1024_usize.pow(3);
        debug!(
            "Gathering {total} samples ({:.2} MiB) into {} cells",
            (total * std::mem::size_of::<c32>()) as f64 / 1024.0_f64.powi(2),
            num_samples.len()
        );
        let mut samples: Array3<Vec<c32>> = Array3::from_elem(shape, vec![]);
        for (cell, &n) in samples.iter_mut().zip(num_samples.iter()) {
            cell.try_reserve_exact(n as usize)
                .map_err(|_| FlagError::InsufficientMemory { need_gib })?;
        }

        for v in vis {
            let pol = match layout.pol_index(v.pol) {
                Some(p) => p,
                None => continue,
            };
            for (chan, &d) in v.data.iter().enumerate() {
                if v.flags.is_good(chan) && !bin.flags.get(pol, v.baseline, chan) {
                    samples[[pol, v.baseline, chan]].push(d);
                }
            }
        }

        let mut workspace = Workspace {
            samples,
            stats: BinStats {
                med_spec: Array3::from_elem(shape, NAN_C32),
                rms_spec: Array3::from_elem(shape, NAN_C32),
                vec_avg: Array3::from_elem(shape, NAN_C32),
                median: Array2::from_elem((NUM_POLS, layout.num_baselines), NAN_C32),
                deviation: Array2::from_elem((NUM_POLS, layout.num_baselines), NAN_C32),
                num_samples,
            },
        };
        workspace.compute_vec_avg();
        Ok(workspace)
    }

    fn compute_vec_avg(&mut self) {
        for (avg, samples) in self.stats.vec_avg.iter_mut().zip(self.samples.iter()) {
            *avg = if samples.is_empty() {
                NAN_C32
            } else {
                samples.iter().sum::<c32>() / samples.len() as f32
            };
        }
    }

    /// Recompute the median and deviation of every cell over time.
    pub(crate) fn recompute_cells(&mut self) {
        for ((med, rms), samples) in self
            .stats
            .med_spec
            .iter_mut()
            .zip(self.stats.rms_spec.iter_mut())
            .zip(self.samples.iter())
        {
            (*med, *rms) = median_deviation_cmplx(samples);
        }
    }

    /// Recompute the median and deviation over channels of every
    /// (pol, baseline).
    pub(crate) fn recompute_spectra(&mut self) {
        let stats = &mut self.stats;
        for ((pol, bl), median) in stats.median.indexed_iter_mut() {
            let row = stats.med_spec.slice(s![pol, bl, ..]).to_vec();
            let (m, d) = median_deviation_cmplx(&row);
            *median = m;
            stats.deviation[[pol, bl]] = d;
        }
    }

    /// Recompute all statistics except the time average.
    pub(crate) fn recompute(&mut self) {
        self.recompute_cells();
        self.recompute_spectra();
    }

    /// Flag a cell, discarding its samples and statistics. Returns `true` if
    /// the cell wasn't already flagged.
    pub(crate) fn exclude(
        &mut self,
        flags: &mut FlagGrid,
        pol: usize,
        baseline: usize,
        chan: usize,
    ) -> bool {
        self.samples[[pol, baseline, chan]] = vec![];
        self.stats.clear(pol, baseline, chan);
        flags.set(pol, baseline, chan)
    }

    /// Multiply every cross-correlation sample (and time average) by
    /// `g(ant1) * conj(g(ant2))`.
    pub(crate) fn apply_gains(&mut self, gains: &Gains, num_ants: usize) {
        let num_chans = self.samples.len_of(Axis(2));
        for pol in 0..NUM_POLS {
            for (bl, ant1, ant2) in cross_baselines(num_ants) {
                for chan in 0..num_chans {
                    let factor = gains.baseline_factor(pol, ant1, ant2, chan);
                    self.samples[[pol, bl, chan]]
                        .iter_mut()
                        .for_each(|s| *s *= factor);
                    self.stats.vec_avg[[pol, bl, chan]] *= factor;
                }
            }
        }
    }
}
