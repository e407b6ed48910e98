// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Antenna-based bandpass gains.
//!
//! Gains are solved on a coarse spectral grid; the grid has roughly
//! sqrt(num_chans) bins, each a power of two channels wide. For an antenna
//! `a` on a baseline with antenna `b`, each baseline implies a gain
//!
//! `g_a = sqrt(M_ab / m_ab(k)) / conj(g_b)`
//!
//! where `M_ab` is the baseline's median over channels and `m_ab(k)` is the
//! median of gain bin `k`. The new gain is the average of the old gain and the
//! median of all implied gains. This is iterated until no gain changes by more than a
//! threshold.

mod error;
#[cfg(test)]
mod tests;

pub use error::BandpassError;

use log::{debug, warn};
use ndarray::prelude::*;

use crate::{
    c32,
    constants::{
        DEFAULT_BANDPASS_MAX_ITERATIONS, DEFAULT_BANDPASS_STOP_THRESHOLD, SLOW_CONVERGER_NOISE_RATIO,
        SLOW_CONVERGER_RATIO,
    },
    math::{baseline_index, cross_baselines, median, median_cmplx, num_baselines, NAN_C32},
};

/// The width of a gain bin [channels] for a spectrum with `num_chans` channels:
/// `2^floor(log2(num_chans) / 2)`.
pub fn gain_bin_width(num_chans: usize) -> usize {
    if num_chans < 2 {
        return 1;
    }
    let log2 = usize::BITS - 1 - num_chans.leading_zeros();
    1 << (log2 / 2)
}

/// Complex gains for each polarisation, antenna and gain bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Gains {
    /// (pol, antenna, gain bin)
    gains: Array3<c32>,
    num_chans: usize,
    bin_width: usize,
}

impl Gains {
    /// Gains of 1 for every antenna.
    pub fn neutral(num_pols: usize, num_ants: usize, num_chans: usize) -> Gains {
        let bin_width = gain_bin_width(num_chans);
        let num_bins = (num_chans + bin_width - 1) / bin_width;
        Gains {
            gains: Array3::from_elem((num_pols, num_ants, num_bins.max(1)), c32::new(1.0, 0.0)),
            num_chans,
            bin_width,
        }
    }

    /// (pols, antennas, gain bins)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.gains.dim()
    }

    pub fn num_chans(&self) -> usize {
        self.num_chans
    }

    pub fn bin_width(&self) -> usize {
        self.bin_width
    }

    /// The gains on the coarse grid.
    pub fn view(&self) -> ArrayView3<c32> {
        self.gains.view()
    }

    /// The channel at the centre of a gain bin. Not necessarily an integer.
    fn bin_centre(&self, bin: usize) -> f32 {
        (bin * self.bin_width) as f32 + (self.bin_width - 1) as f32 / 2.0
    }

    /// The gain of an antenna at a channel. Gains are exact at bin centres,
    /// linearly interpolated between them, and flat beyond the outermost
    /// centres.
    pub fn gain_at(&self, pol: usize, ant: usize, chan: usize) -> c32 {
        let row = self.gains.slice(s![pol, ant, ..]);
        let last = row.len() - 1;
        let pos = chan as f32;
        if pos <= self.bin_centre(0) {
            return row[0];
        }
        if pos >= self.bin_centre(last) {
            return row[last];
        }
        let lower = ((pos - self.bin_centre(0)) / self.bin_width as f32).floor() as usize;
        let t = (pos - self.bin_centre(lower)) / self.bin_width as f32;
        row[lower] * (1.0 - t) + row[lower + 1] * t
    }

    /// The correction for a baseline at a channel: `g(ant1) * conj(g(ant2))`.
    pub fn baseline_factor(&self, pol: usize, ant1: usize, ant2: usize, chan: usize) -> c32 {
        self.gain_at(pol, ant1, chan) * self.gain_at(pol, ant2, chan).conj()
    }
}

/// How a solve went.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverResult {
    pub num_iterations: usize,
    pub converged: bool,
    /// The largest gain change of the final iteration.
    pub max_change: f32,
    /// The median gain change of the final iteration.
    pub median_change: f32,
}

#[derive(Debug, Clone)]
pub struct BandpassSolution {
    pub gains: Gains,
    pub result: SolverResult,
    /// (pol, baseline, channel) cells that should be flagged because they
    /// contribute to slowly-converging gains. Always empty unless
    /// [`BandpassSolver::flag_slow_convergers`] is set.
    pub suspects: Vec<(usize, usize, usize)>,
}

#[derive(Debug, Clone, Copy)]
pub struct BandpassSolver {
    pub max_iterations: usize,
    /// Stop iterating when no gain changes by more than this.
    pub stop_threshold: f32,
    /// Once the median gain change is below `stop_threshold`, look for noisy
    /// baselines feeding gains that are still moving.
    pub flag_slow_convergers: bool,
}

impl Default for BandpassSolver {
    fn default() -> Self {
        BandpassSolver {
            max_iterations: DEFAULT_BANDPASS_MAX_ITERATIONS,
            stop_threshold: DEFAULT_BANDPASS_STOP_THRESHOLD,
            flag_slow_convergers: false,
        }
    }
}

impl BandpassSolver {
    /// Solve for gains.
    ///
    /// `med_spec` and `rms_spec` are the (pol, baseline, channel) medians and
    /// deviations over time, and `spec_median` is each (pol, baseline) median over
    /// channels. Excluded cells are NaN. The inputs are not modified.
    pub fn solve(
        &self,
        num_ants: usize,
        med_spec: ArrayView3<c32>,
        spec_median: ArrayView2<c32>,
        rms_spec: ArrayView3<c32>,
    ) -> Result<BandpassSolution, BandpassError> {
        if num_ants < 2 {
            return Err(BandpassError::TooFewAntennas { num_ants });
        }
        let (num_pols, num_bls, num_chans) = med_spec.dim();
        if num_bls != num_baselines(num_ants) {
            return Err(BandpassError::ShapeMismatch {
                what: "medians",
                expected: vec![num_pols, num_baselines(num_ants), num_chans],
                got: med_spec.shape().to_vec(),
            });
        }
        if spec_median.dim() != (num_pols, num_bls) {
            return Err(BandpassError::ShapeMismatch {
                what: "baseline medians",
                expected: vec![num_pols, num_bls],
                got: spec_median.shape().to_vec(),
            });
        }
        if rms_spec.dim() != med_spec.dim() {
            return Err(BandpassError::ShapeMismatch {
                what: "deviations",
                expected: med_spec.shape().to_vec(),
                got: rms_spec.shape().to_vec(),
            });
        }

        let mut gains = Gains::neutral(num_pols, num_ants, num_chans);
        let bin_width = gains.bin_width;
        let num_bins = gains.gains.len_of(Axis(2));

        // These are modified when flagging slow convergers.
        let mut med_spec = med_spec.to_owned();
        let mut rms_spec = rms_spec.to_owned();
        let mut spec_median = spec_median.to_owned();
        let mut binned = bin_medians(med_spec.view(), bin_width, num_bins);

        let mut changes = Array3::from_elem(gains.gains.dim(), f32::NAN);
        let mut candidates = Vec::with_capacity(num_ants - 1);
        let mut suspects = vec![];
        let mut iteration = 0;
        debug!("Starting bandpass calibration loop");
        let result = loop {
            iteration += 1;
            let old = gains.gains.clone();

            for ((pol, ant, bin), gain) in gains.gains.indexed_iter_mut() {
                candidates.clear();
                for other in (0..num_ants).filter(|&a| a != ant) {
                    let (ant1, ant2) = (ant.min(other), ant.max(other));
                    let bl = baseline_index(num_ants, ant1, ant2);
                    let ratio = (spec_median[[pol, bl]] / binned[[pol, bl, bin]]).sqrt();
                    let other_gain = old[[pol, other, bin]];
                    candidates.push(if ant == ant1 {
                        ratio / other_gain.conj()
                    } else {
                        // Solving for the second antenna of the pair.
                        (ratio / other_gain).conj()
                    });
                }

                let new = (median_cmplx(&candidates) + *gain) / 2.0;
                changes[[pol, ant, bin]] = (new - *gain).norm();
                if !new.is_nan() {
                    *gain = new;
                }
            }

            let change_list: Vec<f32> = changes.iter().copied().collect();
            let median_change = median(&change_list).unwrap_or(0.0);
            let max_change = change_list
                .iter()
                .filter(|c| !c.is_nan())
                .fold(0.0_f32, |acc, &c| acc.max(c));
            let num_outliers = change_list
                .iter()
                .filter(|&&c| c > SLOW_CONVERGER_RATIO * median_change)
                .count();
            debug!(
                "Bandpass iteration {iteration}: median change {median_change:.4}, max change {max_change:.2}, {num_outliers} outliers"
            );

            if self.flag_slow_convergers && median_change < self.stop_threshold {
                let num_new = flag_slow_convergers(
                    changes.view(),
                    median_change,
                    &mut med_spec,
                    &mut rms_spec,
                    &mut spec_median,
                    &mut binned,
                    bin_width,
                    &mut suspects,
                );
                debug!("{num_new} bl/pol/chans marked bad for slow convergence");
            }

            if max_change < self.stop_threshold {
                break SolverResult {
                    num_iterations: iteration,
                    converged: true,
                    max_change,
                    median_change,
                };
            }
            if iteration >= self.max_iterations {
                warn!("Reached maximum number of bandpass iterations ({iteration})");
                break SolverResult {
                    num_iterations: iteration,
                    converged: false,
                    max_change,
                    median_change,
                };
            }
        };

        Ok(BandpassSolution {
            gains,
            result,
            suspects,
        })
    }
}

/// The median of each (pol, baseline) over the channels of each gain bin.
fn bin_medians(med_spec: ArrayView3<c32>, bin_width: usize, num_bins: usize) -> Array3<c32> {
    let (num_pols, num_bls, num_chans) = med_spec.dim();
    let mut binned = Array3::from_elem((num_pols, num_bls, num_bins), NAN_C32);
    for ((pol, bl, bin), b) in binned.indexed_iter_mut() {
        let start = bin * bin_width;
        let end = ((bin + 1) * bin_width).min(num_chans);
        let chans: Vec<c32> = med_spec.slice(s![pol, bl, start..end]).to_vec();
        *b = median_cmplx(&chans);
    }
    binned
}

/// Flag cross-baseline cells with a large deviation that feed an antenna gain
/// whose change is more than [`SLOW_CONVERGER_RATIO`] times the median change.
/// Flagged cells are excluded from the statistics used for further iterations.
/// Returns the number of newly flagged cells.
#[allow(clippy::too_many_arguments)]
fn flag_slow_convergers(
    changes: ArrayView3<f32>,
    median_change: f32,
    med_spec: &mut Array3<c32>,
    rms_spec: &mut Array3<c32>,
    spec_median: &mut Array2<c32>,
    binned: &mut Array3<c32>,
    bin_width: usize,
    suspects: &mut Vec<(usize, usize, usize)>,
) -> usize {
    let (num_pols, num_ants, num_bins) = changes.dim();
    let num_chans = med_spec.len_of(Axis(2));
    let rms_list: Vec<c32> = rms_spec.iter().copied().collect();
    let med_rms = median_cmplx(&rms_list).norm();
    let is_slow = |pol: usize, ant: usize, bin: usize| {
        changes[[pol, ant, bin]] > SLOW_CONVERGER_RATIO * median_change
    };

    let mut num_new = 0;
    for pol in 0..num_pols {
        for (bl, ant1, ant2) in cross_baselines(num_ants) {
            let mut modified = false;
            for bin in (0..num_bins).filter(|&b| is_slow(pol, ant1, b) || is_slow(pol, ant2, b)) {
                let end = ((bin + 1) * bin_width).min(num_chans);
                for chan in bin * bin_width..end {
                    if rms_spec[[pol, bl, chan]].norm() > SLOW_CONVERGER_NOISE_RATIO * med_rms {
                        med_spec[[pol, bl, chan]] = NAN_C32;
                        rms_spec[[pol, bl, chan]] = NAN_C32;
                        suspects.push((pol, bl, chan));
                        num_new += 1;
                        modified = true;
                    }
                }
            }
            if modified {
                let row = med_spec.slice(s![pol, bl, ..]).to_vec();
                spec_median[[pol, bl]] = median_cmplx(&row);
                for bin in 0..num_bins {
                    let end = ((bin + 1) * bin_width).min(num_chans);
                    let chans = med_spec.slice(s![pol, bl, bin * bin_width..end]).to_vec();
                    binned[[pol, bl, bin]] = median_cmplx(&chans);
                }
            }
        }
    }
    num_new
}
