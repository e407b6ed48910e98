// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Deciding which visibilities are bad.
//!
//! Every scan is passed through a fixed sequence of checks; each check may only
//! add flags, and statistics are recomputed from the surviving samples before
//! the next check runs:
//!
//! 1. retention (`reten`): cells that are already mostly flagged;
//! 2. gathering samples into (pol, baseline, channel) cells;
//! 3. robust statistics of every cell and baseline;
//! 4. time-series outliers (`time`);
//! 5. bandpass flattening (unless `noband`): calibrator scans solve for gains,
//!    target scans borrow them from the nearest calibrator scan;
//! 6. spectral corruption (`ata`);
//! 7. narrowband RFI (unless `norfi`);
//! 8. distribution shape (`dist`, calibrators only);
//! 9. noisy baselines (`noise`, calibrators only).
//!
//! Once all scans of a calibrator dataset are done, baselines with a large
//! phase scatter are flagged (unless `nophase`). Flags are then written back
//! with [`FlagWriter`].

mod calibrators;
mod error;
mod grid;
mod phases;
mod stats;
mod write;

pub use calibrators::CalibratorIndex;
pub use error::FlagError;
pub use grid::{FlagGrid, NUM_POLS};
pub use stats::BinStats;
pub use write::{FlagWriter, WriteSummary};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, warn};

use crate::{
    bandpass::{BandpassSolver, Gains},
    constants::{CORRUPTION_BLOCKS_CAL, CORRUPTION_BLOCKS_TARGET},
    dataset::{Bin, Dataset},
    params::FlagOptions,
    PROGRESS_BARS,
};
use stats::{Layout, Workspace};

/// The number of cells newly flagged by each check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseCounts {
    pub retention: usize,
    pub time_series: usize,
    /// Cells feeding slowly-converging bandpass gains.
    pub slow_convergers: usize,
    pub corruption: usize,
    pub narrowband: usize,
    pub distribution: usize,
    pub noise: usize,
}

impl PhaseCounts {
    pub fn total(&self) -> usize {
        self.retention
            + self.time_series
            + self.slow_convergers
            + self.corruption
            + self.narrowband
            + self.distribution
            + self.noise
    }
}

impl std::ops::AddAssign for PhaseCounts {
    fn add_assign(&mut self, other: PhaseCounts) {
        self.retention += other.retention;
        self.time_series += other.time_series;
        self.slow_convergers += other.slow_convergers;
        self.corruption += other.corruption;
        self.narrowband += other.narrowband;
        self.distribution += other.distribution;
        self.noise += other.noise;
    }
}

/// Flags the scans of datasets.
pub struct FlagEngine<'a> {
    options: &'a FlagOptions,
    solver: BandpassSolver,
}

impl<'a> FlagEngine<'a> {
    pub fn new(options: &'a FlagOptions) -> FlagEngine<'a> {
        FlagEngine {
            options,
            solver: BandpassSolver {
                flag_slow_convergers: options.flag_slow_convergers,
                ..Default::default()
            },
        }
    }

    /// Flag every scan of a dataset. Calibrator datasets are flagged with
    /// `calibrators` set to `None` and solve for their own gains; target
    /// datasets must be given the index of all (already flagged) calibrator
    /// scans.
    pub fn flag_dataset(
        &self,
        dataset: &mut Dataset,
        calibrators: Option<&CalibratorIndex>,
    ) -> Result<PhaseCounts, FlagError> {
        let layout = Layout::of(dataset);
        let kind = if calibrators.is_some() {
            "target"
        } else {
            "calibrator"
        };
        let progress = make_flagging_progress_bar(
            dataset.bins.len(),
            format!("Flagging {kind} scans"),
            PROGRESS_BARS.load(),
        );

        let mut total = PhaseCounts::default();
        let mut num_interpolated = 0;
        for (i_bin, bin) in dataset.bins.iter_mut().enumerate() {
            if let (Some(index), true) = (calibrators, self.options.interpolate) {
                num_interpolated +=
                    index.interpolate_flags(layout.time0 + bin.first_time, &mut bin.flags)?;
            }
            let counts = self.flag_bin(bin, &layout, calibrators)?;
            debug!("Scan {i_bin}: {counts:?}");
            total += counts;
            progress.inc(1);
        }
        progress.abandon_with_message(format!("Finished flagging {kind} scans"));

        if num_interpolated > 0 {
            info!("Applied {num_interpolated} calibrator flags to '{}'", dataset.name);
        }
        Ok(total)
    }

    /// Run every check over one scan. The scan's visibilities are consumed;
    /// its statistics and gains are kept.
    pub(crate) fn flag_bin(
        &self,
        bin: &mut Bin,
        layout: &Layout,
        calibrators: Option<&CalibratorIndex>,
    ) -> Result<PhaseCounts, FlagError> {
        let options = self.options;
        let is_calibrator = calibrators.is_none();
        let mut counts = PhaseCounts::default();

        if options.reten {
            counts.retention = phases::retention(bin, layout);
        }

        let mut ws = Workspace::materialise(bin, layout)?;
        ws.recompute();

        if options.tseries {
            counts.time_series = phases::time_series(&mut ws, &mut bin.flags);
            ws.recompute_spectra();
        }

        if !options.no_band {
            let gains = match calibrators {
                Some(index) => borrowed_gains(bin, layout, index),
                None if layout.num_ants < 2 => {
                    warn!("Can't flatten the bandpass with fewer than 2 antennas");
                    None
                }
                None => {
                    let solution = self.solver.solve(
                        layout.num_ants,
                        ws.stats.med_spec.view(),
                        ws.stats.median.view(),
                        ws.stats.rms_spec.view(),
                    )?;
                    debug!("Bandpass solve: {:?}", solution.result);
                    for (pol, bl, chan) in solution.suspects {
                        if ws.exclude(&mut bin.flags, pol, bl, chan) {
                            counts.slow_convergers += 1;
                        }
                    }
                    Some(solution.gains)
                }
            };
            if let Some(gains) = gains {
                ws.apply_gains(&gains, layout.num_ants);
                bin.gains = Some(gains);
            }
            ws.recompute();
        }

        if options.ata {
            let num_blocks = if is_calibrator {
                CORRUPTION_BLOCKS_CAL
            } else {
                CORRUPTION_BLOCKS_TARGET
            };
            counts.corruption =
                phases::spectral_corruption(&mut ws, &mut bin.flags, layout, num_blocks);
            ws.recompute();
        }

        if !options.no_rfi {
            counts.narrowband = phases::narrowband(&mut ws, &mut bin.flags);
            ws.recompute();
        }

        if is_calibrator && options.dist {
            counts.distribution = phases::distribution(&mut ws, &mut bin.flags);
        }

        if is_calibrator && options.noise {
            counts.noise = phases::noisy_baselines(&mut ws, &mut bin.flags);
        }

        ws.recompute();
        bin.stats = Some(ws.stats);
        Ok(counts)
    }

    /// Flag (pol, baseline)s of every scan whose phase scatter is too large.
    /// Only meaningful for calibrators. Returns the number of (pol,
    /// baseline)s flagged.
    pub fn check_phases(&self, dataset: &mut Dataset) -> usize {
        dataset
            .bins
            .iter_mut()
            .map(|bin| match &mut bin.stats {
                Some(stats) => phases::phase_scatter(stats, &mut bin.flags),
                None => 0,
            })
            .sum()
    }
}

/// Copy the gains of the calibrator scan nearest to a target scan.
fn borrowed_gains(bin: &Bin, layout: &Layout, index: &CalibratorIndex) -> Option<Gains> {
    let first = layout.time0 + bin.first_time;
    let last = layout.time0 + bin.last_time;
    match index.nearest_gains(first, last) {
        Some(gains) if gains.dim().1 == layout.num_ants && gains.num_chans() == layout.num_chans => {
            Some(gains.clone())
        }
        Some(gains) => {
            warn!(
                "Calibrator gains are for {} antennas and {} channels, but the scan at JD {first:.5} has {} and {}; not flattening its bandpass",
                gains.dim().1,
                gains.num_chans(),
                layout.num_ants,
                layout.num_chans
            );
            None
        }
        None => {
            warn!("No calibrator gains found for the scan at JD {first:.5}");
            None
        }
    }
}

/// Convenience function to make a progress bar while flagging. `draw`
/// determines if the progress bar is actually displayed.
fn make_flagging_progress_bar(num_bins: usize, message: String, draw: bool) -> ProgressBar {
    ProgressBar::with_draw_target(
        Some(num_bins as _),
        if draw {
            // Use stdout, not stderr, because the messages printed by the
            // progress bar are valuable.
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        },
    )
    .with_style(
        ProgressStyle::default_bar()
            .template("{msg}: [{wide_bar:.blue}] {pos:3}/{len:3} ({elapsed_precise}<{eta_precise})")
            .unwrap()
            .progress_chars("=> "),
    )
    .with_position(0)
    .with_message(message)
}
