// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use hifitime::Epoch;
use itertools::Itertools;
use log::{debug, info};
use vec1::Vec1;

use super::{FlagOptions, ParamsError};
use crate::{
    cli::InfoPrinter,
    dataset::{load_dataset, Dataset},
    flagging::{CalibratorIndex, FlagEngine, FlagWriter, PhaseCounts, WriteSummary},
    io::{open_vis_file, VisFile},
    pol::pol_name,
};

pub(crate) struct AutoflagParams {
    /// Calibrator datasets. These are flagged first and supply gains (and
    /// optionally flags) to the targets.
    pub(crate) calibrators: Vec1<PathBuf>,

    pub(crate) targets: Vec<PathBuf>,

    pub(crate) options: FlagOptions,

    /// Added to the history of every dataset whose flags are written.
    pub(crate) history: String,

    /// Read and summarise the datasets, but don't flag anything.
    pub(crate) dry_run: bool,
}

impl AutoflagParams {
    pub(crate) fn run(&self) -> Result<(), ParamsError> {
        let Self {
            calibrators,
            targets,
            options,
            history,
            dry_run,
        } = self;
        let engine = FlagEngine::new(options);
        let writer = FlagWriter::new(options);

        let mut index = CalibratorIndex::new();
        for path in calibrators {
            let (mut file, mut dataset) = open_and_load(path, "Calibrator")?;
            if *dry_run {
                continue;
            }

            let counts = engine.flag_dataset(&mut dataset, None)?;
            let num_phase = if options.no_phase {
                0
            } else {
                engine.check_phases(&mut dataset)
            };
            print_flagging_summary(&dataset, &counts, Some(num_phase));

            let summary = writer.write(&dataset, file.as_mut(), Some(history.clone()))?;
            print_write_summary(&dataset.name, &summary, options.no_flag);
            index.add_dataset(&dataset);
        }
        debug!("{} calibrator scans are available to targets", index.len());

        for path in targets {
            let (mut file, mut dataset) = open_and_load(path, "Target")?;
            if *dry_run {
                continue;
            }

            let counts = engine.flag_dataset(&mut dataset, Some(&index))?;
            print_flagging_summary(&dataset, &counts, None);

            let summary = writer.write(&dataset, file.as_mut(), Some(history.clone()))?;
            print_write_summary(&dataset.name, &summary, options.no_flag);
        }

        if *dry_run {
            info!("Dry run -- exiting now.");
        }
        Ok(())
    }
}

fn open_and_load(path: &Path, kind: &str) -> Result<(Box<dyn VisFile>, Dataset), ParamsError> {
    info!("Reading {} dataset '{}'", kind.to_lowercase(), path.display());
    let mut file = open_vis_file(path)?;
    let dataset = load_dataset(file.as_mut())?;
    print_dataset_summary(&dataset, kind);
    Ok((file, dataset))
}

fn print_dataset_summary(dataset: &Dataset, kind: &str) {
    let counts = &dataset.counts;
    let mut printer = InfoPrinter::new(format!("{kind} dataset '{}'", dataset.name).into());
    printer.push_block(vec![
        format!("Observation type: {}", dataset.obs_type).into(),
        format!("First timestamp: {}", Epoch::from_jde_utc(dataset.time0)).into(),
        format!(
            "{} antennas, {} channels, {} s integrations",
            dataset.num_ants, dataset.num_chans, dataset.int_time
        )
        .into(),
        format!(
            "Polarisations: {}",
            dataset.pols.iter().flatten().map(|&p| pol_name(p)).join(", ")
        )
        .into(),
    ]);
    printer.push_block(vec![
        format!(
            "{} records read; {} accepted into {} scans",
            counts.num_records,
            counts.num_accepted,
            dataset.bins.len()
        )
        .into(),
        format!("{} rejected for having no good channels", counts.num_bad).into(),
        format!("{} rejected for their polarisation", counts.num_bad_pol).into(),
        format!(
            "{:.2} flagged channels per accepted record",
            counts.mean_flagged_chans()
        )
        .into(),
    ]);
    printer.display();
}

fn print_flagging_summary(dataset: &Dataset, counts: &PhaseCounts, num_phase: Option<usize>) {
    let mut printer = InfoPrinter::new(format!("Flagged '{}'", dataset.name).into());
    let mut block: Vec<Cow<'static, str>> = vec![
        format!("Retention: {}", counts.retention).into(),
        format!("Time series: {}", counts.time_series).into(),
        format!("Slow bandpass convergence: {}", counts.slow_convergers).into(),
        format!("Spectral corruption: {}", counts.corruption).into(),
        format!("Narrowband RFI: {}", counts.narrowband).into(),
        format!("Distribution: {}", counts.distribution).into(),
        format!("Noisy baselines: {}", counts.noise).into(),
    ];
    if let Some(n) = num_phase {
        block.push(format!("Phase scatter: {n} baseline/pols").into());
    }
    printer.push_block(block);
    printer.push_line(
        format!(
            "{} cells flagged over {} scans",
            counts.total(),
            dataset.bins.len()
        )
        .into(),
    );
    printer.display();
}

fn print_write_summary(name: &str, summary: &WriteSummary, no_flag: bool) {
    let title = if no_flag {
        format!("Flags for '{name}' (not written)")
    } else {
        format!("Wrote flags to '{name}'")
    };
    let mut printer = InfoPrinter::new(title.into());
    printer.push_block(vec![
        format!(
            "Original data: {} good correlations of {} total",
            summary.good_before, summary.num_correlations
        )
        .into(),
        format!(
            "Modified data: {} good correlations of {} total",
            summary.good_after, summary.num_correlations
        )
        .into(),
    ]);
    printer.push_line(
        format!(
            "Flagged {} additional correlations ({:.2}%)",
            summary.num_additional(),
            summary.additional_percent()
        )
        .into(),
    );
    printer.push_line(
        format!(
            "{} individual channels flagged for outlying amplitudes",
            summary.num_single_sample
        )
        .into(),
    );
    printer.push_line(format!("{:.2}% data retention", summary.retention_percent()).into());
    printer.display();
}
