// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.


use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use clap::Parser;
use itertools::Itertools;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use vec1::Vec1;

use super::common::{display_warnings, InfoPrinter, Warn, ARG_FILE_HELP};
use crate::{
    io::{get_all_matches_from_glob, GlobError},
    params::{AutoflagParams, FlagOptions, ParamsError, FLAG_OPTION_NAMES},
    AutoflagError,
};

lazy_static::lazy_static! {
    static ref OPTIONS_HELP: String =
        format!("Comma-separated flagging options. Each may be abbreviated to any unambiguous prefix. Available options: {}", *FLAG_OPTION_NAMES);
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct FlagArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// Calibrator visibility files. These are flagged first and supply
    /// bandpass gains to the target files. Globs are expanded. At least one is
    /// required.
    #[clap(short, long, multiple_values(true), help_heading = "INPUT FILES")]
    pub(super) cal: Option<Vec<String>>,

    /// Target visibility files. Globs are expanded.
    #[clap(long, multiple_values(true), help_heading = "INPUT FILES")]
    pub(super) vis: Option<Vec<String>>,

    #[clap(
        short,
        long,
        multiple_values(true),
        help = OPTIONS_HELP.as_str(),
        help_heading = "FLAGGING"
    )]
    pub(super) options: Option<Vec<String>>,

    /// While flattening calibrator bandpasses, flag noisy baselines that feed
    /// slowly-converging gains.
    #[clap(long, help_heading = "FLAGGING")]
    #[serde(default)]
    pub(super) flag_slow_convergers: bool,
}

impl FlagArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<FlagArgs, AutoflagError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Read in the file arguments. Ensure all of the file args are
            // accounted for by pattern matching.
            let FlagArgs {
                args_file: _,
                cal,
                vis,
                options,
                flag_slow_convergers,
            } = unpack_arg_file!(arg_file);

            // Merge all the arguments, preferring the CLI args when available.
            Ok(FlagArgs {
                args_file: None,
                cal: cli_args.cal.or(cal),
                vis: cli_args.vis.or(vis),
                options: cli_args.options.or(options),
                flag_slow_convergers: cli_args.flag_slow_convergers || flag_slow_convergers,
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<AutoflagParams, FlagArgsError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            cal,
            vis,
            options,
            flag_slow_convergers,
        } = self;

        let calibrators = expand_globs(cal.unwrap_or_default())?;
        let calibrators = Vec1::try_from_vec(calibrators).map_err(|_| FlagArgsError::NoCalibrators)?;
        let targets = expand_globs(vis.unwrap_or_default())?;
        if targets.is_empty() {
            "No target visibilities were given; only calibrators will be flagged".warn();
        }

        let mut options = FlagOptions::parse(&options.unwrap_or_default())?;
        options.flag_slow_convergers = flag_slow_convergers;
        if options.no_flag {
            "'noflag' was given; flags will be computed but not written".warn();
        }
        if options.no_rfi && options.no_single {
            "'norfi' already turns off the single-sample check; 'nosingle' is redundant".warn();
        }
        let enabled = options.enabled().into_iter().join(",");

        let mut printer = InfoPrinter::new("Flagging set up".into());
        let mut block: Vec<Cow<'static, str>> = vec!["Calibrators:".into()];
        block.extend(calibrators.iter().map(|p| format!("  {}", p.display()).into()));
        printer.push_block(block);
        if !targets.is_empty() {
            let mut block: Vec<Cow<'static, str>> = vec!["Targets:".into()];
            block.extend(targets.iter().map(|p| format!("  {}", p.display()).into()));
            printer.push_block(block);
        }
        printer.push_line(
            format!(
                "Options: {}",
                if enabled.is_empty() { "<none>" } else { &enabled }
            )
            .into(),
        );
        if flag_slow_convergers {
            printer.push_line("Flagging noisy baselines feeding slowly-converging gains".into());
        }
        printer.display();
        display_warnings();

        Ok(AutoflagParams {
            calibrators,
            targets,
            options,
            history: format!(
                "autoflag {}: options={enabled}",
                env!("CARGO_PKG_VERSION")
            ),
            dry_run: false,
        })
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), AutoflagError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let mut params = self.parse()?;
        params.dry_run = dry_run;
        if dry_run {
            info!("Dry run -- datasets will be read but not flagged.");
        }

        params.run()?;
        Ok(())
    }
}

/// Paths that exist are used as they are; everything else is treated as a
/// glob.
fn expand_globs(entries: Vec<String>) -> Result<Vec<PathBuf>, GlobError> {
    let mut paths = vec![];
    for entry in entries {
        if Path::new(&entry).exists() {
            paths.push(PathBuf::from(entry));
        } else {
            paths.extend(get_all_matches_from_glob(&entry)?);
        }
    }
    Ok(paths)
}

#[derive(thiserror::Error, Debug)]
pub(super) enum FlagArgsError {
    #[error("No calibrator visibility files were specified (use --cal)")]
    NoCalibrators,

    #[error(transparent)]
    Glob(#[from] GlobError),

    #[error(transparent)]
    Params(#[from] ParamsError),
}
