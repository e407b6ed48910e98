// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Feature toggles.

use std::collections::HashSet;

use itertools::Itertools;
use log::warn;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use super::ParamsError;

/// Every option word that may be given with `--options`. A word selects an
/// option if it is a case-insensitive prefix of the option's name.
#[derive(Debug, Display, EnumIter, EnumString, IntoStaticStr, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum FlagOption {
    /// Do everything except write flags.
    NoFlag,
    /// Don't flatten bandpasses.
    NoBand,
    /// Don't check calibrator phase scatter.
    NoPhase,
    /// Don't look for narrowband RFI or single-sample outliers.
    NoRfi,
    /// Look for spectral corruption.
    Ata,
    /// Look at the distribution of calibrator data in the complex plane.
    Dist,
    /// Flag excessively noisy calibrator baselines.
    Noise,
    /// Flag cells that are already mostly flagged.
    Reten,
    /// Look for outliers in each cell's time series.
    Time,
    /// Don't check individual samples.
    NoSingle,
    /// Apply calibrator flags to the target scans between them.
    Interpolate,
}

lazy_static::lazy_static! {
    pub(crate) static ref FLAG_OPTION_NAMES: String = FlagOption::iter().join(", ");
}

/// The flagging configuration. This is set once from the command line and
/// handed to everything that flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagOptions {
    pub no_flag: bool,
    pub no_band: bool,
    pub no_phase: bool,
    pub no_rfi: bool,
    pub ata: bool,
    pub dist: bool,
    pub noise: bool,
    pub reten: bool,
    pub tseries: bool,
    pub no_single: bool,
    pub interpolate: bool,

    /// Flag noisy baselines feeding slowly-converging bandpass gains.
    #[serde(default)]
    pub flag_slow_convergers: bool,
}

impl FlagOptions {
    /// Parse option words. Each item may itself be a comma-separated list.
    /// Unrecognised or ambiguous words are errors; repeated options are
    /// warned about.
    pub fn parse<S: AsRef<str>>(words: &[S]) -> Result<FlagOptions, ParamsError> {
        let mut options = FlagOptions::default();
        let mut seen = HashSet::new();
        for word in words
            .iter()
            .flat_map(|w| w.as_ref().split(','))
            .map(str::trim)
            .filter(|w| !w.is_empty())
        {
            let option = match_option(word)?;
            if !seen.insert(option) {
                warn!("Option '{option}' was given more than once");
            }
            options.set(option);
        }
        Ok(options)
    }

    fn set(&mut self, option: FlagOption) {
        *self.field_mut(option) = true;
    }

    fn field_mut(&mut self, option: FlagOption) -> &mut bool {
        match option {
            FlagOption::NoFlag => &mut self.no_flag,
            FlagOption::NoBand => &mut self.no_band,
            FlagOption::NoPhase => &mut self.no_phase,
            FlagOption::NoRfi => &mut self.no_rfi,
            FlagOption::Ata => &mut self.ata,
            FlagOption::Dist => &mut self.dist,
            FlagOption::Noise => &mut self.noise,
            FlagOption::Reten => &mut self.reten,
            FlagOption::Time => &mut self.tseries,
            FlagOption::NoSingle => &mut self.no_single,
            FlagOption::Interpolate => &mut self.interpolate,
        }
    }

    /// The options that are set.
    pub fn enabled(&self) -> Vec<FlagOption> {
        let mut copy = *self;
        FlagOption::iter()
            .filter(|&option| *copy.field_mut(option))
            .collect()
    }

    /// Should individual samples be checked when writing flags?
    pub fn check_single_samples(&self) -> bool {
        !(self.no_single || self.no_rfi)
    }
}

/// Find the option a word selects.
fn match_option(word: &str) -> Result<FlagOption, ParamsError> {
    let lower = word.to_lowercase();
    let mut matches = vec![];
    for option in FlagOption::iter() {
        let name: &'static str = option.into();
        if name == lower {
            return Ok(option);
        }
        if name.starts_with(&lower) {
            matches.push(option);
        }
    }
    match matches.as_slice() {
        [] => Err(ParamsError::UnrecognisedOption {
            word: word.to_string(),
            valid: FLAG_OPTION_NAMES.clone(),
        }),
        [option] => Ok(*option),
        _ => Err(ParamsError::AmbiguousOption {
            word: word.to_string(),
            matches: matches.iter().join(", "),
        }),
    }
}
