// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

Thresholds are expressed in units of the relevant robust deviation unless
stated otherwise.
 */

/// Seconds in a day. Visibility times are Julian dates.
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// A gap between visibilities larger than this many integration times starts a
/// new scan.
pub const SCAN_GAP_INTEGRATIONS: f64 = 5.0;

/// Visibilities may arrive this many integration times earlier than the start
/// of the current scan before it is considered an ordering violation.
pub const TIME_ORDER_TOLERANCE: f64 = 0.1;

/// A sample lying further than this from its cell's median (in either the real
/// or imaginary part) counts as a time-series outlier.
pub const TSERIES_SIGMA: f32 = 4.0;

/// A cell is flagged by the time-series check when more than this fraction of
/// its samples are outliers.
pub const TSERIES_OUTLIER_FRACTION: f32 = 0.6;

/// Narrowband RFI threshold on the vector-averaged amplitude spectrum.
pub const NARROWBAND_SIGMA: f32 = 2.0;

/// With fewer unflagged channels than this, the top-decile deviation can't
/// exclude a single channel, so the narrowband check uses the 75% window.
pub const NARROWBAND_MIN_DEV90_CHANNELS: usize = 20;

/// Number of spectral blocks compared when looking for spectral corruption in a
/// calibrator scan.
pub const CORRUPTION_BLOCKS_CAL: usize = 4;

/// Number of spectral blocks compared when looking for spectral corruption in a
/// target scan.
pub const CORRUPTION_BLOCKS_TARGET: usize = 32;

/// Blocks narrower than this many channels aren't checked for corruption.
pub const CORRUPTION_MIN_BLOCK_WIDTH: usize = 4;

/// A block needs at least this many unflagged channels to yield a deviation.
pub const CORRUPTION_MIN_GOOD_CHANNELS: usize = 10;

/// A block whose deviation exceeds another block's by this ratio is suspect.
pub const CORRUPTION_RATIO: f32 = 3.0;

/// Distribution-shape threshold, in units of the baseline's deviation.
pub const DISTRIBUTION_SIGMA: f32 = 5.0;

/// Noise-baseline threshold, in units of the median baseline deviation.
pub const NOISE_RATIO: f32 = 3.0;

/// Calibrator baselines with a phase scatter larger than this [radians] are
/// flagged.
pub const PHASE_SCATTER_LIMIT: f32 = 1.0;

/// Per-visibility amplitude threshold, in units of the baseline's deviation.
pub const SINGLE_SAMPLE_SIGMA: f32 = 10.0;

/// The bandpass solver has converged when no gain changes by more than this.
pub const DEFAULT_BANDPASS_STOP_THRESHOLD: f32 = 0.01;

/// The maximum number of bandpass solver iterations.
pub const DEFAULT_BANDPASS_MAX_ITERATIONS: usize = 10;

/// Gains changing by more than this multiple of the median change are
/// "slow convergers".
pub const SLOW_CONVERGER_RATIO: f32 = 5.0;

/// Baselines touching a slow converger are flagged when their time-series
/// deviation exceeds this multiple of the median deviation.
pub const SLOW_CONVERGER_NOISE_RATIO: f32 = 3.0;
