// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Automated flagging of radio-interferometric visibilities.

Calibrator and target visibility files are segmented into scans, robust
statistics are gathered per polarisation, baseline and channel, bandpasses are
flattened with antenna-based gains, and outliers caused by RFI, spectral
corruption or excess noise are flagged. The decisions are then written back
into each file's flag table.
 */

pub mod bandpass;
mod cli;
pub mod constants;
pub mod dataset;
pub mod flagging;
pub mod io;
pub mod math;
pub mod params;
pub mod pol;

// Re-exports.
pub use cli::{Autoflag, AutoflagError};
pub use dataset::{Bin, Dataset};
pub use flagging::{FlagEngine, FlagGrid};
pub use params::FlagOptions;

use crossbeam_utils::atomic::AtomicCell;

/// Single-precision complex numbers. Visibilities are stored with this
/// precision.
#[allow(non_camel_case_types)]
pub type c32 = num_complex::Complex32;

/// Should progress bars be drawn? This is set once by the command line.
pub(crate) static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
