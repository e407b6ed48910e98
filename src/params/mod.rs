// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameters that are kept modular to be used in multiple aspects of
//! `autoflag`.
//!
//! The code here is kind of "mirroring" the code within the `cli` module; the
//! idea is that `cli` is unparsed, user-facing code, whereas parameters have
//! been parsed and are ready to be used directly.

mod autoflag;
mod error;
mod options;

pub(crate) use autoflag::AutoflagParams;
pub use error::ParamsError;
pub use options::{FlagOption, FlagOptions};
pub(crate) use options::FLAG_OPTION_NAMES;
