// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BandpassError {
    #[error("Cannot solve for bandpass gains with {num_ants} antennas; at least 2 are needed")]
    TooFewAntennas { num_ants: usize },

    #[error("Bandpass solver given {what} with shape {got:?}, expected {expected:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
}
