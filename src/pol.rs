// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Polarisation products and their (MIRIAD) integer codes.

use strum_macros::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
pub enum Pol {
    I,
    Q,
    U,
    V,
    RR,
    LL,
    RL,
    LR,
    XX,
    YY,
    XY,
    YX,
}

impl Pol {
    pub fn from_code(code: i32) -> Option<Pol> {
        let pol = match code {
            1 => Pol::I,
            2 => Pol::Q,
            3 => Pol::U,
            4 => Pol::V,
            -1 => Pol::RR,
            -2 => Pol::LL,
            -3 => Pol::RL,
            -4 => Pol::LR,
            -5 => Pol::XX,
            -6 => Pol::YY,
            -7 => Pol::XY,
            -8 => Pol::YX,
            _ => return None,
        };
        Some(pol)
    }

    pub fn code(self) -> i32 {
        match self {
            Pol::I => 1,
            Pol::Q => 2,
            Pol::U => 3,
            Pol::V => 4,
            Pol::RR => -1,
            Pol::LL => -2,
            Pol::RL => -3,
            Pol::LR => -4,
            Pol::XX => -5,
            Pol::YY => -6,
            Pol::XY => -7,
            Pol::YX => -8,
        }
    }

    /// Is this product formed from matching feeds? Stokes I counts as
    /// parallel-hand.
    pub fn is_parallel_hand(self) -> bool {
        matches!(self, Pol::I | Pol::RR | Pol::LL | Pol::XX | Pol::YY)
    }
}

/// Is the polarisation code a known parallel-hand product?
pub fn is_parallel_hand(code: i32) -> bool {
    Pol::from_code(code)
        .map(Pol::is_parallel_hand)
        .unwrap_or(false)
}

/// A human-readable name for a polarisation code.
pub fn pol_name(code: i32) -> String {
    match Pol::from_code(code) {
        Some(pol) => pol.to_string(),
        None => format!("<unknown pol {code}>"),
    }
}
