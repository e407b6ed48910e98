// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.

mod robust;

pub use robust::*;

use crate::c32;

/// A complex "excluded" value. Any statistic that couldn't be computed is
/// represented by this.
pub const NAN_C32: c32 = c32::new(f32::NAN, f32::NAN);

/// The number of baselines formed by `num_ants` antennas, including
/// auto-correlations.
pub fn num_baselines(num_ants: usize) -> usize {
    num_ants * (num_ants + 1) / 2
}

/// Get the packed baseline index of an antenna pair. The pair must be ordered
/// (`ant1 <= ant2`); auto-correlations are included in the packing.
///
/// # Examples
///
/// `assert_eq!(baseline_index(3, 1, 2), 4);`
#[inline]
pub fn baseline_index(num_ants: usize, ant1: usize, ant2: usize) -> usize {
    debug_assert!(ant1 <= ant2);
    num_ants * ant1 - ant1 * (ant1 + 1) / 2 + ant2
}

/// Iterate over all cross-correlation baselines formed by `num_ants` antennas.
/// Each item is the packed baseline index and the two (0-indexed) antennas.
pub fn cross_baselines(num_ants: usize) -> impl Iterator<Item = (usize, usize, usize)> {
    (0..num_ants).flat_map(move |ant1| {
        (ant1 + 1..num_ants).map(move |ant2| (baseline_index(num_ants, ant1, ant2), ant1, ant2))
    })
}

/// Get the antennas of a packed baseline index. This is the inverse of
/// [`baseline_index`].
pub fn baseline_to_ants(num_ants: usize, baseline: usize) -> Option<(usize, usize)> {
    let mut start = 0;
    for ant1 in 0..num_ants {
        let row_len = num_ants - ant1;
        if baseline < start + row_len {
            return Some((ant1, ant1 + baseline - start));
        }
        start += row_len;
    }
    None
}
