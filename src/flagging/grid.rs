// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Packed flags for a scan.

use super::FlagError;

/// The number of (parallel-hand) polarisations a [`FlagGrid`] holds.
pub const NUM_POLS: usize = 2;

/// Flags for every polarisation, baseline and channel of a scan, packed eight
/// per byte. Flags are encoded as bits, i.e. 0 for unflagged, 1 for flagged.
/// The bit index is `pol * (num_baselines * num_chans) + baseline * num_chans
/// + chan` (channel fastest), with the least significant bit of each byte
/// first.
///
/// This is the inverse of the per-channel flags of a visibility file (and of
/// [`crate::dataset::ChannelFlags`]), where a set bit marks good data. A new
/// grid is all zeros, so merging with OR only ever adds flags;
/// [`FlagWriter`](super::FlagWriter) inverts on the way out.
///
/// Flags are never cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagGrid {
    num_baselines: usize,
    num_chans: usize,
    bits: Vec<u8>,
}

impl FlagGrid {
    /// Create a grid with no flags set.
    pub fn new(num_baselines: usize, num_chans: usize) -> FlagGrid {
        let num_bits = NUM_POLS * num_baselines * num_chans;
        FlagGrid {
            num_baselines,
            num_chans,
            bits: vec![0; (num_bits + 7) / 8],
        }
    }

    /// (pols, baselines, channels)
    pub fn dim(&self) -> (usize, usize, usize) {
        (NUM_POLS, self.num_baselines, self.num_chans)
    }

    #[inline]
    fn index(&self, pol: usize, baseline: usize, chan: usize) -> usize {
        debug_assert!(pol < NUM_POLS);
        debug_assert!(baseline < self.num_baselines);
        debug_assert!(chan < self.num_chans);
        pol * self.num_baselines * self.num_chans + baseline * self.num_chans + chan
    }

    /// Is this cell flagged?
    #[inline]
    pub fn get(&self, pol: usize, baseline: usize, chan: usize) -> bool {
        let i = self.index(pol, baseline, chan);
        self.bits[i / 8] & (1 << (i % 8)) != 0
    }

    /// Flag a cell. Returns `true` if it wasn't already flagged.
    #[inline]
    pub fn set(&mut self, pol: usize, baseline: usize, chan: usize) -> bool {
        let i = self.index(pol, baseline, chan);
        let mask = 1 << (i % 8);
        let byte = &mut self.bits[i / 8];
        let new = *byte & mask == 0;
        *byte |= mask;
        new
    }

    /// Flag every channel of a polarisation and baseline. Returns the number of
    /// newly-flagged cells.
    pub fn set_baseline(&mut self, pol: usize, baseline: usize) -> usize {
        (0..self.num_chans)
            .filter(|&chan| self.set(pol, baseline, chan))
            .count()
    }

    /// The number of flagged cells.
    pub fn count(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// The number of flagged channels of a polarisation and baseline.
    pub fn count_baseline(&self, pol: usize, baseline: usize) -> usize {
        (0..self.num_chans)
            .filter(|&chan| self.get(pol, baseline, chan))
            .count()
    }

    /// OR another grid's flags into this one. The grids must have the same
    /// shape.
    pub fn merge(&mut self, other: &FlagGrid) -> Result<(), FlagError> {
        if self.dim() != other.dim() {
            return Err(FlagError::ShapeMismatch {
                expected: self.dim(),
                got: other.dim(),
            });
        }
        for (mine, theirs) in self.bits.iter_mut().zip(other.bits.iter()) {
            *mine |= theirs;
        }
        Ok(())
    }

    /// The packed flags.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }
}
