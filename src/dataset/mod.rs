// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Visibilities grouped into scans ("bins").
//!
//! A [`Dataset`] holds everything known about one visibility file after it has
//! been read. Its visibilities are grouped into time-ordered [`Bin`]s; a gap of
//! more than [`SCAN_GAP_INTEGRATIONS`] integration times between visibilities
//! starts a new bin.

mod error;
mod ingest;
#[cfg(test)]
mod tests;

pub use error::IngestError;
pub use ingest::{load_dataset, IngestCounts};

use crate::{
    bandpass::Gains,
    c32,
    constants::{SCAN_GAP_INTEGRATIONS, SECONDS_PER_DAY, TIME_ORDER_TOLERANCE},
    flagging::{BinStats, FlagGrid},
    math::num_baselines,
};

/// Per-channel flags of a single visibility, packed eight per byte. Unlike
/// [`FlagGrid`], a set bit means the channel is *good*.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFlags {
    num_chans: usize,
    bits: Vec<u8>,
}

impl ChannelFlags {
    pub fn from_good(good: &[bool]) -> ChannelFlags {
        let mut bits = vec![0; (good.len() + 7) / 8];
        for (chan, _) in good.iter().enumerate().filter(|(_, &g)| g) {
            bits[chan / 8] |= 1 << (chan % 8);
        }
        ChannelFlags {
            num_chans: good.len(),
            bits,
        }
    }

    #[inline]
    pub fn is_good(&self, chan: usize) -> bool {
        self.bits[chan / 8] & (1 << (chan % 8)) != 0
    }

    pub fn num_good(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn len(&self) -> usize {
        self.num_chans
    }

    pub fn is_empty(&self) -> bool {
        self.num_chans == 0
    }
}

/// A single correlator record that has been accepted into a scan.
#[derive(Debug, Clone)]
pub struct Visibility {
    /// [days since the dataset's `time0`]
    pub time: f64,
    pub u: f64,
    pub v: f64,

    /// 0-indexed antennas, with `ants.0 <= ants.1`.
    pub ants: (usize, usize),

    /// The packed baseline index of `ants`.
    pub baseline: usize,

    /// The polarisation code.
    pub pol: i32,

    pub data: Vec<c32>,
    pub flags: ChannelFlags,

    /// Thermal-noise variance estimate (never negative).
    pub variance: f64,
}

/// A scan: a contiguous, time-ordered block of visibilities.
#[derive(Debug, Clone)]
pub struct Bin {
    /// [days since the dataset's `time0`]
    pub first_time: f64,
    /// [days since the dataset's `time0`]
    pub last_time: f64,

    /// The number of visibilities that were put into this bin.
    pub num_vis: usize,

    /// The raw visibilities. These are dropped once the bin's statistics have
    /// been gathered.
    pub(crate) vis: Vec<Visibility>,

    pub flags: FlagGrid,

    /// Statistics gathered while flagging.
    pub stats: Option<BinStats>,

    /// Bandpass gains solved for (or copied into) this bin.
    pub gains: Option<Gains>,
}

impl Bin {
    fn new(vis: Visibility, num_baselines: usize, num_chans: usize) -> Bin {
        Bin {
            first_time: vis.time,
            last_time: vis.time,
            num_vis: 1,
            vis: vec![vis],
            flags: FlagGrid::new(num_baselines, num_chans),
            stats: None,
            gains: None,
        }
    }

    /// Does this bin's time range contain `time` [days since `time0`]?
    pub fn contains(&self, time: f64) -> bool {
        time >= self.first_time && time <= self.last_time
    }

    /// The raw visibilities, if they haven't yet been dropped.
    pub fn visibilities(&self) -> &[Visibility] {
        &self.vis
    }
}

/// One visibility file, read and binned.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub obs_type: String,

    pub num_ants: usize,
    /// Includes auto-correlations.
    pub num_baselines: usize,
    pub num_chans: usize,

    /// [seconds]
    pub int_time: f32,

    /// The Julian date of the first record. All other times are relative to
    /// this.
    pub time0: f64,

    /// Pointing centre [radians].
    pub ra: f64,
    pub dec: f64,

    /// The parallel-hand polarisation codes present, in ascending order. These
    /// are the polarisation axis of every bin's [`FlagGrid`].
    pub pols: [Option<i32>; 2],

    pub bins: Vec<Bin>,

    pub counts: IngestCounts,
}

impl Dataset {
    pub(crate) fn new(name: String, obs_type: String) -> Dataset {
        Dataset {
            name,
            obs_type,
            num_ants: 0,
            num_baselines: 0,
            num_chans: 0,
            int_time: 0.0,
            time0: 0.0,
            ra: 0.0,
            dec: 0.0,
            pols: [None, None],
            bins: vec![],
            counts: IngestCounts::default(),
        }
    }

    pub(crate) fn set_num_ants(&mut self, num_ants: usize) {
        self.num_ants = num_ants;
        self.num_baselines = num_baselines(num_ants);
    }

    /// The position of a polarisation code on a bin's polarisation axis. Only
    /// parallel-hand polarisations have one.
    pub fn pol_index(&self, pol: i32) -> Option<usize> {
        self.pols.iter().position(|&p| p == Some(pol))
    }

    /// Put a visibility into the last bin, or start a new bin if there's a
    /// big enough gap in time.
    pub(crate) fn insert(&mut self, vis: Visibility) -> Result<(), IngestError> {
        let int_time_days = f64::from(self.int_time) / SECONDS_PER_DAY;
        let (num_baselines, num_chans) = (self.num_baselines, self.num_chans);
        let last = match self.bins.last_mut() {
            Some(b) => b,
            None => {
                self.bins.push(Bin::new(vis, num_baselines, num_chans));
                return Ok(());
            }
        };

        if vis.time < last.first_time {
            if last.first_time - vis.time > TIME_ORDER_TOLERANCE * int_time_days {
                return Err(IngestError::OutOfOrder {
                    file: self.name.clone(),
                    time: vis.time,
                    scan_start: last.first_time,
                });
            }
            last.first_time = vis.time;
        }

        if vis.time - last.last_time > SCAN_GAP_INTEGRATIONS * int_time_days {
            self.bins.push(Bin::new(vis, num_baselines, num_chans));
        } else {
            last.last_time = last.last_time.max(vis.time);
            last.num_vis += 1;
            last.vis.push(vis);
        }
        Ok(())
    }

    /// The total number of visibilities held in bins.
    pub fn num_vis(&self) -> usize {
        self.bins.iter().map(|b| b.num_vis).sum()
    }
}
