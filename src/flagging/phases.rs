// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The individual flagging passes over a scan. Each returns the number of
//! cells it newly flagged.

use log::{debug, info, warn};
use ndarray::prelude::*;

use super::{stats::Layout, BinStats, FlagGrid, Workspace, NUM_POLS};
use crate::{
    c32,
    constants::*,
    dataset::Bin,
    math::{
        cross_baselines, deviation90, deviation90_cmplx, median, median_cmplx,
        median_deviation25, median_deviation_cmplx, NAN_C32,
    },
    pol::pol_name,
};

/// Flag cells in which at least as many samples are flagged as unflagged.
/// This must run before the bin's visibilities are gathered into a
/// [`Workspace`].
pub(super) fn retention(bin: &mut Bin, layout: &Layout) -> usize {
    let shape = layout.shape();
    let mut num_good = Array3::<u32>::zeros(shape);
    let mut num_bad = Array3::<u32>::zeros(shape);
    for vis in &bin.vis {
        let pol = match layout.pol_index(vis.pol) {
            Some(p) => p,
            None => continue,
        };
        for chan in 0..layout.num_chans {
            if vis.flags.is_good(chan) {
                num_good[[pol, vis.baseline, chan]] += 1;
            } else {
                num_bad[[pol, vis.baseline, chan]] += 1;
            }
        }
    }

    let mut num_flagged = 0;
    for ((pol, bl, chan), &good) in num_good.indexed_iter() {
        if num_bad[[pol, bl, chan]] >= good && bin.flags.set(pol, bl, chan) {
            num_flagged += 1;
        }
    }
    num_flagged
}

/// Flag cells where most samples lie far from the cell's median, along with
/// their neighbouring channels.
pub(super) fn time_series(ws: &mut Workspace, flags: &mut FlagGrid) -> usize {
    let (_, num_bls, num_chans) = ws.samples.dim();
    let mut num_flagged = 0;
    for pol in 0..NUM_POLS {
        for bl in 0..num_bls {
            let noisy: Vec<usize> = (0..num_chans)
                .filter(|&chan| {
                    let samples = &ws.samples[[pol, bl, chan]];
                    if samples.is_empty() {
                        return false;
                    }
                    let med = ws.stats.med_spec[[pol, bl, chan]];
                    let rms = ws.stats.rms_spec[[pol, bl, chan]];
                    let num_high = samples
                        .iter()
                        .filter(|s| {
                            (s.re - med.re).abs() > TSERIES_SIGMA * rms.re
                                || (s.im - med.im).abs() > TSERIES_SIGMA * rms.im
                        })
                        .count();
                    num_high as f32 > TSERIES_OUTLIER_FRACTION * samples.len() as f32
                })
                .collect();

            for chan in noisy {
                for c in neighbourhood(chan, num_chans) {
                    if ws.exclude(flags, pol, bl, c) {
                        num_flagged += 1;
                    }
                }
            }
        }
    }
    num_flagged
}

/// A channel and its immediate neighbours.
fn neighbourhood(chan: usize, num_chans: usize) -> impl Iterator<Item = usize> {
    chan.saturating_sub(1)..(chan + 2).min(num_chans)
}

/// Look for blocks of the spectrum that are much noisier than other blocks of
/// the same baseline. Antennas whose baselines are repeatedly implicated have
/// the offending block flagged on all their baselines, worst first, until no
/// block stands out.
pub(super) fn spectral_corruption(
    ws: &mut Workspace,
    flags: &mut FlagGrid,
    layout: &Layout,
    num_blocks: usize,
) -> usize {
    let num_chans = layout.num_chans;
    let width = num_chans / num_blocks;
    if num_chans % num_blocks != 0 {
        warn!("Spectrum of {num_chans} channels does not divide evenly into {num_blocks} blocks");
    }
    if width < CORRUPTION_MIN_BLOCK_WIDTH {
        debug!("Spectral blocks are too narrow ({width} channels); skipping the corruption check");
        return 0;
    }

    let mut num_flagged = 0;
    loop {
        let counts = corruption_counts(&ws.stats, layout.num_ants, num_blocks, width);
        let max = counts.iter().copied().max().unwrap_or(0);
        if max == 0 {
            break;
        }
        for ((pol, ant, block), _) in counts.indexed_iter().filter(|(_, &c)| c >= max) {
            info!(
                "  Spectral corruption found on antpol {}-{}, block {block}",
                ant + 1,
                layout.pols[pol].map(pol_name).unwrap_or_default()
            );
        }

        let mut num_new = 0;
        for pol in 0..NUM_POLS {
            for (bl, ant1, ant2) in cross_baselines(layout.num_ants) {
                for block in 0..num_blocks {
                    if counts[[pol, ant1, block]] < max && counts[[pol, ant2, block]] < max {
                        continue;
                    }
                    let start = block * num_chans / num_blocks;
                    let end = (block + 1) * num_chans / num_blocks;
                    for chan in start..end {
                        if ws.exclude(flags, pol, bl, chan) {
                            num_new += 1;
                        }
                    }
                }
            }
        }
        ws.recompute_spectra();
        num_flagged += num_new;
        if num_new == 0 {
            break;
        }
    }
    num_flagged
}

/// For each (pol, antenna, block), the number of times one of the antenna's
/// baselines had that block more than [`CORRUPTION_RATIO`] times noisier than
/// another block.
fn corruption_counts(
    stats: &BinStats,
    num_ants: usize,
    num_blocks: usize,
    width: usize,
) -> Array3<u32> {
    let num_chans = stats.med_spec.len_of(Axis(2));
    let mut counts = Array3::zeros((NUM_POLS, num_ants, num_blocks));
    let mut devs = vec![NAN_C32; num_blocks];
    for pol in 0..NUM_POLS {
        for (bl, ant1, ant2) in cross_baselines(num_ants) {
            for (block, dev) in devs.iter_mut().enumerate() {
                let start = block * num_chans / num_blocks;
                let end = start + width;
                let med_window = stats.med_spec.slice(s![pol, bl, start..end]).to_vec();
                let (d, n) = deviation90_cmplx(&med_window);
                *dev = if n < CORRUPTION_MIN_GOOD_CHANNELS {
                    NAN_C32
                } else {
                    // Add the typical time-series deviation in quadrature.
                    let rms_window = stats.rms_spec.slice(s![pol, bl, start..end]).to_vec();
                    let rms = median_cmplx(&rms_window);
                    c32::new(d.re.hypot(rms.re), d.im.hypot(rms.im))
                };
            }

            for i in 0..num_blocks {
                for j in (0..num_blocks).filter(|&j| j != i) {
                    if devs[i].re > CORRUPTION_RATIO * devs[j].re
                        || devs[i].im > CORRUPTION_RATIO * devs[j].im
                    {
                        counts[[pol, ant1, i]] += 1;
                        counts[[pol, ant2, i]] += 1;
                    }
                }
            }
        }
    }
    counts
}

/// Flag channels whose time-averaged amplitude is high compared with the rest
/// of the spectrum, along with their neighbours. Each (pol, baseline) is
/// revisited until nothing new is flagged.
pub(super) fn narrowband(ws: &mut Workspace, flags: &mut FlagGrid) -> usize {
    let (_, num_bls, num_chans) = ws.samples.dim();
    let mut num_flagged = 0;
    for pol in 0..NUM_POLS {
        for bl in 0..num_bls {
            loop {
                let amps: Vec<f32> = ws
                    .stats
                    .vec_avg
                    .slice(s![pol, bl, ..])
                    .iter()
                    .map(|v| v.norm())
                    .collect();
                let threshold = match narrowband_threshold(&amps) {
                    Some(t) => t,
                    None => break,
                };
                let high: Vec<usize> = amps
                    .iter()
                    .enumerate()
                    .filter(|(_, &a)| a > threshold)
                    .map(|(chan, _)| chan)
                    .collect();

                let mut num_new = 0;
                for chan in high {
                    for c in neighbourhood(chan, num_chans) {
                        if ws.exclude(flags, pol, bl, c) {
                            num_new += 1;
                        }
                    }
                }
                num_flagged += num_new;
                if num_new == 0 {
                    break;
                }
            }
        }
    }
    num_flagged
}

/// The amplitude above which a channel is considered RFI: the median plus
/// [`NARROWBAND_SIGMA`] deviations. The deviation emphasises the noisiest
/// channels when there are enough of them.
fn narrowband_threshold(amps: &[f32]) -> Option<f32> {
    let num_good = amps.iter().filter(|a| !a.is_nan()).count();
    let (med, dev) = if num_good >= NARROWBAND_MIN_DEV90_CHANNELS {
        (median(amps)?, deviation90(amps)?.0)
    } else {
        median_deviation25(amps)?
    };
    Some(med + NARROWBAND_SIGMA * dev)
}

/// Flag cells whose distribution in the complex plane is displaced or wider
/// than is typical for their baseline.
pub(super) fn distribution(ws: &mut Workspace, flags: &mut FlagGrid) -> usize {
    let (_, num_bls, num_chans) = ws.samples.dim();
    let mut num_flagged = 0;
    for pol in 0..NUM_POLS {
        for bl in 0..num_bls {
            let row = ws.stats.med_spec.slice(s![pol, bl, ..]).to_vec();
            let (bl_median, bl_deviation) = median_deviation_cmplx(&row);
            ws.stats.median[[pol, bl]] = bl_median;
            ws.stats.deviation[[pol, bl]] = bl_deviation;

            for chan in 0..num_chans {
                if ws.samples[[pol, bl, chan]].is_empty() {
                    continue;
                }
                let (med, rms) = median_deviation_cmplx(&ws.samples[[pol, bl, chan]]);
                ws.stats.med_spec[[pol, bl, chan]] = med;
                ws.stats.rms_spec[[pol, bl, chan]] = rms;
                let offset = med - bl_median;
                if offset.norm() + rms.norm() > DISTRIBUTION_SIGMA * bl_deviation.norm()
                    && ws.exclude(flags, pol, bl, chan)
                {
                    num_flagged += 1;
                }
            }
        }
    }
    num_flagged
}

/// Flag whole (pol, baseline)s whose spectral deviation is much larger than
/// the typical deviation.
pub(super) fn noisy_baselines(ws: &mut Workspace, flags: &mut FlagGrid) -> usize {
    ws.recompute();
    let devs: Vec<c32> = ws.stats.deviation.iter().copied().collect();
    let typical = median_cmplx(&devs);
    let (_, num_bls, num_chans) = ws.samples.dim();

    let mut num_baselines = 0;
    let mut num_flagged = 0;
    for pol in 0..NUM_POLS {
        for bl in 0..num_bls {
            let dev = ws.stats.deviation[[pol, bl]];
            if dev.re > NOISE_RATIO * typical.re || dev.im > NOISE_RATIO * typical.im {
                num_baselines += 1;
                for chan in 0..num_chans {
                    if !ws.samples[[pol, bl, chan]].is_empty() && ws.exclude(flags, pol, bl, chan)
                    {
                        num_flagged += 1;
                    }
                }
            }
        }
    }
    debug!("Flagged {num_baselines} noisy baseline/pols");
    num_flagged
}

/// Flag whole (pol, baseline)s whose phase scatter, `atan2(|deviation|,
/// |median|)`, is larger than [`PHASE_SCATTER_LIMIT`]. Returns the number of
/// (pol, baseline)s flagged.
pub(super) fn phase_scatter(stats: &mut BinStats, flags: &mut FlagGrid) -> usize {
    let scattered: Vec<(usize, usize)> = stats
        .median
        .indexed_iter()
        .filter(|&((pol, bl), median)| {
            stats.deviation[[pol, bl]].norm().atan2(median.norm()) > PHASE_SCATTER_LIMIT
        })
        .map(|(cell, _)| cell)
        .collect();
    let num_chans = stats.med_spec.len_of(Axis(2));
    for &(pol, bl) in &scattered {
        flags.set_baseline(pol, bl);
        for chan in 0..num_chans {
            stats.clear(pol, bl, chan);
        }
    }
    scattered.len()
}
