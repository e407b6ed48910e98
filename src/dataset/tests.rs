// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;
use crate::{
    c32,
    io::{encode_baseline, MemoryVisFile, VisRecord},
};

const INT_TIME: f32 = 8.0;
const JD0: f64 = 2459000.5;

fn record(ant1: u32, ant2: u32, pol: i32, time: f64) -> VisRecord {
    VisRecord {
        u: 100.0,
        v: 50.0,
        time,
        baseline: encode_baseline(ant1, ant2),
        pol,
        data: vec![c32::new(1.0, 2.0); 4],
        flags: vec![true; 4],
        num_ants: 3,
        int_time: INT_TIME,
        ra: 0.0,
        dec: 0.0,
        variance: 1.0,
    }
}

/// The time of the `i`th integration, with an extra `gap` integrations
/// inserted before `gap_index`.
fn time_of(i: usize, gap_index: usize, gap: f64) -> f64 {
    let mut steps = i as f64;
    if i >= gap_index {
        steps += gap - 1.0;
    }
    JD0 + steps * f64::from(INT_TIME) / 86400.0
}

fn load(records: Vec<VisRecord>) -> Result<Dataset, IngestError> {
    let mut file = MemoryVisFile::new("test", None, records);
    load_dataset(&mut file)
}

#[test]
fn test_gap_splits_bins() {
    let k = 7;
    let records = (0..12)
        .map(|i| record(1, 2, -5, time_of(i, k, 6.0)))
        .collect();
    let dataset = load(records).unwrap();
    assert_eq!(dataset.bins.len(), 2);
    assert_eq!(dataset.bins[0].num_vis, k);
    assert_eq!(dataset.bins[1].num_vis, 12 - k);
    assert!(dataset.bins[0].last_time < dataset.bins[1].first_time);
    assert_abs_diff_eq!(dataset.bins[0].first_time, 0.0);
}

#[test]
fn test_small_gaps_stay_in_one_bin() {
    let records = (0..12)
        .map(|i| record(1, 2, -5, time_of(i, 7, 4.5)))
        .collect();
    let dataset = load(records).unwrap();
    assert_eq!(dataset.bins.len(), 1);
    assert_eq!(dataset.bins[0].num_vis, 12);
    assert_eq!(dataset.num_vis(), 12);
}

#[test]
fn test_header_values() {
    let mut file = MemoryVisFile::new("test", Some("calibrator"), vec![record(1, 2, -6, JD0)]);
    let dataset = load_dataset(&mut file).unwrap();
    assert_eq!(dataset.name, "test");
    assert_eq!(dataset.obs_type, "calibrator");
    assert_eq!(dataset.num_ants, 3);
    assert_eq!(dataset.num_baselines, 6);
    assert_eq!(dataset.num_chans, 4);
    assert_abs_diff_eq!(dataset.time0, JD0);
    assert_eq!(dataset.pols, [Some(-6), None]);
    assert_eq!(dataset.bins[0].flags.dim(), (2, 6, 4));

    // Without a header value, cross correlation is assumed.
    let dataset = load(vec![record(1, 2, -6, JD0)]).unwrap();
    assert_eq!(dataset.obs_type, "crosscorrelation");
}

#[test]
fn test_rejection_counters() {
    let mut flagged = record(1, 2, -5, JD0);
    flagged.flags = vec![false; 4];
    let mut partly_flagged = record(1, 3, -5, JD0);
    partly_flagged.flags = vec![true, false, false, true];
    let records = vec![
        record(1, 2, -5, JD0),
        record(1, 2, -7, JD0),
        record(1, 2, -8, JD0),
        flagged,
        partly_flagged,
        // Antenna 4 doesn't exist.
        record(1, 4, -5, JD0),
        record(2, 3, -6, JD0),
    ];
    let dataset = load(records).unwrap();
    let counts = &dataset.counts;
    assert_eq!(counts.num_records, 7);
    assert_eq!(counts.num_accepted, 3);
    assert_eq!(counts.num_bad_pol, 2);
    assert_eq!(counts.num_bad, 2);
    assert_eq!(counts.num_flagged_vischan, 2);
    assert_abs_diff_eq!(counts.mean_flagged_chans(), 2.0 / 3.0);
    // Parallel-hand codes are stored in ascending order.
    assert_eq!(dataset.pols, [Some(-6), Some(-5)]);
    assert_eq!(dataset.pol_index(-5), Some(1));
    assert_eq!(dataset.pol_index(-7), None);
}

#[test]
fn test_pols_of_rejected_records_are_present() {
    let mut flagged = record(1, 2, -6, JD0);
    flagged.flags = vec![false; 4];
    let dataset = load(vec![record(1, 2, -5, JD0), flagged]).unwrap();
    assert_eq!(dataset.counts.num_accepted, 1);
    assert_eq!(dataset.pols, [Some(-6), Some(-5)]);
    assert_eq!(dataset.pol_index(-5), Some(1));

    // A third parallel-hand polarisation is too many, even when all of its
    // records are rejected.
    let mut out_of_range = record(1, 4, -1, JD0);
    out_of_range.flags = vec![false; 4];
    let records = vec![
        record(1, 2, -5, JD0),
        record(1, 2, -6, JD0),
        out_of_range,
    ];
    assert!(matches!(
        load(records),
        Err(IngestError::TooManyParallelPols { .. })
    ));
}

#[test]
fn test_swapped_antennas_are_conjugated() {
    let dataset = load(vec![record(3, 1, -5, JD0)]).unwrap();
    let vis = &dataset.bins[0].visibilities()[0];
    assert_eq!(vis.ants, (0, 2));
    assert_eq!(vis.baseline, 2);
    assert_eq!(vis.data[0], c32::new(1.0, -2.0));
    assert_abs_diff_eq!(vis.u, -100.0);
}

#[test]
fn test_variance_is_clamped() {
    let mut r = record(1, 2, -5, JD0);
    r.variance = -3.0;
    let dataset = load(vec![r, record(1, 3, -5, JD0)]).unwrap();
    assert_eq!(dataset.counts.num_bad_variance, 1);
    let vis = dataset.bins[0].visibilities();
    assert_abs_diff_eq!(vis[0].variance, 0.0);
    assert_abs_diff_eq!(vis[1].variance, 1.0);
}

#[test]
fn test_int_time_change_is_tolerated() {
    let mut r = record(1, 2, -5, JD0);
    r.int_time = 4.0;
    let dataset = load(vec![record(1, 2, -5, JD0), r]).unwrap();
    assert_abs_diff_eq!(dataset.int_time, 4.0);
}

#[test]
fn test_fatal_ingest_errors() {
    let mut r = record(1, 2, -5, JD0);
    r.data.push(c32::new(0.0, 0.0));
    r.flags.push(true);
    assert!(matches!(
        load(vec![record(1, 2, -5, JD0), r]),
        Err(IngestError::ChannelCountChanged { from: 4, to: 5, .. })
    ));

    let mut r = record(1, 2, -5, JD0);
    r.num_ants = 4;
    assert!(matches!(
        load(vec![record(1, 2, -5, JD0), r]),
        Err(IngestError::AntennaCountChanged { from: 3, to: 4, .. })
    ));

    let records = vec![
        record(1, 2, -5, JD0),
        record(1, 2, -6, JD0),
        record(1, 2, -1, JD0),
    ];
    assert!(matches!(
        load(records),
        Err(IngestError::TooManyParallelPols { .. })
    ));

    assert!(matches!(load(vec![]), Err(IngestError::Empty { .. })));

    let mut r = record(1, 2, -5, JD0);
    r.flags.pop();
    assert!(matches!(
        load(vec![record(1, 3, -5, JD0), r]),
        Err(IngestError::FlagCountMismatch {
            record: 1,
            num_chans: 4,
            num_flags: 3,
            ..
        })
    ));
    // The first record establishes the channel count, so it is checked too.
    let mut r = record(1, 2, -5, JD0);
    r.flags.push(true);
    assert!(matches!(
        load(vec![r]),
        Err(IngestError::FlagCountMismatch {
            record: 0,
            num_chans: 4,
            num_flags: 5,
            ..
        })
    ));
}

#[test]
fn test_time_order() {
    let int_time_days = f64::from(INT_TIME) / 86400.0;

    // Slightly out of order is absorbed by widening the scan.
    let records = vec![
        record(1, 2, -5, JD0 + int_time_days),
        record(1, 2, -5, JD0 + 0.95 * int_time_days),
    ];
    let dataset = load(records).unwrap();
    assert_eq!(dataset.bins.len(), 1);
    assert_abs_diff_eq!(
        dataset.bins[0].first_time,
        -0.05 * int_time_days,
        epsilon = 1e-8
    );

    let records = vec![
        record(1, 2, -5, JD0 + int_time_days),
        record(1, 2, -5, JD0),
    ];
    assert!(matches!(load(records), Err(IngestError::OutOfOrder { .. })));
}

#[test]
fn test_channel_flags_packing() {
    let good = [true, false, true, true, false, false, false, false, true];
    let flags = ChannelFlags::from_good(&good);
    assert_eq!(flags.len(), 9);
    assert_eq!(flags.num_good(), 4);
    for (chan, &g) in good.iter().enumerate() {
        assert_eq!(flags.is_good(chan), g);
    }
}
