// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use ndarray::prelude::*;

use super::*;

const NUM_ANTS: usize = 3;
const NUM_CHANS: usize = 8;

/// Flat spectra of 1, with antenna 0's response 4 times higher in channels 2
/// and 3 (gain bin 1).
fn bumpy_inputs() -> (Array3<c32>, Array2<c32>, Array3<c32>) {
    let num_bls = num_baselines(NUM_ANTS);
    let mut med_spec = Array3::from_elem((2, num_bls, NUM_CHANS), c32::new(1.0, 0.0));
    for pol in 0..2 {
        for ant2 in 1..NUM_ANTS {
            let bl = baseline_index(NUM_ANTS, 0, ant2);
            med_spec
                .slice_mut(s![pol, bl, 2..4])
                .fill(c32::new(4.0, 0.0));
        }
    }
    let spec_median = Array2::from_elem((2, num_bls), c32::new(1.0, 0.0));
    let rms_spec = Array3::from_elem((2, num_bls, NUM_CHANS), c32::new(0.1, 0.1));
    (med_spec, spec_median, rms_spec)
}

#[test]
fn test_gain_bin_width() {
    assert_eq!(gain_bin_width(0), 1);
    assert_eq!(gain_bin_width(1), 1);
    assert_eq!(gain_bin_width(3), 1);
    assert_eq!(gain_bin_width(8), 2);
    assert_eq!(gain_bin_width(16), 4);
    assert_eq!(gain_bin_width(100), 8);
    assert_eq!(gain_bin_width(1024), 32);

    let gains = Gains::neutral(2, 4, 100);
    assert_eq!(gains.dim(), (2, 4, 13));
}

#[test]
fn test_gain_interpolation() {
    let mut gains = Gains::neutral(2, NUM_ANTS, NUM_CHANS);
    assert_eq!(gains.dim(), (2, NUM_ANTS, 4));
    gains.gains[[0, 0, 1]] = c32::new(3.0, 0.0);

    // Bin centres are at channels 0.5, 2.5, 4.5 and 6.5.
    assert_abs_diff_eq!(gains.gain_at(0, 0, 0).re, 1.0);
    assert_abs_diff_eq!(gains.gain_at(0, 0, 2).re, 2.5);
    assert_abs_diff_eq!(gains.gain_at(0, 0, 3).re, 2.5);
    assert_abs_diff_eq!(gains.gain_at(0, 0, 4).re, 1.5);
    assert_abs_diff_eq!(gains.gain_at(0, 0, 7).re, 1.0);
    // Other antennas and pols are untouched.
    assert_abs_diff_eq!(gains.gain_at(1, 0, 2).re, 1.0);
    assert_abs_diff_eq!(gains.gain_at(0, 1, 2).re, 1.0);

    gains.gains[[0, 1, 1]] = c32::new(0.0, 2.0);
    let factor = gains.baseline_factor(0, 0, 1, 2);
    // 3 * conj(2i) at the bin centre is -6i; at channel 2 both are blended.
    let g0 = c32::new(2.5, 0.0);
    let g1 = c32::new(0.25, 1.5);
    assert_abs_diff_eq!(factor.re, (g0 * g1.conj()).re, epsilon = 1e-6);
    assert_abs_diff_eq!(factor.im, (g0 * g1.conj()).im, epsilon = 1e-6);
}

#[test]
fn test_flat_spectra_give_neutral_gains() {
    let num_bls = num_baselines(NUM_ANTS);
    let med_spec = Array3::from_elem((2, num_bls, NUM_CHANS), c32::new(2.0, 1.0));
    let spec_median = Array2::from_elem((2, num_bls), c32::new(2.0, 1.0));
    let rms_spec = Array3::from_elem((2, num_bls, NUM_CHANS), c32::new(0.1, 0.1));
    let solution = BandpassSolver::default()
        .solve(
            NUM_ANTS,
            med_spec.view(),
            spec_median.view(),
            rms_spec.view(),
        )
        .unwrap();
    assert!(solution.result.converged);
    assert_eq!(solution.result.num_iterations, 1);
    assert!(solution.suspects.is_empty());
    for g in solution.gains.view() {
        assert_abs_diff_eq!(g.re, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(g.im, 0.0, epsilon = 1e-6);
    }
}

#[test]
fn test_bump_is_flattened() {
    let (med_spec, spec_median, rms_spec) = bumpy_inputs();
    let solution = BandpassSolver::default()
        .solve(
            NUM_ANTS,
            med_spec.view(),
            spec_median.view(),
            rms_spec.view(),
        )
        .unwrap();
    assert!(solution.result.num_iterations <= DEFAULT_BANDPASS_MAX_ITERATIONS);
    let gains = solution.gains.view();

    for pol in 0..2 {
        // Bins without a bump are untouched.
        for bin in [0, 2, 3] {
            for ant in 0..NUM_ANTS {
                assert_abs_diff_eq!(gains[[pol, ant, bin]].re, 1.0, epsilon = 1e-6);
            }
        }
        // Antenna 0 is turned down.
        assert!(gains[[pol, 0, 1]].norm() < gains[[pol, 1, 1]].norm());
        let corrected = c32::new(4.0, 0.0) * solution.gains.baseline_factor(pol, 0, 1, 2);
        assert!(corrected.norm() < 4.0);
        assert!(corrected.norm() > 1.0);
    }
}

#[test]
fn test_solver_is_deterministic() {
    let (med_spec, spec_median, rms_spec) = bumpy_inputs();
    let solver = BandpassSolver::default();
    let first = solver
        .solve(
            NUM_ANTS,
            med_spec.view(),
            spec_median.view(),
            rms_spec.view(),
        )
        .unwrap();
    let second = solver
        .solve(
            NUM_ANTS,
            med_spec.view(),
            spec_median.view(),
            rms_spec.view(),
        )
        .unwrap();
    assert_eq!(first.gains, second.gains);
    assert_eq!(first.result, second.result);
}

#[test]
fn test_iteration_cap() {
    let (med_spec, spec_median, rms_spec) = bumpy_inputs();
    let solver = BandpassSolver {
        max_iterations: 1,
        ..Default::default()
    };
    let solution = solver
        .solve(
            NUM_ANTS,
            med_spec.view(),
            spec_median.view(),
            rms_spec.view(),
        )
        .unwrap();
    assert_eq!(solution.result.num_iterations, 1);
    assert!(!solution.result.converged);
    // The first step is halfway between 1 and the median of (0.5, 0.5).
    assert_abs_diff_eq!(solution.gains.view()[[0, 0, 1]].re, 0.75, epsilon = 1e-6);
}

#[test]
fn test_slow_convergers_are_suspects() {
    let (med_spec, spec_median, mut rms_spec) = bumpy_inputs();
    let bl = baseline_index(NUM_ANTS, 0, 1);
    rms_spec[[0, bl, 2]] = c32::new(5.0, 5.0);
    // Noisy, but its gain bin converges immediately.
    rms_spec[[1, bl, 6]] = c32::new(5.0, 5.0);

    let solver = BandpassSolver {
        flag_slow_convergers: true,
        ..Default::default()
    };
    let solution = solver
        .solve(
            NUM_ANTS,
            med_spec.view(),
            spec_median.view(),
            rms_spec.view(),
        )
        .unwrap();
    assert_eq!(solution.suspects, vec![(0, bl, 2)]);

    // The inputs weren't modified.
    assert_abs_diff_eq!(rms_spec[[0, bl, 2]].re, 5.0);
}

#[test]
fn test_solver_errors() {
    let (med_spec, spec_median, rms_spec) = bumpy_inputs();
    let solver = BandpassSolver::default();
    assert!(matches!(
        solver.solve(1, med_spec.view(), spec_median.view(), rms_spec.view()),
        Err(BandpassError::TooFewAntennas { num_ants: 1 })
    ));
    assert!(matches!(
        solver.solve(4, med_spec.view(), spec_median.view(), rms_spec.view()),
        Err(BandpassError::ShapeMismatch { .. })
    ));
    assert!(matches!(
        solver.solve(
            NUM_ANTS,
            med_spec.view(),
            spec_median.slice(s![.., ..3]),
            rms_spec.view()
        ),
        Err(BandpassError::ShapeMismatch { .. })
    ));
}
