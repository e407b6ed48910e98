// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Robust order statistics.
//!
//! Flagged or otherwise excluded samples are marked with NaN. NaN sorts after
//! every number, so only the leading run of numbers in a sorted list is used.
//! None of these functions modify their input.
//!
//! Deviations are half-widths of the tightest window spanning a fixed share of
//! the sorted good data:
//!
//! | estimator                 | window width | emphasis     |
//! |---------------------------|--------------|--------------|
//! | [`median_deviation`]      | n/2          | bulk         |
//! | [`median_deviation25`]    | n - n/4      | clean data   |
//! | [`deviation90`]           | 9n/10        | noisy data   |
//!
//! The complex versions treat the real and imaginary projections
//! independently, and an excluded result in either yields a complex NaN.

use crate::{c32, math::NAN_C32};

/// Copy the non-NaN values of `list` and sort them ascending.
fn good_sorted(list: &[f32]) -> Vec<f32> {
    let mut good: Vec<f32> = list.iter().copied().filter(|v| !v.is_nan()).collect();
    good.sort_unstable_by(|a, b| a.total_cmp(b));
    good
}

fn median_of_sorted(sorted: &[f32]) -> f32 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Half of the smallest `sorted[i + width] - sorted[i]` over the first
/// `num_windows` windows. Fewer than two values have no spread.
fn half_width(sorted: &[f32], width: usize, num_windows: usize) -> f32 {
    let n = sorted.len();
    if n < 2 {
        return 0.0;
    }
    let width = width.clamp(1, n - 1);
    let num_windows = num_windows.clamp(1, n - width);
    let narrowest = (0..num_windows)
        .map(|i| sorted[i + width] - sorted[i])
        .fold(f32::INFINITY, f32::min);
    narrowest / 2.0
}

/// The median of the non-NaN values of `list`, or `None` if there are none.
pub fn median(list: &[f32]) -> Option<f32> {
    let sorted = good_sorted(list);
    if sorted.is_empty() {
        None
    } else {
        Some(median_of_sorted(&sorted))
    }
}

/// The median and "meddev" of the non-NaN values of `list`. The deviation is
/// half of the narrowest window containing half of the good data.
pub fn median_deviation(list: &[f32]) -> Option<(f32, f32)> {
    let sorted = good_sorted(list);
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    Some((median_of_sorted(&sorted), half_width(&sorted, n / 2, n / 2)))
}

/// Like [`median_deviation`], but the window spans three quarters of the good
/// data. A minority of high outliers doesn't inflate this deviation.
pub fn median_deviation25(list: &[f32]) -> Option<(f32, f32)> {
    let sorted = good_sorted(list);
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    let width = n - n / 4;
    Some((median_of_sorted(&sorted), half_width(&sorted, width, n - width)))
}

/// The deviation of the top decile: half of the narrowest window containing
/// 90% of the good data. Also returns the number of good values.
pub fn deviation90(list: &[f32]) -> Option<(f32, usize)> {
    let sorted = good_sorted(list);
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    let width = n * 9 / 10;
    Some((half_width(&sorted, width, n - width), n))
}

fn split(list: &[c32]) -> (Vec<f32>, Vec<f32>) {
    list.iter().map(|c| (c.re, c.im)).unzip()
}

/// The complex median; real and imaginary parts are treated separately.
pub fn median_cmplx(list: &[c32]) -> c32 {
    let (re, im) = split(list);
    match (median(&re), median(&im)) {
        (Some(re), Some(im)) => c32::new(re, im),
        _ => NAN_C32,
    }
}

fn combine(re: Option<(f32, f32)>, im: Option<(f32, f32)>) -> (c32, c32) {
    match (re, im) {
        (Some((re_med, re_dev)), Some((im_med, im_dev))) => {
            (c32::new(re_med, im_med), c32::new(re_dev, im_dev))
        }
        _ => (NAN_C32, NAN_C32),
    }
}

/// The complex median and "meddev" (see [`median_deviation`]).
pub fn median_deviation_cmplx(list: &[c32]) -> (c32, c32) {
    let (re, im) = split(list);
    combine(median_deviation(&re), median_deviation(&im))
}

/// The complex median and 75%-window deviation (see [`median_deviation25`]).
pub fn median_deviation25_cmplx(list: &[c32]) -> (c32, c32) {
    let (re, im) = split(list);
    combine(median_deviation25(&re), median_deviation25(&im))
}

/// The complex top-decile deviation (see [`deviation90`]) and the number of
/// good values used.
pub fn deviation90_cmplx(list: &[c32]) -> (c32, usize) {
    let (re, im) = split(list);
    match (deviation90(&re), deviation90(&im)) {
        (Some((re_dev, n_re)), Some((im_dev, n_im))) => {
            (c32::new(re_dev, im_dev), n_re.min(n_im))
        }
        _ => (NAN_C32, 0),
    }
}
