// Copyright 2025 the Latentscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

use kurbo::{Affine, Point};

/// Error returned when an affine transform cannot be inverted.
///
/// This happens when the linear 2×2 block of the transform is singular, for
/// example after scaling an axis by zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DegenerateTransform {
    /// Determinant of the linear part of the rejected transform.
    pub determinant: f64,
}

impl fmt::Display for DegenerateTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "transform is not invertible (determinant {})",
            self.determinant
        )
    }
}

impl core::error::Error for DegenerateTransform {}

/// Returns the inverse of `transform`.
///
/// Fails with [`DegenerateTransform`] when the determinant of the 2×2 block
/// is within `f64::EPSILON` of zero or is not finite.
pub fn try_invert(transform: Affine) -> Result<Affine, DegenerateTransform> {
    let determinant = transform.determinant();
    if !determinant.is_finite() || determinant.abs() <= f64::EPSILON {
        return Err(DegenerateTransform { determinant });
    }
    Ok(transform.inverse())
}

/// Euclidean distance between `a` and `b`.
///
/// Coincident points are at distance `0.0`.
#[inline]
#[must_use]
pub fn distance(a: Point, b: Point) -> f64 {
    (b - a).length()
}

/// Finds the point closest to `query`.
///
/// Returns the index and distance of the nearest point, or `None` when
/// `points` is empty. The scan is linear; when several points are equally
/// close the first one encountered wins. Points whose distance is NaN are
/// never selected.
pub fn nearest_point<I>(points: I, query: Point) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = Point>,
{
    let mut best: Option<(usize, f64)> = None;
    for (index, point) in points.into_iter().enumerate() {
        let d = distance(point, query);
        if d.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, best_d)| d < best_d) {
            best = Some((index, d));
        }
    }
    best
}
