// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Four-corner footprint extraction and polygon/grid overlap area, used by the
MIRI branch of the FOV DQ engine (and the NIRSPEC branch whenever a slice's
projection happens not to degenerate to a line).
 */

use crate::constants::LINE_DISTANCE_TOLERANCE;
use crate::math::quad_rect_overlap_area;

/// Reduces a scattered set of (coord1, coord2) samples down to the four
/// corners of their bounding footprint.
///
/// Corner 1 is the point with the minimum `coord2`, corner 2 the point with
/// the maximum `coord1`, corner 3 the point with the maximum `coord2`, and
/// corner 4 the point with the minimum `coord1` — ties broken by first
/// occurrence. Returns `None` if `coord1`/`coord2` are empty or of mismatched
/// length.
///
/// The second element of the result is `true` when the footprint has
/// degenerated to a line: both diagonals (corner1-corner4 and
/// corner2-corner3) fall under [`LINE_DISTANCE_TOLERANCE`].
pub fn four_corners(coord1: &[f64], coord2: &[f64]) -> Option<([(f64, f64); 4], bool)> {
    if coord1.is_empty() || coord1.len() != coord2.len() {
        return None;
    }

    let argmin = |values: &[f64]| -> usize {
        let mut best = 0;
        for (i, &v) in values.iter().enumerate() {
            if v < values[best] {
                best = i;
            }
        }
        best
    };
    let argmax = |values: &[f64]| -> usize {
        let mut best = 0;
        for (i, &v) in values.iter().enumerate() {
            if v > values[best] {
                best = i;
            }
        }
        best
    };

    let i1 = argmin(coord2);
    let i2 = argmax(coord1);
    let i3 = argmax(coord2);
    let i4 = argmin(coord1);

    let corner1 = (coord1[i1], coord2[i1]);
    let corner2 = (coord1[i2], coord2[i2]);
    let corner3 = (coord1[i3], coord2[i3]);
    let corner4 = (coord1[i4], coord2[i4]);

    let dist = |a: (f64, f64), b: (f64, f64)| ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt();
    let is_line =
        dist(corner1, corner4) < LINE_DISTANCE_TOLERANCE && dist(corner2, corner3) < LINE_DISTANCE_TOLERANCE;

    Some(([corner1, corner2, corner3, corner4], is_line))
}

/// Fraction of a `cdelt1 x cdelt2` spaxel centred at `(xcenter, ycenter)`
/// covered by the quadrilateral `corners`.
pub fn overlap_fraction(
    corners: &[(f64, f64); 4],
    xcenter: f64,
    ycenter: f64,
    cdelt1: f64,
    cdelt2: f64,
) -> f64 {
    let area_box = cdelt1 * cdelt2;
    if area_box <= 0.0 {
        return 0.0;
    }
    quad_rect_overlap_area(corners, xcenter, ycenter, cdelt1, cdelt2) / area_box
}
