// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Bresenham line rasterization: finds the spaxels a NIRSPEC slice's projected
line crosses on a given wavelength plane.
 */

/// Traces the integer grid cells touched by the line from `(x1, y1)` to
/// `(x2, y2)` (in spaxel-index units, not yet clamped to any grid size).
/// Matches the classic Bresenham formulation: the line is rotated to its
/// shallow axis, walked start-to-end, and un-rotated/un-reversed on the way
/// out, so traversal direction never changes which cells are visited
/// (required by the monotonicity law: tracing a line backwards yields the
/// same cell set).
pub fn trace(x1: i64, y1: i64, x2: i64, y2: i64) -> Vec<(i64, i64)> {
    let (mut x1, mut y1, mut x2, mut y2) = (x1, y1, x2, y2);

    let is_steep = (y2 - y1).abs() > (x2 - x1).abs();
    if is_steep {
        std::mem::swap(&mut x1, &mut y1);
        std::mem::swap(&mut x2, &mut y2);
    }

    let swapped = x1 > x2;
    if swapped {
        std::mem::swap(&mut x1, &mut x2);
        std::mem::swap(&mut y1, &mut y2);
    }

    let dx = x2 - x1;
    let dy = y2 - y1;
    let ystep: i64 = if y1 < y2 { 1 } else { -1 };

    let mut error = dx / 2;
    let mut y = y1;
    let mut points = Vec::with_capacity((dx + 1).max(0) as usize);
    for x in x1..=x2 {
        points.push(if is_steep { (y, x) } else { (x, y) });
        error -= dy.abs();
        if error < 0 {
            y += ystep;
            error += dx;
        }
    }

    if swapped {
        points.reverse();
    }
    points
}

/// As [`trace`], but converts cube-plane coordinates to spaxel indices first
/// (via the axes' origin and step) and drops any cell that falls outside
/// `[0, naxis1) x [0, naxis2)`.
#[allow(clippy::too_many_arguments)]
pub fn trace_in_grid(
    xi1: f64,
    eta1: f64,
    xi2: f64,
    eta2: f64,
    xcoord0: f64,
    ycoord0: f64,
    cdelt1: f64,
    cdelt2: f64,
    naxis1: usize,
    naxis2: usize,
) -> Vec<(usize, usize)> {
    let x1 = ((xi1 - xcoord0) / cdelt1) as i64;
    let y1 = ((eta1 - ycoord0) / cdelt2) as i64;
    let x2 = ((xi2 - xcoord0) / cdelt1) as i64;
    let y2 = ((eta2 - ycoord0) / cdelt2) as i64;

    trace(x1, y1, x2, y2)
        .into_iter()
        .filter_map(|(x, y)| {
            if x >= 0 && y >= 0 && (x as usize) < naxis1 && (y as usize) < naxis2 {
                Some((x as usize, y as usize))
            } else {
                None
            }
        })
        .collect()
}
