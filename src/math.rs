// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Small numeric helpers shared by the geometry, mapper and kernel modules.
 */

/// The circular mean of a set of angles given in degrees, returned in the
/// range `[0, 360)`.
///
/// Plain arithmetic averaging breaks down when RA values straddle the
/// 0/360 wrap point; this instead averages the unit vectors the angles
/// represent. The cube builder only ever calls this with the minimum and
/// maximum RA seen across a band's footprints, so it does not attempt to
/// handle multi-modal distributions of angles.
pub fn circular_mean_deg(values_deg: &[f64]) -> f64 {
    let (sum_sin, sum_cos) = values_deg.iter().fold((0.0_f64, 0.0_f64), |(s, c), &v| {
        let r = v.to_radians();
        (s + r.sin(), c + r.cos())
    });
    sum_sin.atan2(sum_cos).to_degrees().rem_euclid(360.0)
}

/// Index of the table entry closest to `value`. Ties resolve to the lower
/// index. Panics if `table` is empty.
pub fn nearest_index(table: &[f64], value: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, &t) in table.iter().enumerate() {
        let d = (t - value).abs();
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Signed area of a simple polygon via the shoelace formula. Positive for
/// counter-clockwise vertex order.
pub fn polygon_area(vertices: &[(f64, f64)]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..vertices.len() {
        let (x0, y0) = vertices[i];
        let (x1, y1) = vertices[(i + 1) % vertices.len()];
        area += x0 * y1 - x1 * y0;
    }
    (area * 0.5).abs()
}

/// Clips a (possibly non-convex-safe, but here always convex quadrilateral)
/// polygon against an axis-aligned rectangle using the Sutherland-Hodgman
/// algorithm, returning the clipped polygon's vertices.
pub fn clip_polygon_to_rect(
    polygon: &[(f64, f64)],
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
) -> Vec<(f64, f64)> {
    let mut output = polygon.to_vec();

    // Clip against x >= x_min
    output = clip_edge(&output, |p| p.0 >= x_min, |a, b| {
        let t = (x_min - a.0) / (b.0 - a.0);
        (x_min, a.1 + t * (b.1 - a.1))
    });
    // Clip against x <= x_max
    output = clip_edge(&output, |p| p.0 <= x_max, |a, b| {
        let t = (x_max - a.0) / (b.0 - a.0);
        (x_max, a.1 + t * (b.1 - a.1))
    });
    // Clip against y >= y_min
    output = clip_edge(&output, |p| p.1 >= y_min, |a, b| {
        let t = (y_min - a.1) / (b.1 - a.1);
        (a.0 + t * (b.0 - a.0), y_min)
    });
    // Clip against y <= y_max
    output = clip_edge(&output, |p| p.1 <= y_max, |a, b| {
        let t = (y_max - a.1) / (b.1 - a.1);
        (a.0 + t * (b.0 - a.0), y_max)
    });

    output
}

fn clip_edge(
    polygon: &[(f64, f64)],
    inside: impl Fn((f64, f64)) -> bool,
    intersect: impl Fn((f64, f64), (f64, f64)) -> (f64, f64),
) -> Vec<(f64, f64)> {
    if polygon.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(polygon.len() + 1);
    for i in 0..polygon.len() {
        let curr = polygon[i];
        let prev = polygon[(i + polygon.len() - 1) % polygon.len()];
        let curr_in = inside(curr);
        let prev_in = inside(prev);
        if curr_in {
            if !prev_in {
                out.push(intersect(prev, curr));
            }
            out.push(curr);
        } else if prev_in {
            out.push(intersect(prev, curr));
        }
    }
    out
}

/// Area of the overlap between a quadrilateral (in any winding order) and an
/// axis-aligned rectangle defined by its centre and full side lengths.
pub fn quad_rect_overlap_area(
    quad: &[(f64, f64); 4],
    rect_centre_x: f64,
    rect_centre_y: f64,
    rect_width: f64,
    rect_height: f64,
) -> f64 {
    let x_min = rect_centre_x - rect_width / 2.0;
    let x_max = rect_centre_x + rect_width / 2.0;
    let y_min = rect_centre_y - rect_height / 2.0;
    let y_max = rect_centre_y + rect_height / 2.0;
    let clipped = clip_polygon_to_rect(quad, x_min, x_max, y_min, y_max);
    polygon_area(&clipped)
}

/// Distance from point `p` to the infinite line through `a` and `b`.
pub fn point_to_line_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len = (dx * dx + dy * dy).sqrt();
    if len < f64::EPSILON {
        return ((p.0 - a.0).powi(2) + (p.1 - a.1).powi(2)).sqrt();
    }
    ((dy * p.0 - dx * p.1 + b.0 * a.1 - b.1 * a.0) / len).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn circular_mean_handles_wrap() {
        let mean = circular_mean_deg(&[359.0, 1.0]);
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn circular_mean_plain_case() {
        let mean = circular_mean_deg(&[10.0, 20.0]);
        assert_abs_diff_eq!(mean, 15.0, epsilon = 1e-6);
    }

    #[test]
    fn nearest_index_picks_closest() {
        let table = [1.0, 2.0, 4.0, 8.0];
        assert_eq!(nearest_index(&table, 3.1), 2);
        assert_eq!(nearest_index(&table, 0.0), 0);
    }

    #[test]
    fn square_overlap_is_full_area() {
        let quad = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
        let area = quad_rect_overlap_area(&quad, 0.0, 0.0, 4.0, 4.0);
        assert_abs_diff_eq!(area, 4.0, epsilon = 1e-9);
    }

    #[test]
    fn disjoint_quad_has_no_overlap() {
        let quad = [(10.0, 10.0), (11.0, 10.0), (11.0, 11.0), (10.0, 11.0)];
        let area = quad_rect_overlap_area(&quad, 0.0, 0.0, 2.0, 2.0);
        assert_abs_diff_eq!(area, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn partial_overlap_is_between_zero_and_full() {
        let quad = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];
        // Quad is a unit square centred at the corner of a 1x1 rect at origin.
        let area = quad_rect_overlap_area(&quad, 0.5, 0.5, 1.0, 1.0);
        assert!(area > 0.0 && area < 1.0);
    }
}
