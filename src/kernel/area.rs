// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Area-weighted accumulation: each detector pixel's footprint is traced as
a polygon in the (alpha, wavelength) plane and clipped against every
candidate output voxel in that same plane. Beta needs no projection at
all; a pixel's slice number addresses the output's second axis
directly, since alpha-beta cubes are built with exactly one row per
slice. Used for single-exposure alpha-beta cubes, where point-cloud
resampling would otherwise discard the pixel's shape.
*/

use crate::geometry::CubeGeometry;
use crate::mapper::AreaSamples;

use super::{roi_index_range, SpaxelGrid};

/// Accumulates `samples` into `grid` by clipping each pixel's four
/// (alpha, wavelength) corners against every spaxel rectangle in its
/// wavelength neighbourhood, on the row given by the pixel's slice
/// number. The accumulated weight is the raw overlap area, not a
/// fraction normalised to the spaxel's own area.
pub fn accumulate(grid: &mut SpaxelGrid, geometry: &CubeGeometry, samples: &AreaSamples) {
    debug_assert_eq!(grid.naxis1, geometry.naxis1);
    debug_assert_eq!(grid.naxis2, geometry.naxis2);
    debug_assert_eq!(grid.naxis3, geometry.naxis3);

    for i in 0..samples.len() {
        accumulate_one(grid, geometry, samples, i);
    }
}

#[inline]
fn accumulate_one(grid: &mut SpaxelGrid, geometry: &CubeGeometry, samples: &AreaSamples, i: usize) {
    let iy = samples.slice_no[i];
    if iy < 0 || iy as usize >= geometry.naxis2 {
        return;
    }
    let iy = iy as usize;

    let corners = samples.corners[i];
    let flux_i = samples.flux[i] as f64;

    let x_min = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
    let x_max = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
    let w_min = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
    let w_max = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);

    let x_centre = (x_min + x_max) / 2.0;
    let x_radius = (x_max - x_min) / 2.0 + geometry.cdelt1;
    let w_centre = (w_min + w_max) / 2.0;
    let last_cdelt3 = *geometry.cdelt3_normal.last().unwrap_or(&geometry.cdelt1);
    let w_radius = (w_max - w_min) / 2.0 + last_cdelt3.abs();

    let (ix_lo, ix_hi) = roi_index_range(&geometry.xcoord, x_centre, x_radius);
    let (iz_lo, iz_hi) = roi_index_range(&geometry.wavelength, w_centre, w_radius);

    for iz in iz_lo..iz_hi {
        let plane_width = geometry.cdelt3_normal[iz].abs();
        for ix in ix_lo..ix_hi {
            let area = crate::math::quad_rect_overlap_area(
                &corners,
                geometry.xcoord[ix],
                geometry.wavelength[iz],
                geometry.cdelt1,
                plane_width,
            );
            if area <= 0.0 {
                continue;
            }
            let idx = grid.index(ix, iy, iz);
            grid.flux_sum[idx] += area * flux_i;
            grid.weight_sum[idx] += area;
            grid.count[idx] += 1;
        }
    }
}
