// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The Modified Shepard Method (MSM) and its exponential variant (EMSM):
inverse-distance and Gaussian-falloff point-cloud resampling.
 */

use rayon::prelude::*;

use crate::context::WeightingKind;
use crate::geometry::CubeGeometry;
use crate::mapper::MappedSamples;

use super::{roi_index_range, weighting, SpaxelGrid};

/// Accumulates `samples` into `grid` using either the MSM or EMSM law,
/// selected by `weighting`. Every sample's distance to a candidate spaxel
/// is normalised by that sample's own region-of-interest radii, so the
/// same loop serves both a linear cube (where every sample shares one ROI)
/// and a non-linear one (where ROI varies sample to sample).
pub fn accumulate(grid: &mut SpaxelGrid, geometry: &CubeGeometry, samples: &MappedSamples, kind: WeightingKind) {
    debug_assert_eq!(grid.naxis1, geometry.naxis1);
    debug_assert_eq!(grid.naxis2, geometry.naxis2);
    debug_assert_eq!(grid.naxis3, geometry.naxis3);
    debug_assert_ne!(kind, WeightingKind::MiriPsf, "miripsf uses a dedicated accumulator");

    for i in 0..samples.len() {
        accumulate_one(grid, geometry, samples, i, kind);
    }
}

/// As [`accumulate`], but spreads the per-sample work across a rayon
/// thread pool, with each thread accumulating into its own grid and the
/// partials merged at the end. Worthwhile once a band's point cloud grows
/// past a few tens of thousands of samples; below that the merge
/// overhead dominates.
pub fn accumulate_parallel(
    grid: &mut SpaxelGrid,
    geometry: &CubeGeometry,
    samples: &MappedSamples,
    kind: WeightingKind,
) {
    let n = samples.len();
    if n == 0 {
        return;
    }
    let num_threads = rayon::current_num_threads().max(1);
    let chunk = (n / num_threads).max(1);

    let partials: Vec<SpaxelGrid> = (0..n)
        .collect::<Vec<_>>()
        .par_chunks(chunk)
        .map(|indices| {
            let mut local = SpaxelGrid::new(geometry.naxis1, geometry.naxis2, geometry.naxis3);
            for &i in indices {
                accumulate_one(&mut local, geometry, samples, i, kind);
            }
            local
        })
        .collect();

    for partial in &partials {
        grid.merge(partial);
    }
}

#[inline]
fn accumulate_one(
    grid: &mut SpaxelGrid,
    geometry: &CubeGeometry,
    samples: &MappedSamples,
    i: usize,
    kind: WeightingKind,
) {
    let c1 = samples.coord1[i];
    let c2 = samples.coord2[i];
    let w = samples.wave[i];
    let rois = samples.rois[i];
    let roiw = samples.roiw[i];

    let (ix_lo, ix_hi) = roi_index_range(&geometry.xcoord, c1, rois);
    let (iy_lo, iy_hi) = roi_index_range(&geometry.ycoord, c2, rois);
    let (iz_lo, iz_hi) = roi_index_range(&geometry.wavelength, w, roiw);
    if ix_lo >= ix_hi || iy_lo >= iy_hi || iz_lo >= iz_hi {
        return;
    }

    let flux_i = samples.flux[i] as f64;
    let power = samples.weight_power[i];
    let soft_rad = samples.soft_rad[i];
    let scale_rad = samples.scale_rad[i];

    for iz in iz_lo..iz_hi {
        let dz = (geometry.wavelength[iz] - w) / roiw.max(f64::EPSILON);
        for iy in iy_lo..iy_hi {
            let dy = (geometry.ycoord[iy] - c2) / rois.max(f64::EPSILON);
            for ix in ix_lo..ix_hi {
                let dx = (geometry.xcoord[ix] - c1) / rois.max(f64::EPSILON);
                let dist = (dx * dx + dy * dy + dz * dz).sqrt();
                if dist > 1.0 {
                    continue;
                }
                let wt = match kind {
                    WeightingKind::Msm => weighting::msm_weight(dist, power, soft_rad),
                    WeightingKind::Emsm => weighting::emsm_weight(dist, scale_rad),
                    WeightingKind::MiriPsf => unreachable!(),
                };
                let idx = grid.index(ix, iy, iz);
                // Bounds were just derived from the same axes the grid was
                // sized from, so skipping the check here is safe and saves
                // a meaningful fraction of this loop's time.
                unsafe {
                    *grid.flux_sum.get_unchecked_mut(idx) += wt * flux_i;
                    *grid.weight_sum.get_unchecked_mut(idx) += wt;
                    *grid.count.get_unchecked_mut(idx) += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PixelCoordSystem;

    fn flat_geometry() -> CubeGeometry {
        CubeGeometry {
            coord_system: PixelCoordSystem::World,
            crval1: 0.0,
            crval2: 0.0,
            crpix1: 3.5,
            crpix2: 3.5,
            cdelt1: 0.1,
            cdelt2: 0.1,
            naxis1: 5,
            naxis2: 5,
            naxis3: 3,
            xcoord: vec![-0.2, -0.1, 0.0, 0.1, 0.2],
            ycoord: vec![-0.2, -0.1, 0.0, 0.1, 0.2],
            wavelength: vec![4.9, 5.0, 5.1],
            linear_wavelength: true,
            crval3: 4.9,
            crpix3: 1.0,
            cdelt3: Some(0.1),
            cdelt3_normal: vec![0.1, 0.1, 0.1],
        }
    }

    fn one_sample_at_centre() -> MappedSamples {
        let mut s = MappedSamples::default();
        s.coord1.push(0.0);
        s.coord2.push(0.0);
        s.wave.push(5.0);
        s.alpha.push(0.0);
        s.beta.push(0.0);
        s.flux.push(10.0);
        s.slice_no.push(1);
        s.rois.push(0.15);
        s.roiw.push(0.15);
        s.weight_power.push(2.0);
        s.soft_rad.push(0.01);
        s.scale_rad.push(0.5);
        s
    }

    #[test]
    fn centre_spaxel_gets_highest_weight() {
        let geometry = flat_geometry();
        let samples = one_sample_at_centre();
        let mut grid = SpaxelGrid::new(geometry.naxis1, geometry.naxis2, geometry.naxis3);
        accumulate(&mut grid, &geometry, &samples, WeightingKind::Msm);
        let centre_idx = grid.index(2, 2, 1);
        let neighbour_idx = grid.index(3, 2, 1);
        assert!(grid.weight_sum[centre_idx] > grid.weight_sum[neighbour_idx]);
        assert!(grid.count[centre_idx] >= 1);
    }

    #[test]
    fn parallel_and_serial_accumulation_agree() {
        let geometry = flat_geometry();
        let samples = one_sample_at_centre();

        let mut serial = SpaxelGrid::new(geometry.naxis1, geometry.naxis2, geometry.naxis3);
        accumulate(&mut serial, &geometry, &samples, WeightingKind::Emsm);

        let mut parallel = SpaxelGrid::new(geometry.naxis1, geometry.naxis2, geometry.naxis3);
        accumulate_parallel(&mut parallel, &geometry, &samples, WeightingKind::Emsm);

        for i in 0..serial.flux_sum.len() {
            assert!((serial.flux_sum[i] - parallel.flux_sum[i]).abs() < 1e-9);
        }
    }
}
