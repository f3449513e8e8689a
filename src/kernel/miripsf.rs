// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
MIRI's analytic point-spread/line-spread function weighting: every sample
is weighted by its distance from a spaxel in instrument-native
(alpha, beta, wavelength), rather than the cube's own coordinate system.
*/

use crate::geometry::CubeGeometry;
use crate::mapper::MappedSamples;

use super::{roi_index_range, weighting, SpaxelGrid};

/// Accumulates `samples` into `grid` using the MIRI PSF/LSF law.
///
/// `spaxel_alpha`/`spaxel_beta` give every spatial spaxel's instrument-
/// native (alpha, beta), re-projected once per cube from the output grid
/// through a reference world-to-v2v3-to-alpha-beta transform; they are
/// flattened in `(iy * naxis1 + ix)` order and shared across every
/// wavelength plane. `alpha_resol`/`beta_resol` are polynomial
/// coefficients (increasing degree) giving the PSF's 1-sigma width as a
/// function of wavelength; `rp_average_wave` is the average resolving
/// power used to derive the LSF's wavelength width.
#[allow(clippy::too_many_arguments)]
pub fn accumulate(
    grid: &mut SpaxelGrid,
    geometry: &CubeGeometry,
    samples: &MappedSamples,
    spaxel_alpha: &[f64],
    spaxel_beta: &[f64],
    alpha_resol: &[f64],
    beta_resol: &[f64],
    rp_average_wave: f64,
) {
    debug_assert_eq!(grid.naxis1, geometry.naxis1);
    debug_assert_eq!(grid.naxis2, geometry.naxis2);
    debug_assert_eq!(grid.naxis3, geometry.naxis3);
    debug_assert_eq!(spaxel_alpha.len(), geometry.naxis1 * geometry.naxis2);
    debug_assert_eq!(spaxel_beta.len(), geometry.naxis1 * geometry.naxis2);

    for i in 0..samples.len() {
        accumulate_one(grid, geometry, samples, i, spaxel_alpha, spaxel_beta, alpha_resol, beta_resol, rp_average_wave);
    }
}

const PSF_SUPPORT_SIGMAS: f64 = 3.0;

#[inline]
#[allow(clippy::too_many_arguments)]
fn accumulate_one(
    grid: &mut SpaxelGrid,
    geometry: &CubeGeometry,
    samples: &MappedSamples,
    i: usize,
    spaxel_alpha: &[f64],
    spaxel_beta: &[f64],
    alpha_resol: &[f64],
    beta_resol: &[f64],
    rp_average_wave: f64,
) {
    let alpha_s = samples.alpha[i];
    let beta_s = samples.beta[i];
    let wave = samples.wave[i];
    let flux_i = samples.flux[i] as f64;
    let roiw = samples.roiw[i];

    let (iz_lo, iz_hi) = roi_index_range(&geometry.wavelength, wave, roiw);
    if iz_lo >= iz_hi {
        return;
    }

    let alpha_width = weighting::poly_eval(alpha_resol, wave).max(f64::EPSILON);
    let beta_width = weighting::poly_eval(beta_resol, wave).max(f64::EPSILON);
    let lsf_width = (wave / rp_average_wave.max(f64::EPSILON)).max(f64::EPSILON);

    for iy in 0..geometry.naxis2 {
        for ix in 0..geometry.naxis1 {
            let idx2d = iy * geometry.naxis1 + ix;
            let dalpha = spaxel_alpha[idx2d] - alpha_s;
            let dbeta = spaxel_beta[idx2d] - beta_s;
            if dalpha.abs() > PSF_SUPPORT_SIGMAS * alpha_width || dbeta.abs() > PSF_SUPPORT_SIGMAS * beta_width {
                continue;
            }
            for iz in iz_lo..iz_hi {
                let dwave = geometry.wavelength[iz] - wave;
                let wt = weighting::miripsf_weight(dalpha, dbeta, dwave, alpha_width, beta_width, lsf_width);
                let idx = grid.index(ix, iy, iz);
                grid.flux_sum[idx] += wt * flux_i;
                grid.weight_sum[idx] += wt;
                grid.count[idx] += 1;
            }
        }
    }
}
