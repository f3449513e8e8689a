// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Maps a single exposure's detector pixels onto a cube's coordinate system,
producing the point cloud the resampling kernel later accumulates into
spaxels.
 */

pub mod error;

use log::{debug, trace};
use ndarray::Array2;

use crate::context::{BandKey, ExposureData, PixelCoordSystem};
use crate::coord;
use crate::dqflags;
use crate::geometry::CubeGeometry;
use crate::params::ResolvedParameters;
use error::MapperError;

/// The point cloud produced by mapping one exposure: every sample that
/// survived data-quality and range filtering, in parallel arrays.
#[derive(Clone, Debug, Default)]
pub struct MappedSamples {
    /// Tangent-plane xi (world cubes) or alpha (alpha-beta cubes).
    pub coord1: Vec<f64>,
    /// Tangent-plane eta (world cubes) or beta (alpha-beta cubes).
    pub coord2: Vec<f64>,
    pub wave: Vec<f64>,
    /// Instrument-native alpha, always populated regardless of coordinate
    /// system, since the MIRI PSF weighting law needs it even for
    /// sky-projected cubes.
    pub alpha: Vec<f64>,
    /// Instrument-native beta, see [`Self::alpha`].
    pub beta: Vec<f64>,
    pub flux: Vec<f32>,
    pub slice_no: Vec<i32>,
    pub rois: Vec<f64>,
    pub roiw: Vec<f64>,
    pub weight_power: Vec<f64>,
    pub soft_rad: Vec<f64>,
    pub scale_rad: Vec<f64>,
}

impl MappedSamples {
    fn with_capacity(cap: usize) -> Self {
        Self {
            coord1: Vec::with_capacity(cap),
            coord2: Vec::with_capacity(cap),
            wave: Vec::with_capacity(cap),
            alpha: Vec::with_capacity(cap),
            beta: Vec::with_capacity(cap),
            flux: Vec::with_capacity(cap),
            slice_no: Vec::with_capacity(cap),
            rois: Vec::with_capacity(cap),
            roiw: Vec::with_capacity(cap),
            weight_power: Vec::with_capacity(cap),
            soft_rad: Vec::with_capacity(cap),
            scale_rad: Vec::with_capacity(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.wave.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wave.is_empty()
    }
}

/// Counts of what happened to every detector pixel considered, logged
/// once per exposure and aggregated once per band.
#[derive(Clone, Copy, Debug, Default)]
pub struct MapperStats {
    pub total_considered: usize,
    pub kept: usize,
    pub dropped_dq: usize,
    pub dropped_invalid_coords: usize,
    pub dropped_out_of_range: usize,
}

impl std::ops::AddAssign for MapperStats {
    fn add_assign(&mut self, rhs: Self) {
        self.total_considered += rhs.total_considered;
        self.kept += rhs.kept;
        self.dropped_dq += rhs.dropped_dq;
        self.dropped_invalid_coords += rhs.dropped_invalid_coords;
        self.dropped_out_of_range += rhs.dropped_out_of_range;
    }
}

fn sample_params(resolved: &ResolvedParameters, wave: f64) -> (f64, f64, f64, f64, f64) {
    if resolved.linear_wavelength {
        (
            resolved.rois,
            resolved.roiw.unwrap_or(0.0),
            resolved.weight_power.unwrap_or(2.0),
            resolved.soft_rad.unwrap_or(0.0),
            resolved.scale_rad.unwrap_or(0.0),
        )
    } else {
        let table = resolved
            .wavelength_table
            .as_ref()
            .expect("non-linear cube requires a wavelength table");
        let idx = crate::math::nearest_index(&table.wavelength, wave);
        (
            table.spatial_roi[idx],
            table.wave_roi[idx],
            table.weight_power[idx],
            table.soft_rad[idx],
            table.scale_rad[idx],
        )
    }
}

/// Subtracts `exposure`'s background polynomial for `band`'s channel from
/// its flux plane in place, evaluated against each pixel's instrument-
/// native beta coordinate.
fn subtract_background(exposure: &mut dyn ExposureData, band: &BandKey) {
    let maybe_poly = exposure
        .background_polynomials()
        .iter()
        .find(|bp| bp.channel == band.par1)
        .cloned();
    let Some(poly) = maybe_poly else {
        return;
    };

    let (rows, cols) = {
        let flux = exposure.flux();
        (flux.shape()[0], flux.shape()[1])
    };
    let mut beta_grid = Array2::<f64>::from_elem((rows, cols), f64::NAN);
    for y in 0..rows {
        for x in 0..cols {
            let (_, beta, _) = exposure.wcs().detector_to_alpha_beta(x as f64, y as f64);
            beta_grid[[y, x]] = beta;
        }
    }

    let mut flux = exposure.flux_mut();
    for y in 0..rows {
        for x in 0..cols {
            let beta = beta_grid[[y, x]];
            if !beta.is_nan() {
                flux[[y, x]] -= poly.evaluate(beta) as f32;
            }
        }
    }
}

/// Maps every usable pixel of `exposure` into the coordinate system of
/// `geometry`, producing a point cloud ready for the resampling kernel.
///
/// Filters applied, in order: data-quality (`DO_NOT_USE`/`NON_SCIENCE`),
/// coordinate validity (`NaN` from an off-slice WCS evaluation), and
/// wavelength range. This uniform NaN check on the derived coordinates
/// covers both the world and alpha-beta coordinate systems identically,
/// rather than inspecting different fields per branch.
pub fn map_exposure(
    exposure: &mut dyn ExposureData,
    band: &BandKey,
    geometry: &CubeGeometry,
    resolved: &ResolvedParameters,
    do_background_subtraction: bool,
) -> Result<(MappedSamples, MapperStats), MapperError> {
    let exposure_id = exposure.exposure_id().to_owned();

    if do_background_subtraction {
        subtract_background(exposure, band);
    }

    let (flux_shape, dq_shape) = {
        let flux = exposure.flux();
        let dq = exposure.dq();
        (
            (flux.shape()[0], flux.shape()[1]),
            (dq.shape()[0], dq.shape()[1]),
        )
    };
    if flux_shape != dq_shape {
        return Err(MapperError::ShapeMismatch(exposure_id, flux_shape, dq_shape));
    }
    let (rows, cols) = flux_shape;

    let mut stats = MapperStats::default();
    let mut samples = MappedSamples::with_capacity(rows * cols / 8);

    let flux = exposure.flux();
    let dq = exposure.dq();

    // The wavelength window a sample must fall within is padded by one
    // plane's worth of step on either side of the cube's own axis, not
    // just `resolved.wave_{min,max}`, matching the original's
    // min/max_wave_tolerance so that a sample whose wavelength lands just
    // outside the cube's first/last plane but still within its step isn't
    // dropped.
    let wave_min_tol = geometry.wavelength[0] - geometry.cdelt3_normal[0].abs();
    let wave_max_tol = geometry.wavelength[geometry.naxis3 - 1] + geometry.cdelt3_normal[geometry.naxis3 - 1].abs();

    for y in 0..rows {
        for x in 0..cols {
            stats.total_considered += 1;
            let flag = dq[[y, x]];
            if dqflags::is_unusable(flag) {
                stats.dropped_dq += 1;
                continue;
            }

            let (xf, yf) = (x as f64, y as f64);
            let (coord1, coord2, wave) = match resolved.coord_system {
                PixelCoordSystem::World => {
                    let (ra, dec, wave) = exposure.wcs().detector_to_world(xf, yf);
                    if ra.is_nan() || dec.is_nan() || wave.is_nan() {
                        stats.dropped_invalid_coords += 1;
                        continue;
                    }
                    let (xi, eta) = coord::radec_to_tangent(geometry.crval1, geometry.crval2, ra, dec);
                    (xi, eta, wave)
                }
                PixelCoordSystem::AlphaBeta => {
                    let (alpha, beta, wave) = exposure.wcs().detector_to_alpha_beta(xf, yf);
                    if alpha.is_nan() || beta.is_nan() || wave.is_nan() {
                        stats.dropped_invalid_coords += 1;
                        continue;
                    }
                    (alpha, beta, wave)
                }
            };

            if wave < wave_min_tol || wave > wave_max_tol {
                stats.dropped_out_of_range += 1;
                continue;
            }

            let (alpha, beta, _) = exposure.wcs().detector_to_alpha_beta(xf, yf);
            let slice_no = exposure.wcs().slice_number(xf, yf).unwrap_or(-1);
            let (rois, roiw, weight_power, soft_rad, scale_rad) = sample_params(resolved, wave);

            samples.coord1.push(coord1);
            samples.coord2.push(coord2);
            samples.wave.push(wave);
            samples.alpha.push(alpha);
            samples.beta.push(beta);
            samples.flux.push(flux[[y, x]]);
            samples.slice_no.push(slice_no);
            samples.rois.push(rois);
            samples.roiw.push(roiw);
            samples.weight_power.push(weight_power);
            samples.soft_rad.push(soft_rad);
            samples.scale_rad.push(scale_rad);
            stats.kept += 1;
        }
    }

    trace!(
        "mapped exposure {}: {}/{} pixels kept ({} dq, {} invalid coords, {} out of range)",
        exposure_id,
        stats.kept,
        stats.total_considered,
        stats.dropped_dq,
        stats.dropped_invalid_coords,
        stats.dropped_out_of_range
    );
    if stats.kept == 0 {
        debug!("exposure {} contributed no samples to its band", exposure_id);
    }

    Ok((samples, stats))
}

/// The per-pixel quadrilaterals and flux values used by area-weighted
/// interpolation, in place of [`MappedSamples`]'s point cloud. Beta is
/// exactly the detector's slice number, so only alpha and wavelength are
/// traced as a polygon; the slice index addresses the output's second
/// axis directly.
#[derive(Clone, Debug, Default)]
pub struct AreaSamples {
    /// Each pixel's four (alpha, wavelength) corners, in winding order.
    pub corners: Vec<[(f64, f64); 4]>,
    pub wave: Vec<f64>,
    pub flux: Vec<f32>,
    pub slice_no: Vec<i32>,
}

impl AreaSamples {
    pub fn len(&self) -> usize {
        self.wave.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wave.is_empty()
    }
}

/// Maps `exposure` onto `geometry` for area-weighted interpolation,
/// tracing each kept pixel's four corners in the (alpha, wavelength)
/// plane; beta is exactly the pixel's slice number, so there's nothing
/// to project along that axis.
pub fn map_exposure_area(
    exposure: &mut dyn ExposureData,
    band: &BandKey,
    geometry: &CubeGeometry,
    do_background_subtraction: bool,
) -> Result<(AreaSamples, MapperStats), MapperError> {
    let exposure_id = exposure.exposure_id().to_owned();

    if do_background_subtraction {
        subtract_background(exposure, band);
    }

    let (flux_shape, dq_shape) = {
        let flux = exposure.flux();
        let dq = exposure.dq();
        (
            (flux.shape()[0], flux.shape()[1]),
            (dq.shape()[0], dq.shape()[1]),
        )
    };
    if flux_shape != dq_shape {
        return Err(MapperError::ShapeMismatch(exposure_id, flux_shape, dq_shape));
    }
    let (rows, cols) = flux_shape;

    let mut stats = MapperStats::default();
    let mut samples = AreaSamples::default();

    let flux = exposure.flux();
    let dq = exposure.dq();

    let wave_min_tol = geometry.wavelength[0] - geometry.cdelt3_normal[0].abs();
    let wave_max_tol = geometry.wavelength[geometry.naxis3 - 1] + geometry.cdelt3_normal[geometry.naxis3 - 1].abs();

    for y in 0..rows {
        for x in 0..cols {
            stats.total_considered += 1;
            if dqflags::is_unusable(dq[[y, x]]) {
                stats.dropped_dq += 1;
                continue;
            }

            let (xf, yf) = (x as f64, y as f64);
            let (_, _, wave) = exposure.wcs().detector_to_alpha_beta(xf, yf);
            if wave.is_nan() {
                stats.dropped_invalid_coords += 1;
                continue;
            }
            if wave < wave_min_tol || wave > wave_max_tol {
                stats.dropped_out_of_range += 1;
                continue;
            }
            let slice_no = match exposure.wcs().slice_number(xf, yf) {
                Some(s) => s,
                None => {
                    stats.dropped_invalid_coords += 1;
                    continue;
                }
            };

            let offsets = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];
            let mut corners = [(0.0, 0.0); 4];
            let mut any_nan = false;
            for (i, (ox, oy)) in offsets.iter().enumerate() {
                let (alpha, _, w) = exposure
                    .wcs()
                    .detector_to_alpha_beta(xf + ox, yf + oy);
                if alpha.is_nan() || w.is_nan() {
                    any_nan = true;
                    break;
                }
                corners[i] = (alpha, w);
            }
            if any_nan {
                stats.dropped_invalid_coords += 1;
                continue;
            }

            samples.corners.push(corners);
            samples.wave.push(wave);
            samples.flux.push(flux[[y, x]]);
            samples.slice_no.push(slice_no);
            stats.kept += 1;
        }
    }

    trace!(
        "area-mapped exposure {}: {}/{} pixels kept",
        exposure_id, stats.kept, stats.total_considered
    );

    Ok((samples, stats))
}
