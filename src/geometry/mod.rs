// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Builds a cube's coordinate geometry (its WCS-equivalent axes) from a
band's combined footprint and resolved resampling parameters.
 */

pub mod error;

use log::debug;

use crate::context::{Footprint, PixelCoordSystem, WavelengthTable};
use crate::coord;
use crate::params::ResolvedParameters;
use error::GeometryError;

/// A sanity ceiling on spaxels per spatial axis; cubes built from sane
/// inputs never get anywhere close to this, but a corrupt WCS fit can send
/// a footprint's extent to infinity, and we'd rather fail fast than try to
/// allocate a cube with billions of spaxels.
const MAX_SPAXELS_PER_AXIS: usize = 4096;

/// As above, for wavelength planes.
const MAX_WAVELENGTH_PLANES: usize = 65536;

/// A cube's coordinate geometry: everything needed to map a spaxel index
/// to a physical coordinate, and back.
#[derive(Clone, Debug)]
pub struct CubeGeometry {
    pub coord_system: PixelCoordSystem,
    pub crval1: f64,
    pub crval2: f64,
    pub crpix1: f64,
    pub crpix2: f64,
    pub cdelt1: f64,
    pub cdelt2: f64,
    pub naxis1: usize,
    pub naxis2: usize,
    pub naxis3: usize,
    /// Coordinate-1 offset (arcsec for world cubes, alpha for alpha-beta
    /// cubes) of each spaxel column's centre.
    pub xcoord: Vec<f64>,
    /// Coordinate-2 offset of each spaxel row's centre.
    pub ycoord: Vec<f64>,
    /// Absolute wavelength of each plane.
    pub wavelength: Vec<f64>,
    pub linear_wavelength: bool,
    pub crval3: f64,
    pub crpix3: f64,
    /// `Some` only when [`Self::linear_wavelength`] is true.
    pub cdelt3: Option<f64>,
    /// Per-plane wavelength step, `wavelength[k+1] - wavelength[k]`, with the
    /// last entry copied from the penultimate one. Used to scale spectral
    /// ROIs consistently whether the axis is linear or tabulated.
    pub cdelt3_normal: Vec<f64>,
}

/// Computes the per-plane wavelength step array described on
/// [`CubeGeometry::cdelt3_normal`].
fn cdelt3_normal_from_wavelength(wavelength: &[f64]) -> Vec<f64> {
    if wavelength.len() < 2 {
        return vec![1.0; wavelength.len()];
    }
    let mut steps: Vec<f64> = wavelength.windows(2).map(|w| w[1] - w[0]).collect();
    let last = *steps.last().unwrap();
    steps.push(last);
    steps
}

impl CubeGeometry {
    /// Converts a world coordinate-1/2 pair into the nearest spaxel
    /// column/row indices, or `None` if it falls outside the cube.
    pub fn locate_spaxel(&self, coord1: f64, coord2: f64) -> Option<(usize, usize)> {
        let ix = ((coord1 - self.xcoord[0]) / self.cdelt1).round();
        let iy = ((coord2 - self.ycoord[0]) / self.cdelt2).round();
        if ix < 0.0 || iy < 0.0 {
            return None;
        }
        let (ix, iy) = (ix as usize, iy as usize);
        if ix >= self.naxis1 || iy >= self.naxis2 {
            return None;
        }
        Some((ix, iy))
    }

    /// Locates the nearest wavelength plane to `wave`, or `None` if
    /// outside the cube's spectral range.
    pub fn locate_plane(&self, wave: f64) -> Option<usize> {
        if self.wavelength.is_empty() {
            return None;
        }
        if wave < self.wavelength[0] || wave > *self.wavelength.last().unwrap() {
            return None;
        }
        Some(crate::math::nearest_index(&self.wavelength, wave))
    }
}

/// Quantizes a `[min_val, max_val]` extent around a centre of zero into a
/// pixel count and `CRPIX`, matching the convention that the reference
/// value always sits on a pixel boundary rather than a pixel centre.
fn quantize_symmetric_axis(min_val: f64, max_val: f64, cdelt: f64) -> (usize, f64) {
    let n_below = (min_val.abs() / cdelt).ceil().max(0.0) as usize;
    let n_above = (max_val.abs() / cdelt).ceil().max(0.0) as usize;
    let naxis = (n_below + n_above).max(1);
    let crpix = n_below as f64 + 1.0;
    (naxis, crpix)
}

fn axis_coords(naxis: usize, crval: f64, crpix: f64, cdelt: f64) -> Vec<f64> {
    (0..naxis)
        .map(|i| ((i as f64 + 1.0) - crpix) * cdelt + crval)
        .collect()
}

/// Quantizes `[wave_min, wave_max]` into a linear axis, recentering about
/// the requested range's midpoint so the quantized span stays symmetric
/// around it rather than growing only on the high side. `CRVAL3` sits at
/// the first plane's centre (half a step in from the recentered low edge),
/// matching the convention `quantize_symmetric_axis` uses for the spatial
/// axes.
fn linear_wavelength_axis(wave_min: f64, wave_max: f64, cdelt3: f64) -> (Vec<f64>, f64, f64) {
    let naxis3 = ((wave_max - wave_min) / cdelt3).ceil().max(1.0) as usize;
    let midpoint = (wave_min + wave_max) / 2.0;
    let recentered_min = midpoint - (naxis3 as f64) * cdelt3 / 2.0;
    let crval3 = recentered_min + cdelt3 / 2.0;
    let crpix3 = 1.0;
    let coords = (0..naxis3).map(|i| crval3 + i as f64 * cdelt3).collect();
    (coords, crval3, crpix3)
}

fn nonlinear_wavelength_axis(table: &WavelengthTable) -> (Vec<f64>, f64, f64) {
    let coords = table.wavelength.clone();
    let crval3 = coords.first().copied().unwrap_or(0.0);
    (coords, crval3, 1.0)
}

fn check_axis_limit(naxis: usize, limit: usize) -> Result<(), GeometryError> {
    if naxis > limit {
        return Err(GeometryError::TooManySpaxels(naxis, naxis, limit));
    }
    Ok(())
}

/// Builds the geometry for a sky-projected (world) cube from the
/// RA/Dec extent of its combined footprint.
///
/// `footprint.coord1_{min,max}` are RA in degrees, `coord2_{min,max}` are
/// Dec in degrees; the wavelength bounds are taken from `resolved` rather
/// than the footprint, since the resolved parameters may have clipped
/// them relative to what any single exposure covers.
pub fn build_world_geometry(
    footprint: &Footprint,
    resolved: &ResolvedParameters,
) -> Result<CubeGeometry, GeometryError> {
    let crval1 = crate::math::circular_mean_deg(&[footprint.coord1_min, footprint.coord1_max]);
    let crval2 = (footprint.coord2_min + footprint.coord2_max) / 2.0;

    let corners = [
        (footprint.coord1_min, footprint.coord2_min),
        (footprint.coord1_min, footprint.coord2_max),
        (footprint.coord1_max, footprint.coord2_min),
        (footprint.coord1_max, footprint.coord2_max),
    ];
    let projected: Vec<(f64, f64)> = corners
        .iter()
        .map(|&(ra, dec)| coord::radec_to_tangent(crval1, crval2, ra, dec))
        .collect();
    let xi_min = projected.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let xi_max = projected
        .iter()
        .map(|p| p.0)
        .fold(f64::NEG_INFINITY, f64::max);
    let eta_min = projected.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let eta_max = projected
        .iter()
        .map(|p| p.1)
        .fold(f64::NEG_INFINITY, f64::max);

    if (xi_max - xi_min).abs() < crate::constants::FOOTPRINT_EXTENT_TOLERANCE {
        return Err(GeometryError::DegenerateFootprint("coord1"));
    }
    if (eta_max - eta_min).abs() < crate::constants::FOOTPRINT_EXTENT_TOLERANCE {
        return Err(GeometryError::DegenerateFootprint("coord2"));
    }

    let cdelt1 = resolved.spatial_scale;
    let cdelt2 = resolved.spatial_scale;
    let (naxis1, crpix1) = quantize_symmetric_axis(xi_min, xi_max, cdelt1);
    let (naxis2, crpix2) = quantize_symmetric_axis(eta_min, eta_max, cdelt2);
    check_axis_limit(naxis1, MAX_SPAXELS_PER_AXIS)?;
    check_axis_limit(naxis2, MAX_SPAXELS_PER_AXIS)?;

    let xcoord = axis_coords(naxis1, 0.0, crpix1, cdelt1);
    let ycoord = axis_coords(naxis2, 0.0, crpix2, cdelt2);

    let (wavelength, crval3, crpix3, cdelt3) = if resolved.linear_wavelength {
        let cdelt3 = resolved
            .spectral_scale
            .expect("linear wavelength axis requires a spectral scale");
        let (coords, crval3, crpix3) =
            linear_wavelength_axis(resolved.wave_min, resolved.wave_max, cdelt3);
        (coords, crval3, crpix3, Some(cdelt3))
    } else {
        let table = resolved
            .wavelength_table
            .as_ref()
            .ok_or(GeometryError::WavelengthTableTooShort)?;
        if table.len() < 2 {
            return Err(GeometryError::WavelengthTableTooShort);
        }
        let (coords, crval3, crpix3) = nonlinear_wavelength_axis(table);
        (coords, crval3, crpix3, None)
    };
    if wavelength.len() > MAX_WAVELENGTH_PLANES {
        return Err(GeometryError::TooManyWavelengthPlanes(
            wavelength.len(),
            MAX_WAVELENGTH_PLANES,
        ));
    }

    debug!(
        "world geometry: naxis=({}, {}, {}), crval=({:.6}, {:.6}, {:.6}), cdelt1={:.6}\"",
        naxis1,
        naxis2,
        wavelength.len(),
        crval1,
        crval2,
        crval3,
        cdelt1
    );

    let cdelt3_normal = cdelt3_normal_from_wavelength(&wavelength);
    Ok(CubeGeometry {
        coord_system: PixelCoordSystem::World,
        crval1,
        crval2,
        crpix1,
        crpix2,
        cdelt1,
        cdelt2,
        naxis1,
        naxis2,
        naxis3: wavelength.len(),
        xcoord,
        ycoord,
        wavelength,
        linear_wavelength: resolved.linear_wavelength,
        crval3,
        crpix3,
        cdelt3,
        cdelt3_normal,
    })
}

/// Builds the geometry for a single-exposure, instrument-native
/// (alpha, beta) cube. `CRVAL1`/`CRVAL2` are recentered about the
/// footprint's midpoint and then stepped back by half the quantized axis
/// width, so the quantized axis (which may be wider than the raw extent)
/// stays centred on the data rather than anchored to its low edge.
pub fn build_alpha_beta_geometry(
    footprint: &Footprint,
    resolved: &ResolvedParameters,
    num_slices: usize,
) -> Result<CubeGeometry, GeometryError> {
    let extent1 = footprint.coord1_max - footprint.coord1_min;
    let extent2 = footprint.coord2_max - footprint.coord2_min;
    if extent1.abs() < crate::constants::FOOTPRINT_EXTENT_TOLERANCE {
        return Err(GeometryError::DegenerateFootprint("alpha"));
    }
    if extent2.abs() < crate::constants::FOOTPRINT_EXTENT_TOLERANCE {
        return Err(GeometryError::DegenerateFootprint("beta"));
    }

    let cdelt1 = resolved.spatial_scale;
    let naxis1 = (extent1 / cdelt1).ceil().max(1.0) as usize;
    check_axis_limit(naxis1, MAX_SPAXELS_PER_AXIS)?;
    let crpix1 = crate::constants::ALPHA_BETA_CRPIX1;
    let a_centre = (footprint.coord1_max + footprint.coord1_min) / 2.0;
    let crval1 = a_centre - (naxis1 as f64 / 2.0) * cdelt1;
    let xcoord = axis_coords(naxis1, crval1, crpix1, cdelt1);

    let naxis2 = num_slices.max(1);
    let cdelt2 = extent2 / naxis2 as f64;
    let crpix2 = crate::constants::ALPHA_BETA_CRPIX1;
    let b_centre = (footprint.coord2_max + footprint.coord2_min) / 2.0;
    let crval2 = b_centre - (naxis2 as f64 / 2.0) * cdelt2;
    let ycoord = axis_coords(naxis2, crval2, crpix2, cdelt2);

    let (wavelength, crval3, crpix3, cdelt3) = if resolved.linear_wavelength {
        let cdelt3 = resolved
            .spectral_scale
            .expect("linear wavelength axis requires a spectral scale");
        let (coords, crval3, crpix3) =
            linear_wavelength_axis(resolved.wave_min, resolved.wave_max, cdelt3);
        (coords, crval3, crpix3, Some(cdelt3))
    } else {
        let table = resolved
            .wavelength_table
            .as_ref()
            .ok_or(GeometryError::WavelengthTableTooShort)?;
        if table.len() < 2 {
            return Err(GeometryError::WavelengthTableTooShort);
        }
        let (coords, crval3, crpix3) = nonlinear_wavelength_axis(table);
        (coords, crval3, crpix3, None)
    };
    if wavelength.len() > MAX_WAVELENGTH_PLANES {
        return Err(GeometryError::TooManyWavelengthPlanes(
            wavelength.len(),
            MAX_WAVELENGTH_PLANES,
        ));
    }

    debug!(
        "alpha-beta geometry: naxis=({}, {}, {}), crval=({:.6}, {:.6}, {:.6})",
        naxis1,
        naxis2,
        wavelength.len(),
        crval1,
        crval2,
        crval3
    );

    let cdelt3_normal = cdelt3_normal_from_wavelength(&wavelength);
    Ok(CubeGeometry {
        coord_system: PixelCoordSystem::AlphaBeta,
        crval1,
        crval2,
        crpix1,
        crpix2,
        cdelt1,
        cdelt2,
        naxis1,
        naxis2,
        naxis3: wavelength.len(),
        xcoord,
        ycoord,
        wavelength,
        linear_wavelength: resolved.linear_wavelength,
        crval3,
        crpix3,
        cdelt3,
        cdelt3_normal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WeightingKind;

    fn resolved_linear(wave_min: f64, wave_max: f64) -> ResolvedParameters {
        ResolvedParameters {
            spatial_scale: 0.13,
            spectral_scale: Some(0.001),
            linear_wavelength: true,
            rois: 0.4,
            roiw: Some(0.001),
            weight_power: Some(2.0),
            soft_rad: Some(0.01),
            scale_rad: Some(0.6),
            wave_min,
            wave_max,
            wavelength_table: None,
            weighting: WeightingKind::Msm,
            interpolation: crate::context::Interpolation::PointCloud,
            coord_system: PixelCoordSystem::World,
        }
    }

    #[test]
    fn world_geometry_has_positive_extents() {
        let footprint = Footprint {
            coord1_min: 119.99,
            coord1_max: 120.01,
            coord2_min: -20.01,
            coord2_max: -19.99,
            wave_min: 4.9,
            wave_max: 5.7,
        };
        let resolved = resolved_linear(4.9, 5.7);
        let geom = build_world_geometry(&footprint, &resolved).unwrap();
        assert!(geom.naxis1 > 0);
        assert!(geom.naxis2 > 0);
        assert!(geom.naxis3 > 0);
        // CRVAL3 sits half a step in from the recentered low edge, not
        // exactly at wave_min, per the quantize-then-recenter rule.
        let expected_first = geom.crval3;
        assert!((geom.wavelength[0] - expected_first).abs() < 1e-9);
        assert!((geom.wavelength[0] - 4.9).abs() < resolved.spectral_scale.unwrap());
    }

    #[test]
    fn degenerate_footprint_is_rejected() {
        let footprint = Footprint {
            coord1_min: 120.0,
            coord1_max: 120.0,
            coord2_min: -20.0,
            coord2_max: -19.99,
            wave_min: 4.9,
            wave_max: 5.7,
        };
        let resolved = resolved_linear(4.9, 5.7);
        let err = build_world_geometry(&footprint, &resolved).unwrap_err();
        assert!(matches!(err, GeometryError::DegenerateFootprint("coord1")));
    }

    #[test]
    fn alpha_beta_geometry_respects_slice_count() {
        let footprint = Footprint {
            coord1_min: -2.0,
            coord1_max: 2.0,
            coord2_min: -1.5,
            coord2_max: 1.5,
            wave_min: 4.9,
            wave_max: 5.7,
        };
        let resolved = resolved_linear(4.9, 5.7);
        let geom = build_alpha_beta_geometry(&footprint, &resolved, 21).unwrap();
        assert_eq!(geom.naxis2, 21);
    }
}
