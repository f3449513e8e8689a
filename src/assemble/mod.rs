// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Turns a cube's flat accumulation buffers into the final output product:
reshaped 3-D arrays, per-voxel flux and error, and the WCS-equivalent
metadata an embedding pipeline attaches to a FITS header.
 */

use itertools::izip;
use ndarray::Array3;

use crate::context::{BlendedMetadata, ExposureData, MetadataBlender};
use crate::geometry::CubeGeometry;
use crate::kernel::SpaxelGrid;

/// Axis-3 WCS type: linear wavelength sampling, or a tabulated lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WavelengthAxisType {
    Wave,
    WaveTab,
}

/// The WCS-equivalent metadata attached to a finished cube. Field names
/// mirror FITS header keywords since that's what an embedding pipeline
/// ultimately writes them as.
#[derive(Clone, Debug)]
pub struct CubeMetadata {
    pub crval1: f64,
    pub crval2: f64,
    pub crval3: f64,
    pub crpix1: f64,
    pub crpix2: f64,
    pub crpix3: f64,
    /// Degrees, after the arcsec-to-degree conversion applied on output.
    pub cdelt1_deg: f64,
    /// Degrees, after the arcsec-to-degree conversion applied on output.
    pub cdelt2_deg: f64,
    pub cdelt3: Option<f64>,
    pub naxis1: usize,
    pub naxis2: usize,
    pub naxis3: usize,
    pub wavelength_axis_type: WavelengthAxisType,
    /// Present only when `wavelength_axis_type` is `WaveTab`.
    pub wavelength_table: Option<Vec<f64>>,
    pub blended: BlendedMetadata,
}

/// The final cube: three 3-D arrays (flux, data quality, weight map), an
/// error array, and its metadata. Shaped `(NAXIS3, NAXIS2, NAXIS1)`,
/// matching FITS's fastest-varying-first axis order reversed for Rust's
/// row-major storage.
pub struct CubeProduct {
    pub data: Array3<f32>,
    pub dq: Array3<u32>,
    pub weightmap: Array3<f32>,
    pub err: Array3<f32>,
    pub metadata: CubeMetadata,
}

/// Converts arcsec to degrees, the convention every spatial CDELT is
/// stored in on output regardless of which coordinate system the cube
/// was built in.
const ARCSEC_TO_DEG: f64 = 1.0 / 3600.0;

/// Reshapes `grid`'s flat accumulation buffers and `dq` (already
/// refined by [`crate::dq::refine::finalize`]) into a [`CubeProduct`],
/// computing final flux as `flux_sum / weight_sum` wherever a spaxel was
/// touched and leaving it (and its error) at zero otherwise.
///
/// `exposures` and `blender` are only consulted when more than one
/// exposure contributed to the cube; a single-exposure cube carries no
/// blended metadata, since there is nothing to merge.
pub fn assemble(
    grid: &SpaxelGrid,
    dq: ndarray::Array1<u32>,
    geometry: &CubeGeometry,
    exposures: &[&dyn ExposureData],
    blender: Option<&dyn MetadataBlender>,
) -> CubeProduct {
    let n = grid.flux_sum.len();
    let mut flux = vec![0.0f32; n];
    let mut err = vec![0.0f32; n];
    let mut weightmap = vec![0.0f32; n];

    for (flux_out, err_out, weight_out, &flux_sum, &weight_sum, &count) in izip!(
        &mut flux,
        &mut err,
        &mut weightmap,
        grid.flux_sum.iter(),
        grid.weight_sum.iter(),
        grid.count.iter()
    ) {
        *weight_out = weight_sum as f32;
        if count > 0 && weight_sum > 0.0 {
            *flux_out = (flux_sum / weight_sum) as f32;
            *err_out = (1.0 / weight_sum.sqrt()) as f32;
        }
    }

    let shape = (geometry.naxis3, geometry.naxis2, geometry.naxis1);
    let data = Array3::from_shape_vec(shape, flux).expect("flux buffer matches geometry's voxel count");
    let dq = dq
        .into_shape(shape)
        .expect("dq buffer matches geometry's voxel count");
    let weightmap =
        Array3::from_shape_vec(shape, weightmap).expect("weight buffer matches geometry's voxel count");
    let err = Array3::from_shape_vec(shape, err).expect("err buffer matches geometry's voxel count");

    let blended = match (exposures.len() > 1, blender) {
        (true, Some(blender)) => blender.blend(exposures),
        _ => BlendedMetadata::default(),
    };

    let (wavelength_axis_type, wavelength_table) = if geometry.linear_wavelength {
        (WavelengthAxisType::Wave, None)
    } else {
        (WavelengthAxisType::WaveTab, Some(geometry.wavelength.clone()))
    };

    let metadata = CubeMetadata {
        crval1: geometry.crval1,
        crval2: geometry.crval2,
        crval3: geometry.crval3,
        crpix1: geometry.crpix1,
        crpix2: geometry.crpix2,
        crpix3: geometry.crpix3,
        cdelt1_deg: geometry.cdelt1 * ARCSEC_TO_DEG,
        cdelt2_deg: geometry.cdelt2 * ARCSEC_TO_DEG,
        cdelt3: geometry.cdelt3,
        naxis1: geometry.naxis1,
        naxis2: geometry.naxis2,
        naxis3: geometry.naxis3,
        wavelength_axis_type,
        wavelength_table,
        blended,
    };

    CubeProduct {
        data,
        dq,
        weightmap,
        err,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PixelCoordSystem;

    fn flat_geometry() -> CubeGeometry {
        CubeGeometry {
            coord_system: PixelCoordSystem::World,
            crval1: 120.0,
            crval2: -20.0,
            crpix1: 2.5,
            crpix2: 2.5,
            cdelt1: 0.13,
            cdelt2: 0.13,
            naxis1: 3,
            naxis2: 3,
            naxis3: 2,
            xcoord: vec![-0.13, 0.0, 0.13],
            ycoord: vec![-0.13, 0.0, 0.13],
            wavelength: vec![4.9, 5.0],
            linear_wavelength: true,
            crval3: 4.9,
            crpix3: 1.0,
            cdelt3: Some(0.1),
            cdelt3_normal: vec![0.1, 0.1],
        }
    }

    #[test]
    fn untouched_voxels_have_zero_flux_and_error() {
        let geometry = flat_geometry();
        let grid = SpaxelGrid::new(geometry.naxis1, geometry.naxis2, geometry.naxis3);
        let dq = ndarray::Array1::zeros(geometry.naxis1 * geometry.naxis2 * geometry.naxis3);
        let product = assemble(&grid, dq, &geometry, &[], None);
        assert!(product.data.iter().all(|&f| f == 0.0));
        assert!(product.err.iter().all(|&e| e == 0.0));
    }

    #[test]
    fn touched_voxel_gets_weighted_mean_flux() {
        let geometry = flat_geometry();
        let mut grid = SpaxelGrid::new(geometry.naxis1, geometry.naxis2, geometry.naxis3);
        let idx = grid.index(1, 1, 0);
        grid.flux_sum[idx] = 20.0;
        grid.weight_sum[idx] = 4.0;
        grid.count[idx] = 2;
        let dq = ndarray::Array1::zeros(geometry.naxis1 * geometry.naxis2 * geometry.naxis3);
        let product = assemble(&grid, dq, &geometry, &[], None);
        assert!((product.data[[0, 1, 1]] - 5.0).abs() < 1e-6);
        assert!((product.weightmap[[0, 1, 1]] - 4.0).abs() < 1e-6);
    }

    #[test]
    fn cdelt_is_converted_from_arcsec_to_degrees() {
        let geometry = flat_geometry();
        let grid = SpaxelGrid::new(geometry.naxis1, geometry.naxis2, geometry.naxis3);
        let dq = ndarray::Array1::zeros(geometry.naxis1 * geometry.naxis2 * geometry.naxis3);
        let product = assemble(&grid, dq, &geometry, &[], None);
        assert!((product.metadata.cdelt1_deg - geometry.cdelt1 / 3600.0).abs() < 1e-12);
    }

    #[test]
    fn nonlinear_wavelength_axis_emits_wave_tab() {
        let mut geometry = flat_geometry();
        geometry.linear_wavelength = false;
        geometry.cdelt3 = None;
        let grid = SpaxelGrid::new(geometry.naxis1, geometry.naxis2, geometry.naxis3);
        let dq = ndarray::Array1::zeros(geometry.naxis1 * geometry.naxis2 * geometry.naxis3);
        let product = assemble(&grid, dq, &geometry, &[], None);
        assert_eq!(product.metadata.wavelength_axis_type, WavelengthAxisType::WaveTab);
        assert_eq!(product.metadata.wavelength_table, Some(geometry.wavelength.clone()));
    }
}
