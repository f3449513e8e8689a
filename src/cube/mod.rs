// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Top-level orchestration: ties the parameter resolver, geometry builder,
detector mapper, resampling kernel, FOV DQ engine and output assembler
into the single per-band (or per-exposure) pipeline an embedding caller
drives.
*/

use log::{debug, info};
use ndarray::Array1;

use crate::assemble::{self, CubeProduct};
use crate::context::{
    BandKey, ExposureData, ExposureWcs, Instrument, InstrumentInfo, InstrumentOps,
    MetadataBlender, PixelCoordSystem, WeightingKind,
};
use crate::coord;
use crate::dq::{self, refine};
use crate::error::CubeBuildError;
use crate::geometry::{build_alpha_beta_geometry, build_world_geometry, CubeGeometry};
use crate::kernel::{self, SpaxelGrid};
use crate::mapper::{map_exposure, map_exposure_area};
use crate::params::{resolve_parameters, ResolvedParameters, UserOverrides};

/// Drives the whole cube-building pipeline for one instrument. Holds no
/// per-cube state; every field is an external collaborator an embedding
/// caller supplies once and reuses across many cubes.
pub struct IfuCubeBuilder<'a> {
    instrument: Instrument,
    ops: &'a dyn InstrumentOps,
    info: &'a dyn InstrumentInfo,
    blender: Option<&'a dyn MetadataBlender>,
}

impl<'a> IfuCubeBuilder<'a> {
    pub fn new(
        instrument: Instrument,
        ops: &'a dyn InstrumentOps,
        info: &'a dyn InstrumentInfo,
        blender: Option<&'a dyn MetadataBlender>,
    ) -> Self {
        Self {
            instrument,
            ops,
            info,
            blender,
        }
    }

    /// Builds one cube covering `band` from `exposures`. `exposures` is
    /// opened and released one at a time, so only one exposure's science
    /// data is resident while mapping, and a second time in full at the
    /// end purely to gather metadata for blending.
    pub fn build_band_cube(
        &self,
        band: &BandKey,
        exposures: &[std::sync::Arc<dyn crate::context::ExposureRef>],
        overrides: &UserOverrides,
        output_type: crate::context::OutputType,
    ) -> Result<CubeProduct, CubeBuildError> {
        let resolved = resolve_parameters(
            std::slice::from_ref(band),
            self.instrument,
            self.info,
            overrides,
            exposures.len(),
            output_type,
        )?;

        let footprint = self.union_footprint(band, exposures, resolved.coord_system)?;

        let geometry = match resolved.coord_system {
            PixelCoordSystem::World => build_world_geometry(&footprint, &resolved)?,
            PixelCoordSystem::AlphaBeta => {
                build_alpha_beta_geometry(&footprint, &resolved, self.info.num_slices(&band.par1))?
            }
        };
        info!(
            "band {}: built {}x{}x{} cube geometry",
            band, geometry.naxis1, geometry.naxis2, geometry.naxis3
        );

        let mut grid = SpaxelGrid::new(geometry.naxis1, geometry.naxis2, geometry.naxis3);
        let mut dq_accum = Array1::<u32>::zeros(geometry.naxis1 * geometry.naxis2 * geometry.naxis3);

        for exposure_ref in exposures {
            let mut handle = exposure_ref.open()?;
            self.accumulate_exposure(handle.as_mut(), band, &geometry, &resolved, &mut grid, &mut dq_accum)?;
        }

        refine::finalize(
            &mut dq_accum,
            &grid.weight_sum,
            geometry.naxis1,
            geometry.naxis2,
            geometry.naxis3,
        );

        let opened: Vec<Box<dyn ExposureData>> = exposures
            .iter()
            .map(|r| r.open())
            .collect::<Result<_, _>>()?;
        let refs: Vec<&dyn ExposureData> = opened.iter().map(|b| b.as_ref()).collect();
        let product = assemble::assemble(&grid, dq_accum, &geometry, &refs, self.blender);

        Ok(product)
    }

    fn union_footprint(
        &self,
        band: &BandKey,
        exposures: &[std::sync::Arc<dyn crate::context::ExposureRef>],
        coord_system: PixelCoordSystem,
    ) -> Result<crate::context::Footprint, CubeBuildError> {
        let mut footprint = None;
        for exposure_ref in exposures {
            crate::context::with_exposure(exposure_ref.as_ref(), |exposure| {
                let fp = self.ops.footprint(exposure, band, self.info, coord_system);
                footprint = Some(match footprint.take() {
                    Some(existing) => crate::context::Footprint::union(&existing, &fp),
                    None => fp,
                });
                Ok(())
            })?;
        }
        footprint.ok_or_else(|| {
            CubeBuildError::Generic(format!("band {} has no exposures to build a footprint from", band))
        })
    }

    /// Maps one exposure's detector pixels, computes its contribution to
    /// the initial DQ plane, and accumulates it into `grid` with the
    /// resolved weighting law.
    ///
    /// The FOV DQ engine always works from the point-cloud mapping
    /// (samples carry a slice number and a (coord1, coord2) position,
    /// which the area path's (alpha, wavelength) polygons don't), so an
    /// area-interpolated exposure is still mapped twice: once for its
    /// area-weighted contribution to the spaxel grid, once (background
    /// subtraction already applied) purely to feed the DQ engine.
    fn accumulate_exposure(
        &self,
        exposure: &mut dyn ExposureData,
        band: &BandKey,
        geometry: &CubeGeometry,
        resolved: &ResolvedParameters,
        grid: &mut SpaxelGrid,
        dq_accum: &mut Array1<u32>,
    ) -> Result<(), CubeBuildError> {
        match resolved.interpolation {
            crate::context::Interpolation::PointCloud => {
                let (samples, stats) = map_exposure(exposure, band, geometry, resolved, true)?;
                debug!(
                    "exposure {}: {} samples mapped for band {}",
                    exposure.exposure_id(),
                    stats.kept,
                    band
                );
                let initial_dq = dq::compute_initial_dq(&samples, geometry, self.instrument, band, self.info);
                or_assign(dq_accum, &initial_dq);

                match resolved.weighting {
                    WeightingKind::Msm | WeightingKind::Emsm => {
                        kernel::msm::accumulate_parallel(grid, geometry, &samples, resolved.weighting);
                    }
                    WeightingKind::MiriPsf => {
                        let (spaxel_alpha, spaxel_beta) = spaxel_alpha_beta_grid(geometry, exposure.wcs());
                        kernel::miripsf::accumulate(
                            grid,
                            geometry,
                            &samples,
                            &spaxel_alpha,
                            &spaxel_beta,
                            &self.info.psf_alpha_parameters(),
                            &self.info.psf_beta_parameters(),
                            self.info.rp_average_wave(band),
                        );
                    }
                }
            }
            crate::context::Interpolation::Area => {
                let (area_samples, area_stats) = map_exposure_area(exposure, band, geometry, true)?;
                debug!(
                    "exposure {}: {} area samples mapped for band {}",
                    exposure.exposure_id(),
                    area_stats.kept,
                    band
                );
                kernel::area::accumulate(grid, geometry, &area_samples);

                let (point_samples, _) = map_exposure(exposure, band, geometry, resolved, false)?;
                let initial_dq =
                    dq::compute_initial_dq(&point_samples, geometry, self.instrument, band, self.info);
                or_assign(dq_accum, &initial_dq);
            }
        }
        Ok(())
    }
}

/// Element-wise `dq |= delta`, since ndarray's bitwise operator overloads
/// don't cover `Array1<u32>`.
fn or_assign(dq: &mut Array1<u32>, delta: &Array1<u32>) {
    for (d, &s) in dq.iter_mut().zip(delta.iter()) {
        *d |= s;
    }
}

/// Re-projects every spaxel centre through `wcs` into instrument-native
/// (alpha, beta), for the miripsf weighting law's per-spaxel distance
/// computation. For an alpha-beta cube the axes already are alpha and
/// beta, so no projection is needed; for a world cube each spaxel's
/// (xi, eta) goes through sky coordinates and the telescope's V2/V3
/// frame, evaluated at the cube's central wavelength plane. Built once
/// per exposure rather than cached, since no WCS transform is assumed
/// stable across exposures.
fn spaxel_alpha_beta_grid(geometry: &CubeGeometry, wcs: &dyn ExposureWcs) -> (Vec<f64>, Vec<f64>) {
    let n = geometry.naxis1 * geometry.naxis2;
    let mut alpha = vec![0.0; n];
    let mut beta = vec![0.0; n];

    match geometry.coord_system {
        PixelCoordSystem::AlphaBeta => {
            for iy in 0..geometry.naxis2 {
                for ix in 0..geometry.naxis1 {
                    let idx = iy * geometry.naxis1 + ix;
                    alpha[idx] = geometry.xcoord[ix];
                    beta[idx] = geometry.ycoord[iy];
                }
            }
        }
        PixelCoordSystem::World => {
            let wave = geometry.wavelength[geometry.naxis3 / 2];
            for iy in 0..geometry.naxis2 {
                for ix in 0..geometry.naxis1 {
                    let idx = iy * geometry.naxis1 + ix;
                    let (ra, dec) =
                        coord::tangent_to_radec(geometry.crval1, geometry.crval2, geometry.xcoord[ix], geometry.ycoord[iy]);
                    let (v2, v3) = wcs.world_to_v2v3(ra, dec, wave);
                    let (a, b) = wcs.v2v3_to_alpha_beta(v2, v3, wave);
                    alpha[idx] = a;
                    beta[idx] = b;
                }
            }
        }
    }

    (alpha, beta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{
        BackgroundPolynomial, ExposureRef, Footprint, OutputType, OverlapMode, WavelengthTable,
    };
    use ndarray::{Array2, ArrayView2, ArrayViewMut2};
    use std::sync::Arc;

    struct FakeWcs {
        crval1: f64,
        crval2: f64,
        cdelt: f64,
        nx: usize,
    }

    impl ExposureWcs for FakeWcs {
        fn detector_to_world(&self, x: f64, y: f64) -> (f64, f64, f64) {
            let xi = (x - self.nx as f64 / 2.0) * self.cdelt;
            let eta = (y - self.nx as f64 / 2.0) * self.cdelt;
            let (ra, dec) = coord::tangent_to_radec(self.crval1, self.crval2, xi, eta);
            let wave = 5.0 + 0.01 * y;
            (ra, dec, wave)
        }

        fn detector_to_alpha_beta(&self, x: f64, y: f64) -> (f64, f64, f64) {
            let (_, _, wave) = self.detector_to_world(x, y);
            (x - self.nx as f64 / 2.0, y - self.nx as f64 / 2.0, wave)
        }

        fn world_to_v2v3(&self, ra: f64, dec: f64, _wave: f64) -> (f64, f64) {
            coord::radec_to_tangent(self.crval1, self.crval2, ra, dec)
        }

        fn v2v3_to_alpha_beta(&self, v2: f64, v3: f64, _wave: f64) -> (f64, f64) {
            (v2 / self.cdelt, v3 / self.cdelt)
        }

        fn slice_number(&self, _x: f64, _y: f64) -> Option<i32> {
            Some(0)
        }
    }

    struct FakeExposure {
        flux: Array2<f32>,
        dq: Array2<u32>,
        wcs: FakeWcs,
        id: String,
    }

    impl ExposureData for FakeExposure {
        fn flux(&self) -> ArrayView2<f32> {
            self.flux.view()
        }
        fn flux_mut(&mut self) -> ArrayViewMut2<f32> {
            self.flux.view_mut()
        }
        fn dq(&self) -> ArrayView2<u32> {
            self.dq.view()
        }
        fn wcs(&self) -> &dyn ExposureWcs {
            &self.wcs
        }
        fn background_polynomials(&self) -> &[BackgroundPolynomial] {
            &[]
        }
        fn exposure_id(&self) -> &str {
            &self.id
        }
    }

    struct FakeExposureRef {
        nx: usize,
    }

    impl ExposureRef for FakeExposureRef {
        fn open(&self) -> Result<Box<dyn ExposureData>, crate::mapper::error::MapperError> {
            let flux = Array2::from_elem((self.nx, self.nx), 10.0f32);
            let dq = Array2::zeros((self.nx, self.nx));
            Ok(Box::new(FakeExposure {
                flux,
                dq,
                wcs: FakeWcs {
                    crval1: 120.0,
                    crval2: -20.0,
                    cdelt: 0.05,
                    nx: self.nx,
                },
                id: "fake".to_string(),
            }))
        }

        fn display_name(&self) -> &str {
            "fake"
        }
    }

    struct FakeOps;
    impl InstrumentOps for FakeOps {
        fn slice_map(&self, exposure: &dyn ExposureData, _band: &BandKey, _info: &dyn InstrumentInfo) -> Array2<i32> {
            Array2::zeros(exposure.flux().dim())
        }

        fn footprint(
            &self,
            exposure: &dyn ExposureData,
            _band: &BandKey,
            _info: &dyn InstrumentInfo,
            _coord_system: PixelCoordSystem,
        ) -> Footprint {
            let (rows, cols) = exposure.flux().dim();
            let mut fp = None;
            for &(x, y) in &[(0.0, 0.0), (cols as f64 - 1.0, rows as f64 - 1.0)] {
                let (ra, dec, wave) = exposure.wcs().detector_to_world(x, y);
                let this = Footprint {
                    coord1_min: ra,
                    coord1_max: ra,
                    coord2_min: dec,
                    coord2_max: dec,
                    wave_min: wave,
                    wave_max: wave,
                };
                fp = Some(match fp {
                    Some(existing) => Footprint::union(&existing, &this),
                    None => this,
                });
            }
            fp.unwrap()
        }

        fn dq_overlap_mode(&self) -> OverlapMode {
            OverlapMode::Polygon
        }
    }

    struct FakeInfo;
    impl InstrumentInfo for FakeInfo {
        fn wave_roi(&self, _band: &BandKey) -> f64 {
            0.05
        }
        fn spatial_roi(&self, _band: &BandKey) -> f64 {
            0.2
        }
        fn scale(&self, _band: &BandKey) -> (f64, f64, f64) {
            (0.1, 0.1, 0.05)
        }
        fn wave_min(&self, _band: &BandKey) -> f64 {
            4.5
        }
        fn wave_max(&self, _band: &BandKey) -> f64 {
            5.5
        }
        fn msm_power(&self, _band: &BandKey) -> f64 {
            2.0
        }
        fn soft_rad(&self, _band: &BandKey) -> f64 {
            0.01
        }
        fn scale_rad(&self, _band: &BandKey) -> f64 {
            0.5
        }
        fn start_slice(&self, _par1: &str) -> i32 {
            0
        }
        fn end_slice(&self, _par1: &str) -> i32 {
            0
        }
        fn num_slices(&self, _par1: &str) -> usize {
            1
        }
        fn rp_average_wave(&self, _band: &BandKey) -> f64 {
            3000.0
        }
        fn psf_alpha_parameters(&self) -> Vec<f64> {
            vec![0.1]
        }
        fn psf_beta_parameters(&self) -> Vec<f64> {
            vec![0.1]
        }
        fn multichannel_table(&self, _weighting: WeightingKind) -> WavelengthTable {
            empty_table()
        }
        fn prism_table(&self) -> WavelengthTable {
            empty_table()
        }
        fn medium_resolution_table(&self) -> WavelengthTable {
            empty_table()
        }
        fn high_resolution_table(&self) -> WavelengthTable {
            empty_table()
        }
    }

    fn empty_table() -> WavelengthTable {
        WavelengthTable {
            wavelength: vec![],
            spatial_roi: vec![],
            wave_roi: vec![],
            weight_power: vec![],
            soft_rad: vec![],
            scale_rad: vec![],
        }
    }

    #[test]
    fn single_exposure_world_cube_builds_without_error() {
        let ops = FakeOps;
        let info = FakeInfo;
        let builder = IfuCubeBuilder::new(Instrument::Miri, &ops, &info, None);
        let band = BandKey::new("1", "SHORT");
        let exposures: Vec<Arc<dyn ExposureRef>> = vec![Arc::new(FakeExposureRef { nx: 12 })];
        let overrides = UserOverrides::default();

        let product = builder
            .build_band_cube(&band, &exposures, &overrides, OutputType::Multi)
            .unwrap();

        assert!(product.data.dim().0 > 0);
        assert!(product.data.iter().any(|&f| f > 0.0));
    }
}
