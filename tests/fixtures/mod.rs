// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Shared in-memory fakes for the integration tests in this directory.
//!
//! These mirror the `Synthetic*`/`Fake*` pattern used by the library's own
//! unit tests and the `cube_build_demo` binary, generalised with a handful
//! of knobs (detector size, plate scale, wavelength gradient, slice height)
//! so each test file can build the exposure geometry it needs without
//! duplicating boilerplate trait impls.

#![allow(dead_code)]

use ndarray::{Array2, ArrayView2, ArrayViewMut2};

use ifu_cube_build::context::{
    BackgroundPolynomial, Footprint, OverlapMode, WavelengthTable,
};
use ifu_cube_build::{
    BandKey, ExposureData, ExposureRef, ExposureWcs, InstrumentInfo, InstrumentOps,
    PixelCoordSystem, WeightingKind,
};

/// An affine detector WCS: world coordinates come from a real gnomonic
/// projection centred on `(crval1, crval2)`, alpha/beta come from the same
/// plate scale with beta quantised into `rows_per_slice`-tall slices.
#[derive(Clone, Copy, Debug)]
pub struct GridWcs {
    pub crval1: f64,
    pub crval2: f64,
    pub cdelt: f64,
    pub nx: f64,
    pub ny: f64,
    pub wave0: f64,
    pub dwave_dy: f64,
    pub rows_per_slice: f64,
}

impl ExposureWcs for GridWcs {
    fn detector_to_world(&self, x: f64, y: f64) -> (f64, f64, f64) {
        let xi = (x - self.nx / 2.0) * self.cdelt;
        let eta = (y - self.ny / 2.0) * self.cdelt;
        let (ra, dec) = ifu_cube_build::coord::tangent_to_radec(self.crval1, self.crval2, xi, eta);
        (ra, dec, self.wave0 + self.dwave_dy * y)
    }

    fn detector_to_alpha_beta(&self, x: f64, y: f64) -> (f64, f64, f64) {
        let wave = self.wave0 + self.dwave_dy * y;
        ((x - self.nx / 2.0) * self.cdelt, (y / self.rows_per_slice).floor(), wave)
    }

    fn world_to_v2v3(&self, ra: f64, dec: f64, _wave: f64) -> (f64, f64) {
        ifu_cube_build::coord::radec_to_tangent(self.crval1, self.crval2, ra, dec)
    }

    fn v2v3_to_alpha_beta(&self, v2: f64, v3: f64, _wave: f64) -> (f64, f64) {
        (v2 / self.cdelt, (v3 / self.cdelt / self.rows_per_slice).floor())
    }

    fn slice_number(&self, _x: f64, y: f64) -> Option<i32> {
        Some((y / self.rows_per_slice).floor() as i32)
    }
}

pub struct GridExposure {
    pub flux: Array2<f32>,
    pub dq: Array2<u32>,
    pub wcs: GridWcs,
    pub polynomials: Vec<BackgroundPolynomial>,
    pub id: String,
}

impl ExposureData for GridExposure {
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
        &self.polynomials
    }
    fn exposure_id(&self) -> &str {
        &self.id
    }
}

/// An `ExposureRef` that rebuilds a fresh [`GridExposure`] from its closure
/// every time it is opened, the way a real ref would re-read a file from
/// disk on each open rather than handing out a cached, possibly-mutated copy.
pub struct GridExposureRef {
    pub name: String,
    pub build: Box<dyn Fn() -> GridExposure + Send + Sync>,
}

impl ExposureRef for GridExposureRef {
    fn open(&self) -> Result<Box<dyn ExposureData>, ifu_cube_build::mapper::error::MapperError> {
        Ok(Box::new((self.build)()))
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

pub struct FixtureOps;

impl InstrumentOps for FixtureOps {
    fn slice_map(&self, exposure: &dyn ExposureData, _band: &BandKey, _info: &dyn InstrumentInfo) -> Array2<i32> {
        Array2::zeros(exposure.flux().dim())
    }

    fn footprint(
        &self,
        exposure: &dyn ExposureData,
        _band: &BandKey,
        _info: &dyn InstrumentInfo,
        coord_system: PixelCoordSystem,
    ) -> Footprint {
        let (rows, cols) = exposure.flux().dim();
        let mut footprint = None;
        for &(x, y) in &[(0.0, 0.0), (cols as f64 - 1.0, rows as f64 - 1.0)] {
            let (c1, c2, wave) = match coord_system {
                PixelCoordSystem::World => exposure.wcs().detector_to_world(x, y),
                PixelCoordSystem::AlphaBeta => exposure.wcs().detector_to_alpha_beta(x, y),
            };
            let this = Footprint {
                coord1_min: c1,
                coord1_max: c1,
                coord2_min: c2,
                coord2_max: c2,
                wave_min: wave,
                wave_max: wave,
            };
            footprint = Some(match footprint {
                Some(existing) => Footprint::union(&existing, &this),
                None => this,
            });
        }
        footprint.unwrap()
    }

    fn dq_overlap_mode(&self) -> OverlapMode {
        OverlapMode::Polygon
    }
}

#[derive(Clone, Debug)]
pub struct FixtureInfo {
    pub wave_roi: f64,
    pub spatial_roi: f64,
    pub scale: (f64, f64, f64),
    pub wave_min: f64,
    pub wave_max: f64,
    pub msm_power: f64,
    pub soft_rad: f64,
    pub scale_rad: f64,
    pub start_slice: i32,
    pub end_slice: i32,
    pub num_slices: usize,
    pub rp_average_wave: f64,
}

impl Default for FixtureInfo {
    fn default() -> Self {
        Self {
            wave_roi: 0.05,
            spatial_roi: 0.3,
            scale: (0.1, 0.1, 0.002),
            wave_min: 4.8,
            wave_max: 5.5,
            msm_power: 2.0,
            soft_rad: 0.01,
            scale_rad: 0.5,
            start_slice: 0,
            end_slice: 29,
            num_slices: 30,
            rp_average_wave: 5.2,
        }
    }
}

impl InstrumentInfo for FixtureInfo {
    fn wave_roi(&self, _band: &BandKey) -> f64 {
        self.wave_roi
    }
    fn spatial_roi(&self, _band: &BandKey) -> f64 {
        self.spatial_roi
    }
    fn scale(&self, _band: &BandKey) -> (f64, f64, f64) {
        self.scale
    }
    fn wave_min(&self, _band: &BandKey) -> f64 {
        self.wave_min
    }
    fn wave_max(&self, _band: &BandKey) -> f64 {
        self.wave_max
    }
    fn msm_power(&self, _band: &BandKey) -> f64 {
        self.msm_power
    }
    fn soft_rad(&self, _band: &BandKey) -> f64 {
        self.soft_rad
    }
    fn scale_rad(&self, _band: &BandKey) -> f64 {
        self.scale_rad
    }
    fn start_slice(&self, _par1: &str) -> i32 {
        self.start_slice
    }
    fn end_slice(&self, _par1: &str) -> i32 {
        self.end_slice
    }
    fn num_slices(&self, _par1: &str) -> usize {
        self.num_slices
    }
    fn rp_average_wave(&self, _band: &BandKey) -> f64 {
        self.rp_average_wave
    }
    fn psf_alpha_parameters(&self) -> Vec<f64> {
        vec![0.31, -0.08]
    }
    fn psf_beta_parameters(&self) -> Vec<f64> {
        vec![0.2]
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

pub fn empty_table() -> WavelengthTable {
    WavelengthTable {
        wavelength: vec![],
        spatial_roi: vec![],
        wave_roi: vec![],
        weight_power: vec![],
        soft_rad: vec![],
        scale_rad: vec![],
    }
}

/// Reimplementation of the crate's circular mean, kept private to `math`.
/// Textbook mean-of-angles formula, duplicated here only so a test can
/// compute the expected value without reaching into crate internals.
pub fn circular_mean_deg(values_deg: &[f64]) -> f64 {
    let (s, c) = values_deg.iter().fold((0.0_f64, 0.0_f64), |(s, c), &v| {
        let r = v.to_radians();
        (s + r.sin(), c + r.cos())
    });
    s.atan2(c).to_degrees().rem_euclid(360.0)
}
