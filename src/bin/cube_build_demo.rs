// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Drives [`ifu_cube_build::IfuCubeBuilder`] against a synthetic single-exposure
fixture and prints a summary of the resulting cube. This is a smoke-test
driver for the library, not the on-disk pipeline step an embedding caller
would write; there is no FITS I/O here, only in-memory fakes of the traits
in [`ifu_cube_build::context`].
*/

use std::sync::Arc;

use clap::Parser;
use log::info;
use ndarray::{Array2, ArrayView2, ArrayViewMut2};

use ifu_cube_build::{
    BandKey, ExposureData, ExposureRef, ExposureWcs, IfuCubeBuilder, Instrument, InstrumentInfo,
    InstrumentOps, OutputType, UserOverrides,
};

struct SyntheticWcs {
    crval1: f64,
    crval2: f64,
    cdelt: f64,
    nx: f64,
}

impl ExposureWcs for SyntheticWcs {
    fn detector_to_world(&self, x: f64, y: f64) -> (f64, f64, f64) {
        let xi = (x - self.nx / 2.0) * self.cdelt;
        let eta = (y - self.nx / 2.0) * self.cdelt;
        let (ra, dec) = ifu_cube_build::coord::tangent_to_radec(self.crval1, self.crval2, xi, eta);
        (ra, dec, 5.0 + 0.002 * y)
    }

    fn detector_to_alpha_beta(&self, x: f64, y: f64) -> (f64, f64, f64) {
        let (_, _, wave) = self.detector_to_world(x, y);
        (x - self.nx / 2.0, (y / 4.0).floor(), wave)
    }

    fn world_to_v2v3(&self, ra: f64, dec: f64, _wave: f64) -> (f64, f64) {
        ifu_cube_build::coord::radec_to_tangent(self.crval1, self.crval2, ra, dec)
    }

    fn v2v3_to_alpha_beta(&self, v2: f64, v3: f64, _wave: f64) -> (f64, f64) {
        (v2 / self.cdelt, v3 / self.cdelt)
    }

    fn slice_number(&self, _x: f64, y: f64) -> Option<i32> {
        Some((y / 4.0).floor() as i32)
    }
}

struct SyntheticExposure {
    flux: Array2<f32>,
    dq: Array2<u32>,
    wcs: SyntheticWcs,
}

impl ExposureData for SyntheticExposure {
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
    fn background_polynomials(&self) -> &[ifu_cube_build::context::BackgroundPolynomial] {
        &[]
    }
    fn exposure_id(&self) -> &str {
        "demo-exposure"
    }
}

struct SyntheticExposureRef {
    nx: usize,
}

impl ExposureRef for SyntheticExposureRef {
    fn open(&self) -> Result<Box<dyn ExposureData>, ifu_cube_build::mapper::error::MapperError> {
        let flux = Array2::from_elem((self.nx, self.nx), 12.5f32);
        let dq = Array2::zeros((self.nx, self.nx));
        Ok(Box::new(SyntheticExposure {
            flux,
            dq,
            wcs: SyntheticWcs {
                crval1: 10.684,
                crval2: 41.269,
                cdelt: 0.05,
                nx: self.nx as f64,
            },
        }))
    }

    fn display_name(&self) -> &str {
        "demo-exposure"
    }
}

struct DemoOps;
impl InstrumentOps for DemoOps {
    fn slice_map(&self, exposure: &dyn ExposureData, _band: &BandKey, _info: &dyn InstrumentInfo) -> Array2<i32> {
        Array2::zeros(exposure.flux().dim())
    }

    fn footprint(
        &self,
        exposure: &dyn ExposureData,
        _band: &BandKey,
        _info: &dyn InstrumentInfo,
        _coord_system: ifu_cube_build::PixelCoordSystem,
    ) -> ifu_cube_build::context::Footprint {
        let (rows, cols) = exposure.flux().dim();
        let mut footprint = None;
        for &(x, y) in &[(0.0, 0.0), (cols as f64 - 1.0, rows as f64 - 1.0)] {
            let (ra, dec, wave) = exposure.wcs().detector_to_world(x, y);
            let this = ifu_cube_build::context::Footprint {
                coord1_min: ra,
                coord1_max: ra,
                coord2_min: dec,
                coord2_max: dec,
                wave_min: wave,
                wave_max: wave,
            };
            footprint = Some(match footprint {
                Some(existing) => ifu_cube_build::context::Footprint::union(&existing, &this),
                None => this,
            });
        }
        footprint.unwrap()
    }

    fn dq_overlap_mode(&self) -> ifu_cube_build::context::OverlapMode {
        ifu_cube_build::context::OverlapMode::Polygon
    }
}

struct DemoInfo;
impl InstrumentInfo for DemoInfo {
    fn wave_roi(&self, _band: &BandKey) -> f64 {
        0.05
    }
    fn spatial_roi(&self, _band: &BandKey) -> f64 {
        0.2
    }
    fn scale(&self, _band: &BandKey) -> (f64, f64, f64) {
        (0.13, 0.13, 0.002)
    }
    fn wave_min(&self, _band: &BandKey) -> f64 {
        4.9
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
        1
    }
    fn end_slice(&self, _par1: &str) -> i32 {
        5
    }
    fn num_slices(&self, _par1: &str) -> usize {
        5
    }
    fn rp_average_wave(&self, _band: &BandKey) -> f64 {
        5.2
    }
    fn psf_alpha_parameters(&self) -> Vec<f64> {
        vec![0.31, -0.08]
    }
    fn psf_beta_parameters(&self) -> Vec<f64> {
        vec![0.2]
    }
    fn multichannel_table(&self, _weighting: ifu_cube_build::WeightingKind) -> ifu_cube_build::context::WavelengthTable {
        empty_table()
    }
    fn prism_table(&self) -> ifu_cube_build::context::WavelengthTable {
        empty_table()
    }
    fn medium_resolution_table(&self) -> ifu_cube_build::context::WavelengthTable {
        empty_table()
    }
    fn high_resolution_table(&self) -> ifu_cube_build::context::WavelengthTable {
        empty_table()
    }
}

fn empty_table() -> ifu_cube_build::context::WavelengthTable {
    ifu_cube_build::context::WavelengthTable {
        wavelength: vec![],
        spatial_roi: vec![],
        wave_roi: vec![],
        weight_power: vec![],
        soft_rad: vec![],
        scale_rad: vec![],
    }
}

#[derive(Parser, Debug)]
#[clap(name = "cube_build_demo", about = "Build a synthetic IFU cube and print a summary")]
struct Opt {
    /// 0 = info, 1 = debug, 2+ = trace.
    #[clap(short, long, default_value = "0")]
    verbose: u8,

    /// Detector side length, in pixels, of the synthetic exposure.
    #[clap(long, default_value = "40")]
    nx: usize,
}

fn main() {
    let opt = Opt::parse();
    if let Err(e) = ifu_cube_build::log_init::init_logging(opt.verbose) {
        eprintln!("failed to initialise logging: {e}");
    }

    let ops = DemoOps;
    let info = DemoInfo;
    let builder = IfuCubeBuilder::new(Instrument::Miri, &ops, &info, None);
    let band = BandKey::new("1", "SHORT");
    let exposures: Vec<Arc<dyn ExposureRef>> = vec![Arc::new(SyntheticExposureRef { nx: opt.nx })];
    let overrides = UserOverrides::default();

    match builder.build_band_cube(&band, &exposures, &overrides, OutputType::Multi) {
        Ok(product) => {
            let touched = product.data.iter().filter(|&&f| f != 0.0).count();
            info!(
                "built cube {}x{}x{}: {} of {} voxels touched",
                product.metadata.naxis1,
                product.metadata.naxis2,
                product.metadata.naxis3,
                touched,
                product.data.len()
            );
        }
        Err(e) => {
            eprintln!("failed to build cube: {e}");
            std::process::exit(1);
        }
    }
}
