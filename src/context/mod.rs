// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Types shared across the cube-building pipeline: the external interfaces an
embedding pipeline implements to hand exposures and instrument knowledge to
this crate, and the small value types that flow between components.

File I/O, WCS model fitting, and reference-file loading are all out of
scope for this crate; it only ever sees them through the traits below.
 */

use std::str::FromStr;

use ndarray::{ArrayView2, ArrayViewMut2};
use serde::{Deserialize, Serialize};

use crate::mapper::error::MapperError;

/// Returned by the `FromStr` impls of the small enum types below when a
/// CLI or config value doesn't match any recognised variant.
#[derive(Clone, Debug, thiserror::Error)]
#[error("'{given}' is not a recognised {what} (expected one of: {expected})")]
pub struct UnrecognisedVariant {
    what: &'static str,
    given: String,
    expected: &'static str,
}

/// Identifies a band: for MIRI, a (channel, sub-band) pair such as
/// `("1", "SHORT")`; for NIRSPEC, a (grating, filter) pair such as
/// `("g140m", "f070lp")`. Exposures are grouped into bands before any
/// cube geometry is built.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BandKey {
    pub par1: String,
    pub par2: String,
}

impl BandKey {
    pub fn new(par1: impl Into<String>, par2: impl Into<String>) -> Self {
        Self {
            par1: par1.into(),
            par2: par2.into(),
        }
    }
}

impl std::fmt::Display for BandKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.par1, self.par2)
    }
}

/// The two supported spectrographs. Each has its own detector geometry,
/// slice layout and resampling defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instrument {
    Miri,
    Nirspec,
}

/// The coordinate system a cube's spatial axes are built in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PixelCoordSystem {
    /// RA/Dec tangent-plane projection; used for multi-exposure, sky-based
    /// cubes.
    World,
    /// Instrument-native alpha/beta plane; used for single-exposure cubes
    /// and diagnostics.
    AlphaBeta,
}

impl FromStr for PixelCoordSystem {
    type Err = UnrecognisedVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "world" => Ok(Self::World),
            "alpha-beta" | "alpha_beta" | "alphabeta" => Ok(Self::AlphaBeta),
            given => Err(UnrecognisedVariant {
                what: "coordinate system",
                given: given.to_owned(),
                expected: "world, alpha-beta",
            }),
        }
    }
}

/// How samples falling inside a spaxel are combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    PointCloud,
    Area,
}

impl FromStr for Interpolation {
    type Err = UnrecognisedVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pointcloud" | "point-cloud" | "point_cloud" => Ok(Self::PointCloud),
            "area" => Ok(Self::Area),
            given => Err(UnrecognisedVariant {
                what: "interpolation mode",
                given: given.to_owned(),
                expected: "pointcloud, area",
            }),
        }
    }
}

/// How the output cube(s) are grouped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    /// One cube per band.
    Band,
    /// One cube per instrument, covering every supplied band.
    Multi,
    /// One cube per input exposure (implies [`PixelCoordSystem::AlphaBeta`]).
    Single,
}

impl FromStr for OutputType {
    type Err = UnrecognisedVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "band" => Ok(Self::Band),
            "multi" => Ok(Self::Multi),
            "single" => Ok(Self::Single),
            given => Err(UnrecognisedVariant {
                what: "output type",
                given: given.to_owned(),
                expected: "multi, single, band",
            }),
        }
    }
}

/// Which resampling kernel law is used to turn distance into weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightingKind {
    /// Modified Shepard Method: inverse-distance weighting with a
    /// configurable power and a soft floor radius.
    Msm,
    /// Exponential variant of MSM: a Gaussian falloff with a configurable
    /// scale radius.
    Emsm,
    /// Analytic MIRI point-spread/line-spread function weighting.
    MiriPsf,
}

impl FromStr for WeightingKind {
    type Err = UnrecognisedVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "msm" => Ok(Self::Msm),
            "emsm" => Ok(Self::Emsm),
            "miripsf" => Ok(Self::MiriPsf),
            given => Err(UnrecognisedVariant {
                what: "weighting law",
                given: given.to_owned(),
                expected: "msm, emsm, miripsf",
            }),
        }
    }
}

/// A per-channel background polynomial, subtracted from a detector frame
/// in instrument-native (alpha, beta) units before mapping.
#[derive(Clone, Debug)]
pub struct BackgroundPolynomial {
    pub channel: String,
    /// Coefficients in increasing order of degree, evaluated against beta.
    pub coeffs: Vec<f64>,
}

impl BackgroundPolynomial {
    pub fn evaluate(&self, beta: f64) -> f64 {
        self.coeffs
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * beta + c)
    }
}

/// Per-exposure world-coordinate transforms. An embedding pipeline fits
/// these once per exposure (usually from a GWCS-style model); this crate
/// only ever evaluates them at detector pixel coordinates.
pub trait ExposureWcs {
    /// Detector (x, y) to (RA, Dec, wavelength). Returns `NaN` components
    /// if the pixel has no valid solution (e.g. lies off a slice).
    fn detector_to_world(&self, x: f64, y: f64) -> (f64, f64, f64);

    /// Detector (x, y) to instrument-native (alpha, beta, wavelength).
    fn detector_to_alpha_beta(&self, x: f64, y: f64) -> (f64, f64, f64);

    /// Sky position and wavelength to the telescope's V2/V3 boresight
    /// frame; an intermediate step some instrument models require to get
    /// from world coordinates to alpha/beta.
    fn world_to_v2v3(&self, ra: f64, dec: f64, wave: f64) -> (f64, f64);

    /// V2/V3 and wavelength to instrument-native (alpha, beta).
    fn v2v3_to_alpha_beta(&self, v2: f64, v3: f64, wave: f64) -> (f64, f64);

    /// The detector slice number a pixel belongs to, or `None` if it does
    /// not belong to any IFU slice.
    fn slice_number(&self, x: f64, y: f64) -> Option<i32>;
}

/// A single exposure: its science and data-quality planes plus the WCS
/// that maps detector pixels to sky and instrument-native coordinates.
pub trait ExposureData {
    fn flux(&self) -> ArrayView2<f32>;
    fn flux_mut(&mut self) -> ArrayViewMut2<f32>;
    fn dq(&self) -> ArrayView2<u32>;
    fn wcs(&self) -> &dyn ExposureWcs;
    fn background_polynomials(&self) -> &[BackgroundPolynomial];
    fn exposure_id(&self) -> &str;
}

/// A lazily-openable reference to an exposure, e.g. a path to a file on
/// disk. The master table holds these rather than open exposures so that
/// only one exposure's science data is resident at a time while mapping a
/// band.
pub trait ExposureRef: Send + Sync {
    fn open(&self) -> Result<Box<dyn ExposureData>, MapperError>;
    fn display_name(&self) -> &str;
}

/// Opens `exposure_ref`, runs `f` against the live handle, and closes it
/// again on every exit path (including early return via `?`).
pub fn with_exposure<R>(
    exposure_ref: &dyn ExposureRef,
    f: impl FnOnce(&mut dyn ExposureData) -> Result<R, MapperError>,
) -> Result<R, MapperError> {
    let mut handle = exposure_ref.open()?;
    f(handle.as_mut())
}

/// Groups an instrument's exposures by band, in the order they were added.
/// An `IndexMap` is used (as opposed to a `HashMap`) because the order
/// bands are discovered in is also the order their cubes are built in,
/// which downstream consumers rely on for deterministic output.
pub type BandTable = indexmap::IndexMap<BandKey, Vec<std::sync::Arc<dyn ExposureRef>>>;

/// All exposures destined for a single run of the cube builder, grouped
/// first by instrument and then by band.
pub struct MasterTable {
    pub instrument: Instrument,
    pub bands: BandTable,
}

impl MasterTable {
    pub fn new(instrument: Instrument) -> Self {
        Self {
            instrument,
            bands: indexmap::IndexMap::new(),
        }
    }

    pub fn insert(&mut self, band: BandKey, exposure: std::sync::Arc<dyn ExposureRef>) {
        self.bands.entry(band).or_insert_with(Vec::new).push(exposure);
    }

    pub fn num_files(&self) -> usize {
        self.bands.values().map(|v| v.len()).sum()
    }
}

/// The spatial/spectral extent an exposure's footprint covers within a
/// single band, expressed in whatever coordinate system the cube is being
/// built in (tangent-plane arcsec offsets, or native alpha/beta).
#[derive(Clone, Copy, Debug)]
pub struct Footprint {
    pub coord1_min: f64,
    pub coord1_max: f64,
    pub coord2_min: f64,
    pub coord2_max: f64,
    pub wave_min: f64,
    pub wave_max: f64,
}

impl Footprint {
    pub fn union(&self, other: &Footprint) -> Footprint {
        Footprint {
            coord1_min: self.coord1_min.min(other.coord1_min),
            coord1_max: self.coord1_max.max(other.coord1_max),
            coord2_min: self.coord2_min.min(other.coord2_min),
            coord2_max: self.coord2_max.max(other.coord2_max),
            wave_min: self.wave_min.min(other.wave_min),
            wave_max: self.wave_max.max(other.wave_max),
        }
    }
}

/// How an instrument's detector footprint should be rasterized by the FOV
/// DQ engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlapMode {
    /// Trace the four corners as a quadrilateral and compute area overlap.
    Polygon,
    /// The footprint degenerates to a line (e.g. a single NIRSPEC slice at
    /// some wavelengths); rasterize it with Bresenham instead.
    Line,
}

/// A table of per-wavelength resampling parameters, used wherever a
/// band's wavelength sampling is too non-uniform for a single scalar ROI
/// or weight power to apply across its whole range.
#[derive(Clone, Debug)]
pub struct WavelengthTable {
    pub wavelength: Vec<f64>,
    pub spatial_roi: Vec<f64>,
    pub wave_roi: Vec<f64>,
    pub weight_power: Vec<f64>,
    pub soft_rad: Vec<f64>,
    pub scale_rad: Vec<f64>,
}

impl WavelengthTable {
    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    /// Returns the sub-table covering `[wave_min, wave_max]`, padded by one
    /// entry on either side whenever the nearest table point lies strictly
    /// inside the requested range.
    pub fn sliced(&self, wave_min: f64, wave_max: f64) -> WavelengthTable {
        let imin0 = crate::math::nearest_index(&self.wavelength, wave_min);
        let imax0 = crate::math::nearest_index(&self.wavelength, wave_max);
        let mut imin = imin0;
        let mut imax = imax0;
        if imin > 1 && self.wavelength[imin] > wave_min {
            imin -= 1;
        }
        if imax + 1 < self.wavelength.len() && wave_max > self.wavelength[imax] {
            imax += 1;
        }
        WavelengthTable {
            wavelength: self.wavelength[imin..=imax].to_vec(),
            spatial_roi: self.spatial_roi[imin..=imax].to_vec(),
            wave_roi: self.wave_roi[imin..=imax].to_vec(),
            weight_power: self.weight_power[imin..=imax].to_vec(),
            soft_rad: self.soft_rad[imin..=imax].to_vec(),
            scale_rad: self.scale_rad[imin..=imax].to_vec(),
        }
    }
}

/// Per-band, per-instrument knowledge that an embedding pipeline supplies:
/// default resampling parameters, slice geometry, and PSF/LSF tables. This
/// crate never derives any of these from first principles; it only reads
/// them through this trait.
pub trait InstrumentInfo {
    fn wave_roi(&self, band: &BandKey) -> f64;
    fn spatial_roi(&self, band: &BandKey) -> f64;
    /// `(alpha/x scale, beta/y scale, wavelength scale)`, all in the
    /// relevant coordinate system's native units.
    fn scale(&self, band: &BandKey) -> (f64, f64, f64);
    fn wave_min(&self, band: &BandKey) -> f64;
    fn wave_max(&self, band: &BandKey) -> f64;
    fn msm_power(&self, band: &BandKey) -> f64;
    fn soft_rad(&self, band: &BandKey) -> f64;
    fn scale_rad(&self, band: &BandKey) -> f64;
    fn start_slice(&self, par1: &str) -> i32;
    fn end_slice(&self, par1: &str) -> i32;
    fn num_slices(&self, par1: &str) -> usize;
    fn rp_average_wave(&self, band: &BandKey) -> f64;
    fn psf_alpha_parameters(&self) -> Vec<f64>;
    fn psf_beta_parameters(&self) -> Vec<f64>;
    fn multichannel_table(&self, weighting: WeightingKind) -> WavelengthTable;
    fn prism_table(&self) -> WavelengthTable;
    fn medium_resolution_table(&self) -> WavelengthTable;
    fn high_resolution_table(&self) -> WavelengthTable;
}

/// Instrument-specific footprint and slice-map operations. The mapper and
/// FOV DQ engine call through this trait instead of branching on
/// `Instrument` themselves.
pub trait InstrumentOps {
    /// The per-pixel slice number for `exposure`'s detector frame, or a
    /// negative sentinel for pixels that don't belong to any slice.
    fn slice_map(&self, exposure: &dyn ExposureData, band: &BandKey, info: &dyn InstrumentInfo) -> ndarray::Array2<i32>;

    /// The four-corner (or degenerate line) footprint of `exposure` within
    /// `band`, in `coord_system` units, for one wavelength plane.
    fn footprint(
        &self,
        exposure: &dyn ExposureData,
        band: &BandKey,
        info: &dyn InstrumentInfo,
        coord_system: PixelCoordSystem,
    ) -> Footprint;

    fn dq_overlap_mode(&self) -> OverlapMode;
}

/// Blends FITS-style metadata (observation dates, exposure times,
/// instrument configuration keywords) across the exposures contributing
/// to a cube. This crate treats the result as an opaque bag of strings to
/// be attached to the final cube product.
pub trait MetadataBlender {
    fn blend(&self, exposures: &[&dyn ExposureData]) -> BlendedMetadata;
}

#[derive(Clone, Debug, Default)]
pub struct BlendedMetadata {
    pub keywords: std::collections::BTreeMap<String, String>,
}
