// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Parameter resolution: turning user overrides and per-band instrument
defaults into one concrete set of resampling parameters for a cube.
 */

pub mod error;

use crate::constants::{DITHER_ROI_SCALE, MIN_FILES_FOR_UNSCALED_ROI};
use crate::context::{
    BandKey, Instrument, InstrumentInfo, Interpolation, OutputType, PixelCoordSystem,
    WavelengthTable, WeightingKind,
};
use error::ParameterResolutionError;

/// User-supplied overrides of the instrument's default resampling
/// parameters. A value of `0.0` (or `None` for the wavelength bounds)
/// means "use the instrument default", matching the CLI's convention of
/// zero meaning unset.
#[derive(Clone, Debug)]
pub struct UserOverrides {
    pub scale1: f64,
    pub scale2: f64,
    pub scalew: f64,
    pub rois: f64,
    pub roiw: f64,
    pub weight_power: f64,
    pub wave_min: Option<f64>,
    pub wave_max: Option<f64>,
    pub weighting: WeightingKind,
    pub interpolation: Interpolation,
    pub coord_system: PixelCoordSystem,
}

impl Default for UserOverrides {
    fn default() -> Self {
        Self {
            scale1: 0.0,
            scale2: 0.0,
            scalew: 0.0,
            rois: 0.0,
            roiw: 0.0,
            weight_power: 0.0,
            wave_min: None,
            wave_max: None,
            weighting: WeightingKind::Msm,
            interpolation: Interpolation::PointCloud,
            coord_system: PixelCoordSystem::World,
        }
    }
}

/// The fully-resolved set of parameters a single cube is built with.
#[derive(Clone, Debug)]
pub struct ResolvedParameters {
    pub spatial_scale: f64,
    /// `None` when the wavelength axis is non-linear and sampling instead
    /// follows [`Self::wavelength_table`].
    pub spectral_scale: Option<f64>,
    pub linear_wavelength: bool,
    pub rois: f64,
    pub roiw: Option<f64>,
    pub weight_power: Option<f64>,
    pub soft_rad: Option<f64>,
    pub scale_rad: Option<f64>,
    pub wave_min: f64,
    pub wave_max: f64,
    pub wavelength_table: Option<WavelengthTable>,
    pub weighting: WeightingKind,
    pub interpolation: Interpolation,
    pub coord_system: PixelCoordSystem,
}

fn validate_combination(
    overrides: &UserOverrides,
    num_bands: usize,
    num_files: usize,
) -> Result<(), ParameterResolutionError> {
    if num_bands == 0 {
        return Err(ParameterResolutionError::NoBandsSupplied);
    }
    if overrides.interpolation == Interpolation::Area {
        if overrides.coord_system != PixelCoordSystem::AlphaBeta {
            return Err(ParameterResolutionError::AreaInterpolationRequiresSingleAlphaBeta);
        }
        if num_files > 1 {
            return Err(ParameterResolutionError::AreaInterpolationRequiresSingleExposure(
                num_files,
            ));
        }
        if num_bands > 1 {
            return Err(ParameterResolutionError::AreaInterpolationRequiresSingleBand(
                num_bands,
            ));
        }
        if overrides.scale2 != 0.0 {
            return Err(ParameterResolutionError::AreaInterpolationRequiresSquareSpaxels);
        }
    }
    if overrides.coord_system == PixelCoordSystem::AlphaBeta && num_files > 1 {
        return Err(ParameterResolutionError::AlphaBetaRequiresSingleExposure(
            num_files,
        ));
    }
    Ok(())
}

/// Resolves the parameters for a cube covering `bands`. When `bands` has
/// more than one entry (building a combined multi-band cube), per-band
/// instrument defaults are merged: spatial/wavelength ROIs take the
/// smallest value seen, weight powers the largest, matching the
/// conservative-resampling convention the rest of the pipeline assumes.
pub fn resolve_parameters(
    bands: &[BandKey],
    instrument: Instrument,
    info: &dyn InstrumentInfo,
    overrides: &UserOverrides,
    num_files: usize,
    output_type: OutputType,
) -> Result<ResolvedParameters, ParameterResolutionError> {
    validate_combination(overrides, bands.len(), num_files)?;

    if overrides.weighting == WeightingKind::MiriPsf && instrument == Instrument::Nirspec {
        return Err(ParameterResolutionError::MiriPsfOnNirspec(
            bands[0].to_string(),
        ));
    }

    let spatial_scale = if overrides.scale1 != 0.0 {
        overrides.scale1
    } else {
        min_over_bands(bands, |b| info.scale(b).0)
    };

    let nominal_spectral_scales: Vec<f64> = bands.iter().map(|b| info.scale(b).2).collect();
    let uniform_spectral_scale = nominal_spectral_scales
        .windows(2)
        .all(|w| (w[0] - w[1]).abs() < 1e-9);

    let (linear_wavelength, spectral_scale) = if overrides.scalew != 0.0 {
        (true, Some(overrides.scalew))
    } else if uniform_spectral_scale {
        (true, nominal_spectral_scales.first().copied())
    } else {
        (false, None)
    };

    let rois_default = if overrides.rois != 0.0 {
        overrides.rois
    } else {
        min_over_bands(bands, |b| info.spatial_roi(b))
    };
    let rois = if overrides.rois == 0.0
        && (num_files < MIN_FILES_FOR_UNSCALED_ROI || output_type == OutputType::Single)
    {
        rois_default * DITHER_ROI_SCALE
    } else {
        rois_default
    };

    let roiw = if overrides.roiw != 0.0 {
        Some(overrides.roiw)
    } else if linear_wavelength {
        Some(min_over_bands(bands, |b| info.wave_roi(b)))
    } else {
        None
    };

    let weight_power = if overrides.weight_power != 0.0 {
        Some(overrides.weight_power)
    } else if linear_wavelength {
        Some(max_over_bands(bands, |b| info.msm_power(b)))
    } else {
        None
    };

    let soft_rad = if linear_wavelength {
        Some(min_over_bands(bands, |b| info.soft_rad(b)))
    } else {
        None
    };
    let scale_rad = if linear_wavelength {
        Some(min_over_bands(bands, |b| info.scale_rad(b)))
    } else {
        None
    };

    let wave_min = overrides
        .wave_min
        .unwrap_or_else(|| min_over_bands(bands, |b| info.wave_min(b)));
    let wave_max = overrides
        .wave_max
        .unwrap_or_else(|| max_over_bands(bands, |b| info.wave_max(b)));
    if !(wave_max > wave_min) {
        return Err(ParameterResolutionError::EmptyWavelengthRange(
            bands[0].to_string(),
            wave_min,
            wave_max,
        ));
    }

    let wavelength_table = if linear_wavelength {
        None
    } else {
        let raw = match instrument {
            Instrument::Miri => info.multichannel_table(overrides.weighting),
            Instrument::Nirspec => select_nirspec_table(info, bands),
        };
        let mut sliced = raw.sliced(wave_min, wave_max);
        if overrides.rois == 0.0
            && (num_files < MIN_FILES_FOR_UNSCALED_ROI || output_type == OutputType::Single)
        {
            for roi in sliced.spatial_roi.iter_mut() {
                *roi *= DITHER_ROI_SCALE;
            }
        }
        Some(sliced)
    };

    Ok(ResolvedParameters {
        spatial_scale,
        spectral_scale,
        linear_wavelength,
        rois,
        roiw,
        weight_power,
        soft_rad,
        scale_rad,
        wave_min,
        wave_max,
        wavelength_table,
        weighting: overrides.weighting,
        interpolation: overrides.interpolation,
        coord_system: overrides.coord_system,
    })
}

fn min_over_bands(bands: &[BandKey], f: impl Fn(&BandKey) -> f64) -> f64 {
    bands.iter().map(f).fold(f64::INFINITY, f64::min)
}

fn max_over_bands(bands: &[BandKey], f: impl Fn(&BandKey) -> f64) -> f64 {
    bands.iter().map(f).fold(f64::NEG_INFINITY, f64::max)
}

/// NIRSPEC gratings fall into three resolution classes, each with its own
/// table of per-wavelength defaults; the table used is whichever class
/// the highest-resolution band present requires.
fn select_nirspec_table(info: &dyn InstrumentInfo, bands: &[BandKey]) -> WavelengthTable {
    const MEDIUM: [&str; 3] = ["g140m", "g235m", "g395m"];
    const HIGH: [&str; 3] = ["g140h", "g235h", "g395h"];
    let uses = |set: &[&str]| {
        bands
            .iter()
            .any(|b| set.contains(&b.par1.to_lowercase().as_str()))
    };
    if uses(&HIGH) {
        info.high_resolution_table()
    } else if uses(&MEDIUM) {
        info.medium_resolution_table()
    } else {
        info.prism_table()
    }
}
