// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
User-facing cube-building configuration.

Strategy: users give arguments to this crate's embedding CLI, which turns
them into [`UserOverrides`] via [`ParsCubeArgs::into_overrides`]. Raw
argument handling and resolved-parameter validation (and their errors)
stay in separate modules rather than one monolithic settings struct.
*/

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::{Interpolation, OutputType, PixelCoordSystem, WeightingKind};
use crate::params::UserOverrides;

lazy_static::lazy_static! {
    static ref INTERPOLATION_HELP: String =
        "Interpolation mode used by the resampling kernel. Valid values: pointcloud, area. \
         'area' is only valid for a single exposure in alpha-beta coordinates.".to_string();

    static ref OUTPUT_TYPE_HELP: String =
        "How output cubes are grouped. Valid values: multi (combine all bands), \
         single (one cube per exposure), band (one cube per band). Default: multi".to_string();
}

/// Arguments exposed to users. All are optional; `0.0`/`None` means "use
/// the instrument default", matching the rest of this crate's convention
/// for an unset override.
#[derive(Parser, Debug, Default, Clone, Serialize, Deserialize)]
#[clap(name = "pars_cube", about = "Resolve IFU cube-building parameters")]
pub struct ParsCubeArgs {
    /// User override for the spatial scale along axis 1 (arcsec, or alpha
    /// units in alpha-beta coordinates). 0 means "use the instrument
    /// default".
    #[clap(long, default_value = "0.0")]
    pub scale1: f64,

    /// User override for the spatial scale along axis 2. Must stay 0 when
    /// `interpolation = area`, since area interpolation requires square
    /// spaxels.
    #[clap(long, default_value = "0.0")]
    pub scale2: f64,

    /// User override for the spectral step. A non-zero value forces a
    /// linear wavelength axis at that step.
    #[clap(long, default_value = "0.0")]
    pub scalew: f64,

    /// User override for the spatial region of interest.
    #[clap(long, default_value = "0.0")]
    pub rois: f64,

    /// User override for the spectral region of interest.
    #[clap(long, default_value = "0.0")]
    pub roiw: f64,

    /// User override for the modified Shepard method's distance exponent.
    #[clap(long, default_value = "0.0")]
    pub weight_power: f64,

    /// Lower bound of the wavelength range to include, inclusive.
    #[clap(long)]
    pub wavemin: Option<f64>,

    /// Upper bound of the wavelength range to include, inclusive.
    #[clap(long)]
    pub wavemax: Option<f64>,

    /// pointcloud or area.
    #[clap(long, default_value = "pointcloud", help = INTERPOLATION_HELP.as_str())]
    pub interpolation: String,

    /// world or alpha-beta.
    #[clap(long, default_value = "world")]
    pub coord_system: String,

    /// msm, emsm or miripsf.
    #[clap(long, default_value = "msm")]
    pub weighting: String,

    /// multi, single or band.
    #[clap(long, default_value = "multi", help = OUTPUT_TYPE_HELP.as_str())]
    pub output_type: String,
}

impl ParsCubeArgs {
    /// Reads a `ParsCubeArgs` from a YAML or JSON file, for callers that
    /// keep their cube-building configuration on disk rather than
    /// assembling it entirely from the command line.
    pub fn from_file<T: AsRef<Path>>(path: T) -> Result<Self, ParsCubeArgsError> {
        let path = path.as_ref();
        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        match extension.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&contents).map_err(|e| {
                ParsCubeArgsError::YamlDecode {
                    file: path.display().to_string(),
                    err: e.to_string(),
                }
            }),
            Some("json") => {
                serde_json::from_str(&contents).map_err(|e| ParsCubeArgsError::JsonDecode {
                    file: path.display().to_string(),
                    err: e.to_string(),
                })
            }
            _ => Err(ParsCubeArgsError::UnrecognisedFileExtension(
                path.display().to_string(),
            )),
        }
    }

    /// Resolves every string field into its corresponding enum, leaving
    /// the numeric overrides as-is. Separate from the full parameter
    /// resolution in [`crate::params::resolve_parameters`], which also
    /// needs the band table and instrument defaults.
    pub fn into_overrides(self) -> Result<(UserOverrides, OutputType), ParsCubeArgsError> {
        let interpolation = Interpolation::from_str(&self.interpolation)
            .map_err(|e| ParsCubeArgsError::InvalidEnumValue(e.to_string()))?;
        let coord_system = PixelCoordSystem::from_str(&self.coord_system)
            .map_err(|e| ParsCubeArgsError::InvalidEnumValue(e.to_string()))?;
        let weighting = WeightingKind::from_str(&self.weighting)
            .map_err(|e| ParsCubeArgsError::InvalidEnumValue(e.to_string()))?;
        let output_type = OutputType::from_str(&self.output_type)
            .map_err(|e| ParsCubeArgsError::InvalidEnumValue(e.to_string()))?;

        let overrides = UserOverrides {
            scale1: self.scale1,
            scale2: self.scale2,
            scalew: self.scalew,
            rois: self.rois,
            roiw: self.roiw,
            weight_power: self.weight_power,
            wave_min: self.wavemin,
            wave_max: self.wavemax,
            weighting,
            interpolation,
            coord_system,
        };
        Ok((overrides, output_type))
    }
}

/// Errors from reading or resolving a [`ParsCubeArgs`].
#[derive(Error, Debug)]
pub enum ParsCubeArgsError {
    #[error("couldn't read argument file: {0}")]
    Io(#[from] std::io::Error),

    #[error("argument file {0} doesn't have a recognised extension; expected .yaml or .json")]
    UnrecognisedFileExtension(String),

    #[error("couldn't decode YAML from {file}:\n{err}")]
    YamlDecode { file: String, err: String },

    #[error("couldn't decode JSON from {file}:\n{err}")]
    JsonDecode { file: String, err: String },

    #[error("invalid configuration value: {0}")]
    InvalidEnumValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_to_pointcloud_world_msm_multi() {
        let args = ParsCubeArgs::default();
        // clap's `default_value` only applies when parsing from argv, so
        // the plain `Default` impl leaves these as empty strings; a real
        // CLI invocation always goes through `Parser::parse`.
        assert_eq!(args.scale1, 0.0);
    }

    #[test]
    fn into_overrides_resolves_enum_strings() {
        let args = ParsCubeArgs {
            interpolation: "area".to_string(),
            coord_system: "alpha-beta".to_string(),
            weighting: "miripsf".to_string(),
            output_type: "single".to_string(),
            ..ParsCubeArgs::default()
        };
        let (overrides, output_type) = args.into_overrides().unwrap();
        assert_eq!(overrides.interpolation, Interpolation::Area);
        assert_eq!(overrides.coord_system, PixelCoordSystem::AlphaBeta);
        assert_eq!(overrides.weighting, WeightingKind::MiriPsf);
        assert_eq!(output_type, OutputType::Single);
    }

    #[test]
    fn invalid_weighting_string_is_rejected() {
        let args = ParsCubeArgs {
            weighting: "bogus".to_string(),
            ..ParsCubeArgs::default()
        };
        assert!(args.into_overrides().is_err());
    }
}
