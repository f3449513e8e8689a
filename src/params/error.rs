// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Errors from resolving a band's cube-building parameters. All of these
/// are configuration problems: they're detected before any exposure data
/// is touched, and abort the whole run rather than just one cube.
#[derive(Error, Debug)]
pub enum ParameterResolutionError {
    #[error("area interpolation was requested but is only valid for single-exposure, alpha-beta cubes")]
    AreaInterpolationRequiresSingleAlphaBeta,

    #[error("area interpolation was requested with {0} input exposures; it only supports exactly one")]
    AreaInterpolationRequiresSingleExposure(usize),

    #[error("area interpolation was requested across {0} bands; it only supports exactly one")]
    AreaInterpolationRequiresSingleBand(usize),

    #[error("alpha-beta coordinates were requested with {0} input exposures; alpha-beta cubes only support exactly one")]
    AlphaBetaRequiresSingleExposure(usize),

    #[error("a non-default spatial scale (scale2) was given but area interpolation requires square spaxels")]
    AreaInterpolationRequiresSquareSpaxels,

    #[error("multi-band output type requires at least one band, but none were supplied")]
    NoBandsSupplied,

    #[error("wavelength range is empty or inverted after resolving band {0}: min={1}, max={2}")]
    EmptyWavelengthRange(String, f64, f64),

    #[error("MIRI PSF weighting was requested for a NIRSPEC band ({0})")]
    MiriPsfOnNirspec(String),
}
