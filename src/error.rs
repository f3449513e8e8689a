// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all cube-build-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use crate::geometry::error::GeometryError;
use crate::mapper::error::MapperError;
use crate::params::error::ParameterResolutionError;

/// The *only* publicly visible error from this crate.
#[derive(Error, Debug)]
pub enum CubeBuildError {
    /// A configuration error: an invalid combination of interpolation,
    /// coordinate system, weighting or band count. Detected before any
    /// exposure is opened.
    #[error("invalid cube-build configuration: {0}")]
    Parameters(#[from] ParameterResolutionError),

    /// A fatal geometry error: a degenerate or oversized footprint.
    #[error("failed to build cube geometry: {0}")]
    Geometry(#[from] GeometryError),

    /// A fatal per-exposure error: missing WCS transform, shape mismatch
    /// between a flux and DQ plane, or a failure opening the exposure.
    #[error("failed to map exposure: {0}")]
    Mapper(#[from] MapperError),

    /// A generic error that can't be clarified further, e.g. a failure
    /// surfaced by a caller-supplied trait implementation.
    #[error("{0}")]
    Generic(String),
}
