// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Errors mapping a single exposure onto a cube's coordinate system.
/// These are per-exposure: the caller logs them and carries on building
/// the cube from whatever exposures remain.
#[derive(Error, Debug)]
pub enum MapperError {
    #[error("failed to open exposure {0}: {1}")]
    OpenFailed(String, String),

    #[error("exposure {0} flux and data-quality planes have mismatched shapes: {1:?} vs {2:?}")]
    ShapeMismatch(String, (usize, usize), (usize, usize)),

    #[error("{0}")]
    Other(String),
}
