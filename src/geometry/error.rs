// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("combined footprint has zero spatial extent along axis {0}; no exposures overlapped")]
    DegenerateFootprint(&'static str),

    #[error("wavelength table has fewer than two entries; cannot build a non-linear wavelength axis")]
    WavelengthTableTooShort,

    #[error("resolved cube would need {0} wavelength planes, exceeding the sanity limit of {1}")]
    TooManyWavelengthPlanes(usize, usize),

    #[error("resolved cube would need {0}x{1} spaxels, exceeding the sanity limit of {2} per axis")]
    TooManySpaxels(usize, usize, usize),
}
