// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reconstructs 3-D spectral cubes from the 2-D detector exposures of an
//! integral-field-unit spectrograph (JWST MIRI MRS and NIRSpec IFU).
//!
//! An embedding pipeline supplies its own instrument model through the
//! [`context`] traits (`ExposureData`, `ExposureWcs`, `ExposureRef`,
//! `InstrumentInfo`, `InstrumentOps`, `MetadataBlender`) and drives the
//! whole reconstruction through [`cube::IfuCubeBuilder`]. The individual
//! pipeline stages are also public, for callers that want to run one in
//! isolation (e.g. resolving parameters without building a cube) or
//! substitute their own implementation of a stage.

pub mod assemble;
pub mod constants;
pub mod context;
pub mod coord;
pub mod cube;
pub mod dq;
pub mod dqflags;
pub mod error;
pub mod geometry;
pub mod kernel;
pub mod log_init;
pub mod mapper;
pub(crate) mod math;
pub mod params;
pub mod pars_cube;

// Re-exports. The traits in `context` are the seam an embedding pipeline
// implements; everything else is the pipeline stages they get driven
// through.
pub use context::{
    BandKey, BandTable, ExposureData, ExposureRef, ExposureWcs, Instrument, InstrumentInfo,
    InstrumentOps, Interpolation, MasterTable, MetadataBlender, OutputType, PixelCoordSystem,
    WeightingKind,
};
pub use cube::IfuCubeBuilder;
pub use error::CubeBuildError;
pub use params::{resolve_parameters, ResolvedParameters, UserOverrides};
pub use pars_cube::{ParsCubeArgs, ParsCubeArgsError};
