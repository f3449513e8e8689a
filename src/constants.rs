// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision. This crate should do as many
calculations as possible in double precision before converting to a lower
precision, if it is ever required.
 */

pub use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Arcseconds per radian. Used when converting tangent-plane projections
/// between radians and the arcsec convention the rest of the crate uses.
pub const ARCSEC_PER_RADIAN: f64 = 206_264.806_247_096_4;

/// A spaxel must have at least this fraction of its area covered by an
/// exposure's field of view before the FOV DQ pass considers it touched at
/// all.
pub const DQ_OVERLAP_TOLERANCE: f64 = 0.05;

/// Coverage fraction above which a spaxel is considered fully (rather than
/// partially) covered by an exposure's field of view.
pub const DQ_FULL_OVERLAP_THRESHOLD: f64 = 0.95;

/// Distance (same units as the corner coordinates) below which four corner
/// points are treated as collinear, i.e. the FOV footprint on a wavelength
/// plane degenerates to a line rather than a quadrilateral.
pub const LINE_DISTANCE_TOLERANCE: f64 = 1e-4;

/// Multiplier applied to the default spatial region-of-interest radius to
/// compensate for sparse dither patterns.
pub const DITHER_ROI_SCALE: f64 = 1.5;

/// Below this many input files, the dither compensation in
/// [`DITHER_ROI_SCALE`] is applied unconditionally.
pub const MIN_FILES_FOR_UNSCALED_ROI: usize = 4;

/// NIRSPEC IFU exposures always expose exactly this many slices.
pub const NIRSPEC_NUM_SLICES: usize = 30;

/// Tolerance used when comparing a derived footprint's spatial extent to
/// zero, to detect a band with no valid IFU slice data.
pub const FOOTPRINT_EXTENT_TOLERANCE: f64 = 1e-5;

/// The default `CRPIX` used for alpha-beta (single-exposure, instrument
/// native) cubes: the first alpha-beta sample always sits at the edge of
/// pixel 1, not its centre.
pub const ALPHA_BETA_CRPIX1: f64 = 0.5;
