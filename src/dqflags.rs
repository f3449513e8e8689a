// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Data-quality bit flags.

These mirror the handful of bits the cube-building pipeline actually cares
about. Input exposures may carry many more flag bits than this; everything
this crate doesn't recognise is passed through unexamined.
 */

/// Pixel must not be used for science (bit 0).
pub const DO_NOT_USE: u32 = 1 << 0;

/// Pixel lies outside the part of the detector used for science, e.g. a
/// region between IFU slices (bit 17).
pub const NON_SCIENCE: u32 = 1 << 17;

/// Returns true if `flags` carries a bit that should exclude a sample from
/// contributing to the cube.
pub fn is_unusable(flags: u32) -> bool {
    flags & (DO_NOT_USE | NON_SCIENCE) != 0
}
