// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The FOV data-quality engine: decides, for every spaxel in a cube, whether
an exposure's field of view actually covered it.

Works in two passes. First, [`compute_initial_dq`] walks every wavelength
plane and marks each spaxel as fully, partially, or not covered by the
instrument's footprint on that plane, using the polygon path for MIRI and
the degenerate line (Bresenham) path for NIRSPEC. After the resampling
kernel has accumulated every exposure, [`refine::finalize`] reconciles
those initial marks against the actual accumulated weight to produce the
cube's final DQ plane.
 */

pub mod bresenham;
pub mod polygon;
pub mod refine;

use ndarray::Array1;

use crate::constants::{DQ_FULL_OVERLAP_THRESHOLD, DQ_OVERLAP_TOLERANCE, NIRSPEC_NUM_SLICES};
use crate::context::{BandKey, Instrument, InstrumentInfo};
use crate::dqflags;
use crate::geometry::CubeGeometry;
use crate::mapper::MappedSamples;

/// A spaxel's footprint is considered touched at all once coverage passes
/// this threshold, `overlap_partial` above it; full coverage is marked
/// `overlap_full` once it passes [`DQ_FULL_OVERLAP_THRESHOLD`].
pub const OVERLAP_PARTIAL: u32 = 4;
pub const OVERLAP_FULL: u32 = 2;
pub const OVERLAP_HOLE: u32 = dqflags::DO_NOT_USE;
pub const OVERLAP_NO_COVERAGE: u32 = dqflags::NON_SCIENCE;

/// Computes the initial, per-plane FOV overlap flags for one exposure's
/// contribution to a band, before any resampling weight has been
/// accumulated. `samples` must be the same exposure's point cloud that
/// was (or will be) handed to the resampling kernel; `band`'s slice
/// bookkeeping comes from `info`.
pub fn compute_initial_dq(
    samples: &MappedSamples,
    geometry: &CubeGeometry,
    instrument: Instrument,
    band: &BandKey,
    info: &dyn InstrumentInfo,
) -> Array1<u32> {
    let mut dq = Array1::<u32>::zeros(geometry.naxis1 * geometry.naxis2 * geometry.naxis3);
    let roiw_ave = info.wave_roi(band);

    match instrument {
        Instrument::Miri => {
            let slices = [info.start_slice(&band.par1), info.end_slice(&band.par1)];
            for iz in 0..geometry.naxis3 {
                let planewave = geometry.wavelength[iz];
                let (coord1, coord2) = gather_plane_points(samples, &slices, planewave, roiw_ave);
                mark_plane_polygon(&mut dq, geometry, iz, &coord1, &coord2);
            }
        }
        Instrument::Nirspec => {
            for slice in 0..NIRSPEC_NUM_SLICES as i32 {
                for iz in 0..geometry.naxis3 {
                    let planewave = geometry.wavelength[iz];
                    let (coord1, coord2) = gather_plane_points(samples, &[slice], planewave, roiw_ave);
                    mark_plane_line_or_polygon(&mut dq, geometry, iz, &coord1, &coord2);
                }
            }
        }
    }

    dq
}

/// Collects every sample belonging to one of `slices` whose wavelength
/// falls within `roiw_ave` of `planewave`.
fn gather_plane_points(samples: &MappedSamples, slices: &[i32], planewave: f64, roiw_ave: f64) -> (Vec<f64>, Vec<f64>) {
    let mut coord1 = Vec::new();
    let mut coord2 = Vec::new();
    for i in 0..samples.len() {
        if !slices.contains(&samples.slice_no[i]) {
            continue;
        }
        if (samples.wave[i] - planewave).abs() < roiw_ave {
            coord1.push(samples.coord1[i]);
            coord2.push(samples.coord2[i]);
        }
    }
    (coord1, coord2)
}

/// Marks spaxels on plane `iz` using the polygon-overlap path: every
/// spaxel in the plane gets its fractional coverage by the four-corner
/// footprint computed directly.
fn mark_plane_polygon(dq: &mut Array1<u32>, geometry: &CubeGeometry, iz: usize, coord1: &[f64], coord2: &[f64]) {
    let Some((corners, is_line)) = polygon::four_corners(coord1, coord2) else {
        return;
    };
    if is_line {
        mark_line(dq, geometry, iz, corners[0], corners[2]);
        return;
    }
    mark_polygon(dq, geometry, iz, &corners);
}

/// As [`mark_plane_polygon`], but used on the NIRSPEC path where a single
/// slice's footprint is expected to degenerate to a line; falls back to
/// the polygon path if it doesn't.
fn mark_plane_line_or_polygon(dq: &mut Array1<u32>, geometry: &CubeGeometry, iz: usize, coord1: &[f64], coord2: &[f64]) {
    let Some((corners, is_line)) = polygon::four_corners(coord1, coord2) else {
        return;
    };
    if is_line {
        mark_line(dq, geometry, iz, corners[0], corners[2]);
    } else {
        mark_polygon(dq, geometry, iz, &corners);
    }
}

fn mark_polygon(dq: &mut Array1<u32>, geometry: &CubeGeometry, iz: usize, corners: &[(f64, f64); 4]) {
    let nxy = geometry.naxis1 * geometry.naxis2;
    for iy in 0..geometry.naxis2 {
        for ix in 0..geometry.naxis1 {
            let frac = polygon::overlap_fraction(
                corners,
                geometry.xcoord[ix],
                geometry.ycoord[iy],
                geometry.cdelt1,
                geometry.cdelt2,
            );
            if frac <= DQ_OVERLAP_TOLERANCE {
                continue;
            }
            let idx = iz * nxy + iy * geometry.naxis1 + ix;
            let flag = if frac > DQ_FULL_OVERLAP_THRESHOLD {
                OVERLAP_FULL
            } else {
                OVERLAP_PARTIAL
            };
            dq[idx] |= flag;
        }
    }
}

fn mark_line(dq: &mut Array1<u32>, geometry: &CubeGeometry, iz: usize, start: (f64, f64), end: (f64, f64)) {
    let nxy = geometry.naxis1 * geometry.naxis2;
    let points = bresenham::trace_in_grid(
        start.0,
        start.1,
        end.0,
        end.1,
        geometry.xcoord[0],
        geometry.ycoord[0],
        geometry.cdelt1,
        geometry.cdelt2,
        geometry.naxis1,
        geometry.naxis2,
    );
    for (ix, iy) in points {
        let idx = iz * nxy + iy * geometry.naxis1 + ix;
        dq[idx] |= OVERLAP_PARTIAL;
    }
}
