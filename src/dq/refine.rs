// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Refines the initial, per-plane FOV overlap flags into the cube's final DQ
plane: good data (0), or `NON_SCIENCE | DO_NOT_USE`.
 */

use ndarray::Array1;

use crate::dqflags::{DO_NOT_USE, NON_SCIENCE};

use super::{OVERLAP_FULL, OVERLAP_HOLE, OVERLAP_NO_COVERAGE, OVERLAP_PARTIAL};

/// Converts `dq` (initial per-spaxel overlap codes, flattened in
/// wavelength-major order matching `weight`) into the cube's final DQ
/// plane, in place.
///
/// Follows five steps: promote any spaxel with positive accumulated weight
/// to "partial" (the initial FOV estimate can be an underestimate); convert
/// untouched (flag-zero) spaxels to `NON_SCIENCE | DO_NOT_USE`; clear
/// full/partial-overlap spaxels to good data (0); mark the remaining
/// zero-weight, zero-flag spaxels as holes; and finally reclassify holes
/// that sit on the cube's spatial edge, or are 4-connected to a
/// `NON_SCIENCE` spaxel, as `NON_SCIENCE | DO_NOT_USE` rather than genuine
/// holes. A hole surrounded by good data on all four sides stays a hole.
pub fn finalize(dq: &mut Array1<u32>, weight: &Array1<f64>, naxis1: usize, naxis2: usize, naxis3: usize) {
    debug_assert_eq!(dq.len(), weight.len());
    debug_assert_eq!(dq.len(), naxis1 * naxis2 * naxis3);

    for i in 0..dq.len() {
        if weight[i] > 0.0 {
            dq[i] = OVERLAP_PARTIAL;
        }
    }
    for i in 0..dq.len() {
        if dq[i] == 0 {
            dq[i] = NON_SCIENCE | DO_NOT_USE;
        }
    }
    for i in 0..dq.len() {
        if dq[i] & OVERLAP_FULL != 0 || dq[i] & OVERLAP_PARTIAL != 0 {
            dq[i] = 0;
        }
    }
    for i in 0..dq.len() {
        if dq[i] == 0 && weight[i] == 0.0 {
            dq[i] = OVERLAP_HOLE;
        }
    }

    let nxy = naxis1 * naxis2;
    let hole_indices: Vec<usize> = (0..dq.len()).filter(|&i| dq[i] == OVERLAP_HOLE).collect();
    for i in hole_indices {
        let iwave = i / nxy;
        let rem = i - iwave * nxy;
        let yrem = rem / naxis1;
        let xrem = rem - yrem * naxis1;

        if yrem == 0 || yrem == naxis2 - 1 || xrem == 0 || xrem == naxis1 - 1 {
            dq[i] = OVERLAP_NO_COVERAGE | DO_NOT_USE;
            continue;
        }

        // Left, right, bottom, top. Note the strict `> 0` bound (not `>= 0`)
        // below excludes index 0 as a neighbour to check, matching observed
        // upstream behaviour rather than "fixing" it.
        let neighbours: [(i64, i64); 4] = [
            (xrem as i64 - 1, yrem as i64),
            (xrem as i64 + 1, yrem as i64),
            (xrem as i64, yrem as i64 - 1),
            (xrem as i64, yrem as i64 + 1),
        ];
        for (xcheck, ycheck) in neighbours {
            if xcheck > 0 && (xcheck as usize) < naxis1 && ycheck > 0 && (ycheck as usize) < naxis2 {
                let check_idx = iwave * nxy + (ycheck as usize) * naxis1 + (xcheck as usize);
                if dq[check_idx] & OVERLAP_NO_COVERAGE == OVERLAP_NO_COVERAGE {
                    dq[i] = OVERLAP_NO_COVERAGE | DO_NOT_USE;
                    break;
                }
            }
        }
    }
}
