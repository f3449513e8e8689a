// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The resampling kernel: accumulates a mapped exposure's point cloud (or, for
area interpolation, pixel footprints) into a cube's spaxel grid.

Every law shares the same accumulator storage ([`SpaxelGrid`]); only the
function used to turn a distance into a weight differs.
 */

pub mod area;
pub mod miripsf;
pub mod msm;
pub mod weighting;

use ndarray::Array1;

/// The running flux/weight/count sums for every spaxel in a cube, flattened
/// in wavelength-major order (`iz * naxis2 * naxis1 + iy * naxis1 + ix`).
pub struct SpaxelGrid {
    pub naxis1: usize,
    pub naxis2: usize,
    pub naxis3: usize,
    pub flux_sum: Array1<f64>,
    pub weight_sum: Array1<f64>,
    pub count: Array1<u32>,
}

impl SpaxelGrid {
    pub fn new(naxis1: usize, naxis2: usize, naxis3: usize) -> Self {
        let n = naxis1 * naxis2 * naxis3;
        Self {
            naxis1,
            naxis2,
            naxis3,
            flux_sum: Array1::zeros(n),
            weight_sum: Array1::zeros(n),
            count: Array1::zeros(n),
        }
    }

    #[inline]
    pub fn index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        iz * (self.naxis2 * self.naxis1) + iy * self.naxis1 + ix
    }

    /// Merges another grid's sums into this one, spaxel by spaxel. Used to
    /// combine thread-local partial grids after a parallel accumulation
    /// pass.
    pub fn merge(&mut self, other: &SpaxelGrid) {
        debug_assert_eq!(self.flux_sum.len(), other.flux_sum.len());
        self.flux_sum += &other.flux_sum;
        self.weight_sum += &other.weight_sum;
        self.count += &other.count;
    }
}

/// Returns the half-open range of indices into `coords` (assumed sorted
/// ascending, but not necessarily uniformly spaced) whose values fall
/// within `[centre - radius, centre + radius]`.
pub fn roi_index_range(coords: &[f64], centre: f64, radius: f64) -> (usize, usize) {
    if coords.is_empty() || radius <= 0.0 {
        return (0, 0);
    }
    let lo = centre - radius;
    let hi = centre + radius;
    let mut i_lo = 0;
    while i_lo < coords.len() && coords[i_lo] < lo {
        i_lo += 1;
    }
    let mut i_hi = coords.len();
    while i_hi > i_lo && coords[i_hi - 1] > hi {
        i_hi -= 1;
    }
    (i_lo, i_hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roi_index_range_finds_uniform_window() {
        let coords: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let (lo, hi) = roi_index_range(&coords, 5.0, 1.5);
        assert_eq!((lo, hi), (4, 7));
    }

    #[test]
    fn roi_index_range_empty_when_radius_zero() {
        let coords: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let (lo, hi) = roi_index_range(&coords, 5.0, 0.0);
        assert_eq!((lo, hi), (0, 0));
    }

    #[test]
    fn grid_merge_sums_partials() {
        let mut a = SpaxelGrid::new(2, 1, 1);
        let b = SpaxelGrid::new(2, 1, 1);
        a.flux_sum[0] = 1.0;
        let mut b = b;
        b.flux_sum[0] = 2.0;
        a.merge(&b);
        assert_eq!(a.flux_sum[0], 3.0);
    }
}
