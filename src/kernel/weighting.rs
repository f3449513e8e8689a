// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The scalar weighting laws used by the Modified Shepard Method and its
exponential variant. Distances passed in are always normalised by the
relevant region-of-interest radius, so they're dimensionless.
 */

/// Inverse-distance weighting with a soft floor: distances closer than
/// `soft_rad` are clamped to it so a sample exactly on a spaxel centre
/// doesn't produce an infinite weight.
pub fn msm_weight(normalized_distance: f64, power: f64, soft_rad: f64) -> f64 {
    let d = normalized_distance.max(soft_rad).max(f64::EPSILON);
    1.0 / d.powf(power)
}

/// Gaussian falloff with a configurable scale radius.
pub fn emsm_weight(normalized_distance: f64, scale_rad: f64) -> f64 {
    let s = scale_rad.max(f64::EPSILON);
    (-(normalized_distance * normalized_distance) / (s * s)).exp()
}

/// Evaluates a polynomial with coefficients in increasing order of degree.
pub fn poly_eval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// The MIRI analytic point-spread/line-spread weighting law: a separable
/// Gaussian in alpha and beta, times a Gaussian line-spread function in
/// wavelength. `alpha_width`/`beta_width`/`lsf_width` are each the local
/// 1-sigma width at the sample's wavelength.
pub fn miripsf_weight(dalpha: f64, dbeta: f64, dwave: f64, alpha_width: f64, beta_width: f64, lsf_width: f64) -> f64 {
    let psf_alpha = (-(dalpha * dalpha) / (2.0 * alpha_width * alpha_width)).exp();
    let psf_beta = (-(dbeta * dbeta) / (2.0 * beta_width * beta_width)).exp();
    let lsf = (-(dwave * dwave) / (2.0 * lsf_width * lsf_width)).exp();
    psf_alpha * psf_beta * lsf
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn msm_weight_at_zero_distance_uses_floor() {
        let w = msm_weight(0.0, 2.0, 0.1);
        assert_abs_diff_eq!(w, 1.0 / 0.1_f64.powf(2.0), epsilon = 1e-9);
    }

    #[test]
    fn msm_weight_decreases_with_distance() {
        let near = msm_weight(0.1, 2.0, 0.01);
        let far = msm_weight(0.9, 2.0, 0.01);
        assert!(near > far);
    }

    #[test]
    fn emsm_weight_is_one_at_zero_and_decays() {
        let w0 = emsm_weight(0.0, 0.5);
        assert_abs_diff_eq!(w0, 1.0, epsilon = 1e-9);
        let w1 = emsm_weight(1.0, 0.5);
        assert!(w1 < w0);
    }

    #[test]
    fn miripsf_weight_is_one_at_zero_offset() {
        let w = miripsf_weight(0.0, 0.0, 0.0, 0.1, 0.1, 0.01);
        assert_abs_diff_eq!(w, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn miripsf_weight_decays_with_alpha_offset() {
        let near = miripsf_weight(0.01, 0.0, 0.0, 0.1, 0.1, 0.01);
        let far = miripsf_weight(0.3, 0.0, 0.0, 0.1, 0.1, 0.01);
        assert!(near > far);
    }
}
