// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Tangent-plane ("standard coordinate") projection.

The geometry builder works out a cube's spatial footprint by projecting
every exposure's sky (RA, Dec) samples onto a tangent plane centred on the
cube's eventual `CRVAL1`/`CRVAL2`, in arcsec offsets (xi, eta). This is the
classic gnomonic (`TAN`) projection described in Calabretta & Greisen
(2002), specialised to the two-angle case used throughout this crate.
 */

use crate::constants::ARCSEC_PER_RADIAN;

/// Projects a sky position onto the tangent plane centred at
/// `(crval1_deg, crval2_deg)`, returning `(xi, eta)` offsets in arcsec.
pub fn radec_to_tangent(crval1_deg: f64, crval2_deg: f64, ra_deg: f64, dec_deg: f64) -> (f64, f64) {
    let ra0 = crval1_deg.to_radians();
    let dec0 = crval2_deg.to_radians();
    let ra = ra_deg.to_radians();
    let dec = dec_deg.to_radians();

    let d_ra = ra - ra0;
    let cos_d_ra = d_ra.cos();
    let denom = dec0.sin() * dec.sin() + dec0.cos() * dec.cos() * cos_d_ra;

    let xi = dec.cos() * d_ra.sin() / denom;
    let eta =
        (dec0.cos() * dec.sin() - dec0.sin() * dec.cos() * cos_d_ra) / denom;

    (xi * ARCSEC_PER_RADIAN, eta * ARCSEC_PER_RADIAN)
}

/// Inverse of [`radec_to_tangent`]: given tangent-plane offsets in arcsec,
/// recovers the sky position in degrees.
pub fn tangent_to_radec(crval1_deg: f64, crval2_deg: f64, xi_arcsec: f64, eta_arcsec: f64) -> (f64, f64) {
    let ra0 = crval1_deg.to_radians();
    let dec0 = crval2_deg.to_radians();
    let xi = xi_arcsec / ARCSEC_PER_RADIAN;
    let eta = eta_arcsec / ARCSEC_PER_RADIAN;

    let rho = (xi * xi + eta * eta).sqrt();
    if rho < 1e-14 {
        return (crval1_deg, crval2_deg);
    }
    let c = rho.atan();
    let sin_c = c.sin();
    let cos_c = c.cos();

    let dec = (cos_c * dec0.sin() + eta * sin_c * dec0.cos() / rho).asin();
    let ra = ra0 + (xi * sin_c).atan2(rho * dec0.cos() * cos_c - eta * dec0.sin() * sin_c);

    (ra.to_degrees().rem_euclid(360.0), dec.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn projection_round_trips() {
        let crval1 = 120.0;
        let crval2 = -20.0;
        let ra = 120.01;
        let dec = -19.99;
        let (xi, eta) = radec_to_tangent(crval1, crval2, ra, dec);
        let (ra2, dec2) = tangent_to_radec(crval1, crval2, xi, eta);
        assert_abs_diff_eq!(ra, ra2, epsilon = 1e-9);
        assert_abs_diff_eq!(dec, dec2, epsilon = 1e-9);
    }

    #[test]
    fn centre_projects_to_origin() {
        let (xi, eta) = radec_to_tangent(45.0, 10.0, 45.0, 10.0);
        assert_abs_diff_eq!(xi, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(eta, 0.0, epsilon = 1e-9);
    }
}
