//! RING-ordered equal-area pixelization of the sphere.
//!
//! The sphere is divided into `12 * nside^2` pixels of equal solid angle,
//! arranged on `4 * nside - 1` rings of constant colatitude: `nside - 1`
//! rings in each polar cap and `2 * nside + 1` rings in the equatorial belt.
//! Pixels are indexed ring by ring from the north pole, west to east within
//! each ring.
//!
//! Positions on the sphere use the spherical convention common in map-based
//! astronomy: `theta` is the colatitude in radians (`0` at the north pole,
//! `pi` at the south pole) and `phi` is the azimuth in radians, increasing
//! eastward.
//!
//! # Examples
//!
//! ```rust
//! use skymap::Pixelization;
//!
//! # fn main() -> Result<(), skymap::PixelizationError> {
//! let grid = Pixelization::new(16)?;
//! assert_eq!(grid.npix(), 3072);
//!
//! // Pixel centers round-trip through angular coordinates
//! let (theta, phi) = grid.pix2ang(1234)?;
//! assert_eq!(grid.ang2pix(theta, phi)?, 1234);
//! # Ok(())
//! # }
//! ```

use nalgebra::Vector3;
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use thiserror::Error;

/// Errors that can occur during pixelization operations.
#[derive(Error, Debug)]
pub enum PixelizationError {
    #[error("Grid resolution (nside) must be at least 1, got {0}")]
    InvalidNside(u32),
    #[error("Pixel index {0} is out of range for a grid of {1} pixels")]
    PixelOutOfRange(usize, usize),
    #[error("Colatitude {0} is outside the valid range [0, pi]")]
    InvalidColatitude(f64),
}

/// An equal-area RING-ordered grid on the sphere with resolution `nside`.
///
/// The grid is a value type: it carries only the resolution parameter, so it
/// is cheap to copy and compare. All pixel indexing methods validate their
/// inputs and return detailed errors instead of panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Pixelization {
    nside: u32,
}

impl Pixelization {
    /// Create a grid with the given resolution parameter.
    ///
    /// Any `nside >= 1` is accepted; the pixel count grows as
    /// `12 * nside^2`.
    pub fn new(nside: u32) -> Result<Self, PixelizationError> {
        if nside < 1 {
            return Err(PixelizationError::InvalidNside(nside));
        }
        Ok(Self { nside })
    }

    /// Resolution parameter of the grid.
    pub fn nside(&self) -> u32 {
        self.nside
    }

    /// Total number of pixels, `12 * nside^2`.
    pub fn npix(&self) -> usize {
        12 * (self.nside as usize) * (self.nside as usize)
    }

    /// Solid angle of a single pixel in steradians.
    ///
    /// The tessellation is exactly equal-area, so this is `4 * pi / npix`
    /// for every pixel.
    pub fn pixel_solid_angle(&self) -> f64 {
        4.0 * PI / self.npix() as f64
    }

    /// Angular coordinates `(theta, phi)` of a pixel center.
    ///
    /// # Arguments
    /// * `pix` - RING-ordered pixel index in `0..npix`
    ///
    /// # Returns
    /// Colatitude and azimuth of the pixel center, in radians
    pub fn pix2ang(&self, pix: usize) -> Result<(f64, f64), PixelizationError> {
        let npix = self.npix();
        if pix >= npix {
            return Err(PixelizationError::PixelOutOfRange(pix, npix));
        }

        let nside = self.nside as usize;
        let ns = self.nside as f64;
        // Number of pixels in one polar cap
        let ncap = 2 * nside * (nside - 1);

        if pix < ncap {
            // North polar cap: rings of 4 * i pixels, i = 1..nside-1
            let hip = (pix as f64 + 1.0) / 2.0;
            let fihip = hip.floor();
            let iring = ((hip - fihip.sqrt()).sqrt().floor() as usize) + 1;
            let iphi = pix + 1 - 2 * iring * (iring - 1);

            let z = 1.0 - (iring * iring) as f64 / (3.0 * ns * ns);
            let phi = (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64;
            Ok((z.acos(), phi))
        } else if pix < npix - ncap {
            // Equatorial belt: 2 * nside + 1 rings of 4 * nside pixels
            let ip = pix - ncap;
            let iring = ip / (4 * nside) + nside;
            let iphi = ip % (4 * nside) + 1;

            // Rings alternate between two phi offsets of half a pixel width
            let fodd = if (iring + nside) % 2 == 1 { 1.0 } else { 0.5 };
            let z = (2.0 * ns - iring as f64) * 2.0 / (3.0 * ns);
            let phi = (iphi as f64 - fodd) * FRAC_PI_2 / ns;
            Ok((z.acos(), phi))
        } else {
            // South polar cap, mirror of the north cap
            let ip = npix - pix;
            let hip = ip as f64 / 2.0;
            let fihip = hip.floor();
            let iring = ((hip - fihip.sqrt()).sqrt().floor() as usize) + 1;
            let iphi = 4 * iring + 1 - (ip - 2 * iring * (iring - 1));

            let z = -1.0 + (iring * iring) as f64 / (3.0 * ns * ns);
            let phi = (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64;
            Ok((z.acos(), phi))
        }
    }

    /// RING-ordered index of the pixel containing the direction
    /// `(theta, phi)`.
    ///
    /// `phi` may be any finite angle; it is wrapped into `[0, 2 * pi)`.
    pub fn ang2pix(&self, theta: f64, phi: f64) -> Result<usize, PixelizationError> {
        if !(0.0..=PI).contains(&theta) {
            return Err(PixelizationError::InvalidColatitude(theta));
        }

        let nside = self.nside as usize;
        let ns = self.nside as f64;
        let npix = self.npix();
        let ncap = 2 * nside * (nside - 1);

        let z = theta.cos();
        let za = z.abs();
        // Azimuth in units of a quadrant, in [0, 4)
        let tt = phi.rem_euclid(TAU) / FRAC_PI_2;

        if za <= 2.0 / 3.0 {
            // Equatorial belt: locate the crossing of the two pixel
            // boundary lines through (z, phi)
            let temp1 = ns * (0.5 + tt);
            let temp2 = ns * z * 0.75;
            let jp = (temp1 - temp2).floor() as i64;
            let jm = (temp1 + temp2).floor() as i64;

            let ir = nside as i64 + 1 + jp - jm;
            let kshift = 1 - (ir & 1);
            let nl4 = 4 * nside as i64;
            let ip = (jp + jm - nside as i64 + kshift + 1) / 2;
            let ip = ip.rem_euclid(nl4);

            Ok(ncap + (ir as usize - 1) * 4 * nside + ip as usize)
        } else {
            // Polar caps
            let tp = tt.fract();
            let tmp = ns * (3.0 * (1.0 - za)).sqrt();
            let jp = (tp * tmp).floor() as usize;
            let jm = ((1.0 - tp) * tmp).floor() as usize;

            let ir = jp + jm + 1;
            let ip = ((tt * ir as f64).floor() as usize) % (4 * ir);

            if z > 0.0 {
                Ok(2 * ir * (ir - 1) + ip)
            } else {
                Ok(npix - 2 * ir * (ir + 1) + ip)
            }
        }
    }

    /// Unit vector of a pixel center.
    pub fn pix2vec(&self, pix: usize) -> Result<Vector3<f64>, PixelizationError> {
        let (theta, phi) = self.pix2ang(pix)?;
        Ok(ang2vec(theta, phi))
    }
}

/// Unit vector for the direction `(theta, phi)`.
pub fn ang2vec(theta: f64, phi: f64) -> Vector3<f64> {
    let sin_theta = theta.sin();
    Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), theta.cos())
}

/// Angular coordinates `(theta, phi)` of a direction vector.
///
/// The vector does not need to be normalized. `phi` is returned in
/// `[0, 2 * pi)`.
pub fn vec2ang(v: &Vector3<f64>) -> (f64, f64) {
    let r = v.norm();
    let theta = (v.z / r).clamp(-1.0, 1.0).acos();
    let phi = v.y.atan2(v.x).rem_euclid(TAU);
    (theta, phi)
}

/// Angular separation between two directions, in radians.
///
/// Uses the haversine form, which is numerically stable for small
/// separations where the naive `acos` of a dot product loses precision.
pub fn angular_separation(theta1: f64, phi1: f64, theta2: f64, phi2: f64) -> f64 {
    let d_theta = theta2 - theta1;
    let d_phi = phi2 - phi1;

    let a = (d_theta / 2.0).sin().powi(2)
        + theta1.sin() * theta2.sin() * (d_phi / 2.0).sin().powi(2);
    2.0 * a.sqrt().min(1.0).asin()
}

/// Displace a direction by a great-circle arc.
///
/// Moves the direction `(theta, phi)` by an angular distance `offset` along
/// the great circle at position angle `azimuth` (measured from the local
/// southward meridian, increasing eastward). Used to scatter photons around
/// a source position.
pub fn displace(theta: f64, phi: f64, offset: f64, azimuth: f64) -> (f64, f64) {
    let center = ang2vec(theta, phi);

    // Local tangent basis at the center direction
    let e_theta = Vector3::new(
        theta.cos() * phi.cos(),
        theta.cos() * phi.sin(),
        -theta.sin(),
    );
    let e_phi = Vector3::new(-phi.sin(), phi.cos(), 0.0);

    let tangent = e_theta * azimuth.cos() + e_phi * azimuth.sin();
    let displaced = center * offset.cos() + tangent * offset.sin();
    vec2ang(&displaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_invalid_nside() {
        assert!(matches!(
            Pixelization::new(0),
            Err(PixelizationError::InvalidNside(0))
        ));
    }

    #[rstest]
    #[case(1, 12)]
    #[case(2, 48)]
    #[case(4, 192)]
    #[case(16, 3072)]
    #[case(64, 49152)]
    fn test_npix(#[case] nside: u32, #[case] expected: usize) {
        let grid = Pixelization::new(nside).unwrap();
        assert_eq!(grid.npix(), expected);
    }

    #[test]
    fn test_solid_angle_covers_sphere() {
        let grid = Pixelization::new(8).unwrap();
        let total = grid.pixel_solid_angle() * grid.npix() as f64;
        assert_relative_eq!(total, 4.0 * PI, epsilon = 1e-12);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(4)]
    #[case(8)]
    #[case(16)]
    fn test_center_roundtrip_exhaustive(#[case] nside: u32) {
        let grid = Pixelization::new(nside).unwrap();
        for pix in 0..grid.npix() {
            let (theta, phi) = grid.pix2ang(pix).unwrap();
            assert!((0.0..=PI).contains(&theta));
            assert!((0.0..TAU).contains(&phi));
            assert_eq!(
                grid.ang2pix(theta, phi).unwrap(),
                pix,
                "center of pixel {pix} at nside {nside} did not round-trip"
            );
        }
    }

    #[test]
    fn test_pixel_out_of_range() {
        let grid = Pixelization::new(2).unwrap();
        assert!(matches!(
            grid.pix2ang(48),
            Err(PixelizationError::PixelOutOfRange(48, 48))
        ));
    }

    #[test]
    fn test_invalid_colatitude() {
        let grid = Pixelization::new(2).unwrap();
        assert!(grid.ang2pix(-0.1, 0.0).is_err());
        assert!(grid.ang2pix(PI + 0.1, 0.0).is_err());
    }

    #[test]
    fn test_poles_map_to_cap_rings() {
        let grid = Pixelization::new(8).unwrap();
        let npix = grid.npix();

        // The polar rings hold exactly four pixels each
        assert!(grid.ang2pix(0.0, 1.0).unwrap() < 4);
        assert!(grid.ang2pix(PI, 1.0).unwrap() >= npix - 4);
    }

    #[test]
    fn test_ring_colatitudes_monotonic() {
        let grid = Pixelization::new(4).unwrap();
        let mut last_theta = 0.0;
        for pix in 0..grid.npix() {
            let (theta, _) = grid.pix2ang(pix).unwrap();
            assert!(theta >= last_theta - 1e-12, "pixel {pix} moved north");
            last_theta = theta.max(last_theta);
        }
    }

    #[test]
    fn test_negative_phi_wraps() {
        let grid = Pixelization::new(4).unwrap();
        let pix = grid.ang2pix(1.0, 0.5).unwrap();
        assert_eq!(grid.ang2pix(1.0, 0.5 - TAU).unwrap(), pix);
        assert_eq!(grid.ang2pix(1.0, 0.5 + TAU).unwrap(), pix);
    }

    #[test]
    fn test_vec_ang_roundtrip() {
        let cases = [(0.3, 1.2), (1.5707, 3.0), (2.9, 5.5)];
        for (theta, phi) in cases {
            let v = ang2vec(theta, phi);
            assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-12);
            let (t2, p2) = vec2ang(&v);
            assert_relative_eq!(t2, theta, epsilon = 1e-12);
            assert_relative_eq!(p2, phi, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_angular_separation_basics() {
        // Same point
        assert_relative_eq!(
            angular_separation(1.0, 2.0, 1.0, 2.0),
            0.0,
            epsilon = 1e-12
        );
        // Pole to equator
        assert_relative_eq!(
            angular_separation(0.0, 0.0, FRAC_PI_2, 1.0),
            FRAC_PI_2,
            epsilon = 1e-12
        );
        // Antipodal points on the equator
        assert_relative_eq!(
            angular_separation(FRAC_PI_2, 0.0, FRAC_PI_2, PI),
            PI,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_displace_zero_offset() {
        let (theta, phi) = displace(1.1, 0.7, 0.0, 2.0);
        assert_relative_eq!(theta, 1.1, epsilon = 1e-12);
        assert_relative_eq!(phi, 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_displace_from_pole() {
        // Any azimuth from the pole lands at colatitude == offset
        let (theta, _) = displace(0.0, 0.0, 0.25, 1.3);
        assert_relative_eq!(theta, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_displace_preserves_separation() {
        let cases = [
            (0.4, 0.1, 0.05, 0.0),
            (1.2, 3.3, 0.3, 1.0),
            (2.8, 5.9, 0.01, 4.5),
            (1.5707, 0.0, 1.0, 2.2),
        ];
        for (theta, phi, offset, azimuth) in cases {
            let (t2, p2) = displace(theta, phi, offset, azimuth);
            assert_relative_eq!(
                angular_separation(theta, phi, t2, p2),
                offset,
                epsilon = 1e-9
            );
        }
    }
}
