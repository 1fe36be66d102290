//! Point-spread functions for smearing source photons on the sky.
//!
//! The renderer only ever asks a PSF for one thing: a random radial offset
//! between a photon's true and observed directions. Keeping the trait this
//! narrow makes the kernel fully pluggable; any radially symmetric response
//! with a sampleable radial profile can stand in.

use rand::{Rng, RngCore};
use thiserror::Error;

/// Errors raised while constructing PSF kernels.
#[derive(Error, Debug)]
pub enum PsfError {
    #[error("PSF width must be non-negative and finite, got {0}")]
    InvalidWidth(f64),
    #[error("King profile tail index must exceed 1, got {0}")]
    InvalidTailIndex(f64),
}

/// A radially symmetric instrument response.
///
/// Implementations draw the angular distance (in radians) between a
/// photon's true arrival direction and where the instrument records it.
/// The azimuth of the displacement is uniform by symmetry and handled by
/// the renderer.
pub trait Psf {
    /// Draw one radial offset in radians.
    fn draw_offset(&self, rng: &mut dyn RngCore) -> f64;
}

/// A two-dimensional Gaussian beam of width `sigma`.
///
/// The radial distance of a 2-D Gaussian is Rayleigh distributed, which has
/// a closed-form inverse CDF. A width of zero degenerates to a delta
/// kernel, which is convenient for deterministic tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianPsf {
    sigma: f64,
}

impl GaussianPsf {
    /// Create a Gaussian kernel with width `sigma` in radians.
    pub fn new(sigma: f64) -> Result<Self, PsfError> {
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(PsfError::InvalidWidth(sigma));
        }
        Ok(Self { sigma })
    }

    /// Kernel width in radians.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

impl Psf for GaussianPsf {
    fn draw_offset(&self, rng: &mut dyn RngCore) -> f64 {
        let u: f64 = rng.random();
        self.sigma * (-2.0 * (1.0 - u).ln()).sqrt()
    }
}

/// A King profile, the standard parametrization of gamma-ray instrument
/// response tails.
///
/// The radial density is proportional to
/// `(1 + r^2 / (2 sigma^2 gamma))^(-gamma)`, which falls off as a power law
/// far from the core instead of the Gaussian's exponential. Its radial CDF
/// inverts in closed form, so sampling needs no rejection loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KingPsf {
    sigma: f64,
    gamma: f64,
}

impl KingPsf {
    /// Create a King kernel with core width `sigma` (radians) and tail
    /// index `gamma`.
    pub fn new(sigma: f64, gamma: f64) -> Result<Self, PsfError> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(PsfError::InvalidWidth(sigma));
        }
        if !gamma.is_finite() || gamma <= 1.0 {
            return Err(PsfError::InvalidTailIndex(gamma));
        }
        Ok(Self { sigma, gamma })
    }

    /// Core width in radians.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Tail index.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Radius below which a given fraction of photons land.
    pub fn containment_radius(&self, fraction: f64) -> f64 {
        let tail = (1.0 - fraction).powf(1.0 / (1.0 - self.gamma));
        self.sigma * (2.0 * self.gamma * (tail - 1.0)).sqrt()
    }
}

impl Psf for KingPsf {
    fn draw_offset(&self, rng: &mut dyn RngCore) -> f64 {
        let u: f64 = rng.random();
        let tail = (1.0 - u).powf(1.0 / (1.0 - self.gamma));
        self.sigma * (2.0 * self.gamma * (tail - 1.0)).sqrt()
    }
}
