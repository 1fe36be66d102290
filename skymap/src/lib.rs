//! Equal-area spherical pixel maps for sky simulation
//!
//! This crate provides the spherical substrate used by the population
//! simulator: a RING-ordered equal-area pixelization of the sphere,
//! conversions between pixel indices, angular coordinates and unit vectors,
//! and a simple per-pixel map type used for spatial templates and exposure
//! maps.

pub mod map;
pub mod pixelization;

// Re-exports for easier access
pub use map::{MapError, SkyMap};
pub use pixelization::{
    angular_separation, displace, Pixelization, PixelizationError,
};
