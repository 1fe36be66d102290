//! Per-pixel maps over the spherical grid.

use crate::pixelization::Pixelization;
use serde::{Deserialize, Serialize};
use std::ops::Index;
use thiserror::Error;

/// Errors raised when constructing or combining sky maps.
#[derive(Error, Debug)]
pub enum MapError {
    #[error("Expected {expected} pixel values for nside {nside}, got {actual}")]
    PixelCountMismatch {
        nside: u32,
        expected: usize,
        actual: usize,
    },
    #[error("Map has nside {actual}, expected nside {expected}")]
    NsideMismatch { expected: u32, actual: u32 },
}

/// A map of one `f64` value per pixel of a [`Pixelization`] grid.
///
/// Used for spatial templates (relative source probability per pixel) and
/// for per-energy-bin exposure maps. The pixel count is fixed by the grid at
/// construction time; values are mutable in place but the map can never be
/// resized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyMap {
    grid: Pixelization,
    values: Vec<f64>,
}

impl SkyMap {
    /// A map with every pixel set to zero.
    pub fn zeros(grid: Pixelization) -> Self {
        Self {
            grid,
            values: vec![0.0; grid.npix()],
        }
    }

    /// A map with every pixel set to `value`.
    pub fn uniform(grid: Pixelization, value: f64) -> Self {
        Self {
            grid,
            values: vec![value; grid.npix()],
        }
    }

    /// Wrap an existing vector of per-pixel values.
    ///
    /// Fails with [`MapError::PixelCountMismatch`] unless the vector holds
    /// exactly one value per grid pixel.
    pub fn from_values(grid: Pixelization, values: Vec<f64>) -> Result<Self, MapError> {
        if values.len() != grid.npix() {
            return Err(MapError::PixelCountMismatch {
                nside: grid.nside(),
                expected: grid.npix(),
                actual: values.len(),
            });
        }
        Ok(Self { grid, values })
    }

    /// The grid this map is defined on.
    pub fn grid(&self) -> Pixelization {
        self.grid
    }

    /// Resolution parameter of the underlying grid.
    pub fn nside(&self) -> u32 {
        self.grid.nside()
    }

    /// Number of pixels in the map.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false: a map holds at least 12 pixels.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a single pixel.
    ///
    /// # Panics
    /// Panics if `pix` is out of range, matching slice indexing semantics.
    pub fn value(&self, pix: usize) -> f64 {
        self.values[pix]
    }

    /// All pixel values in RING order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Mutable access to the pixel values, e.g. for building templates.
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Sum of all pixel values.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Check that this map lives on a grid of the expected resolution.
    pub fn expect_nside(&self, expected: u32) -> Result<(), MapError> {
        if self.nside() != expected {
            return Err(MapError::NsideMismatch {
                expected,
                actual: self.nside(),
            });
        }
        Ok(())
    }
}

impl Index<usize> for SkyMap {
    type Output = f64;

    fn index(&self, pix: usize) -> &f64 {
        &self.values[pix]
    }
}
