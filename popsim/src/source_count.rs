//! Realized source counts: expectation integral plus a Poisson draw.

use crate::scd::BrokenPowerLaw;
use rand::Rng;
use rand_distr::{Distribution, Poisson};
use skymap::SkyMap;
use thiserror::Error;

/// Errors raised while drawing the realized source count.
#[derive(Error, Debug)]
pub enum SourceCountError {
    #[error("Expected source count must be finite and non-negative, got {0}")]
    InvalidExpectation(f64),
}

/// Expected number of sources for a distribution over a spatial template.
///
/// The template acts as an unnormalized spatial weight: the expectation is
/// the flux integral of the source-count distribution multiplied by the sum
/// of all template pixel values.
pub fn expected_count(scd: &BrokenPowerLaw, template: &SkyMap) -> f64 {
    scd.total_integral() * template.total()
}

/// Draw the realized source count for one Monte Carlo trial.
///
/// A Poisson draw around [`expected_count`]. A zero expectation (an empty
/// template, or a vanishing normalization) deterministically yields zero
/// sources.
pub fn draw_count<R: Rng>(
    scd: &BrokenPowerLaw,
    template: &SkyMap,
    rng: &mut R,
) -> Result<u64, SourceCountError> {
    let mean = expected_count(scd, template);
    if !mean.is_finite() || mean < 0.0 {
        return Err(SourceCountError::InvalidExpectation(mean));
    }
    if mean == 0.0 {
        return Ok(0);
    }

    // Mean is finite and positive, so the distribution always constructs
    let poisson = Poisson::new(mean).unwrap();
    Ok(poisson.sample(rng) as u64)
}
