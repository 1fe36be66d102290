//! Rendering a source population into a pixelized photon-count map.
//!
//! Each source is placed by drawing a pixel from the spatial template
//! (treated as an unnormalized probability mass over pixels) and sits at
//! that pixel's center direction. Its expected counts in each energy bin
//! are the product of its flux, the bin's flux fraction and the exposure at
//! the source pixel; realized counts are Poisson draws around those means.
//! Every realized photon is displaced from the source direction by a
//! PSF-drawn radial offset at a uniform azimuth and accumulated into the
//! pixel it lands in.
//!
//! Two placement policies are fixed contracts of this renderer:
//!
//! - A source drawn outside the region of interest contributes no photons
//!   but still counts toward the realized total, and still produces a
//!   (zero-count) diagnostic record. Record counts therefore always match
//!   the drawn source count.
//! - Sources that land in the same pixel accumulate additively; there is no
//!   deduplication or redrawing.

use crate::psf::Psf;
use ndarray::Array2;
use rand::distr::weighted::WeightedIndex;
use rand::Rng;
use rand_distr::{Distribution, Poisson};
use skymap::{angular_separation, displace, PixelizationError, SkyMap};
use std::f64::consts::{FRAC_PI_2, TAU};
use thiserror::Error;

/// Errors raised while rendering a count map.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Template weight at pixel {pixel} must be non-negative and finite, got {value}")]
    InvalidTemplateWeight { pixel: usize, value: f64 },
    #[error("Template must contain at least one positive weight")]
    EmptyTemplate,
    #[error("Expected {expected} flux values for {expected} sources, got {actual}")]
    FluxCountMismatch { expected: u64, actual: usize },
    #[error(transparent)]
    Pixelization(#[from] PixelizationError),
}

/// An angular cap limiting where sources may contribute photons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionOfInterest {
    theta: f64,
    phi: f64,
    radius: f64,
}

impl RegionOfInterest {
    /// A cap of the given angular `radius` (radians) around an arbitrary
    /// center direction.
    pub fn new(theta: f64, phi: f64, radius: f64) -> Self {
        Self { theta, phi, radius }
    }

    /// A cap centered on the galactic center, the usual analysis region
    /// for inner-galaxy studies.
    pub fn around_galactic_center(radius: f64) -> Self {
        Self::new(FRAC_PI_2, 0.0, radius)
    }

    /// Maximum angular distance from the center, in radians.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Whether a direction falls inside the cap.
    pub fn contains(&self, theta: f64, phi: f64) -> bool {
        angular_separation(self.theta, self.phi, theta, phi) <= self.radius
    }
}

/// Diagnostic record for one simulated source.
///
/// Counts and flux are narrowed to `f32` when the record is assembled;
/// positions are the source pixel's center direction. `realized_counts` and
/// `expected_counts` are summed over energy bins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceRecord {
    pub theta: f32,
    pub phi: f32,
    pub realized_counts: f32,
    pub expected_counts: f32,
    pub expected_flux: f32,
}

/// Render a population of sources into a per-bin photon-count map.
///
/// # Arguments
/// * `source_count` - realized number of sources for this trial
/// * `fluxes` - one flux per source
/// * `template` - spatial probability weights, one per pixel
/// * `exposure_bins` - one exposure map per energy bin, on the template grid
/// * `psf` - instrument response used to scatter photons
/// * `flux_fractions` - share of each source's flux in every energy bin
/// * `roi` - optional cap outside which sources are suppressed
/// * `want_diagnostics` - collect one [`SourceRecord`] per source
/// * `rng` - random source for placement, counts and scattering
///
/// # Returns
/// The count map with one row per energy bin, and the per-source records
/// when diagnostics were requested.
#[allow(clippy::too_many_arguments)]
pub fn render<R: Rng>(
    source_count: u64,
    fluxes: &[f64],
    template: &SkyMap,
    exposure_bins: &[SkyMap],
    psf: &dyn Psf,
    flux_fractions: &[f64],
    roi: Option<&RegionOfInterest>,
    want_diagnostics: bool,
    rng: &mut R,
) -> Result<(Array2<u64>, Option<Vec<SourceRecord>>), RenderError> {
    if fluxes.len() as u64 != source_count {
        return Err(RenderError::FluxCountMismatch {
            expected: source_count,
            actual: fluxes.len(),
        });
    }

    for (pixel, &value) in template.values().iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(RenderError::InvalidTemplateWeight { pixel, value });
        }
    }
    if template.total() <= 0.0 {
        return Err(RenderError::EmptyTemplate);
    }

    let grid = template.grid();
    let mut map = Array2::<u64>::zeros((exposure_bins.len(), grid.npix()));
    let mut records = want_diagnostics.then(|| Vec::with_capacity(fluxes.len()));

    // Weights were validated above, so the distribution always constructs
    let position_dist = WeightedIndex::new(template.values()).unwrap();

    for &flux in fluxes {
        let source_pix = position_dist.sample(rng);
        let (theta, phi) = grid.pix2ang(source_pix)?;

        let in_roi = roi.map_or(true, |cap| cap.contains(theta, phi));
        let mut expected = 0.0;
        let mut realized: u64 = 0;

        if in_roi {
            for (bin, (exposure, &fraction)) in
                exposure_bins.iter().zip(flux_fractions).enumerate()
            {
                let mean = flux * fraction * exposure.value(source_pix);
                if mean <= 0.0 || !mean.is_finite() {
                    continue;
                }
                expected += mean;

                let photons = Poisson::new(mean).unwrap().sample(rng) as u64;
                realized += photons;

                for _ in 0..photons {
                    let offset = psf.draw_offset(rng);
                    let azimuth = rng.random_range(0.0..TAU);
                    let (obs_theta, obs_phi) = displace(theta, phi, offset, azimuth);
                    let dest = grid.ang2pix(obs_theta, obs_phi)?;
                    map[[bin, dest]] += 1;
                }
            }
        }

        if let Some(records) = records.as_mut() {
            records.push(SourceRecord {
                theta: theta as f32,
                phi: phi as f32,
                realized_counts: realized as f32,
                expected_counts: expected as f32,
                expected_flux: flux as f32,
            });
        }
    }

    Ok((map, records))
}
