//! The full Monte Carlo pipeline for one simulated sky map.
//!
//! [`run`] brings the collaborating stages together: it validates the
//! caller's inputs, normalizes the exposure input into energy bins, draws
//! the realized source count, draws per-source fluxes, renders the photon
//! count map and assembles (and optionally persists) the outputs. The
//! stages are strictly sequential; each consumes the realized draws of the
//! one before it.
//!
//! A trial is referentially transparent given its seed: identical inputs
//! plus an identical seed produce identical maps and records. Independent
//! trials are free to run concurrently as long as each owns its seed and
//! output name.

use crate::flux::sample_fluxes;
use crate::io::npy;
use crate::psf::Psf;
use crate::render::{render, RegionOfInterest, RenderError, SourceRecord};
use crate::scd::{BrokenPowerLaw, ScdError};
use crate::source_count::{draw_count, SourceCountError};
use log::{debug, info};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use skymap::{MapError, SkyMap};
use thiserror::Error;

/// Errors that abort a simulation trial.
///
/// All are fatal to the invocation: there is no partial-result mode and no
/// internal retry.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error(
        "Exposure and flux fractions must have the same number of energy bins \
         (exposure has {exposure_bins}, flux fractions have {flux_fractions})"
    )]
    BinCountMismatch {
        exposure_bins: usize,
        flux_fractions: usize,
    },
    #[error("Flux fraction {index} must be non-negative and finite, got {value}")]
    InvalidFluxFraction { index: usize, value: f64 },
    #[error("Pixel {pixel} of energy bin {bin} holds {counts} counts, beyond the i32 output range")]
    CountOverflow {
        bin: usize,
        pixel: usize,
        counts: u64,
    },
    #[error(transparent)]
    Scd(#[from] ScdError),
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    SourceCount(#[from] SourceCountError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Failed to write simulated map: {0}")]
    Io(#[from] std::io::Error),
}

/// Exposure input: either one sky-wide map or one map per energy bin.
///
/// A bare map is a convenience for the common single-bin case; it is lifted
/// into a one-element bin sequence once, at the pipeline boundary, before
/// any other processing.
#[derive(Debug, Clone)]
pub enum Exposure {
    Single(SkyMap),
    Binned(Vec<SkyMap>),
}

impl Exposure {
    fn into_bins(self) -> Vec<SkyMap> {
        match self {
            Exposure::Single(map) => vec![map],
            Exposure::Binned(maps) => maps,
        }
    }
}

impl From<SkyMap> for Exposure {
    fn from(map: SkyMap) -> Self {
        Exposure::Single(map)
    }
}

impl From<Vec<SkyMap>> for Exposure {
    fn from(maps: Vec<SkyMap>) -> Self {
        Exposure::Binned(maps)
    }
}

/// Knobs of a simulation trial that have sensible defaults.
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Stem of the output file; the map is saved as `<name>.npy`.
    pub name: String,
    /// Persist the simulated map to disk.
    pub save: bool,
    /// Share of every source's flux per energy bin.
    pub flux_fractions: Vec<f64>,
    /// Optional cap outside which sources are suppressed.
    pub roi: Option<RegionOfInterest>,
    /// Collect one [`SourceRecord`] per simulated source.
    pub want_diagnostics: bool,
    /// Seed for a reproducible trial; a random seed is drawn when absent.
    pub rng_seed: Option<u64>,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            name: "map".to_string(),
            save: false,
            flux_fractions: vec![1.0],
            roi: None,
            want_diagnostics: false,
            rng_seed: None,
        }
    }
}

/// Outputs of one simulation trial.
#[derive(Debug, Clone)]
pub struct Simulation {
    /// Photon counts, one row per energy bin.
    pub counts: Array2<i32>,
    /// Per-source diagnostics, present when requested.
    pub sources: Option<Vec<SourceRecord>>,
}

impl Simulation {
    /// Number of energy bins in the simulated map.
    pub fn num_bins(&self) -> usize {
        self.counts.dim().0
    }

    /// Number of sky pixels per energy bin.
    pub fn num_pixels(&self) -> usize {
        self.counts.dim().1
    }

    /// Total photon count over all pixels and bins.
    pub fn total_counts(&self) -> i64 {
        self.counts.iter().map(|&c| c as i64).sum()
    }
}

/// Run one point-source Monte Carlo trial.
///
/// # Arguments
/// * `indices` - power-law slopes of the source-count distribution,
///   brightest segment first
/// * `breaks` - flux breaks, highest to lowest
/// * `log_norm` - log10 normalization of the distribution
/// * `template` - spatial template of relative source probability
/// * `exposure` - instrument exposure, single map or one per energy bin
/// * `psf` - instrument response for photon scattering
/// * `options` - remaining knobs, see [`SimulationOptions`]
///
/// # Returns
/// The simulated count map (and per-source records when requested). The map
/// always has one row per normalized exposure bin and one column per
/// template pixel.
///
/// # Errors
/// Validation failures ([`SimulationError::BinCountMismatch`], the
/// source-count distribution errors) surface before any random draw;
/// [`SimulationError::CountOverflow`] surfaces at output assembly if a
/// pixel exceeds the `i32` range rather than silently truncating.
pub fn run(
    indices: &[f64],
    breaks: &[f64],
    log_norm: f64,
    template: &SkyMap,
    exposure: impl Into<Exposure>,
    psf: &dyn Psf,
    options: &SimulationOptions,
) -> Result<Simulation, SimulationError> {
    // Lift a bare exposure map into a single energy bin before anything else
    let exposure_bins = exposure.into().into_bins();

    if exposure_bins.len() != options.flux_fractions.len() {
        return Err(SimulationError::BinCountMismatch {
            exposure_bins: exposure_bins.len(),
            flux_fractions: options.flux_fractions.len(),
        });
    }
    for (index, &value) in options.flux_fractions.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(SimulationError::InvalidFluxFraction { index, value });
        }
    }

    let scd = BrokenPowerLaw::new(indices, breaks, log_norm)?;

    for bin in &exposure_bins {
        bin.expect_nside(template.nside())?;
    }

    let seed = options
        .rng_seed
        .unwrap_or_else(|| rand::rng().next_u64());
    let mut rng = StdRng::seed_from_u64(seed);
    debug!("running trial '{}' with seed {seed}", options.name);

    let num_sources = draw_count(&scd, template, &mut rng)?;
    debug!("realized {num_sources} sources");

    let fluxes = sample_fluxes(num_sources, &scd, &mut rng);

    let (raw_map, sources) = render(
        num_sources,
        &fluxes,
        template,
        &exposure_bins,
        psf,
        &options.flux_fractions,
        options.roi.as_ref(),
        options.want_diagnostics,
        &mut rng,
    )?;

    let counts = cast_counts(&raw_map)?;

    if options.save {
        let path = format!("{}.npy", options.name);
        npy::write_counts(&path, &counts)?;
        info!("saved simulated map to {path}");
    }

    info!(
        "simulation complete: {num_sources} sources, {} counts over {} pixels in {} bins",
        counts.iter().map(|&c| c as i64).sum::<i64>(),
        counts.dim().1,
        counts.dim().0,
    );

    Ok(Simulation { counts, sources })
}

/// Narrow the accumulated counts to the `i32` output representation.
fn cast_counts(raw: &Array2<u64>) -> Result<Array2<i32>, SimulationError> {
    let mut counts = Array2::<i32>::zeros(raw.dim());
    for ((bin, pixel), &value) in raw.indexed_iter() {
        counts[[bin, pixel]] =
            i32::try_from(value).map_err(|_| SimulationError::CountOverflow {
                bin,
                pixel,
                counts: value,
            })?;
    }
    Ok(counts)
}
