//! Faint-population demonstration.
//!
//! Simulates a population whose spatial template falls off away from the
//! galactic center, splits each source's flux over two energy bins, and
//! prints how the realized counts compare with the per-source expectations.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example faint_population
//! ```

use popsim::{
    pipeline, Exposure, GaussianPsf, Pixelization, SimulationOptions, SkyMap,
};
use skymap::angular_separation;
use std::f64::consts::FRAC_PI_2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let grid = Pixelization::new(32)?;

    // Template weight decays with distance from the galactic center
    let mut template = SkyMap::zeros(grid);
    for pix in 0..grid.npix() {
        let (theta, phi) = grid.pix2ang(pix)?;
        let dist = angular_separation(FRAC_PI_2, 0.0, theta, phi);
        template.values_mut()[pix] = (-dist / 0.5).exp();
    }

    let exposure = vec![
        SkyMap::uniform(grid, 1.0),
        SkyMap::uniform(grid, 0.8),
    ];

    let psf = GaussianPsf::new(0.5_f64.to_radians())?;
    let options = SimulationOptions {
        flux_fractions: vec![0.6, 0.4],
        want_diagnostics: true,
        rng_seed: Some(1234),
        ..Default::default()
    };

    // Two-segment distribution: steep above the break, shallow below
    let simulation = pipeline::run(
        &[2.2, 1.4],
        &[50.0, 5.0],
        -2.0,
        &template,
        Exposure::Binned(exposure),
        &psf,
        &options,
    )?;

    let sources = simulation.sources.as_ref().unwrap();
    println!(
        "Realized {} sources producing {} counts",
        sources.len(),
        simulation.total_counts()
    );

    let expected: f32 = sources.iter().map(|s| s.expected_counts).sum();
    let realized: f32 = sources.iter().map(|s| s.realized_counts).sum();
    println!("Expected counts {expected:.1}, realized {realized:.0}");

    for bin in 0..simulation.num_bins() {
        let counts: i64 = simulation.counts.row(bin).iter().map(|&c| c as i64).sum();
        println!("  bin {bin}: {counts} counts");
    }

    Ok(())
}
