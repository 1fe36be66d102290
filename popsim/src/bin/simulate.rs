//! Single-trial population simulation tool
//!
//! Runs one point source Monte Carlo trial on a uniform sky and prints
//! summary statistics. Useful for sanity-checking distribution parameters
//! before wiring real templates and exposure maps into the library API.
//!
//! # Usage
//!
//! ```bash
//! # A faint two-segment population, one energy bin
//! cargo run --release --bin simulate -- -n 2.5 -n 1.5 -F 2e-10 -F 1e-11 -A 10.5
//!
//! # Split flux over two energy bins, save the map, fix the seed
//! cargo run --release --bin simulate -- -n 2.0 -F 1.0 \
//!     --flux-frac 0.3 --flux-frac 0.7 --seed 42 --save --name trial7
//!
//! # King profile response and a 30 degree region of interest
//! cargo run --release --bin simulate -- -n 2.0 -F 1.0 \
//!     --king-gamma 2.2 --roi-deg 30 --diagnostics
//! ```

use clap::Parser;
use popsim::{
    pipeline, Exposure, GaussianPsf, KingPsf, Pixelization, Psf, RegionOfInterest,
    SimulationOptions, SkyMap,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run one point source population Monte Carlo trial")]
struct Args {
    /// Grid resolution of the template and exposure maps
    #[arg(long, default_value_t = 64)]
    nside: u32,

    /// Power-law index per segment, brightest first (repeatable)
    #[arg(short = 'n', long = "index", required = true)]
    indices: Vec<f64>,

    /// Flux break per segment, highest to lowest (repeatable)
    #[arg(short = 'F', long = "flux-break", required = true)]
    breaks: Vec<f64>,

    /// log10 normalization of the source-count distribution
    #[arg(short = 'A', long, default_value_t = 0.0)]
    log_norm: f64,

    /// Uniform exposure applied to every pixel of every energy bin
    #[arg(long, default_value_t = 1.0)]
    exposure: f64,

    /// Flux fraction per energy bin (repeat once per bin)
    #[arg(long = "flux-frac")]
    flux_fractions: Option<Vec<f64>>,

    /// PSF width in degrees
    #[arg(long, default_value_t = 0.25)]
    psf_sigma_deg: f64,

    /// Use a King profile with this tail index instead of a Gaussian
    #[arg(long)]
    king_gamma: Option<f64>,

    /// Region of interest radius around the galactic center, in degrees
    #[arg(long)]
    roi_deg: Option<f64>,

    /// Seed for a reproducible trial
    #[arg(long)]
    seed: Option<u64>,

    /// Output name stem; the map is saved as <name>.npy
    #[arg(long, default_value = "map")]
    name: String,

    /// Save the simulated map to disk
    #[arg(long)]
    save: bool,

    /// Collect per-source diagnostics and print the brightest sources
    #[arg(long)]
    diagnostics: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let grid = Pixelization::new(args.nside)?;
    let template = SkyMap::uniform(grid, 1.0);

    let flux_fractions = args.flux_fractions.unwrap_or_else(|| vec![1.0]);
    let exposure_bins: Vec<SkyMap> = flux_fractions
        .iter()
        .map(|_| SkyMap::uniform(grid, args.exposure))
        .collect();

    let sigma = args.psf_sigma_deg.to_radians();
    let psf: Box<dyn Psf> = match args.king_gamma {
        Some(gamma) => Box::new(KingPsf::new(sigma, gamma)?),
        None => Box::new(GaussianPsf::new(sigma)?),
    };

    let options = SimulationOptions {
        name: args.name,
        save: args.save,
        flux_fractions,
        roi: args
            .roi_deg
            .map(|deg| RegionOfInterest::around_galactic_center(deg.to_radians())),
        want_diagnostics: args.diagnostics,
        rng_seed: args.seed,
    };

    let simulation = pipeline::run(
        &args.indices,
        &args.breaks,
        args.log_norm,
        &template,
        Exposure::Binned(exposure_bins),
        psf.as_ref(),
        &options,
    )?;

    println!(
        "Simulated map: {} pixels x {} energy bins",
        simulation.num_pixels(),
        simulation.num_bins()
    );
    println!("Total counts: {}", simulation.total_counts());
    for bin in 0..simulation.num_bins() {
        let bin_counts: i64 = simulation.counts.row(bin).iter().map(|&c| c as i64).sum();
        let occupied = simulation.counts.row(bin).iter().filter(|&&c| c > 0).count();
        println!("  bin {bin}: {bin_counts} counts in {occupied} occupied pixels");
    }

    if let Some(sources) = &simulation.sources {
        println!("Sources: {}", sources.len());
        let mut brightest = sources.clone();
        brightest.sort_by(|a, b| b.expected_flux.partial_cmp(&a.expected_flux).unwrap());
        for source in brightest.iter().take(5) {
            println!(
                "  theta {:.4} phi {:.4}: flux {:.3e}, {} counts ({:.1} expected)",
                source.theta,
                source.phi,
                source.expected_flux,
                source.realized_counts,
                source.expected_counts
            );
        }
    }

    Ok(())
}
