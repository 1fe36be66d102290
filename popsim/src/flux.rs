//! Per-source flux draws from the source-count distribution.
//!
//! Each flux is drawn in two steps: a power-law segment is chosen with
//! probability proportional to its share of the total flux integral, then
//! the flux is drawn within the segment through the closed-form inverse of
//! the segment CDF. The bright-end tail is unbounded above; the lowest
//! break bounds every draw from below.

use crate::scd::{BrokenPowerLaw, UNIT_SLOPE_EPS};
use rand::distr::weighted::WeightedIndex;
use rand::Rng;
use rand_distr::Distribution;

/// Draw `count` flux values from the distribution.
///
/// Returns one flux per source in draw order; no sorting is applied. A zero
/// count yields an empty vector without touching the generator.
pub fn sample_fluxes<R: Rng>(count: u64, scd: &BrokenPowerLaw, rng: &mut R) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }

    // Segment integrals are strictly positive for a validated distribution
    let weights = scd.segment_integrals();
    let segment_dist = WeightedIndex::new(&weights).unwrap();

    (0..count)
        .map(|_| {
            let segment = segment_dist.sample(rng);
            invert_segment_cdf(scd, segment, rng.random())
        })
        .collect()
}

/// Map a uniform draw `u` in `[0, 1)` to a flux within one segment.
fn invert_segment_cdf(scd: &BrokenPowerLaw, segment: usize, u: f64) -> f64 {
    let breaks = scd.breaks();
    let indices = scd.indices();

    if segment == 0 {
        // Unbounded bright tail above the highest break; the survival
        // function (S / F_0)^(1 - n_0) inverts directly
        let slope = indices[0];
        return breaks[0] * (1.0 - u).powf(1.0 / (1.0 - slope));
    }

    let upper = breaks[segment - 1];
    let lower = breaks[segment];
    let slope = indices[segment];

    if (slope - 1.0).abs() < UNIT_SLOPE_EPS {
        lower * (upper / lower).powf(u)
    } else {
        let lower_pow = lower.powf(1.0 - slope);
        let upper_pow = upper.powf(1.0 - slope);
        (lower_pow + u * (upper_pow - lower_pow)).powf(1.0 / (1.0 - slope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_break_law() -> BrokenPowerLaw {
        BrokenPowerLaw::new(&[2.5, 1.5], &[2.0, 1.0], 0.0).unwrap()
    }

    #[test]
    fn test_zero_count_is_empty() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(sample_fluxes(0, &two_break_law(), &mut rng).is_empty());
    }

    #[test]
    fn test_sample_count_and_bounds() {
        let scd = two_break_law();
        let mut rng = StdRng::seed_from_u64(11);
        let fluxes = sample_fluxes(5_000, &scd, &mut rng);

        assert_eq!(fluxes.len(), 5_000);
        // The lowest break is a hard faint-end cutoff
        assert!(fluxes.iter().all(|&f| f >= 1.0));
        assert!(fluxes.iter().all(|&f| f.is_finite()));
    }

    #[test]
    fn test_segment_occupancy_matches_weights() {
        let scd = two_break_law();
        let integrals = scd.segment_integrals();
        let bright_fraction = integrals[0] / (integrals[0] + integrals[1]);

        let mut rng = StdRng::seed_from_u64(23);
        let fluxes = sample_fluxes(20_000, &scd, &mut rng);
        let observed = fluxes.iter().filter(|&&f| f >= 2.0).count() as f64 / 20_000.0;

        assert_relative_eq!(observed, bright_fraction, epsilon = 0.05);
    }

    #[test]
    fn test_empirical_cdf_within_segment() {
        // Single segment S^-2 above S = 1: P(S <= s) = 1 - 1/s
        let scd = BrokenPowerLaw::new(&[2.0], &[1.0], 0.0).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let fluxes = sample_fluxes(20_000, &scd, &mut rng);

        for threshold in [1.5, 2.0, 4.0, 10.0] {
            let expected = 1.0 - 1.0 / threshold;
            let observed =
                fluxes.iter().filter(|&&f| f <= threshold).count() as f64 / 20_000.0;
            assert_relative_eq!(observed, expected, epsilon = 0.05);
        }
    }

    #[test]
    fn test_unit_slope_segment_draws_in_range() {
        let scd = BrokenPowerLaw::new(&[2.0, 1.0], &[2.0, 1.0], 0.0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let fluxes = sample_fluxes(2_000, &scd, &mut rng);
        assert!(fluxes.iter().all(|&f| f >= 1.0));
    }

    #[test]
    fn test_draws_deterministic_under_seed() {
        let scd = two_break_law();
        let mut rng1 = StdRng::seed_from_u64(99);
        let mut rng2 = StdRng::seed_from_u64(99);
        assert_eq!(
            sample_fluxes(100, &scd, &mut rng1),
            sample_fluxes(100, &scd, &mut rng2)
        );
    }
}
