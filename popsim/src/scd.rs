//! Broken power-law source-count distributions.
//!
//! The source-count distribution (SCD) describes how many point sources the
//! population holds as a function of their flux: `dN/dS` is the differential
//! number of sources per unit flux. The parametrization used throughout this
//! crate is a multiply-broken power law:
//!
//! - `indices` lists one power-law slope per segment, brightest segment
//!   first. The first slope applies above the highest flux break and must
//!   exceed 1 so the bright-end source count converges.
//! - `breaks` lists the flux break positions, highest to lowest. The lowest
//!   break acts as a hard faint-end cutoff: the density is zero below it.
//! - `log_norm` is the base-10 logarithm of `dN/dS` evaluated at the highest
//!   break; the density is continuous across the breaks above the cutoff.
//!
//! With slopes `n = [n_0, .., n_{k-1}]` and breaks `F = [F_0, .., F_{k-1}]`:
//!
//! ```text
//! dN/dS (S) = 10^A * (S / F_0)^(-n_0)                    for S >= F_0
//!           = 10^A * c_j * (S / F_{j-1})^(-n_j)          for F_j <= S < F_{j-1}
//!           = 0                                          for S < F_{k-1}
//! ```
//!
//! where the `c_j` factors enforce continuity. All flux integrals over the
//! segments have closed forms, so both the expected total source count and
//! inverse-CDF flux sampling are exact; no quadrature is involved.

use thiserror::Error;

/// Slopes within this distance of 1 use the logarithmic integral branch.
pub(crate) const UNIT_SLOPE_EPS: f64 = 1e-12;

/// Errors raised while validating source-count distribution parameters.
#[derive(Error, Debug)]
pub enum ScdError {
    #[error("Flux breaks are in the wrong order, highest to lowest!")]
    InvalidOrdering,
    #[error("Expected {expected} power-law indices for {breaks} flux breaks, got {actual}")]
    IndexCountMismatch {
        breaks: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Flux breaks must be positive and finite, got {0}")]
    InvalidBreak(f64),
    #[error("Bright-end index {0} must exceed 1 for the source count to converge")]
    DivergentBrightEnd(f64),
}

/// A validated broken power-law source-count distribution.
///
/// Construction checks every invariant once, so downstream sampling code can
/// evaluate densities and integrals without re-validating.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenPowerLaw {
    indices: Vec<f64>,
    breaks: Vec<f64>,
    log_norm: f64,
}

impl BrokenPowerLaw {
    /// Validate and build a distribution.
    ///
    /// # Arguments
    /// * `indices` - power-law slopes, one per segment, brightest first
    /// * `breaks` - flux break positions, highest to lowest
    /// * `log_norm` - log10 of the density at the highest break
    ///
    /// # Errors
    /// * [`ScdError::IndexCountMismatch`] - `indices` and `breaks` lengths
    ///   disagree (one slope per break)
    /// * [`ScdError::InvalidBreak`] - a break is zero, negative or not finite
    /// * [`ScdError::InvalidOrdering`] - more than one break and they are not
    ///   strictly descending
    /// * [`ScdError::DivergentBrightEnd`] - leading slope is at most 1
    pub fn new(indices: &[f64], breaks: &[f64], log_norm: f64) -> Result<Self, ScdError> {
        if breaks.is_empty() || indices.len() != breaks.len() {
            return Err(ScdError::IndexCountMismatch {
                breaks: breaks.len(),
                expected: breaks.len().max(1),
                actual: indices.len(),
            });
        }

        for &b in breaks {
            if !b.is_finite() || b <= 0.0 {
                return Err(ScdError::InvalidBreak(b));
            }
        }

        // A single break has no ordering to violate
        for pair in breaks.windows(2) {
            if pair[1] >= pair[0] {
                return Err(ScdError::InvalidOrdering);
            }
        }

        if indices[0] <= 1.0 {
            return Err(ScdError::DivergentBrightEnd(indices[0]));
        }

        Ok(Self {
            indices: indices.to_vec(),
            breaks: breaks.to_vec(),
            log_norm,
        })
    }

    /// Power-law slopes, brightest segment first.
    pub fn indices(&self) -> &[f64] {
        &self.indices
    }

    /// Flux breaks, highest to lowest.
    pub fn breaks(&self) -> &[f64] {
        &self.breaks
    }

    /// Linear normalization, `10^log_norm`.
    pub fn norm(&self) -> f64 {
        10f64.powf(self.log_norm)
    }

    /// Number of power-law segments.
    pub fn num_segments(&self) -> usize {
        self.breaks.len()
    }

    /// Differential source density `dN/dS` at flux `s`.
    pub fn dn_ds(&self, s: f64) -> f64 {
        let k = self.breaks.len();
        if s >= self.breaks[0] {
            return self.norm() * (s / self.breaks[0]).powf(-self.indices[0]);
        }
        if s < self.breaks[k - 1] {
            return 0.0;
        }

        let mut rel = 1.0;
        for j in 1..k {
            let upper = self.breaks[j - 1];
            let lower = self.breaks[j];
            if s >= lower {
                return self.norm() * rel * (s / upper).powf(-self.indices[j]);
            }
            rel *= (lower / upper).powf(-self.indices[j]);
        }
        // s >= breaks[k - 1] always lands in a segment above
        0.0
    }

    /// Flux integral of `dN/dS` over each power-law segment.
    ///
    /// Entry 0 covers the open bright-end tail above the highest break; the
    /// remaining entries cover the closed intervals between consecutive
    /// breaks. The sum of all entries is the expected number of sources per
    /// unit of spatial template weight.
    pub fn segment_integrals(&self) -> Vec<f64> {
        let norm = self.norm();
        let k = self.breaks.len();
        let mut integrals = Vec::with_capacity(k);

        // Bright tail: integral of (S / F_0)^(-n_0) from F_0 to infinity
        integrals.push(norm * self.breaks[0] / (self.indices[0] - 1.0));

        // Relative density at the upper edge of the current segment
        let mut rel = 1.0;
        for j in 1..k {
            let upper = self.breaks[j - 1];
            let lower = self.breaks[j];
            let slope = self.indices[j];

            let segment = if (slope - 1.0).abs() < UNIT_SLOPE_EPS {
                upper * (upper / lower).ln()
            } else {
                upper / (1.0 - slope) * (1.0 - (lower / upper).powf(1.0 - slope))
            };
            integrals.push(norm * rel * segment);
            rel *= (lower / upper).powf(-slope);
        }
        integrals
    }

    /// Total flux integral of `dN/dS`, i.e. the expected number of sources
    /// per unit of spatial template weight.
    pub fn total_integral(&self) -> f64 {
        self.segment_integrals().iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_break_law() -> BrokenPowerLaw {
        BrokenPowerLaw::new(&[2.5, 1.5], &[2.0, 1.0], 0.0).unwrap()
    }

    #[test]
    fn test_single_break_accepts_any_value() {
        // One break never has an ordering problem, whatever its value
        assert!(BrokenPowerLaw::new(&[2.0], &[1.0], 0.0).is_ok());
        assert!(BrokenPowerLaw::new(&[2.0], &[1e-8], -3.0).is_ok());
    }

    #[test]
    fn test_ascending_breaks_rejected() {
        let err = BrokenPowerLaw::new(&[2.5, 1.5], &[1.0, 2.0], 0.0);
        assert!(matches!(err, Err(ScdError::InvalidOrdering)));
    }

    #[test]
    fn test_equal_breaks_rejected() {
        let err = BrokenPowerLaw::new(&[2.5, 1.5], &[2.0, 2.0], 0.0);
        assert!(matches!(err, Err(ScdError::InvalidOrdering)));
    }

    #[test]
    fn test_interior_ordering_rejected() {
        // Endpoints descend but the middle break is out of place
        let err = BrokenPowerLaw::new(&[2.5, 1.5, 0.5], &[3.0, 4.0, 1.0], 0.0);
        assert!(matches!(err, Err(ScdError::InvalidOrdering)));
    }

    #[test]
    fn test_index_count_mismatch() {
        let err = BrokenPowerLaw::new(&[2.5], &[2.0, 1.0], 0.0);
        assert!(matches!(err, Err(ScdError::IndexCountMismatch { .. })));
        let err = BrokenPowerLaw::new(&[2.5], &[], 0.0);
        assert!(matches!(err, Err(ScdError::IndexCountMismatch { .. })));
    }

    #[test]
    fn test_invalid_break_rejected() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = BrokenPowerLaw::new(&[2.0], &[bad], 0.0);
            assert!(matches!(err, Err(ScdError::InvalidBreak(_))));
        }
    }

    #[test]
    fn test_shallow_bright_end_rejected() {
        let err = BrokenPowerLaw::new(&[1.0], &[1.0], 0.0);
        assert!(matches!(err, Err(ScdError::DivergentBrightEnd(_))));
    }

    #[test]
    fn test_density_continuous_at_interior_breaks() {
        // The lowest break is a hard cutoff; every break above it joins
        // its two segments continuously
        let scd = BrokenPowerLaw::new(&[2.5, 1.8, 1.2], &[3.0, 2.0, 1.0], 0.0).unwrap();
        for &b in &scd.breaks()[..scd.num_segments() - 1] {
            let above = scd.dn_ds(b * (1.0 + 1e-9));
            let below = scd.dn_ds(b * (1.0 - 1e-9));
            assert_relative_eq!(above, below, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_density_normalization() {
        // log_norm fixes the density at the highest break
        let scd = BrokenPowerLaw::new(&[2.5, 1.5], &[2.0, 1.0], 1.0).unwrap();
        assert_relative_eq!(scd.dn_ds(2.0), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_density_zero_below_cutoff() {
        let scd = two_break_law();
        assert_eq!(scd.dn_ds(0.999), 0.0);
        assert_eq!(scd.dn_ds(1e-6), 0.0);
    }

    #[test]
    fn test_single_segment_integral() {
        // Integral of S^-2 above S = 1 is exactly 1
        let scd = BrokenPowerLaw::new(&[2.0], &[1.0], 0.0).unwrap();
        assert_relative_eq!(scd.total_integral(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_interior_integral_matches_quadrature() {
        let scd = two_break_law();
        let integrals = scd.segment_integrals();
        assert_eq!(integrals.len(), 2);

        // Trapezoid sum over the interior segment [1, 2]
        let steps = 20_000;
        let width = 1.0 / steps as f64;
        let mut quad = 0.0;
        for i in 0..steps {
            let left = 1.0 + i as f64 * width;
            let right = left + width;
            quad += width * (scd.dn_ds(left) + scd.dn_ds(right)) / 2.0;
        }
        assert_relative_eq!(integrals[1], quad, epsilon = 1e-6);
    }

    #[test]
    fn test_unit_slope_segment() {
        // Interior slope of exactly 1 takes the logarithmic branch:
        // integral of (S/2)^-1 over [1, 2] is 2 ln 2
        let scd = BrokenPowerLaw::new(&[2.0, 1.0], &[2.0, 1.0], 0.0).unwrap();
        let integrals = scd.segment_integrals();
        assert_relative_eq!(integrals[1], 2.0 * 2f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_norm_scales_integrals() {
        let base = BrokenPowerLaw::new(&[2.5, 1.5], &[2.0, 1.0], 0.0).unwrap();
        let scaled = BrokenPowerLaw::new(&[2.5, 1.5], &[2.0, 1.0], 2.0).unwrap();
        assert_relative_eq!(
            scaled.total_integral(),
            100.0 * base.total_integral(),
            epsilon = 1e-9
        );
    }
}
