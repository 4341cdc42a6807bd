//! Moments of the semi-truncated normal distribution.
//!
//! The variational posterior of every factor entry is a normal N(mu, 1/tau)
//! restricted to the non-negative half-line. Both engines only ever need its
//! mean and variance, derived from the unconstrained (mu, tau) pair through
//! the density/survival ratio of the standard normal.

use std::sync::OnceLock;

use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Standardised truncation point beyond which the density/survival ratio is
/// evaluated with its asymptotic series. Past roughly this point the survival
/// function 1 - Phi(x) loses all significant digits in f64 and the direct
/// ratio degenerates to 0/0.
const ASYMPTOTIC_CUTOFF: f64 = 6.0;

/// lambda(x) = phi(x) / (1 - Phi(x)), the hazard (inverse Mills) ratio of
/// the standard normal.
fn hazard(x: f64) -> f64 {
    if x >= ASYMPTOTIC_CUTOFF {
        // 1/lambda(x) = (1 - 1/x^2 + 3/x^4 - 15/x^6 + ...) / x
        let inv2 = 1.0 / (x * x);
        let recip = (1.0 - inv2 * (1.0 - 3.0 * inv2 * (1.0 - 5.0 * inv2))) / x;
        1.0 / recip
    } else {
        // Sits in the innermost coordinate loop; build the distribution once.
        static STD_NORMAL: OnceLock<Normal> = OnceLock::new();
        let std_normal = STD_NORMAL.get_or_init(|| Normal::new(0.0, 1.0).unwrap());
        std_normal.pdf(x) / (1.0 - std_normal.cdf(x))
    }
}

/// Mean of N(mu, 1/tau) truncated to [0, inf). Requires tau > 0.
pub fn tn_expectation(mu: f64, tau: f64) -> f64 {
    let sqrt_tau = tau.sqrt();
    let x = -mu * sqrt_tau;
    mu + hazard(x) / sqrt_tau
}

/// Variance of N(mu, 1/tau) truncated to [0, inf). Requires tau > 0.
pub fn tn_variance(mu: f64, tau: f64) -> f64 {
    let x = -mu * tau.sqrt();
    let lambda = hazard(x);
    (1.0 - lambda * (lambda - x)) / tau
}
