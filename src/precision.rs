//! Gamma posterior over the Gaussian noise precision.

use statrs::function::gamma::digamma;

/// Posterior Gamma(alpha_s, beta_s) over the noise precision tau.
///
/// The conjugate update absorbs the number of observed cells and the
/// expected squared residual under the current factor posteriors.
#[derive(Debug, Clone, PartialEq)]
pub struct GammaPosterior {
    pub alpha_s: f64,
    pub beta_s: f64,
}

impl GammaPosterior {
    pub fn new(alpha_s: f64, beta_s: f64) -> Self {
        Self { alpha_s, beta_s }
    }

    /// Conjugate update from the Gamma prior (alpha, beta), the observed
    /// cell count and the expected squared residual sum.
    pub fn update(&mut self, alpha: f64, beta: f64, n_observed: f64, exp_square_diff: f64) {
        self.alpha_s = alpha + n_observed / 2.0;
        self.beta_s = beta + exp_square_diff / 2.0;
    }

    /// E[tau] = alpha_s / beta_s.
    pub fn expectation(&self) -> f64 {
        self.alpha_s / self.beta_s
    }

    /// E[log tau] = digamma(alpha_s) - log(beta_s).
    pub fn log_expectation(&self) -> f64 {
        digamma(self.alpha_s) - self.beta_s.ln()
    }
}
