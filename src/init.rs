//! Random initial values for the variational means.
//!
//! The engines default to the prior expectation 1/lambda; callers that want
//! randomised restarts draw one exponential sample per entry here and pass
//! the result through the mu overrides of `initialise`.

use ndarray::Array2;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::{Distribution, Exp};

use crate::error::VbError;

/// One draw from Exp(rate) per entry, with the entry's own rate. Seeded for
/// reproducible restarts.
pub fn exponential_draws(rates: &Array2<f64>, seed: u64) -> Result<Array2<f64>, VbError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Array2::zeros(rates.dim());
    for ((i, j), &rate) in rates.indexed_iter() {
        let dist = Exp::new(rate).map_err(|_| VbError::NonPositiveRate { row: i, col: j })?;
        out[[i, j]] = dist.sample(&mut rng);
    }
    Ok(out)
}
