//! Train/test mask generation over the observed cells of a data matrix.
//!
//! Splits operate on the observed entries of an existing mask M, so the
//! train and test masks are disjoint and their union is M. Training masks
//! are re-drawn until they satisfy the engines' no-empty-row/column rule,
//! since a split that starves a row of observations is unusable.

use ndarray::Array2;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::seq::SliceRandom;
use ndarray_rand::rand::SeedableRng;

use crate::bnmf::validate_mask;
use crate::error::VbError;

const SPLIT_ATTEMPTS: usize = 100;

fn observed_cells(m: &Array2<f64>) -> Vec<(usize, usize)> {
    m.indexed_iter()
        .filter(|(_, &v)| v != 0.0)
        .map(|(idx, _)| idx)
        .collect()
}

/// Hold out `test_fraction` of the observed cells, uniformly at random.
/// Returns (train, test). Re-shuffles until the training mask keeps at
/// least one observation in every row and column, and fails with the last
/// violation if the input cannot support such a split.
pub fn random_split(
    m: &Array2<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<(Array2<f64>, Array2<f64>), VbError> {
    validate_mask(m)?;
    let mut cells = observed_cells(m);
    let n_test = ((test_fraction * cells.len() as f64).round() as usize).min(cells.len());
    let mut rng = StdRng::seed_from_u64(seed);

    let mut attempt = 0;
    loop {
        cells.shuffle(&mut rng);
        let mut train = m.clone();
        let mut test = Array2::zeros(m.dim());
        for &(i, j) in &cells[..n_test] {
            train[[i, j]] = 0.0;
            test[[i, j]] = 1.0;
        }
        match validate_mask(&train) {
            Ok(()) => return Ok((train, test)),
            Err(e) if attempt + 1 == SPLIT_ATTEMPTS => return Err(e),
            Err(_) => attempt += 1,
        }
    }
}

/// Partition the observed cells into `n_folds` disjoint test masks for
/// cross-validation; each pair is (train, test) with train = M minus the
/// fold. The test masks cover M exactly once. Fold sizes differ by at most
/// one cell.
pub fn folds(m: &Array2<f64>, n_folds: usize, seed: u64) -> Vec<(Array2<f64>, Array2<f64>)> {
    let mut cells = observed_cells(m);
    cells.shuffle(&mut StdRng::seed_from_u64(seed));

    let mut out = Vec::with_capacity(n_folds);
    for f in 0..n_folds {
        let mut train = m.clone();
        let mut test = Array2::zeros(m.dim());
        for (idx, &(i, j)) in cells.iter().enumerate() {
            if idx % n_folds == f {
                train[[i, j]] = 0.0;
                test[[i, j]] = 1.0;
            }
        }
        out.push((train, test));
    }
    out
}
