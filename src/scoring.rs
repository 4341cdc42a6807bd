/**
 * File: ./src/scoring.rs
 * Created Date: Tuesday, June 17th 2025
 * Author: Zihan
 * -----
 * Last Modified: Tuesday, 8th July 2025 3:12:48 pm
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
**/
// src/scoring.rs
//
// Masked prediction-quality measures. All three only look at cells where
// the mask is nonzero; held-out evaluation passes the test mask, in-sample
// evaluation the training mask. The mask must select at least one cell,
// otherwise every statistic is a 0/0.

use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// Prediction quality over the masked entries, as returned by `predict`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Performances {
    /// Mean squared error.
    pub mse: f64,
    /// Coefficient of determination, 1 - SSE/SST.
    pub r2: f64,
    /// Pearson correlation between truth and reconstruction.
    pub rp: f64,
}

/// Average squared error over the masked entries.
pub fn compute_mse(mask: &Array2<f64>, r: &Array2<f64>, r_pred: &Array2<f64>) -> f64 {
    let mut sse = 0.0;
    let mut n = 0.0;
    Zip::from(mask).and(r).and(r_pred).for_each(|&m, &x, &p| {
        if m != 0.0 {
            let d = x - p;
            sse += d * d;
            n += 1.0;
        }
    });
    debug_assert!(n > 0.0, "no observed entries under the mask");
    sse / n
}

/// 1 - SSE/SST over the masked entries, SST taken around the masked mean of
/// the true values.
pub fn compute_r2(mask: &Array2<f64>, r: &Array2<f64>, r_pred: &Array2<f64>) -> f64 {
    let mut sum = 0.0;
    let mut n = 0.0;
    Zip::from(mask).and(r).for_each(|&m, &x| {
        if m != 0.0 {
            sum += x;
            n += 1.0;
        }
    });
    debug_assert!(n > 0.0, "no observed entries under the mask");
    let mean = sum / n;

    let mut sse = 0.0;
    let mut sst = 0.0;
    Zip::from(mask).and(r).and(r_pred).for_each(|&m, &x, &p| {
        if m != 0.0 {
            sse += (x - p) * (x - p);
            sst += (x - mean) * (x - mean);
        }
    });
    1.0 - sse / sst
}

/// Pearson correlation over the masked entries: sample covariance divided by
/// the product of sample standard deviations, both restricted to the mask.
pub fn compute_rp(mask: &Array2<f64>, r: &Array2<f64>, r_pred: &Array2<f64>) -> f64 {
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut n = 0.0;
    Zip::from(mask).and(r).and(r_pred).for_each(|&m, &x, &p| {
        if m != 0.0 {
            sum_x += x;
            sum_y += p;
            n += 1.0;
        }
    });
    debug_assert!(n > 0.0, "no observed entries under the mask");
    let mean_x = sum_x / n;
    let mean_y = sum_y / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    Zip::from(mask).and(r).and(r_pred).for_each(|&m, &x, &p| {
        if m != 0.0 {
            let dx = x - mean_x;
            let dy = p - mean_y;
            cov += dx * dy;
            var_x += dx * dx;
            var_y += dy * dy;
        }
    });
    cov / (var_x.sqrt() * var_y.sqrt())
}
