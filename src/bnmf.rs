/**
 * File: ./src/bnmf.rs
 * Created Date: Wednesday, June 18th 2025
 * Author: Zihan
 * -----
 * Last Modified: Friday, 11th July 2025 9:41:02 am
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
**/
// src/bnmf.rs
//
// Variational Bayes for two-factor non-negative matrix factorization,
// R ≈ U·V^T with missing data. Factor entries carry exponential priors and
// semi-truncated-normal posteriors; the noise precision carries a Gamma
// prior/posterior. Updates are Gauss-Seidel: every coordinate update reads
// the freshest expectations of all other coordinates, so the sweep order
// below (U entries row-major, then V entries row-major, then tau) is part
// of the algorithm and fixed.

use log::debug;
use ndarray::{Array2, Axis};

use crate::error::VbError;
use crate::moments::{tn_expectation, tn_variance};
use crate::precision::GammaPosterior;
use crate::scoring::{compute_mse, compute_r2, compute_rp, Performances};

/// Exponential rates for U and V plus the Gamma prior on the noise
/// precision.
#[derive(Debug, Clone)]
pub struct BnmfPriors {
    pub alpha: f64,
    pub beta: f64,
    /// (I, K) exponential rates for U.
    pub lambda_u: Array2<f64>,
    /// (J, K) exponential rates for V.
    pub lambda_v: Array2<f64>,
}

/// Optional overrides for `initialise`. Every field left as `None` falls
/// back to its documented default: tau = 1, mu = 1/lambda, alpha_s = alpha,
/// beta_s = beta.
#[derive(Debug, Clone, Default)]
pub struct BnmfInit {
    pub mu_u: Option<Array2<f64>>,
    pub tau_u: Option<Array2<f64>>,
    pub mu_v: Option<Array2<f64>>,
    pub tau_v: Option<Array2<f64>>,
    pub alpha_s: Option<f64>,
    pub beta_s: Option<f64>,
}

/// Two-factor VB engine. Variational state is public so that tests (and
/// callers composing their own schedules) can read or seed it directly.
#[derive(Debug, Clone)]
pub struct BnmfVb {
    pub r: Array2<f64>,
    pub m: Array2<f64>,
    pub rows: usize,
    pub cols: usize,
    pub k: usize,
    /// Number of observed cells, sum(M).
    pub size_omega: f64,

    pub alpha: f64,
    pub beta: f64,
    pub lambda_u: Array2<f64>,
    pub lambda_v: Array2<f64>,

    pub mu_u: Array2<f64>,
    pub tau_u: Array2<f64>,
    pub exp_u: Array2<f64>,
    pub var_u: Array2<f64>,

    pub mu_v: Array2<f64>,
    pub tau_v: Array2<f64>,
    pub exp_v: Array2<f64>,
    pub var_v: Array2<f64>,

    pub precision: GammaPosterior,
    pub exp_tau: f64,
    pub exp_log_tau: f64,
    /// E[tau] after each completed iteration, for convergence monitoring.
    pub all_exp_tau: Vec<f64>,
}

/// Every row and column of the mask must contain at least one observation,
/// otherwise the corresponding factor row has no likelihood term at all.
pub(crate) fn validate_mask(m: &Array2<f64>) -> Result<(), VbError> {
    for (i, row) in m.axis_iter(Axis(0)).enumerate() {
        if row.sum() == 0.0 {
            return Err(VbError::UnobservedRow(i));
        }
    }
    for (j, col) in m.axis_iter(Axis(1)).enumerate() {
        if col.sum() == 0.0 {
            return Err(VbError::UnobservedColumn(j));
        }
    }
    Ok(())
}

pub(crate) fn checked_shape(
    matrix: Array2<f64>,
    expected: (usize, usize),
    name: &'static str,
) -> Result<Array2<f64>, VbError> {
    if matrix.dim() == expected {
        Ok(matrix)
    } else {
        Err(VbError::PriorShape {
            name,
            got: matrix.dim(),
            expected,
        })
    }
}

impl BnmfVb {
    pub fn new(
        r: Array2<f64>,
        m: Array2<f64>,
        k: usize,
        priors: BnmfPriors,
    ) -> Result<Self, VbError> {
        if r.dim() != m.dim() {
            return Err(VbError::ShapeMismatch {
                r: r.dim(),
                m: m.dim(),
            });
        }
        let (rows, cols) = r.dim();
        let lambda_u = checked_shape(priors.lambda_u, (rows, k), "lambdaU")?;
        let lambda_v = checked_shape(priors.lambda_v, (cols, k), "lambdaV")?;
        validate_mask(&m)?;

        let size_omega = m.sum();
        Ok(Self {
            r,
            m,
            rows,
            cols,
            k,
            size_omega,
            alpha: priors.alpha,
            beta: priors.beta,
            lambda_u,
            lambda_v,
            mu_u: Array2::zeros((rows, k)),
            tau_u: Array2::zeros((rows, k)),
            exp_u: Array2::zeros((rows, k)),
            var_u: Array2::zeros((rows, k)),
            mu_v: Array2::zeros((cols, k)),
            tau_v: Array2::zeros((cols, k)),
            exp_v: Array2::zeros((cols, k)),
            var_v: Array2::zeros((cols, k)),
            precision: GammaPosterior::new(priors.alpha, priors.beta),
            exp_tau: 0.0,
            exp_log_tau: 0.0,
            all_exp_tau: Vec::new(),
        })
    }

    /// Set the variational parameters to their defaults (or the given
    /// overrides) and derive all expectations from them.
    pub fn initialise(&mut self, init: BnmfInit) -> Result<(), VbError> {
        let shape_u = (self.rows, self.k);
        let shape_v = (self.cols, self.k);

        self.mu_u = match init.mu_u {
            Some(mat) => checked_shape(mat, shape_u, "muU")?,
            None => self.lambda_u.mapv(|l| 1.0 / l),
        };
        self.tau_u = match init.tau_u {
            Some(mat) => checked_shape(mat, shape_u, "tauU")?,
            None => Array2::ones(shape_u),
        };
        self.mu_v = match init.mu_v {
            Some(mat) => checked_shape(mat, shape_v, "muV")?,
            None => self.lambda_v.mapv(|l| 1.0 / l),
        };
        self.tau_v = match init.tau_v {
            Some(mat) => checked_shape(mat, shape_v, "tauV")?,
            None => Array2::ones(shape_v),
        };
        self.precision.alpha_s = init.alpha_s.unwrap_or(self.alpha);
        self.precision.beta_s = init.beta_s.unwrap_or(self.beta);

        self.update_exp_tau();
        for i in 0..self.rows {
            for k in 0..self.k {
                self.update_exp_u(i, k);
            }
        }
        for j in 0..self.cols {
            for k in 0..self.k {
                self.update_exp_v(j, k);
            }
        }
        Ok(())
    }

    /// E[ sum over observed (i,j) of (R_ij - U_i · V_j)^2 ] under the
    /// current posteriors: squared residual of the expected reconstruction
    /// plus the per-cell variance of U_i · V_j.
    pub fn exp_square_diff(&self) -> f64 {
        let mut total = 0.0;
        for i in 0..self.rows {
            for j in 0..self.cols {
                if self.m[[i, j]] == 0.0 {
                    continue;
                }
                let dot = self.exp_u.row(i).dot(&self.exp_v.row(j));
                let resid = self.r[[i, j]] - dot;
                let mut variance = 0.0;
                for k in 0..self.k {
                    let u = self.exp_u[[i, k]];
                    let v = self.exp_v[[j, k]];
                    variance += (self.var_u[[i, k]] + u * u) * (self.var_v[[j, k]] + v * v)
                        - u * u * v * v;
                }
                total += resid * resid + variance;
            }
        }
        total
    }

    pub fn update_tau(&mut self) {
        let esd = self.exp_square_diff();
        self.precision
            .update(self.alpha, self.beta, self.size_omega, esd);
    }

    pub fn update_exp_tau(&mut self) {
        self.exp_tau = self.precision.expectation();
        self.exp_log_tau = self.precision.log_expectation();
    }

    /// Coordinate update for U[i,k], reading the current expectations of
    /// everything else. The residual term adds the coordinate's own
    /// contribution back before re-estimating it.
    pub fn update_u(&mut self, i: usize, k: usize) {
        let mut precision = 0.0;
        let mut weighted = 0.0;
        for j in 0..self.cols {
            let m_ij = self.m[[i, j]];
            if m_ij == 0.0 {
                continue;
            }
            let v_jk = self.exp_v[[j, k]];
            precision += m_ij * (v_jk * v_jk + self.var_v[[j, k]]);
            let dot = self.exp_u.row(i).dot(&self.exp_v.row(j));
            weighted += m_ij * (self.r[[i, j]] - dot + self.exp_u[[i, k]] * v_jk) * v_jk;
        }
        let tau_uik = self.exp_tau * precision;
        self.tau_u[[i, k]] = tau_uik;
        self.mu_u[[i, k]] = (-self.lambda_u[[i, k]] + self.exp_tau * weighted) / tau_uik;
    }

    pub fn update_v(&mut self, j: usize, k: usize) {
        let mut precision = 0.0;
        let mut weighted = 0.0;
        for i in 0..self.rows {
            let m_ij = self.m[[i, j]];
            if m_ij == 0.0 {
                continue;
            }
            let u_ik = self.exp_u[[i, k]];
            precision += m_ij * (u_ik * u_ik + self.var_u[[i, k]]);
            let dot = self.exp_u.row(i).dot(&self.exp_v.row(j));
            weighted += m_ij * (self.r[[i, j]] - dot + u_ik * self.exp_v[[j, k]]) * u_ik;
        }
        let tau_vjk = self.exp_tau * precision;
        self.tau_v[[j, k]] = tau_vjk;
        self.mu_v[[j, k]] = (-self.lambda_v[[j, k]] + self.exp_tau * weighted) / tau_vjk;
    }

    pub fn update_exp_u(&mut self, i: usize, k: usize) {
        let mu = self.mu_u[[i, k]];
        let tau = self.tau_u[[i, k]];
        let exp = tn_expectation(mu, tau);
        let var = tn_variance(mu, tau);
        debug_assert!(exp.is_finite() && var.is_finite());
        self.exp_u[[i, k]] = exp;
        self.var_u[[i, k]] = var;
    }

    pub fn update_exp_v(&mut self, j: usize, k: usize) {
        let mu = self.mu_v[[j, k]];
        let tau = self.tau_v[[j, k]];
        let exp = tn_expectation(mu, tau);
        let var = tn_variance(mu, tau);
        debug_assert!(exp.is_finite() && var.is_finite());
        self.exp_v[[j, k]] = exp;
        self.var_v[[j, k]] = var;
    }

    /// Run the given number of coordinate-ascent iterations, appending
    /// E[tau] to the trace after each one.
    pub fn run(&mut self, iterations: usize) {
        for it in 0..iterations {
            for i in 0..self.rows {
                for k in 0..self.k {
                    self.update_u(i, k);
                    self.update_exp_u(i, k);
                }
            }
            for j in 0..self.cols {
                for k in 0..self.k {
                    self.update_v(j, k);
                    self.update_exp_v(j, k);
                }
            }
            self.update_tau();
            self.update_exp_tau();
            self.all_exp_tau.push(self.exp_tau);
            debug!("BNMF iteration {}: exp(tau) = {:.6e}", it + 1, self.exp_tau);
        }
    }

    /// Reconstruct from the posterior means and score against R on the
    /// given mask.
    pub fn predict(&self, mask: &Array2<f64>) -> Performances {
        let r_pred = self.exp_u.dot(&self.exp_v.t());
        Performances {
            mse: compute_mse(mask, &self.r, &r_pred),
            r2: compute_r2(mask, &self.r, &r_pred),
            rp: compute_rp(mask, &self.r, &r_pred),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn priors(rows: usize, cols: usize, k: usize) -> BnmfPriors {
        BnmfPriors {
            alpha: 3.0,
            beta: 1.0,
            lambda_u: Array2::from_elem((rows, k), 2.0),
            lambda_v: Array2::from_elem((cols, k), 3.0),
        }
    }

    /// M with three holes, as used by most of the update tests below.
    fn holed_mask(rows: usize, cols: usize) -> Array2<f64> {
        let mut m = Array2::ones((rows, cols));
        m[[0, 0]] = 0.0;
        m[[2, 2]] = 0.0;
        m[[3, 1]] = 0.0;
        m
    }

    #[test]
    fn test_new_rejects_shape_mismatch() {
        let r = Array2::<f64>::ones((3, 2));
        let m = Array2::<f64>::ones((2, 3));
        let err = BnmfVb::new(r, m, 1, priors(2, 3, 1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Input matrix R is not of the same size as the indicator matrix M: (3, 2) and (2, 3) respectively."
        );
    }

    #[test]
    fn test_new_rejects_bad_prior_shapes() {
        let r = Array2::<f64>::ones((2, 3));
        let m = Array2::<f64>::ones((2, 3));
        let mut p = priors(2, 3, 1);
        p.lambda_u = Array2::ones((3, 1));
        let err = BnmfVb::new(r.clone(), m.clone(), 1, p).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Prior matrix lambdaU has the wrong shape: (3, 1) instead of (2, 1)."
        );

        let mut p = priors(2, 3, 1);
        p.lambda_v = Array2::ones((4, 1));
        let err = BnmfVb::new(r, m, 1, p).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Prior matrix lambdaV has the wrong shape: (4, 1) instead of (3, 1)."
        );
    }

    #[test]
    fn test_new_rejects_unobserved_rows_and_columns() {
        let r = Array2::<f64>::ones((2, 3));
        let m1 = array![[1.0, 1.0, 1.0], [0.0, 0.0, 0.0]];
        let err = BnmfVb::new(r.clone(), m1, 1, priors(2, 3, 1)).unwrap_err();
        assert_eq!(err.to_string(), "Fully unobserved row in R, row 1.");

        let m2 = array![[1.0, 1.0, 0.0], [1.0, 0.0, 0.0]];
        let err = BnmfVb::new(r, m2, 1, priors(2, 3, 1)).unwrap_err();
        assert_eq!(err.to_string(), "Fully unobserved column in R, column 2.");
    }

    #[test]
    fn test_new_stores_inputs() {
        let (rows, cols, k) = (3, 2, 2);
        let r = Array2::from_elem((rows, cols), 2.0);
        let m = Array2::ones((rows, cols));
        let engine = BnmfVb::new(r.clone(), m.clone(), k, priors(rows, cols, k)).unwrap();
        assert_eq!(engine.r, r);
        assert_eq!(engine.m, m);
        assert_eq!(engine.rows, rows);
        assert_eq!(engine.cols, cols);
        assert_eq!(engine.k, k);
        assert_eq!(engine.size_omega, (rows * cols) as f64);
        assert_eq!(engine.alpha, 3.0);
        assert_eq!(engine.beta, 1.0);
    }

    #[test]
    fn test_initialise_defaults() {
        let (rows, cols, k) = (5, 3, 2);
        let r = Array2::ones((rows, cols));
        let m = Array2::ones((rows, cols));
        let mut engine = BnmfVb::new(r, m, k, priors(rows, cols, k)).unwrap();
        engine.initialise(BnmfInit::default()).unwrap();

        assert_eq!(engine.precision.alpha_s, 3.0);
        assert_eq!(engine.precision.beta_s, 1.0);
        assert_eq!(engine.exp_tau, 3.0);
        for v in engine.tau_u.iter() {
            assert_eq!(*v, 1.0);
        }
        for v in engine.mu_u.iter() {
            assert_eq!(*v, 0.5);
        }
        for v in engine.tau_v.iter() {
            assert_eq!(*v, 1.0);
        }
        for v in engine.mu_v.iter() {
            assert_eq!(*v, 1.0 / 3.0);
        }
        // Truncated-normal expectations derived from the defaults.
        for v in engine.exp_u.iter() {
            assert!((*v - (0.5 + 0.352065 / (1.0 - 0.3085))).abs() < 1e-4);
        }
        for v in engine.exp_v.iter() {
            assert!((*v - (1.0 / 3.0 + 0.377383 / (1.0 - 0.3694))).abs() < 1e-4);
        }
    }

    #[test]
    fn test_initialise_with_overrides() {
        let (rows, cols, k) = (5, 3, 2);
        let r = Array2::ones((rows, cols));
        let m = Array2::ones((rows, cols));

        let mut engine =
            BnmfVb::new(r.clone(), m.clone(), k, priors(rows, cols, k)).unwrap();
        engine
            .initialise(BnmfInit {
                mu_u: Some(Array2::from_elem((rows, k), 100.0)),
                tau_v: Some(Array2::from_elem((cols, k), 5.0)),
                alpha_s: Some(12.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(engine.precision.alpha_s, 12.0);
        assert_eq!(engine.precision.beta_s, 1.0);
        assert!(engine.mu_u.iter().all(|&v| v == 100.0));
        assert!(engine.tau_u.iter().all(|&v| v == 1.0));
        assert!(engine.mu_v.iter().all(|&v| v == 1.0 / 3.0));
        assert!(engine.tau_v.iter().all(|&v| v == 5.0));

        let mut engine = BnmfVb::new(r, m, k, priors(rows, cols, k)).unwrap();
        engine
            .initialise(BnmfInit {
                tau_u: Some(Array2::from_elem((rows, k), 10.0)),
                mu_v: Some(Array2::from_elem((cols, k), 200.0)),
                beta_s: Some(13.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(engine.precision.alpha_s, 3.0);
        assert_eq!(engine.precision.beta_s, 13.0);
        assert!(engine.mu_u.iter().all(|&v| v == 0.5));
        assert!(engine.tau_u.iter().all(|&v| v == 10.0));
        assert!(engine.mu_v.iter().all(|&v| v == 200.0));
        assert!(engine.tau_v.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_initialise_rejects_bad_override_shape() {
        let (rows, cols, k) = (5, 3, 2);
        let r = Array2::ones((rows, cols));
        let m = Array2::ones((rows, cols));
        let mut engine = BnmfVb::new(r, m, k, priors(rows, cols, k)).unwrap();
        let err = engine
            .initialise(BnmfInit {
                mu_u: Some(Array2::ones((rows + 1, k))),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(
            err,
            VbError::PriorShape {
                name: "muU",
                got: (6, 2),
                expected: (5, 2),
            }
        );
    }

    /// Seed the engine with the fixed white-box state used by the closed
    /// form tests: expU = 1/2, expV = 1/3, varU = 2, varV = 3, exptau = 3.
    fn seeded_engine() -> BnmfVb {
        let (rows, cols, k) = (5, 3, 2);
        let r = Array2::ones((rows, cols));
        let m = holed_mask(rows, cols);
        let mut engine = BnmfVb::new(r, m, k, priors(rows, cols, k)).unwrap();
        engine.exp_u = Array2::from_elem((rows, k), 0.5);
        engine.exp_v = Array2::from_elem((cols, k), 1.0 / 3.0);
        engine.var_u = Array2::from_elem((rows, k), 2.0);
        engine.var_v = Array2::from_elem((cols, k), 3.0);
        engine.exp_tau = 3.0;
        engine
    }

    #[test]
    fn test_exp_square_diff() {
        let engine = seeded_engine();
        // 12 observed cells; per cell (1 - 1/3)^2 residual plus
        // 2 * (2.25 * (3 + 1/9) - 0.25/9) variance.
        let expected = 172.66666666666666;
        assert!((engine.exp_square_diff() - expected).abs() < 1e-10);
    }

    #[test]
    fn test_update_tau() {
        let mut engine = seeded_engine();
        engine.update_tau();
        assert!((engine.precision.alpha_s - (3.0 + 12.0 / 2.0)).abs() < 1e-12);
        assert!((engine.precision.beta_s - (1.0 + 172.66666666666666 / 2.0)).abs() < 1e-10);
    }

    #[test]
    fn test_update_u_matches_closed_form() {
        for i in 0..5 {
            for k in 0..2 {
                let mut engine = seeded_engine();
                engine.update_u(i, k);

                let mut precision = 0.0;
                let mut weighted = 0.0;
                for j in 0..3 {
                    let m_ij = engine.m[[i, j]];
                    let v = 1.0 / 3.0;
                    precision += m_ij * (v * v + 3.0);
                    let dot = 2.0 * 0.5 * v;
                    weighted += m_ij * (1.0 - dot + 0.5 * v) * v;
                }
                let tau = 3.0 * precision;
                let mu = (-2.0 + 3.0 * weighted) / tau;
                assert!((engine.tau_u[[i, k]] - tau).abs() < 1e-12);
                assert!((engine.mu_u[[i, k]] - mu).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_update_v_matches_closed_form() {
        for j in 0..3 {
            for k in 0..2 {
                let mut engine = seeded_engine();
                engine.update_v(j, k);

                let mut precision = 0.0;
                let mut weighted = 0.0;
                for i in 0..5 {
                    let m_ij = engine.m[[i, j]];
                    let u = 0.5;
                    precision += m_ij * (u * u + 2.0);
                    let dot = 2.0 * 0.5 * (1.0 / 3.0);
                    weighted += m_ij * (1.0 - dot + u * (1.0 / 3.0)) * u;
                }
                let tau = 3.0 * precision;
                let mu = (-3.0 + 3.0 * weighted) / tau;
                assert!((engine.tau_v[[j, k]] - tau).abs() < 1e-12);
                assert!((engine.mu_v[[j, k]] - mu).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_update_exp_u() {
        let (rows, cols, k) = (5, 3, 2);
        let r = Array2::ones((rows, cols));
        let m = Array2::ones((rows, cols));
        let mut engine = BnmfVb::new(r, m, k, priors(rows, cols, k)).unwrap();
        engine
            .initialise(BnmfInit {
                tau_u: Some(Array2::from_elem((rows, k), 4.0)),
                ..Default::default()
            })
            .unwrap();
        // muU = 1/2, tauU = 4: x = -1, lambda = 0.2876155949126352,
        // gamma = 0.37033832534958433.
        for i in 0..rows {
            for kk in 0..k {
                engine.update_exp_u(i, kk);
                assert!((engine.exp_u[[i, kk]] - (0.5 + 0.2876155949126352 / 2.0)).abs() < 1e-5);
                assert!(
                    (engine.var_u[[i, kk]] - 0.25 * (1.0 - 0.37033832534958433)).abs() < 1e-5
                );
            }
        }
    }

    #[test]
    fn test_update_exp_tau() {
        let (rows, cols, k) = (5, 3, 2);
        let r = Array2::ones((rows, cols));
        let m = Array2::ones((rows, cols));
        let mut engine = BnmfVb::new(r, m, k, priors(rows, cols, k)).unwrap();
        engine.initialise(BnmfInit::default()).unwrap();
        engine.update_exp_tau();
        assert_eq!(engine.exp_tau, 3.0);
        assert!((engine.exp_log_tau - 0.9227843350984671).abs() < 1e-12);
    }

    #[test]
    fn test_run_changes_everything_and_stays_finite() {
        let (rows, cols, k) = (10, 5, 2);
        let mut r = Array2::ones((rows, cols));
        r[[0, 1]] = 2.0;
        r[[0, 2]] = 3.0;
        let m = holed_mask(rows, cols);
        let mut engine = BnmfVb::new(r, m, k, priors(rows, cols, k)).unwrap();
        engine.initialise(BnmfInit::default()).unwrap();
        engine.run(2);

        for i in 0..rows {
            for kk in 0..k {
                assert!(engine.mu_u[[i, kk]] != 0.5);
                assert!(engine.tau_u[[i, kk]] != 1.0);
                assert!(engine.exp_u[[i, kk]].is_finite());
                assert!(engine.tau_u[[i, kk]].is_finite());
            }
        }
        for j in 0..cols {
            for kk in 0..k {
                assert!(engine.mu_v[[j, kk]] != 1.0 / 3.0);
                assert!(engine.tau_v[[j, kk]] != 1.0);
                assert!(engine.exp_v[[j, kk]].is_finite());
                assert!(engine.tau_v[[j, kk]].is_finite());
            }
        }
        assert!(engine.precision.alpha_s != 3.0);
        assert!(engine.precision.beta_s != 1.0);
        assert!(engine.exp_tau.is_finite());
        assert!(engine.exp_log_tau.is_finite());
        assert_eq!(engine.all_exp_tau.len(), 2);
    }

    #[test]
    fn test_predict_worked_example() {
        let r = array![
            [1.0, 2.0, 3.0],
            [4.0, 5.0, 6.0],
            [7.0, 8.0, 9.0],
            [10.0, 11.0, 12.0],
            [13.0, 14.0, 15.0]
        ];
        let m = Array2::ones((5, 3));
        let mut engine = BnmfVb::new(r, m, 2, priors(5, 3, 2)).unwrap();
        engine.exp_u = array![
            [125.0, 126.0],
            [126.0, 126.0],
            [126.0, 126.0],
            [126.0, 126.0],
            [126.0, 126.0]
        ];
        engine.exp_v = array![[84.0, 84.0], [84.0, 84.0], [84.0, 84.0]];

        let m_test = array![
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 0.0, 0.0]
        ];
        let perf = engine.predict(&m_test);

        let sse = 444408561.0 + 447872569.0 + 447660964.0 + 447618649.0;
        let mse = sse / 4.0;
        // Masked mean of the truth is 7.25.
        let r2 = 1.0 - sse / (4.25f64.powi(2) + 2.25f64.powi(2) + 2.75f64.powi(2) + 3.75f64.powi(2));
        let rp = 357.0 / (44.75f64.sqrt() * 5292.0f64.sqrt());

        assert!((perf.mse - mse).abs() < 1e-2);
        assert!(((perf.r2 - r2) / r2).abs() < 1e-10);
        assert!((perf.rp - rp).abs() < 1e-10);
    }
}
