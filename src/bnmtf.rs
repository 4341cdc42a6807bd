//! Variational Bayes for three-factor non-negative matrix factorization,
//! R ≈ F·S·G^T with missing data.
//!
//! F (I x K) and G (J x L) are row/column cluster loadings, S (K x L) links
//! them. Posteriors mirror the two-factor engine: semi-truncated normals on
//! every factor entry, a Gamma on the noise precision. Because the factors
//! multiply through S, the coordinate updates carry covariance correction
//! terms that the two-factor model does not have.
//!
//! The per-coordinate math lives in free functions (`f_coordinate`,
//! `s_coordinate`, `g_coordinate`) shared with the cached variant in
//! `bnmtf_optimised`, so the two variants cannot drift apart numerically.

use log::debug;
use ndarray::Array2;

use crate::bnmf::{checked_shape, validate_mask};
use crate::error::VbError;
use crate::moments::{tn_expectation, tn_variance};
use crate::precision::GammaPosterior;
use crate::scoring::{compute_mse, compute_r2, compute_rp, Performances};

/// Exponential rates for F, S and G plus the Gamma prior on the noise
/// precision.
#[derive(Debug, Clone)]
pub struct BnmtfPriors {
    pub alpha: f64,
    pub beta: f64,
    /// (I, K) exponential rates for F.
    pub lambda_f: Array2<f64>,
    /// (K, L) exponential rates for S.
    pub lambda_s: Array2<f64>,
    /// (J, L) exponential rates for G.
    pub lambda_g: Array2<f64>,
}

/// Optional overrides for `initialise`, same convention as `BnmfInit`.
#[derive(Debug, Clone, Default)]
pub struct BnmtfInit {
    pub mu_f: Option<Array2<f64>>,
    pub tau_f: Option<Array2<f64>>,
    pub mu_s: Option<Array2<f64>>,
    pub tau_s: Option<Array2<f64>>,
    pub mu_g: Option<Array2<f64>>,
    pub tau_g: Option<Array2<f64>>,
    pub alpha_s: Option<f64>,
    pub beta_s: Option<f64>,
}

/// Three-factor VB engine, one coordinate update at a time. Variational
/// state is public for the same white-box reasons as `BnmfVb`.
#[derive(Debug, Clone)]
pub struct BnmtfVb {
    pub r: Array2<f64>,
    pub m: Array2<f64>,
    pub rows: usize,
    pub cols: usize,
    pub k: usize,
    pub l: usize,
    pub size_omega: f64,

    pub alpha: f64,
    pub beta: f64,
    pub lambda_f: Array2<f64>,
    pub lambda_s: Array2<f64>,
    pub lambda_g: Array2<f64>,

    pub mu_f: Array2<f64>,
    pub tau_f: Array2<f64>,
    pub exp_f: Array2<f64>,
    pub var_f: Array2<f64>,

    pub mu_s: Array2<f64>,
    pub tau_s: Array2<f64>,
    pub exp_s: Array2<f64>,
    pub var_s: Array2<f64>,

    pub mu_g: Array2<f64>,
    pub tau_g: Array2<f64>,
    pub exp_g: Array2<f64>,
    pub var_g: Array2<f64>,

    pub precision: GammaPosterior,
    pub exp_tau: f64,
    pub exp_log_tau: f64,
    pub all_exp_tau: Vec<f64>,
}

/// Elementwise second moment, var + exp^2.
fn second_moment(exp: &Array2<f64>, var: &Array2<f64>) -> Array2<f64> {
    exp.mapv(|v| v * v) + var
}

/// Coordinate update for F[i,k] given the cached row products of S and G:
/// `sg` = E[S]·E[G]^T (K x J) and `var_sg` its per-entry variance. Returns
/// the new (tau, mu) pair.
///
/// The `cov` term corrects for G entries appearing both in row k's product
/// and in every other row's product of the same column.
#[allow(clippy::too_many_arguments)]
pub(crate) fn f_coordinate(
    i: usize,
    k: usize,
    r: &Array2<f64>,
    m: &Array2<f64>,
    exp_f: &Array2<f64>,
    exp_s: &Array2<f64>,
    var_g: &Array2<f64>,
    sg: &Array2<f64>,
    var_sg: &Array2<f64>,
    lambda: f64,
    exp_tau: f64,
) -> (f64, f64) {
    let cols = r.ncols();
    let n_l = exp_s.ncols();
    let fs_i = exp_f.row(i).dot(exp_s);
    let f_ik = exp_f[[i, k]];

    let mut precision = 0.0;
    let mut weighted = 0.0;
    for j in 0..cols {
        let m_ij = m[[i, j]];
        if m_ij == 0.0 {
            continue;
        }
        let sg_kj = sg[[k, j]];
        precision += m_ij * (sg_kj * sg_kj + var_sg[[k, j]]);

        let r_pred = exp_f.row(i).dot(&sg.column(j));
        let mut cov = 0.0;
        for l in 0..n_l {
            let s_kl = exp_s[[k, l]];
            cov += s_kl * var_g[[j, l]] * (fs_i[l] - f_ik * s_kl);
        }
        weighted += m_ij * ((r[[i, j]] - r_pred + f_ik * sg_kj) * sg_kj - cov);
    }
    let tau = exp_tau * precision;
    let mu = (-lambda + exp_tau * weighted) / tau;
    (tau, mu)
}

/// Coordinate update for S[k,l]. Needs both cached products, `sg` (K x J)
/// and `fs` = E[F]·E[S] (I x L), since S couples the row and column sides.
#[allow(clippy::too_many_arguments)]
pub(crate) fn s_coordinate(
    k: usize,
    l: usize,
    r: &Array2<f64>,
    m: &Array2<f64>,
    exp_f: &Array2<f64>,
    var_f: &Array2<f64>,
    exp_s: &Array2<f64>,
    exp_g: &Array2<f64>,
    var_g: &Array2<f64>,
    sg: &Array2<f64>,
    fs: &Array2<f64>,
    lambda: f64,
    exp_tau: f64,
) -> (f64, f64) {
    let (rows, cols) = r.dim();
    let s_kl = exp_s[[k, l]];

    let mut precision = 0.0;
    let mut weighted = 0.0;
    for i in 0..rows {
        for j in 0..cols {
            let m_ij = m[[i, j]];
            if m_ij == 0.0 {
                continue;
            }
            let f_ik = exp_f[[i, k]];
            let g_jl = exp_g[[j, l]];
            let second_f = var_f[[i, k]] + f_ik * f_ik;
            let second_g = var_g[[j, l]] + g_jl * g_jl;
            precision += m_ij * second_f * second_g;

            let r_pred = exp_f.row(i).dot(&sg.column(j));
            let cov = var_f[[i, k]] * g_jl * (sg[[k, j]] - s_kl * g_jl)
                + var_g[[j, l]] * f_ik * (fs[[i, l]] - f_ik * s_kl);
            weighted += m_ij * ((r[[i, j]] - r_pred + f_ik * s_kl * g_jl) * f_ik * g_jl - cov);
        }
    }
    let tau = exp_tau * precision;
    let mu = (-lambda + exp_tau * weighted) / tau;
    (tau, mu)
}

/// Coordinate update for G[j,l] given `fs` = E[F]·E[S] (I x L), `var_fs`
/// its per-entry variance, and `sg` for the covariance correction.
#[allow(clippy::too_many_arguments)]
pub(crate) fn g_coordinate(
    j: usize,
    l: usize,
    r: &Array2<f64>,
    m: &Array2<f64>,
    var_f: &Array2<f64>,
    exp_s: &Array2<f64>,
    exp_g: &Array2<f64>,
    sg: &Array2<f64>,
    fs: &Array2<f64>,
    var_fs: &Array2<f64>,
    lambda: f64,
    exp_tau: f64,
) -> (f64, f64) {
    let rows = r.nrows();
    let n_k = exp_s.nrows();
    let g_jl = exp_g[[j, l]];

    let mut precision = 0.0;
    let mut weighted = 0.0;
    for i in 0..rows {
        let m_ij = m[[i, j]];
        if m_ij == 0.0 {
            continue;
        }
        let fs_il = fs[[i, l]];
        precision += m_ij * (fs_il * fs_il + var_fs[[i, l]]);

        let r_pred = fs.row(i).dot(&exp_g.row(j));
        let mut cov = 0.0;
        for k in 0..n_k {
            let s_kl = exp_s[[k, l]];
            cov += var_f[[i, k]] * s_kl * (sg[[k, j]] - s_kl * g_jl);
        }
        weighted += m_ij * ((r[[i, j]] - r_pred + g_jl * fs_il) * fs_il - cov);
    }
    let tau = exp_tau * precision;
    let mu = (-lambda + exp_tau * weighted) / tau;
    (tau, mu)
}

impl BnmtfVb {
    pub fn new(
        r: Array2<f64>,
        m: Array2<f64>,
        k: usize,
        l: usize,
        priors: BnmtfPriors,
    ) -> Result<Self, VbError> {
        if r.dim() != m.dim() {
            return Err(VbError::ShapeMismatch {
                r: r.dim(),
                m: m.dim(),
            });
        }
        let (rows, cols) = r.dim();
        let lambda_f = checked_shape(priors.lambda_f, (rows, k), "lambdaF")?;
        let lambda_s = checked_shape(priors.lambda_s, (k, l), "lambdaS")?;
        let lambda_g = checked_shape(priors.lambda_g, (cols, l), "lambdaG")?;
        validate_mask(&m)?;

        let size_omega = m.sum();
        Ok(Self {
            r,
            m,
            rows,
            cols,
            k,
            l,
            size_omega,
            alpha: priors.alpha,
            beta: priors.beta,
            lambda_f,
            lambda_s,
            lambda_g,
            mu_f: Array2::zeros((rows, k)),
            tau_f: Array2::zeros((rows, k)),
            exp_f: Array2::zeros((rows, k)),
            var_f: Array2::zeros((rows, k)),
            mu_s: Array2::zeros((k, l)),
            tau_s: Array2::zeros((k, l)),
            exp_s: Array2::zeros((k, l)),
            var_s: Array2::zeros((k, l)),
            mu_g: Array2::zeros((cols, l)),
            tau_g: Array2::zeros((cols, l)),
            exp_g: Array2::zeros((cols, l)),
            var_g: Array2::zeros((cols, l)),
            precision: GammaPosterior::new(priors.alpha, priors.beta),
            exp_tau: 0.0,
            exp_log_tau: 0.0,
            all_exp_tau: Vec::new(),
        })
    }

    pub fn initialise(&mut self, init: BnmtfInit) -> Result<(), VbError> {
        let shape_f = (self.rows, self.k);
        let shape_s = (self.k, self.l);
        let shape_g = (self.cols, self.l);

        self.mu_f = match init.mu_f {
            Some(mat) => checked_shape(mat, shape_f, "muF")?,
            None => self.lambda_f.mapv(|v| 1.0 / v),
        };
        self.tau_f = match init.tau_f {
            Some(mat) => checked_shape(mat, shape_f, "tauF")?,
            None => Array2::ones(shape_f),
        };
        self.mu_s = match init.mu_s {
            Some(mat) => checked_shape(mat, shape_s, "muS")?,
            None => self.lambda_s.mapv(|v| 1.0 / v),
        };
        self.tau_s = match init.tau_s {
            Some(mat) => checked_shape(mat, shape_s, "tauS")?,
            None => Array2::ones(shape_s),
        };
        self.mu_g = match init.mu_g {
            Some(mat) => checked_shape(mat, shape_g, "muG")?,
            None => self.lambda_g.mapv(|v| 1.0 / v),
        };
        self.tau_g = match init.tau_g {
            Some(mat) => checked_shape(mat, shape_g, "tauG")?,
            None => Array2::ones(shape_g),
        };
        self.precision.alpha_s = init.alpha_s.unwrap_or(self.alpha);
        self.precision.beta_s = init.beta_s.unwrap_or(self.beta);

        self.update_exp_tau();
        for i in 0..self.rows {
            for k in 0..self.k {
                self.update_exp_f(i, k);
            }
        }
        for k in 0..self.k {
            for l in 0..self.l {
                self.update_exp_s(k, l);
            }
        }
        for j in 0..self.cols {
            for l in 0..self.l {
                self.update_exp_g(j, l);
            }
        }
        Ok(())
    }

    /// E[S]·E[G]^T, shape (K, J).
    pub fn exp_sg(&self) -> Array2<f64> {
        self.exp_s.dot(&self.exp_g.t())
    }

    /// Per-entry variance of (S·G^T)_kj under the factorised posterior.
    pub fn var_sg(&self) -> Array2<f64> {
        let second_s = second_moment(&self.exp_s, &self.var_s);
        let second_g = second_moment(&self.exp_g, &self.var_g);
        let mean_sq_s = self.exp_s.mapv(|v| v * v);
        let mean_sq_g = self.exp_g.mapv(|v| v * v);
        second_s.dot(&second_g.t()) - mean_sq_s.dot(&mean_sq_g.t())
    }

    /// E[F]·E[S], shape (I, L).
    pub fn exp_fs(&self) -> Array2<f64> {
        self.exp_f.dot(&self.exp_s)
    }

    /// Per-entry variance of (F·S)_il under the factorised posterior.
    pub fn var_fs(&self) -> Array2<f64> {
        let second_f = second_moment(&self.exp_f, &self.var_f);
        let second_s = second_moment(&self.exp_s, &self.var_s);
        let mean_sq_f = self.exp_f.mapv(|v| v * v);
        let mean_sq_s = self.exp_s.mapv(|v| v * v);
        second_f.dot(&second_s) - mean_sq_f.dot(&mean_sq_s)
    }

    /// E[ sum over observed (i,j) of (R_ij - F_i S G_j)^2 ]. The variance of
    /// the triple product decomposes into a fully-second-moment term plus
    /// one correction per factor side, all expressible as matrix products.
    pub fn exp_square_diff(&self) -> f64 {
        let sg = self.exp_sg();
        let fs = self.exp_fs();
        let r_pred = self.exp_f.dot(&sg);

        let second_f = second_moment(&self.exp_f, &self.var_f);
        let second_s = second_moment(&self.exp_s, &self.var_s);
        let second_g = second_moment(&self.exp_g, &self.var_g);
        let mean_sq_f = self.exp_f.mapv(|v| v * v);
        let mean_sq_s = self.exp_s.mapv(|v| v * v);
        let mean_sq_g = self.exp_g.mapv(|v| v * v);

        let term_fsg =
            second_f.dot(&second_s).dot(&second_g.t()) - mean_sq_f.dot(&mean_sq_s).dot(&mean_sq_g.t());
        let term_f = self
            .var_f
            .dot(&(sg.mapv(|v| v * v) - mean_sq_s.dot(&mean_sq_g.t())));
        let term_g = (fs.mapv(|v| v * v) - mean_sq_f.dot(&mean_sq_s)).dot(&self.var_g.t());

        let mut total = 0.0;
        for i in 0..self.rows {
            for j in 0..self.cols {
                if self.m[[i, j]] == 0.0 {
                    continue;
                }
                let resid = self.r[[i, j]] - r_pred[[i, j]];
                total += resid * resid + term_fsg[[i, j]] + term_f[[i, j]] + term_g[[i, j]];
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

    pub fn update_f(&mut self, i: usize, k: usize) {
        let sg = self.exp_sg();
        let var_sg = self.var_sg();
        let (tau, mu) = f_coordinate(
            i,
            k,
            &self.r,
            &self.m,
            &self.exp_f,
            &self.exp_s,
            &self.var_g,
            &sg,
            &var_sg,
            self.lambda_f[[i, k]],
            self.exp_tau,
        );
        self.tau_f[[i, k]] = tau;
        self.mu_f[[i, k]] = mu;
    }

    pub fn update_s(&mut self, k: usize, l: usize) {
        let sg = self.exp_sg();
        let fs = self.exp_fs();
        let (tau, mu) = s_coordinate(
            k,
            l,
            &self.r,
            &self.m,
            &self.exp_f,
            &self.var_f,
            &self.exp_s,
            &self.exp_g,
            &self.var_g,
            &sg,
            &fs,
            self.lambda_s[[k, l]],
            self.exp_tau,
        );
        self.tau_s[[k, l]] = tau;
        self.mu_s[[k, l]] = mu;
    }

    pub fn update_g(&mut self, j: usize, l: usize) {
        let sg = self.exp_sg();
        let fs = self.exp_fs();
        let var_fs = self.var_fs();
        let (tau, mu) = g_coordinate(
            j,
            l,
            &self.r,
            &self.m,
            &self.var_f,
            &self.exp_s,
            &self.exp_g,
            &sg,
            &fs,
            &var_fs,
            self.lambda_g[[j, l]],
            self.exp_tau,
        );
        self.tau_g[[j, l]] = tau;
        self.mu_g[[j, l]] = mu;
    }

    pub fn update_exp_f(&mut self, i: usize, k: usize) {
        let exp = tn_expectation(self.mu_f[[i, k]], self.tau_f[[i, k]]);
        let var = tn_variance(self.mu_f[[i, k]], self.tau_f[[i, k]]);
        debug_assert!(exp.is_finite() && var.is_finite());
        self.exp_f[[i, k]] = exp;
        self.var_f[[i, k]] = var;
    }

    pub fn update_exp_s(&mut self, k: usize, l: usize) {
        let exp = tn_expectation(self.mu_s[[k, l]], self.tau_s[[k, l]]);
        let var = tn_variance(self.mu_s[[k, l]], self.tau_s[[k, l]]);
        debug_assert!(exp.is_finite() && var.is_finite());
        self.exp_s[[k, l]] = exp;
        self.var_s[[k, l]] = var;
    }

    pub fn update_exp_g(&mut self, j: usize, l: usize) {
        let exp = tn_expectation(self.mu_g[[j, l]], self.tau_g[[j, l]]);
        let var = tn_variance(self.mu_g[[j, l]], self.tau_g[[j, l]]);
        debug_assert!(exp.is_finite() && var.is_finite());
        self.exp_g[[j, l]] = exp;
        self.var_g[[j, l]] = var;
    }

    /// One pass per iteration over F, then S, then G, then tau, in the same
    /// row-major coordinate order as the cached variant.
    pub fn run(&mut self, iterations: usize) {
        for it in 0..iterations {
            for i in 0..self.rows {
                for k in 0..self.k {
                    self.update_f(i, k);
                    self.update_exp_f(i, k);
                }
            }
            for k in 0..self.k {
                for l in 0..self.l {
                    self.update_s(k, l);
                    self.update_exp_s(k, l);
                }
            }
            for j in 0..self.cols {
                for l in 0..self.l {
                    self.update_g(j, l);
                    self.update_exp_g(j, l);
                }
            }
            self.update_tau();
            self.update_exp_tau();
            self.all_exp_tau.push(self.exp_tau);
            debug!(
                "BNMTF iteration {}: exp(tau) = {:.6e}",
                it + 1,
                self.exp_tau
            );
        }
    }

    pub fn predict(&self, mask: &Array2<f64>) -> Performances {
        let r_pred = self.exp_f.dot(&self.exp_s).dot(&self.exp_g.t());
        Performances {
            mse: compute_mse(mask, &self.r, &r_pred),
            r2: compute_r2(mask, &self.r, &r_pred),
            rp: compute_rp(mask, &self.r, &r_pred),
        }
    }
}
