//! Cached-sweep variant of the three-factor engine.
//!
//! `BnmtfVb::update_f` rebuilds E[S·G^T] and its variance for every single
//! coordinate even though neither S nor G moves during an F sweep, and
//! `update_g` does the same with E[F·S]. This variant hoists those products
//! out of the sweeps. Every coordinate still goes through the exact same
//! kernels as the plain engine, fed the same operand matrices, so the two
//! variants produce the same numbers, not merely close ones.

use log::debug;
use ndarray::Array2;

use crate::bnmtf::{f_coordinate, g_coordinate, BnmtfInit, BnmtfPriors, BnmtfVb};
use crate::error::VbError;
use crate::scoring::Performances;

/// Three-factor VB engine with per-sweep product caches. Holds a plain
/// engine and only overrides the sweep schedule.
#[derive(Debug, Clone)]
pub struct BnmtfVbOptimised {
    pub core: BnmtfVb,
}

impl BnmtfVbOptimised {
    pub fn new(
        r: Array2<f64>,
        m: Array2<f64>,
        k: usize,
        l: usize,
        priors: BnmtfPriors,
    ) -> Result<Self, VbError> {
        Ok(Self {
            core: BnmtfVb::new(r, m, k, l, priors)?,
        })
    }

    pub fn initialise(&mut self, init: BnmtfInit) -> Result<(), VbError> {
        self.core.initialise(init)
    }

    pub fn exp_square_diff(&self) -> f64 {
        self.core.exp_square_diff()
    }

    pub fn run(&mut self, iterations: usize) {
        for it in 0..iterations {
            // S and G are fixed for the whole F sweep, so their product and
            // its variance are too.
            let sg = self.core.exp_sg();
            let var_sg = self.core.var_sg();
            for i in 0..self.core.rows {
                for k in 0..self.core.k {
                    let (tau, mu) = f_coordinate(
                        i,
                        k,
                        &self.core.r,
                        &self.core.m,
                        &self.core.exp_f,
                        &self.core.exp_s,
                        &self.core.var_g,
                        &sg,
                        &var_sg,
                        self.core.lambda_f[[i, k]],
                        self.core.exp_tau,
                    );
                    self.core.tau_f[[i, k]] = tau;
                    self.core.mu_f[[i, k]] = mu;
                    self.core.update_exp_f(i, k);
                }
            }

            // Every S coordinate invalidates both products, nothing to cache.
            for k in 0..self.core.k {
                for l in 0..self.core.l {
                    self.core.update_s(k, l);
                    self.core.update_exp_s(k, l);
                }
            }

            // F and S are fixed for the G sweep; E[S·G^T] is not, since it
            // tracks the G rows being updated, so it is rebuilt per
            // coordinate exactly like the plain engine does.
            let fs = self.core.exp_fs();
            let var_fs = self.core.var_fs();
            for j in 0..self.core.cols {
                for l in 0..self.core.l {
                    let sg = self.core.exp_sg();
                    let (tau, mu) = g_coordinate(
                        j,
                        l,
                        &self.core.r,
                        &self.core.m,
                        &self.core.var_f,
                        &self.core.exp_s,
                        &self.core.exp_g,
                        &sg,
                        &fs,
                        &var_fs,
                        self.core.lambda_g[[j, l]],
                        self.core.exp_tau,
                    );
                    self.core.tau_g[[j, l]] = tau;
                    self.core.mu_g[[j, l]] = mu;
                    self.core.update_exp_g(j, l);
                }
            }

            self.core.update_tau();
            self.core.update_exp_tau();
            self.core.all_exp_tau.push(self.core.exp_tau);
            debug!(
                "BNMTF (cached) iteration {}: exp(tau) = {:.6e}",
                it + 1,
                self.core.exp_tau
            );
        }
    }

    pub fn predict(&self, mask: &Array2<f64>) -> Performances {
        self.core.predict(mask)
    }
}
