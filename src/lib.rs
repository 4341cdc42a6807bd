/*
 * File: /src/lib.rs
 * Created Date: Tuesday, June 17th 2025
 * Author: Zihan
 * -----
 * Last Modified: Friday, 11th July 2025 9:58:26 am
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 */
//! Variational Bayesian non-negative matrix factorization with missing data.
//!
//! Two engines: [`BnmfVb`] factorises R ≈ U·V^T, [`BnmtfVb`] factorises
//! R ≈ F·S·G^T with separate row and column loadings linked through S.
//! [`BnmtfVbOptimised`] is the same model with per-sweep product caches.
//! All three take a binary observation mask and reconstruct the missing
//! cells from the posterior means; `predict` scores the reconstruction on
//! any mask via [`Performances`].

pub mod bnmf;
pub mod bnmtf;
pub mod bnmtf_optimised;
pub mod config;
pub mod error;
pub mod init;
pub mod mask;
pub mod moments;
pub mod precision;
pub mod scoring;

pub use bnmf::{BnmfInit, BnmfPriors, BnmfVb};
pub use bnmtf::{BnmtfInit, BnmtfPriors, BnmtfVb};
pub use bnmtf_optimised::BnmtfVbOptimised;
pub use error::VbError;
pub use scoring::Performances;
