/*
 * File: /main.rs
 * Created Date: Tuesday, June 17th 2025
 * Author: Zihan
 * -----
 * Last Modified: Friday, 11th July 2025 10:02:19 am
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 */

use std::process;
use std::time::Instant;

use log::{error, info, LevelFilter};
use ndarray::Array2;
use simple_logger::SimpleLogger;

use vb_nmtf::config::Config;
use vb_nmtf::init::exponential_draws;
use vb_nmtf::{BnmtfInit, BnmtfPriors, BnmtfVbOptimised};

const SEED: u64 = 0;

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::new(std::env::args()).map_err(|e| {
        error!("usage: vb_nmtf <R.npy> <M.npy> <K> <L> <iterations>");
        e
    })?;
    let (r, m, k, l, iterations) = config.into_parts();
    let (rows, cols) = r.dim();
    info!(
        "{}: factorising {} x {} matrix ({} observed cells) with K = {}, L = {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        rows,
        cols,
        m.sum() as usize,
        k,
        l
    );

    // Flat hyperparameters; the weak 1/50 rate on S reflects its role as a
    // small linking matrix that has to carry the overall scale of R.
    let priors = BnmtfPriors {
        alpha: 1.0,
        beta: 1.0,
        lambda_f: Array2::ones((rows, k)),
        lambda_s: Array2::from_elem((k, l), 1.0 / 50.0),
        lambda_g: Array2::ones((cols, l)),
    };
    let mu_s = exponential_draws(&priors.lambda_s, SEED)?;

    let mut engine = BnmtfVbOptimised::new(r, m.clone(), k, l, priors)?;
    engine.initialise(BnmtfInit {
        mu_s: Some(mu_s),
        ..Default::default()
    })?;

    let start = Instant::now();
    engine.run(iterations);
    info!(
        "{} iterations in {:?}, final exp(tau) = {:.6e}",
        iterations,
        start.elapsed(),
        engine.core.exp_tau
    );

    let perf = engine.predict(&m);
    info!(
        "training fit: MSE = {:.4}, R^2 = {:.4}, Rp = {:.4}",
        perf.mse, perf.r2, perf.rp
    );
    Ok(())
}

fn main() {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .expect("Failed to initialize logger");

    if let Err(e) = run() {
        error!("{e}");
        process::exit(1);
    }
}
