use std::fs::File;

/**
 * File: ./src/config.rs
 * Created Date: Tuesday, June 17th 2025
 * Author: Zihan
 * -----
 * Last Modified: Wednesday, 9th July 2025 11:21:37 am
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
**/
use ndarray::Array2;
use ndarray_npy::ReadNpyExt;

/// Command-line configuration: the data matrix, its observation mask, the
/// factor ranks and the iteration count.
pub struct Config {
    r: Array2<f64>,
    m: Array2<f64>,
    k: usize,
    l: usize,
    iterations: usize,
}

impl Config {
    /// constructor
    ///
    /// # Examples
    /// ```bash
    /// $ cargo run -- data/R.npy data/M.npy 10 5 200
    /// ```
    pub fn new(
        mut args: impl Iterator<Item = String>,
    ) -> Result<Config, Box<dyn std::error::Error>> {
        // args:
        // 0: program name
        // 1: R npy path
        // 2: M npy path
        // 3: K
        // 4: L
        // 5: iterations
        args.next();
        let r_path = args.next().ok_or("missing R matrix path")?;
        let m_path = args.next().ok_or("missing M mask path")?;
        let r = Array2::<f64>::read_npy(File::open(r_path)?)?;
        let m = Array2::<f64>::read_npy(File::open(m_path)?)?;
        let k = args.next().ok_or("missing K")?.parse::<usize>()?;
        let l = args.next().ok_or("missing L")?.parse::<usize>()?;
        let iterations = args.next().ok_or("missing iteration count")?.parse::<usize>()?;

        Ok(Config {
            r,
            m,
            k,
            l,
            iterations,
        })
    }

    pub fn get_r(&self) -> &Array2<f64> {
        &self.r
    }

    pub fn get_m(&self) -> &Array2<f64> {
        &self.m
    }

    pub fn get_k(&self) -> usize {
        self.k
    }

    pub fn get_l(&self) -> usize {
        self.l
    }

    pub fn get_iterations(&self) -> usize {
        self.iterations
    }

    /// Consume the config, handing the matrices to the engine without a copy.
    pub fn into_parts(self) -> (Array2<f64>, Array2<f64>, usize, usize, usize) {
        (self.r, self.m, self.k, self.l, self.iterations)
    }
}
