//! Sampling module - Metropolis-Hastings walkers and series statistics.

mod mcmc;
mod stats;

pub use mcmc::{
    mcmc_step, mh_update, mh_update_one_electron, update_width, MCMCParams, Walkers,
};
pub use stats::{autocorrelation_time, blocking_error, mean, variance, SeriesStats};
