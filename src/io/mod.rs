//! IO module - configuration and file handling.

mod config;

pub use config::{AtomConfig, Config, PretrainConfig, SystemConfig};
