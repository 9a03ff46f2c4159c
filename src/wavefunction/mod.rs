//! Wavefunction module - traits, basis functions and log-domain determinants.

mod basis;
mod slogdet;
mod traits;

pub use basis::{sto3g, BasisFunction, ContractedGaussian, GaussianPrimitive, Sto};
pub use slogdet::{logsumexp_signed, slogdet};
pub use traits::{finite_difference_log_derivatives, LogWfn, OptimizableWfn, SingleWfn};
