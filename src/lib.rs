//! FermiNet - neural-network variational Monte Carlo in Rust
//!
//! This crate provides a compact FermiNet-style wavefunction for molecules and
//! periodic solids, Metropolis-Hastings sampling, local energies with Ewald
//! summation, Hartree-Fock pretraining and energy-minimizing training.

pub mod error;
pub mod system;
pub mod wavefunction;
pub mod network;
pub mod hamiltonian;
pub mod sampling;
pub mod optim;
pub mod pretrain;
pub mod train;
pub mod io;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use system::{init_electrons, make_kpoints, Atom, Lattice, System};
pub use wavefunction::{BasisFunction, LogWfn, OptimizableWfn, SingleWfn};
pub use network::{FermiNet, NetworkOptions};
pub use hamiltonian::{EwaldPotential, Hamiltonian};
pub use sampling::{mcmc_step, mh_update, MCMCParams, SeriesStats, Walkers};
pub use optim::{Adam, AdamOptions};
pub use pretrain::{pretrain_hartree_fock, HartreeFockReference, PretrainOptions};
pub use train::{evaluate_energy, TrainOptions, TrainStats, VmcTrainer};
pub use io::Config;
