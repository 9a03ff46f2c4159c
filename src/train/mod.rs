//! Training module - energy minimization of optimizable wavefunctions.

mod vmc;

pub use vmc::{
    clip_local_energies, energy_gradient, evaluate_energy, learning_rate, local_energies,
    TrainOptions, TrainStats, VmcTrainer,
};
