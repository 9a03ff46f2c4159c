//! Pretraining module - Hartree-Fock reference and orbital fitting.

mod hartree_fock;
mod reference;

pub use hartree_fock::{
    pretrain_hartree_fock, pretrain_loss, pretrain_loss_and_grad, OrbitalTarget, PretrainOptions,
};
pub use reference::HartreeFockReference;
