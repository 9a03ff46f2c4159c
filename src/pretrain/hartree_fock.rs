//! Supervised fit of the network orbitals to a Hartree-Fock reference.

use log::info;
use nalgebra::{DMatrix, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::reference::HartreeFockReference;
use crate::error::{Error, Result};
use crate::network::{FermiNet, Orbitals};
use crate::optim::{Adam, AdamOptions};
use crate::sampling::{mh_update, Walkers};
use crate::wavefunction::{LogWfn, OptimizableWfn};

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct PretrainOptions {
    pub iterations: usize,
    pub optimizer: AdamOptions,
}

impl Default for PretrainOptions {
    fn default() -> Self {
        Self {
            iterations: 1000,
            optimizer: AdamOptions::default(),
        }
    }
}

/// Reference orbitals of one configuration, `(alpha, beta)`.
pub type OrbitalTarget = (DMatrix<f64>, DMatrix<f64>);

/// Reference orbitals laid out like the network's determinant blocks.
///
/// A full determinant is compared with the block-diagonal matrix
/// `[[alpha, 0], [0, beta]]`.
fn target_blocks(full_det: bool, target: &OrbitalTarget) -> Vec<DMatrix<f64>> {
    let (alpha, beta) = target;
    if !full_det {
        return vec![alpha.clone(), beta.clone()];
    }
    let (na, nb) = (alpha.nrows(), beta.nrows());
    let mut full = DMatrix::zeros(na + nb, na + nb);
    full.view_mut((0, 0), (na, na)).copy_from(alpha);
    full.view_mut((na, na), (nb, nb)).copy_from(beta);
    vec![full]
}

fn loss_and_cotangents(
    network: &FermiNet,
    batch: &[Vec<Vector3<f64>>],
    targets: &[OrbitalTarget],
) -> (f64, Vec<Orbitals>) {
    let full_det = network.options().full_det;
    let ndet = network.options().determinants;
    let mut loss = 0.0;
    let mut cotangents = Vec::with_capacity(batch.len());

    for (r, target) in batch.iter().zip(targets.iter()) {
        let blocks = target_blocks(full_det, target);
        let orbitals = network.orbitals(r);
        let mut cotangent = orbitals.zeros_like();
        for (d, dets) in orbitals.dets.iter().enumerate() {
            for (b, block) in dets.iter().enumerate() {
                if block.is_empty() {
                    continue;
                }
                // each block is averaged over samples, determinants and entries
                let count = (batch.len() * ndet * block.len()) as f64;
                let residual = &blocks[b] - block;
                loss += residual.norm_squared() / count;
                cotangent.dets[d][b] = residual * (-2.0 / count);
            }
        }
        cotangents.push(cotangent);
    }
    (loss, cotangents)
}

/// Mean squared deviation of the network orbitals from the reference orbitals.
pub fn pretrain_loss(
    network: &FermiNet,
    batch: &[Vec<Vector3<f64>>],
    targets: &[OrbitalTarget],
) -> f64 {
    loss_and_cotangents(network, batch, targets).0
}

/// Pretraining loss and its gradient with respect to the flat network parameters.
pub fn pretrain_loss_and_grad(
    network: &FermiNet,
    batch: &[Vec<Vector3<f64>>],
    targets: &[OrbitalTarget],
) -> (f64, Vec<f64>) {
    let (loss, cotangents) = loss_and_cotangents(network, batch, targets);
    let mut grad = vec![0.0; network.num_params()];
    for (r, cotangent) in batch.iter().zip(cotangents.iter()) {
        for (g, v) in grad.iter_mut().zip(network.orbitals_vjp(r, cotangent)) {
            *g += v;
        }
    }
    (loss, grad)
}

/// Fit the network orbitals to `reference` while sampling from the network.
///
/// Each iteration evaluates the reference orbitals at the current walkers,
/// takes one Adam step on the pretraining loss and then one Metropolis
/// update of the walkers under the updated network. Returns the loss of
/// every iteration.
pub fn pretrain_hartree_fock<R: Rng>(
    network: &mut FermiNet,
    walkers: &mut Walkers,
    reference: &HartreeFockReference,
    options: &PretrainOptions,
    width: f64,
    rng: &mut R,
    mut logger: Option<&mut dyn FnMut(usize, f64)>,
) -> Result<Vec<f64>> {
    if reference.nspins() != network.nspins() {
        return Err(Error::InvalidReference(format!(
            "reference has spins {:?} but the network has {:?}",
            reference.nspins(),
            network.nspins()
        )));
    }

    let mut adam = Adam::new(network.num_params(), options.optimizer);
    let mut history = Vec::with_capacity(options.iterations);
    for t in 0..options.iterations {
        let targets: Vec<OrbitalTarget> = walkers.positions.iter()
            .map(|r| reference.eval_orbitals(r))
            .collect();
        let (loss, grad) = pretrain_loss_and_grad(&*network, &walkers.positions, &targets);

        let mut params = network.params();
        adam.step(&mut params, &grad);
        network.set_params(&params);

        walkers.refresh(&*network);
        mh_update(&*network, walkers, width, None, rng);

        info!("Pretrain iter {:05}: {}", t, loss);
        if let Some(logger) = logger.as_mut() {
            logger(t, loss);
        }
        history.push(loss);
    }
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkOptions;
    use crate::system::{Atom, System};
    use crate::wavefunction::sto3g;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn helium_hydride(full_det: bool) -> (FermiNet, HartreeFockReference, Vec<Vec<Vector3<f64>>>) {
        let a = Vector3::new(0.0, 0.0, -0.7);
        let b = Vector3::new(0.0, 0.0, 0.7);
        let system = System::new(
            vec![Atom::new("H", a).unwrap(), Atom::new("He", b).unwrap()],
            (2, 1),
        ).unwrap();
        let mut basis = sto3g("H", a).unwrap();
        basis.extend(sto3g("He", b).unwrap());
        let c = DMatrix::from_row_slice(2, 2, &[0.4, 1.1, 0.7, -0.9]);
        let reference = HartreeFockReference::restricted((2, 1), basis, c).unwrap();

        let mut rng = StdRng::seed_from_u64(21);
        let options =
            NetworkOptions { hidden_units: 4, determinants: 2, full_det, ..Default::default() };
        let network = FermiNet::new(&system, options, &mut rng).unwrap();
        let batch = vec![
            vec![
                Vector3::new(0.1, 0.2, -0.6),
                Vector3::new(-0.3, 0.1, 0.9),
                Vector3::new(0.2, -0.4, 0.5),
            ],
            vec![
                Vector3::new(0.5, 0.0, 0.1),
                Vector3::new(0.0, 0.3, -1.0),
                Vector3::new(-0.2, 0.2, 0.8),
            ],
        ];
        (network, reference, batch)
    }

    #[test]
    fn test_full_det_target_is_block_diagonal() {
        let alpha = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let beta = DMatrix::from_element(1, 1, 5.0);
        let blocks = target_blocks(true, &(alpha, beta));
        assert_eq!(blocks.len(), 1);
        let expected = DMatrix::from_row_slice(3, 3, &[
            1.0, 2.0, 0.0,
            3.0, 4.0, 0.0,
            0.0, 0.0, 5.0,
        ]);
        assert_eq!(blocks[0], expected);
    }

    #[test]
    fn test_loss_gradient_matches_finite_difference() {
        for full_det in [false, true] {
            let (mut network, reference, batch) = helium_hydride(full_det);
            let targets: Vec<OrbitalTarget> =
                batch.iter().map(|r| reference.eval_orbitals(r)).collect();
            let (loss, grad) = pretrain_loss_and_grad(&network, &batch, &targets);
            assert_relative_eq!(loss, pretrain_loss(&network, &batch, &targets), epsilon = 1e-12);

            let theta = network.params();
            let h = 1e-6;
            for idx in (0..theta.len()).step_by(3) {
                let mut plus = theta.clone();
                plus[idx] += h;
                network.set_params(&plus);
                let f_plus = pretrain_loss(&network, &batch, &targets);
                let mut minus = theta.clone();
                minus[idx] -= h;
                network.set_params(&minus);
                let f_minus = pretrain_loss(&network, &batch, &targets);
                network.set_params(&theta);
                let numerical = (f_plus - f_minus) / (2.0 * h);
                assert_relative_eq!(grad[idx], numerical, epsilon = 1e-6, max_relative = 1e-4);
            }
        }
    }

    #[test]
    fn test_adam_reduces_loss_on_fixed_samples() {
        let (mut network, reference, batch) = helium_hydride(false);
        let targets: Vec<OrbitalTarget> =
            batch.iter().map(|r| reference.eval_orbitals(r)).collect();
        let initial = pretrain_loss(&network, &batch, &targets);
        let adam_options = AdamOptions { learning_rate: 1e-2, ..Default::default() };
        let mut adam = Adam::new(network.num_params(), adam_options);
        for _ in 0..200 {
            let (_, grad) = pretrain_loss_and_grad(&network, &batch, &targets);
            let mut params = network.params();
            adam.step(&mut params, &grad);
            network.set_params(&params);
        }
        assert!(pretrain_loss(&network, &batch, &targets) < 0.5 * initial);
    }

    #[test]
    fn test_logger_sees_every_iteration() {
        let (mut network, reference, batch) = helium_hydride(true);
        let mut walkers = Walkers::new(&network, batch);
        let options = PretrainOptions { iterations: 5, ..Default::default() };
        let mut rng = StdRng::seed_from_u64(4);
        let mut seen = Vec::new();
        let mut logger = |t: usize, loss: f64| seen.push((t, loss));
        let history = pretrain_hartree_fock(
            &mut network, &mut walkers, &reference, &options, 0.02, &mut rng, Some(&mut logger),
        ).unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(seen.iter().map(|(t, _)| *t).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert_eq!(seen.iter().map(|(_, l)| *l).collect::<Vec<_>>(), history);
    }

    #[test]
    fn test_spin_mismatch_rejected() {
        let (mut network, _, batch) = helium_hydride(false);
        let basis = sto3g("H", Vector3::zeros()).unwrap();
        let reference =
            HartreeFockReference::restricted((1, 0), basis, DMatrix::identity(1, 1)).unwrap();
        let mut walkers = Walkers::new(&network, batch);
        let mut rng = StdRng::seed_from_u64(0);
        let result = pretrain_hartree_fock(
            &mut network,
            &mut walkers,
            &reference,
            &PretrainOptions::default(),
            0.02,
            &mut rng,
            None,
        );
        assert!(matches!(result, Err(Error::InvalidReference(_))));
    }
}
