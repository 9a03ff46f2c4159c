//! Compact FermiNet-style ansatz.
//!
//! Ψ(R) = Σ_d Π_b det[φ_k(r_i; R)]_{d,b}, where every orbital depends on its
//! own electron and, through spin-channel means, on all the others. With
//! `full_det` each term is a single N × N determinant; otherwise it is the
//! product of a spin-up and a spin-down determinant.

use nalgebra::{DMatrix, DVector, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::envelope::Envelope;
use super::features::FeatureLayer;
use super::params::{random_matrix, NetworkParams, OrbitalParams};
use crate::error::{Error, Result};
use crate::system::System;
use crate::wavefunction::{logsumexp_signed, slogdet, LogWfn, OptimizableWfn};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct NetworkOptions {
    /// Width of the hidden layer
    pub hidden_units: usize,
    /// Number of determinants in the expansion
    pub determinants: usize,
    /// One N × N determinant per term instead of spin-factored ones
    pub full_det: bool,
    /// Feed periodic electron-atom distances to the network
    pub include_r_ae: bool,
    /// Minimum number of plane waves in the periodic envelope
    pub min_kpoints: Option<usize>,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            hidden_units: 32,
            determinants: 4,
            full_det: true,
            include_r_ae: false,
            min_kpoints: None,
        }
    }
}

/// Orbital matrices indexed as `dets[d][b]`.
///
/// Block `b` of a spin-factored term is the spin-up (b = 0) or spin-down
/// (b = 1) matrix. A full-determinant term has a single N × N block.
#[derive(Debug, Clone, PartialEq)]
pub struct Orbitals {
    pub dets: Vec<Vec<DMatrix<f64>>>,
}

impl Orbitals {
    pub fn zeros_like(&self) -> Self {
        Self {
            dets: self.dets.iter()
                .map(|blocks| blocks.iter().map(|m| DMatrix::zeros(m.nrows(), m.ncols())).collect())
                .collect(),
        }
    }

    /// `(sign, ln|det|)` of every term.
    pub fn signed_log_dets(&self) -> Vec<(f64, f64)> {
        self.dets.iter()
            .map(|blocks| {
                blocks.iter().map(slogdet).fold((1.0, 0.0), |(s, l), (sb, lb)| (s * sb, l + lb))
            })
            .collect()
    }
}

/// Intermediate values of one electron's forward pass.
struct ElectronPass {
    input: DVector<f64>,
    hidden: DVector<f64>,
    linear: DVector<f64>,
    envelope: DVector<f64>,
}

#[derive(Debug, Clone)]
pub struct FermiNet {
    nspins: (usize, usize),
    options: NetworkOptions,
    features: FeatureLayer,
    envelope: Envelope,
    pub params: NetworkParams,
}

impl FermiNet {
    pub fn new<R: Rng>(system: &System, options: NetworkOptions, rng: &mut R) -> Result<Self> {
        if options.determinants == 0 || options.hidden_units == 0 {
            return Err(Error::InvalidConfig(
                "network needs at least one determinant and one hidden unit".into(),
            ));
        }
        if system.atoms.is_empty() && !system.is_periodic() {
            return Err(Error::InvalidSystem("molecular envelope needs at least one atom".into()));
        }

        let features = FeatureLayer::for_system(system, options.include_r_ae);
        let envelope = Envelope::for_system(system, options.min_kpoints);

        let input_dim = features.input_dim();
        let hidden = options.hidden_units;
        let nelec = system.nelectrons();
        let mut orbital_layer = |n: usize| {
            let k = options.determinants * if options.full_det { nelec } else { n };
            OrbitalParams {
                w: random_matrix(rng, k, hidden, 1.0 / (hidden as f64).sqrt()),
                b: DVector::from_column_slice(random_matrix(rng, k, 1, 1.0).as_slice()),
            }
        };
        let orbitals = [orbital_layer(system.nspins.0), orbital_layer(system.nspins.1)];
        let envelopes = [
            envelope.init_params(orbitals[0].b.len()),
            envelope.init_params(orbitals[1].b.len()),
        ];
        let params = NetworkParams {
            w1: random_matrix(rng, hidden, input_dim, 1.0 / (input_dim as f64).sqrt()),
            b1: DVector::from_column_slice(random_matrix(rng, hidden, 1, 1.0).as_slice()),
            orbitals,
            envelopes,
        };

        Ok(Self { nspins: system.nspins, options, features, envelope, params })
    }

    pub fn options(&self) -> &NetworkOptions {
        &self.options
    }

    #[inline]
    fn nelectrons(&self) -> usize {
        self.nspins.0 + self.nspins.1
    }

    #[inline]
    fn spin_of(&self, i: usize) -> usize {
        if i < self.nspins.0 { 0 } else { 1 }
    }

    /// Orbitals per determinant for spin channel `s`.
    fn norb(&self, s: usize) -> usize {
        match (self.options.full_det, s) {
            (true, _) => self.nelectrons(),
            (false, 0) => self.nspins.0,
            (false, _) => self.nspins.1,
        }
    }

    /// `(first electron, rows)` of every block of a term.
    fn blocks(&self) -> Vec<(usize, usize)> {
        if self.options.full_det {
            vec![(0, self.nelectrons())]
        } else {
            vec![(0, self.nspins.0), (self.nspins.0, self.nspins.1)]
        }
    }

    /// Block index and row of electron `i`.
    fn block_of(&self, i: usize) -> (usize, usize) {
        if self.options.full_det || i < self.nspins.0 {
            (0, i)
        } else {
            (1, i - self.nspins.0)
        }
    }

    fn forward(&self, r: &[Vector3<f64>]) -> Vec<ElectronPass> {
        self.features.inputs(r, self.nspins)
            .into_iter()
            .enumerate()
            .map(|(i, input)| {
                let s = self.spin_of(i);
                let hidden = (&self.params.w1 * &input + &self.params.b1).map(f64::tanh);
                let layer = &self.params.orbitals[s];
                let linear = &layer.w * &hidden + &layer.b;
                let envelope = self.envelope.apply(&self.params.envelopes[s], &r[i]);
                ElectronPass { input, hidden, linear, envelope }
            })
            .collect()
    }

    /// Evaluate every orbital matrix at configuration `r`.
    pub fn orbitals(&self, r: &[Vector3<f64>]) -> Orbitals {
        let passes = self.forward(r);
        let values: Vec<DVector<f64>> = passes.iter()
            .map(|p| p.linear.component_mul(&p.envelope))
            .collect();

        let dets = (0..self.options.determinants)
            .map(|d| {
                self.blocks()
                    .into_iter()
                    .map(|(offset, rows)| {
                        let cols = if self.options.full_det { self.nelectrons() } else { rows };
                        DMatrix::from_fn(rows, cols, |row, k| {
                            let i = offset + row;
                            values[i][d * self.norb(self.spin_of(i)) + k]
                        })
                    })
                    .collect()
            })
            .collect();
        Orbitals { dets }
    }

    /// Vector-Jacobian product: Σ cotangent ∘ ∂orbitals/∂θ as a flat parameter vector.
    pub fn orbitals_vjp(&self, r: &[Vector3<f64>], cotangent: &Orbitals) -> Vec<f64> {
        let passes = self.forward(r);
        let mut grad = self.params.zeros_like();

        for (i, pass) in passes.iter().enumerate() {
            let s = self.spin_of(i);
            let norb = self.norb(s);
            let (block, row) = self.block_of(i);

            let mut g = DVector::zeros(pass.linear.len());
            for (d, blocks) in cotangent.dets.iter().enumerate() {
                for k in 0..norb {
                    g[d * norb + k] = blocks[block][(row, k)];
                }
            }

            let g_linear = g.component_mul(&pass.envelope);
            let g_envelope = g.component_mul(&pass.linear);
            self.envelope.accumulate_grad(
                &self.params.envelopes[s],
                &r[i],
                &g_envelope,
                &mut grad.envelopes[s],
            );

            grad.orbitals[s].w += &g_linear * pass.hidden.transpose();
            grad.orbitals[s].b += &g_linear;

            let g_hidden = self.params.orbitals[s].w.transpose() * &g_linear;
            let g_pre = g_hidden.zip_map(&pass.hidden, |gh, h| gh * (1.0 - h * h));
            grad.w1 += &g_pre * pass.input.transpose();
            grad.b1 += &g_pre;
        }
        grad.to_flat()
    }
}

impl LogWfn for FermiNet {
    fn nspins(&self) -> (usize, usize) {
        self.nspins
    }

    fn log_psi(&self, r: &[Vector3<f64>]) -> (f64, f64) {
        logsumexp_signed(&self.orbitals(r).signed_log_dets())
    }
}

impl OptimizableWfn for FermiNet {
    fn num_params(&self) -> usize {
        self.params.num_params()
    }

    fn params(&self) -> Vec<f64> {
        self.params.to_flat()
    }

    fn set_params(&mut self, params: &[f64]) {
        self.params.set_flat(params);
    }

    /// ∂ ln|Ψ| / ∂θ = Σ_d (det_d / Ψ) Σ_b tr(A_db⁻¹ ∂A_db/∂θ).
    fn log_psi_grad_params(&self, r: &[Vector3<f64>]) -> Vec<f64> {
        let orbitals = self.orbitals(r);
        let terms = orbitals.signed_log_dets();
        let (sign, log_abs) = logsumexp_signed(&terms);
        if sign == 0.0 {
            return vec![0.0; self.num_params()];
        }

        let dets = orbitals.dets.iter()
            .zip(terms.iter())
            .map(|(blocks, &(s_d, l_d))| {
                let weight = s_d * sign * (l_d - log_abs).exp();
                blocks.iter()
                    .map(|a| {
                        let zeros = DMatrix::zeros(a.nrows(), a.ncols());
                        if weight == 0.0 || a.nrows() == 0 {
                            return zeros;
                        }
                        match a.clone().try_inverse() {
                            Some(inv) => inv.transpose() * weight,
                            None => zeros,
                        }
                    })
                    .collect()
            })
            .collect();
        self.orbitals_vjp(r, &Orbitals { dets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{Atom, Lattice};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn lithium_hydride(full_det: bool) -> (FermiNet, Vec<Vector3<f64>>) {
        let atoms = vec![
            Atom::new("Li", Vector3::zeros()).unwrap(),
            Atom::new("H", Vector3::new(0.0, 0.0, 3.0)).unwrap(),
        ];
        let system = System::new(atoms, (2, 2)).unwrap();
        let options =
            NetworkOptions { hidden_units: 5, determinants: 2, full_det, ..Default::default() };
        let mut rng = StdRng::seed_from_u64(11);
        let net = FermiNet::new(&system, options, &mut rng).unwrap();
        let r = vec![
            Vector3::new(0.1, 0.2, -0.3),
            Vector3::new(0.4, -0.5, 2.6),
            Vector3::new(-0.2, 0.3, 0.5),
            Vector3::new(0.0, 0.6, 3.3),
        ];
        (net, r)
    }

    #[test]
    fn test_orbital_shapes() {
        let (net, r) = lithium_hydride(false);
        let orbitals = net.orbitals(&r);
        assert_eq!(orbitals.dets.len(), 2);
        assert_eq!(orbitals.dets[0].len(), 2);
        assert_eq!(orbitals.dets[0][0].shape(), (2, 2));

        let (net, r) = lithium_hydride(true);
        let orbitals = net.orbitals(&r);
        assert_eq!(orbitals.dets[1].len(), 1);
        assert_eq!(orbitals.dets[1][0].shape(), (4, 4));
    }

    #[test]
    fn test_antisymmetry_under_same_spin_exchange() {
        for full_det in [false, true] {
            let (net, r) = lithium_hydride(full_det);
            let (sign, log_abs) = net.log_psi(&r);
            let mut swapped = r.clone();
            swapped.swap(2, 3);
            let (sign_swapped, log_abs_swapped) = net.log_psi(&swapped);
            assert_eq!(sign, -sign_swapped);
            assert_relative_eq!(log_abs, log_abs_swapped, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_orbitals_vjp_matches_finite_difference() {
        for full_det in [false, true] {
            let (mut net, r) = lithium_hydride(full_det);
            let mut rng = StdRng::seed_from_u64(5);
            let template = net.orbitals(&r);
            let cotangent = Orbitals {
                dets: template.dets.iter()
                    .map(|blocks| {
                        blocks.iter()
                            .map(|m| random_matrix(&mut rng, m.nrows(), m.ncols(), 1.0))
                            .collect()
                    })
                    .collect(),
            };
            let contract = |net: &FermiNet| -> f64 {
                let o = net.orbitals(&r);
                o.dets.iter().flatten()
                    .zip(cotangent.dets.iter().flatten())
                    .map(|(a, c)| a.component_mul(c).sum())
                    .sum()
            };

            let analytic = net.orbitals_vjp(&r, &cotangent);
            let theta = net.params();
            let h = 1e-6;
            for idx in (0..theta.len()).step_by(7) {
                let mut plus = theta.clone();
                plus[idx] += h;
                net.set_params(&plus);
                let f_plus = contract(&net);
                let mut minus = theta.clone();
                minus[idx] -= h;
                net.set_params(&minus);
                let f_minus = contract(&net);
                net.set_params(&theta);
                let numerical = (f_plus - f_minus) / (2.0 * h);
                assert_relative_eq!(analytic[idx], numerical, epsilon = 1e-5, max_relative = 1e-5);
            }
        }
    }

    #[test]
    fn test_log_psi_grad_matches_finite_difference() {
        let (mut net, r) = lithium_hydride(true);
        let analytic = net.log_psi_grad_params(&r);
        let theta = net.params();
        let h = 1e-6;
        for idx in (0..theta.len()).step_by(5) {
            let mut plus = theta.clone();
            plus[idx] += h;
            net.set_params(&plus);
            let f_plus = net.log_psi(&r).1;
            let mut minus = theta.clone();
            minus[idx] -= h;
            net.set_params(&minus);
            let f_minus = net.log_psi(&r).1;
            net.set_params(&theta);
            let numerical = (f_plus - f_minus) / (2.0 * h);
            assert_relative_eq!(analytic[idx], numerical, epsilon = 1e-5, max_relative = 1e-4);
        }
    }

    #[test]
    fn test_periodic_network_is_periodic() {
        let lattice = Lattice::cubic(1.0).unwrap();
        let atoms = vec![Atom::with_charge("X", Vector3::new(0.0, 0.0, 0.2), 2.0)];
        let system = System::periodic(atoms, (2, 1), lattice).unwrap();
        let options = NetworkOptions { hidden_units: 6, determinants: 1, ..Default::default() };
        let mut rng = StdRng::seed_from_u64(2);
        let net = FermiNet::new(&system, options, &mut rng).unwrap();

        let r = vec![
            Vector3::new(0.1, 0.3, 0.7),
            Vector3::new(0.6, 0.2, 0.4),
            Vector3::new(0.9, 0.8, 0.1),
        ];
        let mut shifted = r.clone();
        shifted[0] += Vector3::new(3.0, -12.0, 41.0);
        let (s1, l1) = net.log_psi(&r);
        let (s2, l2) = net.log_psi(&shifted);
        assert_eq!(s1, s2);
        assert_relative_eq!(l1, l2, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let system = System::new(vec![Atom::new("He", Vector3::zeros()).unwrap()], (1, 1)).unwrap();
        let options = NetworkOptions { determinants: 0, ..Default::default() };
        let mut rng = StdRng::seed_from_u64(0);
        assert!(FermiNet::new(&system, options, &mut rng).is_err());
    }
}
