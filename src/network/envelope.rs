//! Multiplicative envelopes applied to the orbital outputs.
//!
//! Molecules use isotropic exponential decays centred on the nuclei, which
//! enforce the boundary condition at infinity. Solids use a sum of plane
//! waves at reciprocal lattice vectors, which is periodic in the cell.

use nalgebra::{DMatrix, DVector, Vector3};

use super::params::EnvelopeParams;
use crate::system::{make_kpoints, System};

#[derive(Debug, Clone)]
pub enum Envelope {
    Isotropic { atoms: Vec<Vector3<f64>> },
    Multiwave { kpoints: Vec<Vector3<f64>> },
}

impl Envelope {
    pub fn for_system(system: &System, min_kpoints: Option<usize>) -> Self {
        match &system.lattice {
            Some(lattice) => Envelope::Multiwave {
                kpoints: make_kpoints(lattice, system.nspins, min_kpoints),
            },
            None => Envelope::Isotropic { atoms: system.positions() },
        }
    }

    /// Initial parameters for `k` orbitals: unit amplitudes and unit decay rates.
    pub fn init_params(&self, k: usize) -> EnvelopeParams {
        match self {
            Envelope::Isotropic { atoms } => EnvelopeParams::Isotropic {
                pi: DMatrix::from_element(k, atoms.len(), 1.0),
                sigma: DMatrix::from_element(k, atoms.len(), 1.0),
            },
            Envelope::Multiwave { kpoints } => EnvelopeParams::Multiwave {
                cos: DMatrix::from_element(k, kpoints.len(), 1.0),
                sin: DMatrix::from_element(k, kpoints.len(), 1.0),
            },
        }
    }

    /// Envelope value of every orbital at electron position `r`.
    pub fn apply(&self, params: &EnvelopeParams, r: &Vector3<f64>) -> DVector<f64> {
        match (self, params) {
            (Envelope::Isotropic { atoms }, EnvelopeParams::Isotropic { pi, sigma }) => {
                let dist: Vec<f64> = atoms.iter().map(|a| (r - a).norm()).collect();
                DVector::from_fn(pi.nrows(), |k, _| {
                    dist.iter()
                        .enumerate()
                        .map(|(i, d)| pi[(k, i)] * (-sigma[(k, i)] * d).exp())
                        .sum()
                })
            }
            (Envelope::Multiwave { kpoints }, EnvelopeParams::Multiwave { cos, sin }) => {
                let phases: Vec<f64> = kpoints.iter().map(|kp| kp.dot(r)).collect();
                DVector::from_fn(cos.nrows(), |k, _| {
                    phases.iter()
                        .enumerate()
                        .map(|(m, p)| cos[(k, m)] * p.cos() + sin[(k, m)] * p.sin())
                        .sum()
                })
            }
            _ => panic!("envelope parameters do not match the envelope kind"),
        }
    }

    /// Accumulate ∂L/∂params given `g[k] = ∂L/∂env_k` at position `r`.
    pub fn accumulate_grad(
        &self,
        params: &EnvelopeParams,
        r: &Vector3<f64>,
        g: &DVector<f64>,
        grad: &mut EnvelopeParams,
    ) {
        match (self, params, grad) {
            (
                Envelope::Isotropic { atoms },
                EnvelopeParams::Isotropic { pi, sigma },
                EnvelopeParams::Isotropic { pi: d_pi, sigma: d_sigma },
            ) => {
                for (i, atom) in atoms.iter().enumerate() {
                    let d = (r - atom).norm();
                    for k in 0..pi.nrows() {
                        let decay = (-sigma[(k, i)] * d).exp();
                        d_pi[(k, i)] += g[k] * decay;
                        d_sigma[(k, i)] -= g[k] * pi[(k, i)] * d * decay;
                    }
                }
            }
            (
                Envelope::Multiwave { kpoints },
                EnvelopeParams::Multiwave { .. },
                EnvelopeParams::Multiwave { cos: d_cos, sin: d_sin },
            ) => {
                for (m, kp) in kpoints.iter().enumerate() {
                    let phase = kp.dot(r);
                    let (s, c) = phase.sin_cos();
                    for k in 0..d_cos.nrows() {
                        d_cos[(k, m)] += g[k] * c;
                        d_sin[(k, m)] += g[k] * s;
                    }
                }
            }
            _ => panic!("envelope parameters do not match the envelope kind"),
        }
    }
}
