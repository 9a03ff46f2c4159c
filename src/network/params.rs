//! Parameter storage for the orbital network.
//!
//! Optimizers see the parameters as one flat vector; the order is fixed by
//! `tensors` and shared by every flat gradient the network returns.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;

/// Linear map from hidden units to orbital values of one spin channel.
#[derive(Debug, Clone)]
pub struct OrbitalParams {
    /// K × H weights
    pub w: DMatrix<f64>,
    /// K biases
    pub b: DVector<f64>,
}

/// Envelope coefficients of one spin channel.
#[derive(Debug, Clone)]
pub enum EnvelopeParams {
    /// exp(-σ r) decays: both K × natoms
    Isotropic { pi: DMatrix<f64>, sigma: DMatrix<f64> },
    /// plane-wave coefficients: both K × nkpoints
    Multiwave { cos: DMatrix<f64>, sin: DMatrix<f64> },
}

impl EnvelopeParams {
    pub(crate) fn zeros_like(&self) -> Self {
        let zeros = |m: &DMatrix<f64>| DMatrix::zeros(m.nrows(), m.ncols());
        match self {
            EnvelopeParams::Isotropic { pi, sigma } => {
                EnvelopeParams::Isotropic { pi: zeros(pi), sigma: zeros(sigma) }
            }
            EnvelopeParams::Multiwave { cos, sin } => {
                EnvelopeParams::Multiwave { cos: zeros(cos), sin: zeros(sin) }
            }
        }
    }

    fn parts(&self) -> [&DMatrix<f64>; 2] {
        match self {
            EnvelopeParams::Isotropic { pi, sigma } => [pi, sigma],
            EnvelopeParams::Multiwave { cos, sin } => [cos, sin],
        }
    }

    fn parts_mut(&mut self) -> [&mut DMatrix<f64>; 2] {
        match self {
            EnvelopeParams::Isotropic { pi, sigma } => [pi, sigma],
            EnvelopeParams::Multiwave { cos, sin } => [cos, sin],
        }
    }
}

#[derive(Debug, Clone)]
pub struct NetworkParams {
    /// H × D hidden-layer weights
    pub w1: DMatrix<f64>,
    /// H hidden-layer biases
    pub b1: DVector<f64>,
    /// Orbital layers, indexed by spin channel
    pub orbitals: [OrbitalParams; 2],
    /// Envelopes, indexed by spin channel
    pub envelopes: [EnvelopeParams; 2],
}

/// Matrix with i.i.d. N(0, scale²) entries.
pub(crate) fn random_matrix<R: Rng>(
    rng: &mut R,
    rows: usize,
    cols: usize,
    scale: f64,
) -> DMatrix<f64> {
    DMatrix::from_fn(rows, cols, |_, _| rng.sample::<f64, _>(StandardNormal) * scale)
}

impl NetworkParams {
    pub fn zeros_like(&self) -> Self {
        let orbital = |o: &OrbitalParams| OrbitalParams {
            w: DMatrix::zeros(o.w.nrows(), o.w.ncols()),
            b: DVector::zeros(o.b.len()),
        };
        Self {
            w1: DMatrix::zeros(self.w1.nrows(), self.w1.ncols()),
            b1: DVector::zeros(self.b1.len()),
            orbitals: [orbital(&self.orbitals[0]), orbital(&self.orbitals[1])],
            envelopes: [self.envelopes[0].zeros_like(), self.envelopes[1].zeros_like()],
        }
    }

    fn tensors(&self) -> Vec<&[f64]> {
        let mut out = vec![self.w1.as_slice(), self.b1.as_slice()];
        for orbital in &self.orbitals {
            out.push(orbital.w.as_slice());
            out.push(orbital.b.as_slice());
        }
        for envelope in &self.envelopes {
            out.extend(envelope.parts().into_iter().map(|m| m.as_slice()));
        }
        out
    }

    fn tensors_mut(&mut self) -> Vec<&mut [f64]> {
        let mut out = vec![self.w1.as_mut_slice(), self.b1.as_mut_slice()];
        for orbital in self.orbitals.iter_mut() {
            out.push(orbital.w.as_mut_slice());
            out.push(orbital.b.as_mut_slice());
        }
        for envelope in self.envelopes.iter_mut() {
            out.extend(envelope.parts_mut().into_iter().map(|m| m.as_mut_slice()));
        }
        out
    }

    pub fn num_params(&self) -> usize {
        self.tensors().iter().map(|t| t.len()).sum()
    }

    pub fn to_flat(&self) -> Vec<f64> {
        self.tensors().concat()
    }

    /// Overwrite every parameter from a flat vector of length `num_params()`.
    pub fn set_flat(&mut self, flat: &[f64]) {
        assert_eq!(flat.len(), self.num_params(), "flat parameter vector has the wrong length");
        let mut offset = 0;
        for tensor in self.tensors_mut() {
            let n = tensor.len();
            tensor.copy_from_slice(&flat[offset..offset + n]);
            offset += n;
        }
    }
}
