//! Wave function traits for QMC calculations.
//!
//! `SingleWfn` covers one-centre basis functions (atomic orbitals).
//! `LogWfn` is the many-electron interface used by the sampler and the
//! Hamiltonian; it works with the sign and logarithm of |Ψ| so that large
//! systems neither overflow nor underflow.

use nalgebra::Vector3;

/// One-centre function with analytic first and second derivatives.
pub trait SingleWfn {
    fn evaluate(&self, r: &Vector3<f64>) -> f64;

    /// ∇f at `r`.
    fn gradient(&self, r: &Vector3<f64>) -> Vector3<f64>;

    /// ∇²f at `r`.
    fn laplacian(&self, r: &Vector3<f64>) -> f64;
}

/// Gradient and Laplacian of ln|Ψ| for every electron, by central differences
/// of step `h`.
pub fn finite_difference_log_derivatives<W: LogWfn + ?Sized>(
    wfn: &W,
    r: &[Vector3<f64>],
    h: f64,
) -> (Vec<Vector3<f64>>, Vec<f64>) {
    let f0 = wfn.log_psi(r).1;
    let mut grad = vec![Vector3::zeros(); r.len()];
    let mut lap = vec![0.0; r.len()];
    let mut shifted = r.to_vec();
    for i in 0..r.len() {
        for axis in 0..3 {
            let x = r[i][axis];
            shifted[i][axis] = x + h;
            let f_fwd = wfn.log_psi(&shifted).1;
            shifted[i][axis] = x - h;
            let f_bwd = wfn.log_psi(&shifted).1;
            shifted[i][axis] = x;
            grad[i][axis] = (f_fwd - f_bwd) / (2.0 * h);
            lap[i] += (f_fwd - 2.0 * f0 + f_bwd) / (h * h);
        }
    }
    (grad, lap)
}

/// Many-electron wavefunction evaluated in the log domain.
///
/// Positions are ordered spin-up first, as described by `nspins`.
pub trait LogWfn {
    /// Number of (spin-up, spin-down) electrons.
    fn nspins(&self) -> (usize, usize);

    /// Returns `(sign, ln|Ψ(R)|)`. A node gives `(0, -inf)`.
    fn log_psi(&self, r: &[Vector3<f64>]) -> (f64, f64);

    /// `(∇ᵢ ln|Ψ|, ∇ᵢ² ln|Ψ|)` for each electron `i`.
    ///
    /// Central differences of step `h` unless the wavefunction knows its
    /// derivatives in closed form.
    fn log_derivatives(&self, r: &[Vector3<f64>], h: f64) -> (Vec<Vector3<f64>>, Vec<f64>) {
        finite_difference_log_derivatives(self, r, h)
    }
}

/// Trait for wavefunctions with optimizable variational parameters.
///
/// Parameters are exchanged as flat vectors; `log_psi_grad_params` returns
/// O_i = ∂ ln|Ψ(R)| / ∂p_i in the same order as `params`.
pub trait OptimizableWfn: LogWfn {
    /// Number of variational parameters.
    fn num_params(&self) -> usize;

    /// Get current parameter values.
    fn params(&self) -> Vec<f64>;

    /// Set parameter values.
    fn set_params(&mut self, params: &[f64]);

    /// Compute O_i = ∂ ln|Ψ(R)| / ∂p_i for all parameters.
    fn log_psi_grad_params(&self, r: &[Vector3<f64>]) -> Vec<f64>;
}
