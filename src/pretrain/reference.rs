//! Imported Hartree-Fock solution used as the pretraining target.
//!
//! The reference stores an atomic basis and the unrestricted molecular
//! orbital coefficients for each spin. Occupied orbitals follow the Aufbau
//! principle: the lowest `nα` alpha MOs and `nβ` beta MOs.

use nalgebra::{DMatrix, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::wavefunction::{
    finite_difference_log_derivatives, slogdet, BasisFunction, LogWfn, SingleWfn,
};

/// On-disk layout: coefficient matrices are written as rows of basis functions.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct ReferenceFile {
    nspins: (usize, usize),
    basis: Vec<BasisFunction>,
    alpha: Vec<Vec<f64>>,
    beta: Vec<Vec<f64>>,
}

#[derive(Debug, Clone)]
pub struct HartreeFockReference {
    nspins: (usize, usize),
    basis: Vec<BasisFunction>,
    /// nbasis × nmo alpha coefficients
    alpha: DMatrix<f64>,
    /// nbasis × nmo beta coefficients
    beta: DMatrix<f64>,
}

fn coefficient_matrix(rows: &[Vec<f64>], nbasis: usize, name: &str) -> Result<DMatrix<f64>> {
    if rows.len() != nbasis {
        return Err(Error::InvalidReference(format!(
            "{} coefficients have {} rows for {} basis functions",
            name,
            rows.len(),
            nbasis
        )));
    }
    let nmo = rows.first().map_or(0, |r| r.len());
    if rows.iter().any(|r| r.len() != nmo) {
        return Err(Error::InvalidReference(format!("{} coefficient rows differ in length", name)));
    }
    Ok(DMatrix::from_fn(nbasis, nmo, |i, j| rows[i][j]))
}

impl HartreeFockReference {
    pub fn new(
        nspins: (usize, usize),
        basis: Vec<BasisFunction>,
        alpha: DMatrix<f64>,
        beta: DMatrix<f64>,
    ) -> Result<Self> {
        for (name, c, occupied) in [("alpha", &alpha, nspins.0), ("beta", &beta, nspins.1)] {
            if c.nrows() != basis.len() {
                return Err(Error::InvalidReference(format!(
                    "{} coefficients have {} rows for {} basis functions",
                    name,
                    c.nrows(),
                    basis.len()
                )));
            }
            if c.ncols() < occupied {
                return Err(Error::InvalidReference(format!(
                    "{} electrons need {} {} orbitals, found {}",
                    occupied, occupied, name, c.ncols()
                )));
            }
        }
        Ok(Self { nspins, basis, alpha, beta })
    }

    /// Restricted closed- or open-shell reference sharing one set of MOs.
    pub fn restricted(
        nspins: (usize, usize),
        basis: Vec<BasisFunction>,
        coefficients: DMatrix<f64>,
    ) -> Result<Self> {
        Self::new(nspins, basis, coefficients.clone(), coefficients)
    }

    fn from_file(file: ReferenceFile) -> Result<Self> {
        let nbasis = file.basis.len();
        let alpha = coefficient_matrix(&file.alpha, nbasis, "alpha")?;
        let beta = coefficient_matrix(&file.beta, nbasis, "beta")?;
        Self::new(file.nspins, file.basis, alpha, beta)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Self::from_file(serde_yaml::from_str(s)?)
    }

    /// Read a reference written as YAML.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Self::from_file(serde_yaml::from_reader(reader)?)
    }

    pub fn nbasis(&self) -> usize {
        self.basis.len()
    }

    /// Basis function values, one row per electron.
    fn basis_values(&self, r: &[Vector3<f64>]) -> DMatrix<f64> {
        DMatrix::from_fn(r.len(), self.basis.len(), |i, mu| self.basis[mu].evaluate(&r[i]))
    }

    /// Occupied-orbital matrices `(alpha nα × nα, beta nβ × nβ)`.
    ///
    /// Row `i` of the alpha matrix is spin-up electron `i`, row `j` of the
    /// beta matrix is spin-down electron `nα + j`; columns are MOs.
    pub fn eval_orbitals(&self, r: &[Vector3<f64>]) -> (DMatrix<f64>, DMatrix<f64>) {
        let (n_up, n_down) = self.nspins;
        let values = self.basis_values(r);
        let up = values.rows(0, n_up) * self.alpha.columns(0, n_up);
        let down = values.rows(n_up, n_down) * self.beta.columns(0, n_down);
        (up, down)
    }

    /// `(sign, ln|det α · det β|)` of the reference Slater determinant.
    pub fn eval_slater(&self, r: &[Vector3<f64>]) -> (f64, f64) {
        let (up, down) = self.eval_orbitals(r);
        let (s_up, l_up) = slogdet(&up);
        let (s_down, l_down) = slogdet(&down);
        (s_up * s_down, l_up + l_down)
    }

    /// Derivatives of ln|det A| for one spin block, A = χ(r) C.
    ///
    /// ∇ᵢ ln|det A| = Σₖ (A⁻¹)ₖᵢ ∇Aᵢₖ and
    /// ∇ᵢ² ln|det A| = Σₖ (A⁻¹)ₖᵢ ∇²Aᵢₖ - |∇ᵢ ln|det A||².
    /// `None` when A is singular.
    fn block_log_derivatives(
        &self,
        r: &[Vector3<f64>],
        coefficients: &DMatrix<f64>,
    ) -> Option<(Vec<Vector3<f64>>, Vec<f64>)> {
        let n = r.len();
        if n == 0 {
            return Some((Vec::new(), Vec::new()));
        }
        let nbasis = self.basis.len();
        let c = coefficients.columns(0, n).into_owned();
        let orbitals = DMatrix::from_fn(n, nbasis, |i, mu| self.basis[mu].evaluate(&r[i])) * &c;
        let inverse = orbitals.try_inverse()?;
        let gradients: Vec<Vec<Vector3<f64>>> = r.iter()
            .map(|x| self.basis.iter().map(|f| f.gradient(x)).collect())
            .collect();
        let slopes: Vec<DMatrix<f64>> = (0..3)
            .map(|axis| DMatrix::from_fn(n, nbasis, |i, mu| gradients[i][mu][axis]) * &c)
            .collect();
        let curvature = DMatrix::from_fn(n, nbasis, |i, mu| self.basis[mu].laplacian(&r[i])) * &c;

        let mut grad = Vec::with_capacity(n);
        let mut lap = Vec::with_capacity(n);
        for i in 0..n {
            let g = Vector3::from_fn(|axis, _| {
                (0..n).map(|k| inverse[(k, i)] * slopes[axis][(i, k)]).sum::<f64>()
            });
            let l = (0..n).map(|k| inverse[(k, i)] * curvature[(i, k)]).sum::<f64>();
            lap.push(l - g.norm_squared());
            grad.push(g);
        }
        Some((grad, lap))
    }
}

impl LogWfn for HartreeFockReference {
    fn nspins(&self) -> (usize, usize) {
        self.nspins
    }

    fn log_psi(&self, r: &[Vector3<f64>]) -> (f64, f64) {
        self.eval_slater(r)
    }

    /// Closed form from the inverse orbital matrices; central differences
    /// of step `h` if either block is singular.
    fn log_derivatives(&self, r: &[Vector3<f64>], h: f64) -> (Vec<Vector3<f64>>, Vec<f64>) {
        let (r_up, r_down) = r.split_at(self.nspins.0);
        match (
            self.block_log_derivatives(r_up, &self.alpha),
            self.block_log_derivatives(r_down, &self.beta),
        ) {
            (Some((mut grad, mut lap)), Some((grad_down, lap_down))) => {
                grad.extend(grad_down);
                lap.extend(lap_down);
                (grad, lap)
            }
            _ => finite_difference_log_derivatives(self, r, h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hamiltonian::Hamiltonian;
    use crate::system::{Atom, System};
    use crate::wavefunction::{sto3g, Sto};
    use approx::assert_relative_eq;

    fn h2_reference() -> HartreeFockReference {
        let a = Vector3::new(0.0, 0.0, -0.7);
        let b = Vector3::new(0.0, 0.0, 0.7);
        let mut basis = sto3g("H", a).unwrap();
        basis.extend(sto3g("H", b).unwrap());
        // bonding and antibonding combinations
        let c = DMatrix::from_row_slice(2, 2, &[0.55, 1.2, 0.55, -1.2]);
        HartreeFockReference::restricted((1, 1), basis, c).unwrap()
    }

    /// 1s and 2s-like Slater functions on one centre, identity coefficients.
    fn two_slater_reference(nspins: (usize, usize), center: Vector3<f64>) -> HartreeFockReference {
        let two_s = Sto { center, coefficients: vec![1.0], powers: vec![1], exponents: vec![0.5] };
        let basis = vec![
            BasisFunction::Slater(Sto::one_s(center, 1.0)),
            BasisFunction::Slater(two_s),
        ];
        HartreeFockReference::restricted(nspins, basis, DMatrix::identity(2, 2)).unwrap()
    }

    fn assert_matches_finite_differences(reference: &HartreeFockReference, r: &[Vector3<f64>]) {
        let (grad, lap) = reference.log_derivatives(r, 1e-4);
        let (fd_grad, fd_lap) = finite_difference_log_derivatives(reference, r, 1e-4);
        assert_eq!(grad.len(), r.len());
        for i in 0..r.len() {
            assert_relative_eq!(grad[i], fd_grad[i], epsilon = 1e-6);
            assert_relative_eq!(lap[i], fd_lap[i], epsilon = 1e-4);
        }
    }

    #[test]
    fn test_orbital_blocks() {
        let reference = h2_reference();
        let r = [Vector3::new(0.1, 0.0, -0.5), Vector3::new(0.0, 0.2, 0.6)];
        let (up, down) = reference.eval_orbitals(&r);
        assert_eq!(up.shape(), (1, 1));
        assert_eq!(down.shape(), (1, 1));

        let chi = |mu: usize, x: &Vector3<f64>| reference.basis[mu].evaluate(x);
        assert_relative_eq!(up[(0, 0)], 0.55 * (chi(0, &r[0]) + chi(1, &r[0])), epsilon = 1e-12);
        assert_relative_eq!(down[(0, 0)], 0.55 * (chi(0, &r[1]) + chi(1, &r[1])), epsilon = 1e-12);

        let (sign, log_abs) = reference.eval_slater(&r);
        assert_eq!(sign, 1.0);
        assert_relative_eq!(log_abs, (up[(0, 0)] * down[(0, 0)]).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_same_spin_exchange_flips_sign() {
        let a = Vector3::zeros();
        let reference = two_slater_reference((2, 0), a);
        let r = [Vector3::new(0.3, 0.0, 0.0), Vector3::new(0.0, 1.5, 0.2)];
        let (s1, l1) = reference.log_psi(&r);
        let (s2, l2) = reference.log_psi(&[r[1], r[0]]);
        assert_eq!(s1, -s2);
        assert_relative_eq!(l1, l2, epsilon = 1e-12);
    }

    #[test]
    fn test_hydrogen_atom_local_energy() {
        let basis = vec![BasisFunction::Slater(Sto::one_s(Vector3::zeros(), 1.0))];
        let reference = HartreeFockReference::new(
            (1, 0),
            basis,
            DMatrix::from_element(1, 1, 1.0),
            DMatrix::zeros(1, 0),
        ).unwrap();
        let system = System::new(vec![Atom::new("H", Vector3::zeros()).unwrap()], (1, 0)).unwrap();
        let hamiltonian = Hamiltonian::for_system(&system).unwrap();
        let r = [Vector3::new(0.9, -0.6, 0.8)];
        assert_relative_eq!(hamiltonian.local_energy(&reference, &r), -0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_closed_form_log_derivatives() {
        let r = [Vector3::new(0.1, 0.3, -0.5), Vector3::new(-0.2, 0.1, 0.9)];
        assert_matches_finite_differences(&h2_reference(), &r);

        let slater = two_slater_reference((2, 1), Vector3::new(0.0, 0.2, 0.0));
        let r = [
            Vector3::new(0.3, 0.0, 0.4),
            Vector3::new(0.0, 1.5, 0.2),
            Vector3::new(-0.7, 0.6, 0.1),
        ];
        assert_matches_finite_differences(&slater, &r);
    }

    #[test]
    fn test_singular_block_uses_finite_differences() {
        let reference = two_slater_reference((2, 0), Vector3::zeros());
        // equal positions make the 2 × 2 orbital matrix singular
        let x = Vector3::new(0.5, 0.5, 0.5);
        let (grad, lap) = reference.log_derivatives(&[x, x], 1e-4);
        let (fd_grad, fd_lap) = finite_difference_log_derivatives(&reference, &[x, x], 1e-4);
        assert_eq!(grad, fd_grad);
        assert_eq!(lap, fd_lap);
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
nspins: [1, 0]
basis:
  - kind: slater
    center: [0.0, 0.0, 0.0]
    coefficients: [1.0]
    powers: [0]
    exponents: [1.0]
alpha:
  - [1.0]
beta:
  - []
"#;
        let reference = HartreeFockReference::from_yaml_str(yaml).unwrap();
        assert_eq!(reference.nbasis(), 1);
        let (sign, log_abs) = reference.eval_slater(&[Vector3::new(1.0, 0.0, 0.0)]);
        assert_eq!(sign, 1.0);
        assert_relative_eq!(log_abs, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let basis = sto3g("H", Vector3::zeros()).unwrap();
        let result =
            HartreeFockReference::restricted((2, 0), basis.clone(), DMatrix::identity(1, 1));
        assert!(matches!(result, Err(Error::InvalidReference(_))));
        let result = HartreeFockReference::restricted((1, 0), basis, DMatrix::identity(2, 2));
        assert!(matches!(result, Err(Error::InvalidReference(_))));
    }
}
