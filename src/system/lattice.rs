//! Simulation cell for periodic systems.
//!
//! Lattice vectors are stored as the columns of a 3×3 matrix. Reciprocal
//! vectors satisfy bᵢ·aⱼ = 2π δᵢⱼ and are stored the same way.

use nalgebra::{Matrix3, Vector3};
use std::f64::consts::PI;

use crate::error::{Error, Result};

/// Relative tolerance used when closing a shell of k-points.
const SHELL_TOLERANCE: f64 = 1e-5;

#[derive(Debug, Clone, Copy)]
pub struct Lattice {
    /// Lattice vectors (columns)
    pub vectors: Matrix3<f64>,
    /// Reciprocal lattice vectors (columns)
    pub reciprocal: Matrix3<f64>,
    /// Cell volume
    pub volume: f64,
    inverse: Matrix3<f64>,
}

impl Lattice {
    /// Build a lattice from a matrix whose columns are the lattice vectors.
    pub fn new(vectors: Matrix3<f64>) -> Result<Self> {
        let volume = vectors.determinant().abs();
        if !volume.is_finite() || volume < 1e-12 {
            return Err(Error::SingularLattice(volume));
        }
        let inverse = vectors
            .try_inverse()
            .ok_or(Error::SingularLattice(volume))?;
        Ok(Self {
            vectors,
            reciprocal: 2.0 * PI * inverse.transpose(),
            volume,
            inverse,
        })
    }

    /// Build a lattice from a list of lattice vectors.
    pub fn from_rows(rows: &[[f64; 3]; 3]) -> Result<Self> {
        let vectors = Matrix3::from_columns(&[
            Vector3::from(rows[0]),
            Vector3::from(rows[1]),
            Vector3::from(rows[2]),
        ]);
        Self::new(vectors)
    }

    pub fn cubic(a: f64) -> Result<Self> {
        Self::new(Matrix3::identity() * a)
    }

    pub fn fcc(a: f64) -> Result<Self> {
        let h = a / 2.0;
        Self::new(Matrix3::new(
            0.0, h, h,
            h, 0.0, h,
            h, h, 0.0,
        ))
    }

    pub fn bcc(a: f64) -> Result<Self> {
        let h = a / 2.0;
        Self::new(Matrix3::new(
            -h, h, h,
            h, -h, h,
            h, h, -h,
        ))
    }

    /// Cartesian to fractional coordinates.
    #[inline]
    pub fn to_fractional(&self, r: &Vector3<f64>) -> Vector3<f64> {
        self.inverse * r
    }

    #[inline]
    pub fn from_fractional(&self, s: &Vector3<f64>) -> Vector3<f64> {
        self.vectors * s
    }

    /// Map a position back into the simulation cell.
    pub fn wrap(&self, r: &Vector3<f64>) -> Vector3<f64> {
        let s = self.to_fractional(r).map(|x| x - x.floor());
        self.from_fractional(&s)
    }

    /// Reduce a separation vector so that each fractional component lies in [-1/2, 1/2].
    pub fn minimum_image(&self, dr: &Vector3<f64>) -> Vector3<f64> {
        let s = self.to_fractional(dr).map(|x| x - x.round());
        self.from_fractional(&s)
    }

    /// All lattice vectors n₁a₁ + n₂a₂ + n₃a₃ with |nᵢ| ≤ limit, sorted by length.
    /// The origin comes first.
    pub fn lattice_points(&self, limit: u32) -> Vec<Vector3<f64>> {
        integer_combinations(&self.vectors, limit)
    }

    /// Reciprocal lattice vectors with |nᵢ| ≤ limit, sorted by length, origin first.
    pub fn reciprocal_points(&self, limit: u32) -> Vec<Vector3<f64>> {
        integer_combinations(&self.reciprocal, limit)
    }
}

fn integer_combinations(basis: &Matrix3<f64>, limit: u32) -> Vec<Vector3<f64>> {
    let side = 2 * limit as usize + 1;
    let limit = limit as i64;
    let mut points = Vec::with_capacity(side * side * side);
    for nx in -limit..=limit {
        for ny in -limit..=limit {
            for nz in -limit..=limit {
                points.push(basis * Vector3::new(nx as f64, ny as f64, nz as f64));
            }
        }
    }
    points.sort_by(|a, b| a.norm_squared().total_cmp(&b.norm_squared()));
    points
}

/// Reciprocal lattice vectors used as plane-wave k-points by the periodic envelope.
///
/// Takes the `min_kpoints` shortest vectors (default: the larger spin
/// population) and extends the selection to close the last shell.
pub fn make_kpoints(
    lattice: &Lattice,
    nspins: (usize, usize),
    min_kpoints: Option<usize>,
) -> Vec<Vector3<f64>> {
    let min_kpoints = min_kpoints.unwrap_or(nspins.0.max(nspins.1)).max(1);
    let max_k = ((min_kpoints as f64 * (1.0 + SHELL_TOLERANCE)).cbrt().ceil() as u32).max(1);
    let kpoints = lattice.reciprocal_points(max_k);
    let cutoff = kpoints[min_kpoints - 1].norm() * (1.0 + SHELL_TOLERANCE);
    kpoints.into_iter().filter(|k| k.norm() <= cutoff).collect()
}
