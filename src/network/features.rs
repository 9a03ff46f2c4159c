//! Input features of the orbital network.
//!
//! Molecular features are raw electron-atom and electron-electron
//! displacements plus their lengths. Periodic features replace each
//! displacement by the sine and cosine of its fractional coordinates
//! (times 2π) and the length by a smooth periodic distance, so every feature
//! is unchanged when an electron moves by a lattice vector.

use nalgebra::{DVector, Matrix3, Vector3};
use std::f64::consts::PI;

use crate::system::{Lattice, System};

#[derive(Debug, Clone)]
pub enum FeatureLayer {
    Molecular {
        atoms: Vec<Vector3<f64>>,
    },
    Periodic {
        atoms: Vec<Vector3<f64>>,
        lattice: Lattice,
        /// Lᵀ L / (2π)², the metric of the fractional-angle coordinates
        metric: Matrix3<f64>,
        include_r_ae: bool,
    },
}

impl FeatureLayer {
    pub fn molecular(atoms: Vec<Vector3<f64>>) -> Self {
        FeatureLayer::Molecular { atoms }
    }

    pub fn periodic(atoms: Vec<Vector3<f64>>, lattice: Lattice, include_r_ae: bool) -> Self {
        let metric = lattice.vectors.transpose() * lattice.vectors / (4.0 * PI * PI);
        FeatureLayer::Periodic { atoms, lattice, metric, include_r_ae }
    }

    pub fn for_system(system: &System, include_r_ae: bool) -> Self {
        match system.lattice {
            Some(lattice) => Self::periodic(system.positions(), lattice, include_r_ae),
            None => Self::molecular(system.positions()),
        }
    }

    fn natoms(&self) -> usize {
        match self {
            FeatureLayer::Molecular { atoms } | FeatureLayer::Periodic { atoms, .. } => atoms.len(),
        }
    }

    /// Length of the per-electron feature vector.
    pub fn one_electron_dim(&self) -> usize {
        match self {
            FeatureLayer::Molecular { .. } => 4 * self.natoms(),
            FeatureLayer::Periodic { include_r_ae, .. } => {
                let per_atom = if *include_r_ae { 7 } else { 6 };
                per_atom * self.natoms()
            }
        }
    }

    /// Length of the per-pair feature vector.
    pub fn two_electron_dim(&self) -> usize {
        match self {
            FeatureLayer::Molecular { .. } => 4,
            FeatureLayer::Periodic { .. } => 7,
        }
    }

    /// Length of the input vector fed to the hidden layer.
    pub fn input_dim(&self) -> usize {
        3 * self.one_electron_dim() + 2 * self.two_electron_dim()
    }

    fn push_displacement(&self, dr: &Vector3<f64>, include_norm: bool, out: &mut Vec<f64>) {
        match self {
            FeatureLayer::Molecular { .. } => {
                out.extend(dr.iter());
                if include_norm {
                    out.push(dr.norm());
                }
            }
            FeatureLayer::Periodic { lattice, metric, .. } => {
                let angle = lattice.to_fractional(dr) * (2.0 * PI);
                let sin = angle.map(f64::sin);
                let cos = angle.map(f64::cos);
                out.extend(sin.iter());
                out.extend(cos.iter());
                if include_norm {
                    let one_minus_cos = cos.map(|c| 1.0 - c);
                    let norm2 =
                        one_minus_cos.dot(&(metric * one_minus_cos)) + sin.dot(&(metric * sin));
                    out.push(norm2.max(0.0).sqrt());
                }
            }
        }
    }

    fn one_electron(&self, r: &Vector3<f64>) -> Vec<f64> {
        let (atoms, include_norm) = match self {
            FeatureLayer::Molecular { atoms } => (atoms, true),
            FeatureLayer::Periodic { atoms, include_r_ae, .. } => (atoms, *include_r_ae),
        };
        let mut out = Vec::with_capacity(self.one_electron_dim());
        for atom in atoms {
            self.push_displacement(&(r - atom), include_norm, &mut out);
        }
        out
    }

    fn two_electron(&self, dr: &Vector3<f64>) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.two_electron_dim());
        self.push_displacement(dr, true, &mut out);
        out
    }

    /// Build the network input of every electron.
    ///
    /// Electron `i` sees its own one-electron features, the mean one-electron
    /// features of the spin-up and spin-down electrons, and the mean of its
    /// pair features with the spin-up and spin-down electrons. The means make
    /// the inputs equivariant under same-spin permutations.
    pub fn inputs(&self, r: &[Vector3<f64>], nspins: (usize, usize)) -> Vec<DVector<f64>> {
        let n_up = nspins.0;
        let one: Vec<Vec<f64>> = r.iter().map(|ri| self.one_electron(ri)).collect();
        let d1 = self.one_electron_dim();
        let d2 = self.two_electron_dim();

        let mean_of = |rows: &[Vec<f64>], dim: usize| -> Vec<f64> {
            let mut mean = vec![0.0; dim];
            for row in rows {
                for (m, v) in mean.iter_mut().zip(row.iter()) {
                    *m += v;
                }
            }
            if !rows.is_empty() {
                mean.iter_mut().for_each(|m| *m /= rows.len() as f64);
            }
            mean
        };
        let mean_up = mean_of(&one[..n_up], d1);
        let mean_down = mean_of(&one[n_up..], d1);

        (0..r.len())
            .map(|i| {
                let pairs: Vec<Vec<f64>> = r.iter()
                    .map(|rj| self.two_electron(&(r[i] - rj)))
                    .collect();
                let pair_up = mean_of(&pairs[..n_up], d2);
                let pair_down = mean_of(&pairs[n_up..], d2);
                DVector::from_iterator(
                    self.input_dim(),
                    one[i].iter()
                        .chain(mean_up.iter())
                        .chain(mean_down.iter())
                        .chain(pair_up.iter())
                        .chain(pair_down.iter())
                        .copied(),
                )
            })
            .collect()
    }
}
