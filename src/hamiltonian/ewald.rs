//! Ewald summation of the Coulomb energy in a periodic cell.
//!
//! The pair kernel φ(r) is the potential of a unit point charge and all its
//! periodic images, in a uniform compensating background:
//!
//! φ(r) = Σ_R erfc(√γ |r - R|) / |r - R|
//!      + (4π/V) Σ_{G≠0} exp(-G²/4γ) / G² · cos(G·r)
//!      - π / (Vγ)
//!
//! The Madelung constant ξ is the same sum with the R = 0 singular term
//! removed, giving the interaction of a charge with its own images.

use nalgebra::Vector3;
use statrs::function::erf::erfc;
use std::f64::consts::PI;

use crate::error::{Error, Result};
use crate::system::Lattice;

#[derive(Debug, Clone)]
pub struct EwaldPotential {
    lattice: Lattice,
    atoms: Vec<Vector3<f64>>,
    charges: Vec<f64>,
    /// Splitting parameter γ
    gamma: f64,
    /// Real-space lattice vectors, origin first
    lattice_points: Vec<Vector3<f64>>,
    /// Non-zero reciprocal vectors with their weights (4π/V) exp(-G²/4γ) / G²
    reciprocal_terms: Vec<(Vector3<f64>, f64)>,
    madelung: f64,
    /// Nuclear repulsion, fixed for the lifetime of the potential
    ion_ion: f64,
}

impl EwaldPotential {
    pub fn new(
        lattice: Lattice,
        atoms: Vec<Vector3<f64>>,
        charges: Vec<f64>,
        truncation_limit: u32,
    ) -> Result<Self> {
        if atoms.len() != charges.len() {
            return Err(Error::InvalidSystem(format!(
                "{} atoms but {} charges",
                atoms.len(),
                charges.len()
            )));
        }
        let volume = lattice.volume;
        let gamma = (2.8 / volume.cbrt()).powi(2);

        let lattice_points = lattice.lattice_points(truncation_limit);
        let reciprocal_terms = lattice.reciprocal_points(truncation_limit)
            .into_iter()
            .skip(1)
            .map(|g| {
                let g2 = g.norm_squared();
                (g, 4.0 * PI / volume * (-g2 / (4.0 * gamma)).exp() / g2)
            })
            .collect();

        let mut ewald = Self {
            lattice,
            atoms,
            charges,
            gamma,
            lattice_points,
            reciprocal_terms,
            madelung: 0.0,
            ion_ion: 0.0,
        };
        ewald.madelung = ewald.compute_madelung();
        ewald.ion_ion = ewald.compute_ion_ion();
        Ok(ewald)
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn madelung(&self) -> f64 {
        self.madelung
    }

    /// Nuclear-nuclear energy, including each nucleus' interaction with its images.
    pub fn ion_ion(&self) -> f64 {
        self.ion_ion
    }

    fn background(&self) -> f64 {
        PI / (self.lattice.volume * self.gamma)
    }

    fn compute_madelung(&self) -> f64 {
        let kappa = self.gamma.sqrt();
        let real: f64 = self.lattice_points.iter()
            .skip(1)
            .map(|r| {
                let d = r.norm();
                erfc(kappa * d) / d
            })
            .sum();
        let recip: f64 = self.reciprocal_terms.iter().map(|(_, w)| w).sum();
        real - 2.0 * kappa / PI.sqrt() + recip - self.background()
    }

    /// Periodic Coulomb kernel φ for a separation `dr`.
    pub fn kernel(&self, dr: &Vector3<f64>) -> f64 {
        let dr = self.lattice.minimum_image(dr);
        let kappa = self.gamma.sqrt();
        let real: f64 = self.lattice_points.iter()
            .map(|r| {
                let d = (dr - r).norm();
                erfc(kappa * d) / d
            })
            .sum();
        let recip: f64 = self.reciprocal_terms.iter()
            .map(|(g, w)| w * g.dot(&dr).cos())
            .sum();
        real + recip - self.background()
    }

    fn compute_ion_ion(&self) -> f64 {
        let mut energy: f64 = self.charges.iter().map(|z| z * z).sum::<f64>() * self.madelung / 2.0;
        for i in 0..self.atoms.len() {
            for j in (i + 1)..self.atoms.len() {
                let dr = self.atoms[i] - self.atoms[j];
                energy += self.charges[i] * self.charges[j] * self.kernel(&dr);
            }
        }
        energy
    }

    /// Electron-electron plus electron-ion energy.
    pub fn electron_energy(&self, r: &[Vector3<f64>]) -> f64 {
        let mut ee = r.len() as f64 * self.madelung / 2.0;
        for i in 0..r.len() {
            for j in (i + 1)..r.len() {
                ee += self.kernel(&(r[i] - r[j]));
            }
        }
        let ae: f64 = r.iter()
            .map(|ri| {
                self.atoms.iter()
                    .zip(self.charges.iter())
                    .map(|(atom, z)| z * self.kernel(&(ri - atom)))
                    .sum::<f64>()
            })
            .sum();
        ee - ae
    }

    /// Total Coulomb energy of the electrons and nuclei in the cell.
    pub fn energy(&self, r: &[Vector3<f64>]) -> f64 {
        self.electron_energy(r) + self.ion_ion
    }
}
