//! Hamiltonian module - local energy of molecules and periodic solids.

mod ewald;
mod kinetic;
mod potential;

use nalgebra::Vector3;

pub use ewald::EwaldPotential;
pub use kinetic::{kinetic_energy, DEFAULT_FD_STEP};
pub use potential::potential_energy;

use crate::error::Result;
use crate::system::System;
use crate::wavefunction::LogWfn;

/// Real- and reciprocal-space shells kept in the Ewald sums.
pub const EWALD_TRUNCATION: u32 = 5;

#[derive(Debug, Clone)]
pub enum Potential {
    Molecular {
        atoms: Vec<Vector3<f64>>,
        charges: Vec<f64>,
    },
    Periodic(EwaldPotential),
}

impl Potential {
    pub fn energy(&self, r: &[Vector3<f64>]) -> f64 {
        match self {
            Potential::Molecular { atoms, charges } => potential_energy(r, atoms, charges),
            Potential::Periodic(ewald) => ewald.energy(r),
        }
    }
}

/// Electronic Hamiltonian with fixed nuclei.
#[derive(Debug, Clone)]
pub struct Hamiltonian {
    potential: Potential,
    fd_step: f64,
}

impl Hamiltonian {
    pub fn new(potential: Potential) -> Self {
        Self { potential, fd_step: DEFAULT_FD_STEP }
    }

    /// Molecular or Ewald Hamiltonian, depending on whether the system has a lattice.
    pub fn for_system(system: &System) -> Result<Self> {
        let potential = match system.lattice {
            Some(lattice) => Potential::Periodic(EwaldPotential::new(
                lattice,
                system.positions(),
                system.charges(),
                EWALD_TRUNCATION,
            )?),
            None => Potential::Molecular {
                atoms: system.positions(),
                charges: system.charges(),
            },
        };
        Ok(Self::new(potential))
    }

    pub fn with_fd_step(mut self, h: f64) -> Self {
        self.fd_step = h;
        self
    }

    pub fn potential(&self) -> &Potential {
        &self.potential
    }

    /// `(kinetic, potential)` parts of the local energy.
    pub fn local_energy_terms<W: LogWfn + ?Sized>(
        &self,
        wfn: &W,
        r: &[Vector3<f64>],
    ) -> (f64, f64) {
        (kinetic_energy(wfn, r, self.fd_step), self.potential.energy(r))
    }

    /// E_L(R) = HΨ(R) / Ψ(R).
    pub fn local_energy<W: LogWfn + ?Sized>(&self, wfn: &W, r: &[Vector3<f64>]) -> f64 {
        let (kinetic, potential) = self.local_energy_terms(wfn, r);
        kinetic + potential
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::Atom;
    use approx::assert_relative_eq;

    /// Hydrogen-like ground state exp(-Z r).
    struct Hydrogenic {
        z: f64,
    }

    impl LogWfn for Hydrogenic {
        fn nspins(&self) -> (usize, usize) {
            (1, 0)
        }

        fn log_psi(&self, r: &[Vector3<f64>]) -> (f64, f64) {
            (1.0, -self.z * r[0].norm())
        }
    }

    #[test]
    fn test_hydrogen_like_local_energy_is_exact() {
        for z in [1.0, 2.0] {
            let atom = Atom::with_charge("X", Vector3::zeros(), z);
            let system = System::new(vec![atom], (1, 0)).unwrap();
            let hamiltonian = Hamiltonian::for_system(&system).unwrap();
            let wfn = Hydrogenic { z };
            for r in [Vector3::new(0.6, 0.8, -0.4), Vector3::new(1.5, -0.7, 0.9)] {
                let energy = hamiltonian.local_energy(&wfn, &[r]);
                assert_relative_eq!(energy, -0.5 * z * z, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_local_energy_terms_sum() {
        let system = System::new(vec![Atom::new("H", Vector3::zeros()).unwrap()], (1, 0)).unwrap();
        let hamiltonian = Hamiltonian::for_system(&system).unwrap();
        let wfn = Hydrogenic { z: 0.9 };
        let r = [Vector3::new(0.0, 1.0, 0.0)];
        let (kinetic, potential) = hamiltonian.local_energy_terms(&wfn, &r);
        assert_relative_eq!(potential, -1.0, epsilon = 1e-12);
        let total = hamiltonian.local_energy(&wfn, &r);
        assert_relative_eq!(kinetic + potential, total, epsilon = 1e-12);
    }

    #[test]
    fn test_coarse_fd_step_still_close() {
        let system = System::new(vec![Atom::new("H", Vector3::zeros()).unwrap()], (1, 0)).unwrap();
        let hamiltonian = Hamiltonian::for_system(&system).unwrap().with_fd_step(1e-2);
        let r = [Vector3::new(0.8, -0.9, 0.4)];
        let energy = hamiltonian.local_energy(&Hydrogenic { z: 1.0 }, &r);
        assert_relative_eq!(energy, -0.5, epsilon = 1e-3);
    }
}
