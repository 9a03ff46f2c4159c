//! Atoms and the electronic system built from them.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use super::lattice::Lattice;

const ELEMENTS: [&str; 18] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne",
    "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar",
];

/// Nuclear charge of an element symbol, for the first three rows.
pub fn atomic_number(symbol: &str) -> Option<u32> {
    ELEMENTS.iter().position(|&s| s == symbol).map(|i| i as u32 + 1)
}

/// A fixed nucleus.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Atom {
    pub symbol: String,
    /// Position in Bohr
    pub coords: Vector3<f64>,
    /// Nuclear charge (may differ from the atomic number for pseudo-ions)
    pub charge: f64,
}

impl Atom {
    /// Create an atom whose charge is its atomic number.
    pub fn new(symbol: &str, coords: Vector3<f64>) -> Result<Self> {
        let z = atomic_number(symbol)
            .ok_or_else(|| Error::InvalidSystem(format!("unknown element '{}'", symbol)))?;
        Ok(Self::with_charge(symbol, coords, z as f64))
    }

    pub fn with_charge(symbol: &str, coords: Vector3<f64>, charge: f64) -> Self {
        Self { symbol: symbol.to_string(), coords, charge }
    }
}

/// Electrons in the field of fixed nuclei, optionally inside a periodic cell.
///
/// Electrons are ordered spin-up first: indices `0..nspins.0` are spin up and
/// `nspins.0..nspins.0 + nspins.1` are spin down.
#[derive(Debug, Clone)]
pub struct System {
    pub atoms: Vec<Atom>,
    pub nspins: (usize, usize),
    pub lattice: Option<Lattice>,
}

impl System {
    pub fn new(atoms: Vec<Atom>, nspins: (usize, usize)) -> Result<Self> {
        if nspins.0 + nspins.1 == 0 {
            return Err(Error::InvalidSystem("system has no electrons".into()));
        }
        if let Some(atom) = atoms.iter().find(|a| !(a.charge >= 0.0)) {
            return Err(Error::InvalidSystem(format!(
                "atom {} has invalid charge {}",
                atom.symbol, atom.charge
            )));
        }
        Ok(Self { atoms, nspins, lattice: None })
    }

    pub fn periodic(atoms: Vec<Atom>, nspins: (usize, usize), lattice: Lattice) -> Result<Self> {
        let mut system = Self::new(atoms, nspins)?;
        system.lattice = Some(lattice);
        Ok(system)
    }

    #[inline]
    pub fn nelectrons(&self) -> usize {
        self.nspins.0 + self.nspins.1
    }

    #[inline]
    pub fn is_periodic(&self) -> bool {
        self.lattice.is_some()
    }

    /// Spin channel of electron `i` (0 = up, 1 = down).
    #[inline]
    pub fn spin_of(&self, i: usize) -> usize {
        if i < self.nspins.0 { 0 } else { 1 }
    }

    pub fn charges(&self) -> Vec<f64> {
        self.atoms.iter().map(|a| a.charge).collect()
    }

    pub fn positions(&self) -> Vec<Vector3<f64>> {
        self.atoms.iter().map(|a| a.coords).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_number() {
        assert_eq!(atomic_number("H"), Some(1));
        assert_eq!(atomic_number("C"), Some(6));
        assert_eq!(atomic_number("Ar"), Some(18));
        assert_eq!(atomic_number("Xx"), None);
    }

    #[test]
    fn test_system_validation() {
        let atoms = vec![Atom::new("Li", Vector3::zeros()).unwrap()];
        assert!(System::new(atoms.clone(), (0, 0)).is_err());

        let system = System::new(atoms, (2, 1)).unwrap();
        assert_eq!(system.nelectrons(), 3);
        assert_eq!(system.spin_of(1), 0);
        assert_eq!(system.spin_of(2), 1);
        assert!(!system.is_periodic());

        let bad = vec![Atom::with_charge("X", Vector3::zeros(), f64::NAN)];
        assert!(System::new(bad, (1, 0)).is_err());
    }
}
