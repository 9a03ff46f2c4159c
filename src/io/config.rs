//! Run configuration read from YAML.
//!
//! ```yaml
//! system:
//!   atoms:
//!     - { symbol: H, coords: [0.0, 0.0, -0.7] }
//!     - { symbol: H, coords: [0.0, 0.0, 0.7] }
//!   nspins: [1, 1]
//! network: { hidden_units: 32, determinants: 4, full_det: true }
//! mcmc: { steps: 10, width: 0.02 }
//! pretrain: { iterations: 1000, reference: h2_hf.yml }
//! optim: { iterations: 1000, clip_local_energy: 5.0 }
//! batch_size: 256
//! seed: 42
//! ```

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::network::NetworkOptions;
use crate::pretrain::PretrainOptions;
use crate::sampling::MCMCParams;
use crate::system::{Atom, Lattice, System};
use crate::train::TrainOptions;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AtomConfig {
    pub symbol: String,
    pub coords: [f64; 3],
    /// Overrides the atomic number, e.g. for pseudo-ions
    #[serde(default)]
    pub charge: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SystemConfig {
    pub atoms: Vec<AtomConfig>,
    pub nspins: (usize, usize),
    /// Lattice vectors, one per row; absent for molecules
    #[serde(default)]
    pub lattice: Option<[[f64; 3]; 3]>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            atoms: vec![
                AtomConfig { symbol: "H".into(), coords: [0.0, 0.0, -0.7], charge: None },
                AtomConfig { symbol: "H".into(), coords: [0.0, 0.0, 0.7], charge: None },
            ],
            nspins: (1, 1),
            lattice: None,
        }
    }
}

impl SystemConfig {
    pub fn build(&self) -> Result<System> {
        let atoms = self.atoms.iter()
            .map(|a| {
                let coords = Vector3::from(a.coords);
                match a.charge {
                    Some(charge) => Ok(Atom::with_charge(&a.symbol, coords, charge)),
                    None => Atom::new(&a.symbol, coords),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        match &self.lattice {
            Some(rows) => System::periodic(atoms, self.nspins, Lattice::from_rows(rows)?),
            None => System::new(atoms, self.nspins),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct PretrainConfig {
    #[serde(flatten)]
    pub options: PretrainOptions,
    /// YAML file holding the Hartree-Fock reference; pretraining is skipped without one
    pub reference: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub system: SystemConfig,
    pub network: NetworkOptions,
    pub mcmc: MCMCParams,
    pub pretrain: PretrainConfig,
    pub optim: TrainOptions,
    pub batch_size: usize,
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            system: SystemConfig::default(),
            network: NetworkOptions::default(),
            mcmc: MCMCParams::default(),
            pretrain: PretrainConfig::default(),
            optim: TrainOptions::default(),
            batch_size: 256,
            seed: 42,
        }
    }
}

impl Config {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file. A relative `pretrain.reference` is taken relative
    /// to the directory holding the config.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let mut config: Config = serde_yaml::from_reader(reader)?;
        config.validate()?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        Ok(config)
    }

    /// Prefix relative file paths with `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        if let Some(reference) = self.pretrain.reference.as_mut() {
            if reference.is_relative() {
                *reference = base.join(&*reference);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be positive".into()));
        }
        if !(self.mcmc.width > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "mcmc.width must be positive, got {}",
                self.mcmc.width
            )));
        }
        if self.mcmc.pmove_min > self.mcmc.pmove_max {
            return Err(Error::InvalidConfig(format!(
                "mcmc.pmove_min {} exceeds mcmc.pmove_max {}",
                self.mcmc.pmove_min, self.mcmc.pmove_max
            )));
        }
        Ok(())
    }
}
