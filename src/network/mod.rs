//! Network module - FermiNet-style orbitals for molecules and solids.

mod envelope;
mod features;
mod fermi_net;
mod params;

pub use envelope::Envelope;
pub use features::FeatureLayer;
pub use fermi_net::{FermiNet, NetworkOptions, Orbitals};
pub use params::{EnvelopeParams, NetworkParams, OrbitalParams};
