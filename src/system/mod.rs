//! Physical system definition: nuclei, electrons and the periodic cell.

mod atom;
mod init;
mod lattice;

pub use atom::{atomic_number, Atom, System};
pub use init::init_electrons;
pub use lattice::{make_kpoints, Lattice};
