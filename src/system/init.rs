//! Initial electron configurations for the Markov chains.

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::StandardNormal;

use super::atom::System;

/// Distribute electrons over atoms according to nuclear charge.
///
/// Returns one site index per electron, spin-up electrons first. Sites are
/// listed atom by atom and spins alternate along that list, so each atom
/// receives a near-balanced spin population. Electrons left over after every
/// atom is filled to its (rounded) charge are placed round-robin.
fn assign_sites(system: &System) -> Vec<usize> {
    let natoms = system.atoms.len();
    let nelec = system.nelectrons();

    let mut sites: Vec<usize> = system.atoms.iter()
        .enumerate()
        .flat_map(|(i, atom)| std::iter::repeat(i).take(atom.charge.round().max(0.0) as usize))
        .take(nelec)
        .collect();
    let mut next = 0;
    while sites.len() < nelec {
        sites.push(next % natoms);
        next += 1;
    }

    let (n_up, n_down) = system.nspins;
    let mut up = Vec::with_capacity(n_up);
    let mut down = Vec::with_capacity(n_down);
    for (k, &site) in sites.iter().enumerate() {
        let prefer_up = k % 2 == 0;
        if (prefer_up && up.len() < n_up) || down.len() >= n_down {
            up.push(site);
        } else {
            down.push(site);
        }
    }
    up.extend(down);
    up
}

fn gaussian<R: Rng>(rng: &mut R, width: f64) -> Vector3<f64> {
    Vector3::from_fn(|_, _| rng.sample::<f64, _>(StandardNormal)) * width
}

/// Generate `batch` electron configurations scattered around the nuclei.
///
/// Each electron is placed on its assigned atom plus Gaussian noise of standard
/// deviation `width`. Systems without atoms (e.g. an empty periodic cell) use a
/// uniform distribution over the cell, or a Gaussian around the origin.
pub fn init_electrons<R: Rng>(
    rng: &mut R,
    system: &System,
    batch: usize,
    width: f64,
) -> Vec<Vec<Vector3<f64>>> {
    let nelec = system.nelectrons();

    if system.atoms.is_empty() {
        return (0..batch)
            .map(|_| {
                (0..nelec)
                    .map(|_| match &system.lattice {
                        Some(lattice) => {
                            let s = Vector3::from_fn(|_, _| rng.gen::<f64>());
                            lattice.from_fractional(&s)
                        }
                        None => gaussian(rng, width),
                    })
                    .collect()
            })
            .collect();
    }

    let sites = assign_sites(system);
    (0..batch)
        .map(|_| {
            sites.iter()
                .map(|&site| system.atoms[site].coords + gaussian(rng, width))
                .collect()
        })
        .collect()
}
