//! Metropolis-Hastings sampling of |Ψ(R)|².
//!
//! Walkers keep `log_prob = 2 ln|Ψ|` so that every acceptance test is done in
//! the log domain. Proposals are Gaussian, either with a fixed width or with a
//! width that grows with the electron's distance from the nuclei.

use nalgebra::Vector3;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::wavefunction::LogWfn;

/// Parameters for MCMC sampling.
#[derive(Serialize, Deserialize, Copy, Clone, Debug)]
#[serde(default)]
pub struct MCMCParams {
    /// Metropolis updates per `mcmc_step`
    pub steps: usize,
    /// Initial proposal width
    pub width: f64,
    /// Steps discarded before any averaging
    pub burn_in: usize,
    /// Width adaptation interval
    pub adapt_frequency: usize,
    pub pmove_min: f64,
    pub pmove_max: f64,
    /// Scale each electron's step by its harmonic-mean distance to the nuclei
    pub scale_by_nuclear_distance: bool,
    /// Move one electron at a time instead of all at once
    pub one_electron: bool,
    /// Std of the initial Gaussian spread of electrons about their atoms
    pub init_width: f64,
}

impl Default for MCMCParams {
    fn default() -> Self {
        Self {
            steps: 10,
            width: 0.02,
            burn_in: 100,
            adapt_frequency: 100,
            pmove_min: 0.5,
            pmove_max: 0.55,
            scale_by_nuclear_distance: false,
            one_electron: false,
            init_width: 1.0,
        }
    }
}

/// A batch of electron configurations and their log densities.
#[derive(Debug, Clone)]
pub struct Walkers {
    pub positions: Vec<Vec<Vector3<f64>>>,
    /// 2 ln|Ψ| of every walker
    pub log_prob: Vec<f64>,
}

impl Walkers {
    pub fn new<W: LogWfn + ?Sized>(wfn: &W, positions: Vec<Vec<Vector3<f64>>>) -> Self {
        let log_prob = positions.iter().map(|r| 2.0 * wfn.log_psi(r).1).collect();
        Self { positions, log_prob }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Recompute the log densities after the wavefunction changed.
    pub fn refresh<W: LogWfn + ?Sized>(&mut self, wfn: &W) {
        for (r, lp) in self.positions.iter().zip(self.log_prob.iter_mut()) {
            *lp = 2.0 * wfn.log_psi(r).1;
        }
    }
}

/// 1 / mean(1 / |r - R_I|), the harmonic mean distance from `r` to the nuclei.
fn harmonic_mean(r: &Vector3<f64>, atoms: &[Vector3<f64>]) -> f64 {
    let inverse: f64 = atoms.iter().map(|a| 1.0 / (r - a).norm()).sum();
    atoms.len() as f64 / inverse
}

/// Per-electron proposal std.
fn proposal_widths(r: &[Vector3<f64>], width: f64, atoms: Option<&[Vector3<f64>]>) -> Vec<f64> {
    match atoms {
        Some(atoms) if !atoms.is_empty() => {
            r.iter().map(|ri| width * harmonic_mean(ri, atoms)).collect()
        }
        _ => vec![width; r.len()],
    }
}

/// ln q(x | μ, σ) up to a constant, for isotropic 3D Gaussians with per-electron σ.
fn log_proposal(x: &[Vector3<f64>], mu: &[Vector3<f64>], sigma: &[f64]) -> f64 {
    x.iter()
        .zip(mu.iter())
        .zip(sigma.iter())
        .map(|((xi, mi), s)| -0.5 * (xi - mi).norm_squared() / (s * s) - 3.0 * s.ln())
        .sum()
}

fn gaussian_step<R: Rng>(rng: &mut R, sigma: f64) -> Vector3<f64> {
    Vector3::from_fn(|_, _| rng.sample::<f64, _>(StandardNormal) * sigma)
}

/// One all-electron Metropolis-Hastings update of every walker.
///
/// With `atoms`, proposal widths depend on the configuration and the
/// asymmetric proposal density enters the acceptance ratio. Returns the
/// number of accepted moves.
pub fn mh_update<W: LogWfn + ?Sized, R: Rng>(
    wfn: &W,
    walkers: &mut Walkers,
    width: f64,
    atoms: Option<&[Vector3<f64>]>,
    rng: &mut R,
) -> usize {
    let mut accepted = 0;
    for (r, lp) in walkers.positions.iter_mut().zip(walkers.log_prob.iter_mut()) {
        let sigma_old = proposal_widths(r, width, atoms);
        let proposal: Vec<Vector3<f64>> = r.iter()
            .zip(sigma_old.iter())
            .map(|(ri, &s)| ri + gaussian_step(rng, s))
            .collect();
        let lp_new = 2.0 * wfn.log_psi(&proposal).1;

        let ratio = if atoms.is_some() {
            let sigma_new = proposal_widths(&proposal, width, atoms);
            let lq_reverse = log_proposal(r, &proposal, &sigma_new);
            let lq_forward = log_proposal(&proposal, r, &sigma_old);
            lp_new + lq_reverse - *lp - lq_forward
        } else {
            lp_new - *lp
        };

        if rng.gen::<f64>().ln() < ratio {
            *r = proposal;
            *lp = lp_new;
            accepted += 1;
        }
    }
    accepted
}

/// Metropolis-Hastings update moving one electron at a time.
///
/// Returns the number of accepted single-electron moves.
pub fn mh_update_one_electron<W: LogWfn + ?Sized, R: Rng>(
    wfn: &W,
    walkers: &mut Walkers,
    width: f64,
    atoms: Option<&[Vector3<f64>]>,
    rng: &mut R,
) -> usize {
    let mut accepted = 0;
    for (r, lp) in walkers.positions.iter_mut().zip(walkers.log_prob.iter_mut()) {
        for i in 0..r.len() {
            let old = r[i];
            let sigma_old = proposal_widths(&[old], width, atoms)[0];
            let new = old + gaussian_step(rng, sigma_old);
            r[i] = new;
            let lp_new = 2.0 * wfn.log_psi(r).1;

            let ratio = if atoms.is_some() {
                let sigma_new = proposal_widths(&[new], width, atoms)[0];
                lp_new + log_proposal(&[old], &[new], &[sigma_new]) - *lp
                    - log_proposal(&[new], &[old], &[sigma_old])
            } else {
                lp_new - *lp
            };

            if rng.gen::<f64>().ln() < ratio {
                *lp = lp_new;
                accepted += 1;
            } else {
                r[i] = old;
            }
        }
    }
    accepted
}

/// Run `params.steps` Metropolis updates and return the fraction of accepted moves.
pub fn mcmc_step<W: LogWfn + ?Sized, R: Rng>(
    wfn: &W,
    walkers: &mut Walkers,
    params: &MCMCParams,
    width: f64,
    atoms: Option<&[Vector3<f64>]>,
    rng: &mut R,
) -> f64 {
    let atoms = if params.scale_by_nuclear_distance { atoms } else { None };
    let mut accepted = 0;
    for _ in 0..params.steps {
        accepted += if params.one_electron {
            mh_update_one_electron(wfn, walkers, width, atoms, rng)
        } else {
            mh_update(wfn, walkers, width, atoms, rng)
        };
    }
    let moves_per_step = if params.one_electron {
        walkers.len() * walkers.positions.first().map_or(0, |r| r.len())
    } else {
        walkers.len()
    };
    let total = params.steps * moves_per_step;
    if total == 0 { 0.0 } else { accepted as f64 / total as f64 }
}

/// Adapt the proposal width from the acceptance history.
///
/// `pmoves` is a ring buffer of length `adapt_frequency`. At every multiple
/// of `adapt_frequency` the width grows by 10% when the mean acceptance is
/// above `pmove_max` and shrinks by 10% when it is below `pmove_min`.
pub fn update_width(
    t: usize,
    width: f64,
    pmove: f64,
    pmoves: &mut [f64],
    params: &MCMCParams,
) -> f64 {
    let mut width = width;
    if pmoves.is_empty() {
        return width;
    }
    if t > 0 && t % pmoves.len() == 0 {
        let mean = pmoves.iter().sum::<f64>() / pmoves.len() as f64;
        if mean > params.pmove_max {
            width *= 1.1;
        } else if mean < params.pmove_min {
            width /= 1.1;
        }
        pmoves.iter_mut().for_each(|p| *p = 0.0);
    }
    pmoves[t % pmoves.len()] = pmove;
    width
}
