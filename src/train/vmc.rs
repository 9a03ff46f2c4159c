//! Variational energy minimization.
//!
//! Each iteration samples |Ψ|² with Metropolis-Hastings, evaluates the local
//! energies and moves the parameters along
//!
//! ∇⟨E⟩ = 2 ⟨(E_L - ⟨E_L⟩) ∂ ln|Ψ| / ∂θ⟩
//!
//! with outlying local energies clipped to a window around the median.

use log::{debug, info};
use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::hamiltonian::Hamiltonian;
use crate::optim::{Adam, AdamOptions};
use crate::sampling::{mcmc_step, mean, update_width, variance, MCMCParams, SeriesStats, Walkers};
use crate::wavefunction::{LogWfn, OptimizableWfn};

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct TrainOptions {
    pub iterations: usize,
    /// Width of the clipping window in mean absolute deviations; 0 disables clipping
    pub clip_local_energy: f64,
    pub optimizer: AdamOptions,
    /// Learning rate decays as (1 + t / lr_delay)^(-lr_decay)
    pub lr_delay: f64,
    pub lr_decay: f64,
    /// Sampling-only iterations of the final energy estimate
    pub eval_iterations: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            iterations: 1000,
            clip_local_energy: 5.0,
            optimizer: AdamOptions { learning_rate: 1e-3, ..Default::default() },
            lr_delay: 10000.0,
            lr_decay: 1.0,
            eval_iterations: 100,
        }
    }
}

/// Statistics of one training iteration.
#[derive(Debug, Clone, Copy)]
pub struct TrainStats {
    pub step: usize,
    pub energy: f64,
    pub variance: f64,
    pub pmove: f64,
    pub width: f64,
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n == 0 {
        0.0
    } else if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Clip local energies to `median ± scale × mean|E_L - median|`.
pub fn clip_local_energies(energies: &[f64], scale: f64) -> Vec<f64> {
    if scale <= 0.0 || energies.is_empty() {
        return energies.to_vec();
    }
    let center = median(energies);
    let deviation =
        energies.iter().map(|e| (e - center).abs()).sum::<f64>() / energies.len() as f64;
    let (lo, hi) = (center - scale * deviation, center + scale * deviation);
    energies.iter().map(|e| e.clamp(lo, hi)).collect()
}

/// Learning rate at step `t`: `lr × (1 + t / lr_delay)^(-lr_decay)`.
///
/// A non-positive `lr_delay` keeps the rate constant.
pub fn learning_rate(options: &TrainOptions, t: usize) -> f64 {
    let base = options.optimizer.learning_rate;
    if options.lr_delay <= 0.0 {
        return base;
    }
    base * (1.0 + t as f64 / options.lr_delay).powf(-options.lr_decay)
}

/// Local energy of every walker.
pub fn local_energies<W: LogWfn + ?Sized>(
    wfn: &W,
    hamiltonian: &Hamiltonian,
    walkers: &Walkers,
) -> Vec<f64> {
    walkers.positions.iter().map(|r| hamiltonian.local_energy(wfn, r)).collect()
}

/// Energy gradient estimate from walker samples and their local energies.
pub fn energy_gradient<W: OptimizableWfn + ?Sized>(
    wfn: &W,
    walkers: &Walkers,
    energies: &[f64],
    clip_scale: f64,
) -> Vec<f64> {
    let clipped = clip_local_energies(energies, clip_scale);
    let center = mean(&clipped);
    let n = walkers.len().max(1) as f64;

    let mut grad = vec![0.0; wfn.num_params()];
    for (r, e) in walkers.positions.iter().zip(clipped.iter()) {
        let weight = 2.0 * (e - center) / n;
        for (g, o) in grad.iter_mut().zip(wfn.log_psi_grad_params(r)) {
            *g += weight * o;
        }
    }
    grad
}

/// Sampling-only energy estimate over `iterations` MCMC steps.
///
/// The batch-mean local energy of every step forms the series whose blocking
/// error and autocorrelation time are reported.
pub fn evaluate_energy<W: LogWfn + ?Sized, R: Rng>(
    wfn: &W,
    hamiltonian: &Hamiltonian,
    walkers: &mut Walkers,
    mcmc: &MCMCParams,
    width: f64,
    atoms: Option<&[Vector3<f64>]>,
    iterations: usize,
    rng: &mut R,
) -> SeriesStats {
    let series: Vec<f64> = (0..iterations)
        .map(|_| {
            mcmc_step(wfn, walkers, mcmc, width, atoms, rng);
            mean(&local_energies(wfn, hamiltonian, walkers))
        })
        .collect();
    SeriesStats::from_series(&series)
}

/// Energy-minimization driver owning the wavefunction and its walkers.
pub struct VmcTrainer<W: OptimizableWfn> {
    pub wfn: W,
    pub hamiltonian: Hamiltonian,
    pub walkers: Walkers,
    mcmc: MCMCParams,
    options: TrainOptions,
    atoms: Vec<Vector3<f64>>,
    adam: Adam,
    width: f64,
    pmoves: Vec<f64>,
    step: usize,
}

impl<W: OptimizableWfn> VmcTrainer<W> {
    pub fn new(
        wfn: W,
        hamiltonian: Hamiltonian,
        walkers: Walkers,
        mcmc: MCMCParams,
        options: TrainOptions,
        atoms: Vec<Vector3<f64>>,
    ) -> Self {
        let adam = Adam::new(wfn.num_params(), options.optimizer);
        Self {
            wfn,
            hamiltonian,
            walkers,
            mcmc,
            options,
            atoms,
            adam,
            width: mcmc.width,
            pmoves: vec![0.0; mcmc.adapt_frequency],
            step: 0,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn into_wfn(self) -> W {
        self.wfn
    }

    /// One MCMC step at the current width; returns the acceptance ratio.
    fn sample<R: Rng>(&mut self, rng: &mut R) -> f64 {
        let atoms = Some(self.atoms.as_slice());
        mcmc_step(&self.wfn, &mut self.walkers, &self.mcmc, self.width, atoms, rng)
    }

    /// Equilibrate the walkers without touching the parameters.
    pub fn burn_in<R: Rng>(&mut self, rng: &mut R) {
        self.walkers.refresh(&self.wfn);
        for t in 0..self.mcmc.burn_in {
            let pmove = self.sample(rng);
            self.width = update_width(t, self.width, pmove, &mut self.pmoves, &self.mcmc);
        }
        debug!("Burn-in finished with width {:.4}", self.width);
    }

    /// One sampling step followed by one parameter update.
    pub fn train_step<R: Rng>(&mut self, rng: &mut R) -> TrainStats {
        let pmove = self.sample(rng);
        self.width = update_width(self.step, self.width, pmove, &mut self.pmoves, &self.mcmc);

        let energies = local_energies(&self.wfn, &self.hamiltonian, &self.walkers);
        let clip = self.options.clip_local_energy;
        let grad = energy_gradient(&self.wfn, &self.walkers, &energies, clip);

        self.adam.options.learning_rate = learning_rate(&self.options, self.step);
        let mut params = self.wfn.params();
        self.adam.step(&mut params, &grad);
        self.wfn.set_params(&params);
        self.walkers.refresh(&self.wfn);

        let stats = TrainStats {
            step: self.step,
            energy: mean(&energies),
            variance: variance(&energies),
            pmove,
            width: self.width,
        };
        info!(
            "Step {:05}: E = {:.6}, var = {:.6}, pmove = {:.2}",
            stats.step, stats.energy, stats.variance, stats.pmove
        );
        self.step += 1;
        stats
    }

    /// Run `iterations` training steps and return their statistics.
    pub fn run<R: Rng>(&mut self, iterations: usize, rng: &mut R) -> Vec<TrainStats> {
        (0..iterations).map(|_| self.train_step(rng)).collect()
    }

    /// Energy estimate at the current parameters.
    pub fn evaluate<R: Rng>(&mut self, iterations: usize, rng: &mut R) -> SeriesStats {
        evaluate_energy(
            &self.wfn,
            &self.hamiltonian,
            &mut self.walkers,
            &self.mcmc,
            self.width,
            Some(self.atoms.as_slice()),
            iterations,
            rng,
        )
    }
}
