use clap::Parser;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use ferminet::sampling::mean;
use ferminet::train::local_energies;
use ferminet::{
    init_electrons, pretrain_hartree_fock, Config, FermiNet, Hamiltonian, HartreeFockReference,
    OptimizableWfn, VmcTrainer, Walkers,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.yml")]
    config: String,
    /// Override the number of training iterations
    #[arg(short, long)]
    iterations: Option<usize>,
    /// Override the random seed
    #[arg(short, long)]
    seed: Option<u64>,
}

const HA_TO_EV: f64 = 27.21138602;

fn run(args: Args) -> ferminet::Result<()> {
    let mut config = Config::from_yaml(&args.config)?;
    if let Some(iterations) = args.iterations {
        config.optim.iterations = iterations;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let mut rng = StdRng::seed_from_u64(config.seed);

    let system = config.system.build()?;
    info!(
        "{} atoms, {} electrons {:?}, periodic: {}",
        system.atoms.len(),
        system.nelectrons(),
        system.nspins,
        system.is_periodic()
    );

    let mut network = FermiNet::new(&system, config.network.clone(), &mut rng)?;
    let hamiltonian = Hamiltonian::for_system(&system)?;
    let positions = init_electrons(&mut rng, &system, config.batch_size, config.mcmc.init_width);
    let mut walkers = Walkers::new(&network, positions);
    info!("Network has {} parameters", network.num_params());

    match &config.pretrain.reference {
        Some(path) if config.pretrain.options.iterations > 0 => {
            let reference = HartreeFockReference::from_yaml(path)?;
            info!(
                "Reference local energy on initial walkers: {:.6} Ha",
                mean(&local_energies(&reference, &hamiltonian, &walkers))
            );
            pretrain_hartree_fock(
                &mut network,
                &mut walkers,
                &reference,
                &config.pretrain.options,
                config.mcmc.width,
                &mut rng,
                None,
            )?;
        }
        Some(_) => {}
        None => warn!("No Hartree-Fock reference given, skipping pretraining"),
    }

    let atoms = system.positions();
    let mut trainer =
        VmcTrainer::new(network, hamiltonian, walkers, config.mcmc, config.optim, atoms);
    trainer.burn_in(&mut rng);
    let history = trainer.run(config.optim.iterations, &mut rng);
    let estimate = trainer.evaluate(config.optim.eval_iterations, &mut rng);

    println!("FermiNet VMC Results");
    println!("--------------------");
    println!("Number of walkers: {}", config.batch_size);
    println!("Training iterations: {}", history.len());
    if let Some(last) = history.last() {
        println!("Last training energy: {:.6} Ha (variance {:.6})", last.energy, last.variance);
    }
    println!("Final energy: {:.6} ± {:.6} Ha", estimate.mean, estimate.error);
    println!(
        "Final energy: {:.4} ± {:.4} eV",
        HA_TO_EV * estimate.mean,
        HA_TO_EV * estimate.error
    );
    println!("Autocorrelation time: {:.2}", estimate.autocorrelation_time);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
