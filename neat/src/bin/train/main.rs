mod args;

use args::Args;
use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use neat::{
    checkpoint::save_json, CheckpointManager, CheckpointReporter, GameFitness, LoggingReporter,
    Population, RunConfig, StatisticsReporter,
};
use simplelog::{CombinedLogger, Config, SharedLogger, SimpleLogger, WriteLogger};
use std::{
    error::Error,
    fs::File,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

fn main() -> Result<(), Box<dyn Error>> {
    let args = init()?;

    if args.list_params {
        for key in RunConfig::keys() {
            println!("{}", key);
        }
        return Ok(());
    }

    let run_dir = args.run_dir.clone().unwrap_or_else(|| {
        let timestamp = Local::now().format("%Y-%m-%d-%H:%M");
        PathBuf::from(format!("runs/{}", timestamp))
    });
    let manager = CheckpointManager::new(&run_dir)?;

    let config = load_config(&args, &manager)?;
    manager.save_config(&config)?;

    let threads = args
        .threads
        .or(config.run.threads)
        .unwrap_or_else(num_cpus::get);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()?;
    log::info!("Using {} threads, run directory {}", threads, run_dir.display());

    // Set up SIGINT handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_handler = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        log::info!("Received SIGINT, stopping after this generation...");
        stop_flag_handler.store(true, Ordering::Relaxed);
    })?;

    let (mut population, statistics) = match manager.load_latest()? {
        Some(state) if args.resume => {
            log::info!("Resuming from generation {}", state.generation);
            let generation = state.generation;
            (
                Population::from_state(config.clone(), state)?,
                StatisticsReporter::resume(&run_dir, generation)?,
            )
        }
        _ => {
            if args.resume {
                log::warn!("No checkpoint in {}, starting fresh", run_dir.display());
            }
            let population = Population::new(config.clone())?;
            manager.save_checkpoint(population.state())?;
            (population, StatisticsReporter::new(&run_dir))
        }
    };

    population.add_reporter(Box::new(LoggingReporter));
    population.add_reporter(Box::new(statistics));
    population.add_reporter(Box::new(CheckpointReporter::new(CheckpointManager::new(
        &run_dir,
    )?)));

    let mut fitness = GameFitness::new(&config)
        .with_champion(population.best().cloned())
        .with_progress(progress_bar()?);
    log::info!(
        "Playing {} games per generation",
        fitness.games_per_generation(config.run.population_size)
    );

    let summary = population.run(&mut fitness, &stop_flag)?;

    if let Some(best) = &summary.best {
        let path = run_dir.join("best.json");
        save_json(&path, best)?;
        log::info!("Saved best genome {} to {}", best.key, path.display());
    }

    Ok(())
}

fn load_config(args: &Args, manager: &CheckpointManager) -> Result<RunConfig, Box<dyn Error>> {
    let mut config = if args.resume && manager.config_path().exists() {
        manager.load_config()?
    } else if let Some(path) = &args.config {
        RunConfig::load(path)?
    } else {
        RunConfig::default()
    };

    for text in &args.overrides {
        config.apply_override(text)?;
    }
    if let Some(generations) = args.generations {
        config.run.set("generations", &generations.to_string())?;
    }
    config.validate()?;

    Ok(config)
}

fn progress_bar() -> Result<ProgressBar, Box<dyn Error>> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(" {spinner:.cyan} {pos}/{len} games [{wide_bar:.cyan/blue}] {eta_precise}")?,
    );
    Ok(bar)
}

fn init() -> Result<Args, Box<dyn Error>> {
    let args = Args::parse();

    let mut loggers: Vec<Box<dyn SharedLogger>> =
        vec![SimpleLogger::new(LevelFilter::Info, Config::default())];
    if let Some(path) = &args.log_file {
        loggers.push(WriteLogger::new(
            LevelFilter::Debug,
            Config::default(),
            File::create(path)?,
        ));
    }
    CombinedLogger::init(loggers)?;

    Ok(args)
}
