use std::{cell::RefCell, rc::Rc, sync::atomic::AtomicBool};

use tempfile::tempdir;

use super::{OutputFitness, Recorded, RecordingReporter};
use crate::{
    checkpoint::{CheckpointManager, CheckpointReporter},
    config::RunConfig,
    fitness::GameFitness,
    population::{Population, Termination},
    stats::StatisticsReporter,
};

#[test]
fn test_resume_matches_uninterrupted_run() {
    let mut config = RunConfig::default();
    config.run.population_size = 20;
    config.run.seed = 8;
    config.run.generations = 6;
    config.fitness.games_per_genome = 1;

    let mut full = Population::new(config.clone()).unwrap();
    full.run(&mut OutputFitness, &AtomicBool::new(false))
        .unwrap();

    let dir = tempdir().unwrap();
    let mut first = config.clone();
    first.run.generations = 3;
    let mut partial = Population::new(first).unwrap();
    partial.add_reporter(Box::new(CheckpointReporter::new(
        CheckpointManager::new(dir.path()).unwrap(),
    )));
    partial
        .run(&mut OutputFitness, &AtomicBool::new(false))
        .unwrap();

    let manager = CheckpointManager::new(dir.path()).unwrap();
    assert_eq!(manager.generations().unwrap(), vec![1, 2, 3]);
    assert!(manager.best_path(2).exists());

    let state = manager.load_latest().unwrap().unwrap();
    assert_eq!(state.generation, 3);

    let mut resumed = Population::from_state(config, state).unwrap();
    resumed
        .run(&mut OutputFitness, &AtomicBool::new(false))
        .unwrap();

    assert_eq!(resumed.state(), full.state());
}

#[test]
fn test_statistics_resume_drops_replayed_rows() {
    let dir = tempdir().unwrap();
    let mut config = RunConfig::default();
    config.run.population_size = 10;
    config.run.generations = 4;
    config.fitness.games_per_genome = 1;

    let mut population = Population::new(config).unwrap();
    population.add_reporter(Box::new(StatisticsReporter::new(dir.path())));
    population
        .run(&mut OutputFitness, &AtomicBool::new(false))
        .unwrap();

    let stats = StatisticsReporter::load(dir.path()).unwrap();
    assert_eq!(stats.generations.len(), 4);
    let total: usize = stats.species_sizes(3).iter().map(|&(_, size)| size).sum();
    assert_eq!(total, 10);

    let resumed = StatisticsReporter::resume(dir.path(), 2).unwrap();
    assert_eq!(resumed.stats().generations.len(), 2);
    assert!(resumed.stats().species_sizes(2).is_empty());
}

#[test]
fn test_evolution_with_mcts_games() {
    let mut config = RunConfig::default();
    config.run.population_size = 50;
    config.run.generations = 20;
    config.run.seed = 2024;
    config.species.compatibility_threshold = 3.0;
    config.fitness.move_budget = 200;
    config.fitness.games_per_genome = 1;
    config.fitness.max_plies = 10;
    config.fitness.random_opening_plies = 4;

    let recorded = Rc::new(RefCell::new(Recorded::default()));
    let mut population = Population::new(config.clone()).unwrap();
    population.add_reporter(Box::new(RecordingReporter(recorded.clone())));

    let summary = population
        .run(&mut GameFitness::new(&config), &AtomicBool::new(false))
        .unwrap();

    assert_eq!(summary.termination, Termination::GenerationLimit);
    assert_eq!(summary.generations, 20);
    assert!(!population.species().is_empty());
    assert_eq!(population.genomes().len(), 50);

    let recorded = recorded.borrow();
    let curve: Vec<f64> = recorded.reports.iter().map(|r| r.best_ever_fitness).collect();
    assert_eq!(curve.len(), 20);
    assert!(curve.windows(2).all(|w| w[0] <= w[1]), "{:?}", curve);
    assert!(!recorded.reports[19].species.is_empty());

    // Games long enough to trade material separate the population.
    assert!(recorded
        .reports
        .iter()
        .flat_map(|r| &r.matches)
        .any(|m| m.white_reward != m.black_reward));
    assert!(
        recorded.reports.iter().any(|r| r.stdev_fitness > 0.0),
        "{:?}",
        recorded.reports.iter().map(|r| r.stdev_fitness).collect::<Vec<_>>()
    );
}
