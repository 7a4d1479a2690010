use std::{
    cell::RefCell,
    rc::Rc,
    sync::atomic::AtomicBool,
};

use super::{OutputFitness, Recorded, RecordingReporter};
use crate::{
    config::RunConfig,
    error::NeatError,
    fitness::{FitnessFunction, FitnessPass},
    genome::Genome,
    population::{Population, Termination},
};

fn config(seed: u64) -> RunConfig {
    let mut config = RunConfig::default();
    config.run.population_size = 30;
    config.run.generations = 8;
    config.run.seed = seed;
    config.species.compatibility_threshold = 1.0;
    config.genome.node_add_prob = 0.3;
    config.fitness.games_per_genome = 1;
    config
}

#[test]
fn test_every_genome_belongs_to_one_species() {
    let config = config(11);
    let threshold = config.species.compatibility_threshold;
    let species_config = config.species.clone();
    let mut population = Population::new(config).unwrap();

    for _ in 0..6 {
        population.evaluate(&mut OutputFitness).unwrap();

        let genomes = population.genomes();
        assert_eq!(genomes.len(), 30);

        let assignments = population.species().assignments(genomes.len());
        assert!(assignments.iter().all(Option::is_some));

        let total: usize = population.species().iter().map(|s| s.members.len()).sum();
        assert_eq!(total, genomes.len());

        for species in population.species().iter() {
            for &member in &species.members {
                let distance = species
                    .representative
                    .distance(&genomes[member], &species_config);
                assert!(distance <= threshold, "distance {} > {}", distance, threshold);
            }
        }

        population.advance().unwrap();
    }
}

#[test]
fn test_best_fitness_so_far_never_drops() {
    let recorded = Rc::new(RefCell::new(Recorded::default()));
    let mut population = Population::new(config(5)).unwrap();
    population.add_reporter(Box::new(RecordingReporter(recorded.clone())));

    let summary = population
        .run(&mut OutputFitness, &AtomicBool::new(false))
        .unwrap();
    assert_eq!(summary.termination, Termination::GenerationLimit);
    assert_eq!(summary.generations, 8);

    let recorded = recorded.borrow();
    assert_eq!(recorded.reports.len(), 8);
    assert_eq!(recorded.states.len(), 8);

    let curve: Vec<f64> = recorded.reports.iter().map(|r| r.best_ever_fitness).collect();
    assert!(curve.windows(2).all(|w| w[0] <= w[1]), "{:?}", curve);
    for report in recorded.reports.iter() {
        assert!(report.best_fitness <= report.best_ever_fitness);
        assert!(!report.species.is_empty());
    }

    assert_eq!(summary.best_fitness, curve.last().cloned());
}

#[test]
fn test_same_seed_same_run() {
    let run = |seed: u64| {
        let mut population = Population::new(config(seed)).unwrap();
        population
            .run(&mut OutputFitness, &AtomicBool::new(false))
            .unwrap();
        population.state().clone()
    };

    assert_eq!(run(21), run(21));
    assert_ne!(run(21).genomes, run(22).genomes);
}

#[test]
fn test_fitness_target_stops_run() {
    let mut config = config(3);
    config.run.generations = 50;
    config.run.fitness_target = Some(0.0);

    let mut population = Population::new(config).unwrap();
    let summary = population
        .run(&mut OutputFitness, &AtomicBool::new(false))
        .unwrap();

    assert_eq!(summary.termination, Termination::TargetReached);
    assert_eq!(summary.generations, 1);
    assert!(summary.best.is_some());
}

#[test]
fn test_stop_flag_is_observed_before_evaluation() {
    let mut population = Population::new(config(3)).unwrap();
    let summary = population
        .run(&mut OutputFitness, &AtomicBool::new(true))
        .unwrap();

    assert_eq!(summary.termination, Termination::Cancelled);
    assert_eq!(summary.generations, 0);
    assert!(summary.best.is_none());
}

struct ShortFitness;

impl FitnessFunction for ShortFitness {
    fn evaluate(&mut self, genomes: &[Genome], _generation: u32) -> Result<FitnessPass, NeatError> {
        Ok(FitnessPass {
            fitness: vec![1.0; genomes.len() - 1],
            matches: Vec::new(),
        })
    }
}

struct NanFitness;

impl FitnessFunction for NanFitness {
    fn evaluate(&mut self, genomes: &[Genome], _generation: u32) -> Result<FitnessPass, NeatError> {
        let mut fitness = vec![0.5; genomes.len()];
        fitness[0] = f64::NAN;
        Ok(FitnessPass {
            fitness,
            matches: Vec::new(),
        })
    }
}

#[test]
fn test_fitness_count_must_match_population() {
    let mut population = Population::new(config(1)).unwrap();
    assert!(matches!(
        population.evaluate(&mut ShortFitness),
        Err(NeatError::FitnessCount {
            expected: 30,
            actual: 29
        })
    ));
}

#[test]
fn test_non_finite_fitness_is_zeroed() {
    let mut population = Population::new(config(1)).unwrap();
    let report = population.evaluate(&mut NanFitness).unwrap();

    assert_eq!(population.genomes()[0].fitness, Some(0.0));
    assert_eq!(report.best_fitness, 0.5);
    assert_eq!(report.best_genome.key, population.genomes()[1].key);
}
