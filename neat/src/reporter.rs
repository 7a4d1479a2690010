use serde::{Deserialize, Serialize};

use crate::{
    error::NeatError,
    fitness::MatchRecord,
    genome::Genome,
    population::{PopulationState, RunSummary},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSummary {
    pub id: u32,
    pub created: u32,
    pub size: usize,
    pub best_fitness: Option<f64>,
    pub mean_fitness: f64,
    pub stagnation: u32,
}

/// Everything known about a generation once it has been evaluated and speciated.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub generation: u32,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub stdev_fitness: f64,
    /// Best genome of this generation.
    pub best_genome: Genome,
    /// Best fitness over the whole run so far.
    pub best_ever_fitness: f64,
    pub species: Vec<SpeciesSummary>,
    pub matches: Vec<MatchRecord>,
}

/// Hooks called by the population manager. Every method defaults to a no-op.
pub trait Reporter {
    fn start_generation(&mut self, _generation: u32) -> Result<(), NeatError> {
        Ok(())
    }

    fn post_evaluate(&mut self, _report: &GenerationReport) -> Result<(), NeatError> {
        Ok(())
    }

    fn new_best(&mut self, _generation: u32, _genome: &Genome) -> Result<(), NeatError> {
        Ok(())
    }

    fn species_removed(&mut self, _generation: u32, _ids: &[u32]) {}

    /// Called once the next generation has been bred.
    fn end_generation(&mut self, _state: &PopulationState) -> Result<(), NeatError> {
        Ok(())
    }

    fn finished(&mut self, _summary: &RunSummary) {}
}

/// Writes progress to the `log` facade.
#[derive(Debug, Default)]
pub struct LoggingReporter;

impl Reporter for LoggingReporter {
    fn start_generation(&mut self, generation: u32) -> Result<(), NeatError> {
        log::info!("****** Running generation {} ******", generation);
        Ok(())
    }

    fn post_evaluate(&mut self, report: &GenerationReport) -> Result<(), NeatError> {
        log::info!(
            "Generation {}: best {:.4}, mean {:.4}, stdev {:.4}, best ever {:.4}",
            report.generation,
            report.best_fitness,
            report.mean_fitness,
            report.stdev_fitness,
            report.best_ever_fitness
        );
        log::info!(
            "Best genome {}: {} nodes, {} connections ({} enabled)",
            report.best_genome.key,
            report.best_genome.num_nodes(),
            report.best_genome.num_connections(),
            report.best_genome.num_enabled()
        );

        log::info!("{} species", report.species.len());
        for species in &report.species {
            log::debug!(
                "  species {:>4}  size {:>4}  best {:>8}  mean {:>8.4}  stagnant {:>3}",
                species.id,
                species.size,
                species
                    .best_fitness
                    .map_or("-".to_string(), |f| format!("{:.4}", f)),
                species.mean_fitness,
                species.stagnation
            );
        }
        Ok(())
    }

    fn new_best(&mut self, generation: u32, genome: &Genome) -> Result<(), NeatError> {
        log::info!(
            "New best genome {} in generation {} (fitness {:.4})",
            genome.key,
            generation,
            genome.fitness.unwrap_or(f64::NAN)
        );
        Ok(())
    }

    fn species_removed(&mut self, generation: u32, ids: &[u32]) {
        if !ids.is_empty() {
            log::info!("Generation {}: removed stagnant species {:?}", generation, ids);
        }
    }

    fn finished(&mut self, summary: &RunSummary) {
        log::info!(
            "Finished after {} generations ({:?}), best fitness {:.4}",
            summary.generations,
            summary.termination,
            summary.best_fitness.unwrap_or(f64::NAN)
        );
    }
}
