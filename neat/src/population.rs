use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::{
    config::RunConfig,
    context::RunContext,
    error::NeatError,
    fitness::FitnessFunction,
    genome::Genome,
    reporter::{GenerationReport, Reporter, SpeciesSummary},
    reproduction::reproduce,
    species::SpeciesSet,
};

/// Why a run stopped. Reaching the generation limit is a normal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    TargetReached,
    GenerationLimit,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Best genome over all evaluated generations.
    pub best: Option<Genome>,
    pub best_fitness: Option<f64>,
    /// Generations evaluated, counted from generation 0.
    pub generations: u32,
    pub termination: Termination,
}

/// Everything needed to resume a run between generations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationState {
    /// The generation `genomes` belong to, not yet evaluated.
    pub generation: u32,
    pub genomes: Vec<Genome>,
    pub species: SpeciesSet,
    pub context: RunContext,
    pub best: Option<Genome>,
}

/// Drives evaluation, speciation and reproduction across generations.
///
/// Genomes and species are only changed between fitness passes, so every
/// generation is a synchronisation barrier.
pub struct Population {
    config: RunConfig,
    state: PopulationState,
    reporters: Vec<Box<dyn Reporter>>,
}

impl Population {
    pub fn new(config: RunConfig) -> Result<Self, NeatError> {
        config.validate()?;

        let mut context = RunContext::new(
            config.run.seed,
            config.genome.num_inputs,
            config.genome.num_outputs,
        );
        let mut rng = context.initial_rng();
        let genomes = (0..config.run.population_size)
            .map(|_| {
                let key = context.next_genome_key();
                Genome::initial(key, &config.genome, &mut context.tracker, &mut rng)
            })
            .collect();

        Ok(Self {
            config,
            state: PopulationState {
                generation: 0,
                genomes,
                species: SpeciesSet::new(),
                context,
                best: None,
            },
            reporters: Vec::new(),
        })
    }

    /// Resumes from a checkpoint.
    pub fn from_state(config: RunConfig, state: PopulationState) -> Result<Self, NeatError> {
        config.validate()?;
        if state.genomes.is_empty() {
            return Err(NeatError::EmptyPopulation);
        }

        Ok(Self {
            config,
            state,
            reporters: Vec::new(),
        })
    }

    pub fn add_reporter(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn state(&self) -> &PopulationState {
        &self.state
    }

    pub fn generation(&self) -> u32 {
        self.state.generation
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.state.genomes
    }

    pub fn species(&self) -> &SpeciesSet {
        &self.state.species
    }

    pub fn best(&self) -> Option<&Genome> {
        self.state.best.as_ref()
    }

    /// Runs generations until the limit, the fitness target or `stop`.
    ///
    /// `stop` is only observed between generations; a started fitness pass
    /// always completes.
    pub fn run<F>(&mut self, fitness: &mut F, stop: &AtomicBool) -> Result<RunSummary, NeatError>
    where
        F: FitnessFunction + ?Sized,
    {
        let (termination, generations) = loop {
            if stop.load(Ordering::Relaxed) {
                break (Termination::Cancelled, self.state.generation);
            }
            if self.state.generation >= self.config.run.generations {
                break (Termination::GenerationLimit, self.state.generation);
            }

            let report = self.evaluate(fitness)?;
            let target = self.config.run.fitness_target;
            if target.map_or(false, |t| report.best_fitness >= t) {
                break (Termination::TargetReached, self.state.generation + 1);
            }

            self.advance()?;
        };

        let summary = RunSummary {
            best: self.state.best.clone(),
            best_fitness: self.state.best.as_ref().and_then(|g| g.fitness),
            generations,
            termination,
        };
        for reporter in &mut self.reporters {
            reporter.finished(&summary);
        }
        Ok(summary)
    }

    /// Scores and speciates the current generation.
    pub fn evaluate<F>(&mut self, fitness: &mut F) -> Result<GenerationReport, NeatError>
    where
        F: FitnessFunction + ?Sized,
    {
        let generation = self.state.generation;
        for reporter in &mut self.reporters {
            reporter.start_generation(generation)?;
        }

        let pass = fitness.evaluate(&self.state.genomes, generation)?;
        if pass.fitness.len() != self.state.genomes.len() {
            return Err(NeatError::FitnessCount {
                expected: self.state.genomes.len(),
                actual: pass.fitness.len(),
            });
        }

        for (genome, &score) in self.state.genomes.iter_mut().zip(&pass.fitness) {
            genome.fitness = Some(if score.is_finite() {
                score
            } else {
                log::warn!("Genome {} scored {}, using 0", genome.key, score);
                0.0
            });
        }

        let best_index = best_index(&self.state.genomes).ok_or(NeatError::EmptyPopulation)?;
        let best_genome = self.state.genomes[best_index].clone();
        let best_fitness = best_genome.fitness.unwrap_or(0.0);

        let improved = self
            .state
            .best
            .as_ref()
            .and_then(|b| b.fitness)
            .map_or(true, |previous| best_fitness > previous);
        if improved {
            self.state.best = Some(best_genome.clone());
            for reporter in &mut self.reporters {
                reporter.new_best(generation, &best_genome)?;
            }
        }

        self.state
            .species
            .speciate(&self.state.genomes, generation, &self.config.species);

        let report = self.report(generation, best_genome, pass.matches);
        for reporter in &mut self.reporters {
            reporter.post_evaluate(&report)?;
        }
        Ok(report)
    }

    /// Culls stagnant species and breeds the next generation.
    pub fn advance(&mut self) -> Result<(), NeatError> {
        let generation = self.state.generation;

        let champion = self.state.best.as_ref().map(|genome| genome.key);
        let removed = self.state.species.remove_stagnant(
            &self.state.genomes,
            generation,
            champion,
            &self.config.species,
        );
        for reporter in &mut self.reporters {
            reporter.species_removed(generation, &removed);
        }

        let mut rng = self.state.context.generation_rng(generation);
        let next = reproduce(
            &mut self.state.species,
            &self.state.genomes,
            &self.config,
            &mut self.state.context,
            &mut rng,
        )?;

        self.state.genomes = next;
        self.state.generation += 1;

        for reporter in &mut self.reporters {
            reporter.end_generation(&self.state)?;
        }
        Ok(())
    }

    fn report(
        &self,
        generation: u32,
        best_genome: Genome,
        matches: Vec<crate::fitness::MatchRecord>,
    ) -> GenerationReport {
        let scores: Vec<f64> = self
            .state
            .genomes
            .iter()
            .filter_map(|g| g.fitness)
            .collect();
        let (mean, stdev) = mean_stdev(&scores);

        let species = self
            .state
            .species
            .iter()
            .map(|s| {
                let member_scores: Vec<f64> = s
                    .members
                    .iter()
                    .filter_map(|&i| self.state.genomes[i].fitness)
                    .collect();
                SpeciesSummary {
                    id: s.id,
                    created: s.created,
                    size: s.members.len(),
                    best_fitness: s.fitness(&self.state.genomes),
                    mean_fitness: mean_stdev(&member_scores).0,
                    stagnation: s.stagnation(generation),
                }
            })
            .collect();

        GenerationReport {
            generation,
            best_fitness: best_genome.fitness.unwrap_or(0.0),
            mean_fitness: mean,
            stdev_fitness: stdev,
            best_genome,
            best_ever_fitness: self
                .state
                .best
                .as_ref()
                .and_then(|g| g.fitness)
                .unwrap_or(0.0),
            species,
            matches,
        }
    }
}

/// Index of the fittest genome, first on ties.
fn best_index(genomes: &[Genome]) -> Option<usize> {
    genomes
        .iter()
        .enumerate()
        .filter_map(|(i, g)| g.fitness.map(|f| (i, f)))
        .fold(None, |best: Option<(usize, f64)>, candidate| match best {
            Some(b) if b.1 >= candidate.1 => Some(b),
            _ => Some(candidate),
        })
        .map(|(i, _)| i)
}

fn mean_stdev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_stdev() {
        assert_eq!(mean_stdev(&[]), (0.0, 0.0));
        assert_eq!(mean_stdev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), (5.0, 2.0));
    }

    #[test]
    fn test_new_population_has_configured_size() {
        let mut config = RunConfig::default();
        config.run.population_size = 12;
        let population = Population::new(config).unwrap();

        assert_eq!(population.genomes().len(), 12);
        assert_eq!(population.generation(), 0);
        assert!(population.best().is_none());

        let keys: Vec<u64> = population.genomes().iter().map(|g| g.key).collect();
        assert_eq!(keys, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_invalid_config_is_rejected_before_run() {
        let mut config = RunConfig::default();
        config.run.population_size = 0;
        assert!(matches!(
            Population::new(config),
            Err(NeatError::Config(_))
        ));
    }
}
