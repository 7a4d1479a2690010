use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{config::SpeciesConfig, genome::Genome};

/// Genomes within compatibility distance of a shared representative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub id: u32,
    pub created: u32,
    pub representative: Genome,
    /// Indices into the current generation's genomes.
    pub members: Vec<usize>,
    /// Best species fitness seen so far.
    pub best_fitness: Option<f64>,
    pub last_improved: u32,
    /// Mean of the shared member fitness, set before reproduction.
    pub adjusted_fitness: f64,
}

impl Species {
    fn new(id: u32, generation: u32, representative: Genome) -> Self {
        Self {
            id,
            created: generation,
            representative,
            members: Vec::new(),
            best_fitness: None,
            last_improved: generation,
            adjusted_fitness: 0.0,
        }
    }

    /// Generations since the species last improved.
    pub fn stagnation(&self, generation: u32) -> u32 {
        generation.saturating_sub(self.last_improved)
    }

    /// Highest member fitness in the current generation.
    pub fn fitness(&self, genomes: &[Genome]) -> Option<f64> {
        self.members
            .iter()
            .filter_map(|&i| genomes[i].fitness)
            .fold(None, |best, f| Some(best.map_or(f, |b: f64| b.max(f))))
    }
}

/// The current species, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSet {
    species: BTreeMap<u32, Species>,
    next_id: u32,
}

impl SpeciesSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Species> {
        self.species.values()
    }

    pub fn get(&self, id: u32) -> Option<&Species> {
        self.species.get(&id)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Species> {
        self.species.values_mut()
    }

    /// Species id of every genome, indexed like `genomes`.
    pub fn assignments(&self, count: usize) -> Vec<Option<u32>> {
        let mut assignments = vec![None; count];
        for species in self.species.values() {
            for &member in &species.members {
                if let Some(slot) = assignments.get_mut(member) {
                    *slot = Some(species.id);
                }
            }
        }
        assignments
    }

    /// Partitions `genomes` into species.
    ///
    /// Each existing species first adopts its closest genome as the new
    /// representative. Remaining genomes join the closest representative within
    /// the threshold or found a new species. Species left without members are
    /// dropped.
    pub fn speciate(&mut self, genomes: &[Genome], generation: u32, config: &SpeciesConfig) {
        let threshold = config.compatibility_threshold;
        let mut unassigned: Vec<usize> = (0..genomes.len()).collect();

        for species in self.species.values_mut() {
            species.members.clear();

            let closest = unassigned
                .iter()
                .enumerate()
                .map(|(slot, &i)| (slot, i, species.representative.distance(&genomes[i], config)))
                .fold(None, |best: Option<(usize, usize, f64)>, candidate| match best {
                    Some(b) if b.2 <= candidate.2 => Some(b),
                    _ => Some(candidate),
                });

            if let Some((slot, index, _)) = closest {
                unassigned.remove(slot);
                species.representative = genomes[index].clone();
                species.members.push(index);
            }
        }
        self.species.retain(|_, s| !s.members.is_empty());

        for index in unassigned {
            let genome = &genomes[index];
            let closest = self
                .species
                .values()
                .map(|s| (s.id, s.representative.distance(genome, config)))
                .filter(|&(_, d)| d <= threshold)
                .fold(None, |best: Option<(u32, f64)>, candidate| match best {
                    Some(b) if b.1 <= candidate.1 => Some(b),
                    _ => Some(candidate),
                });

            if let Some((id, _)) = closest {
                if let Some(species) = self.species.get_mut(&id) {
                    species.members.push(index);
                    continue;
                }
            }

            let id = self.next_id;
            self.next_id += 1;
            let mut species = Species::new(id, generation, genome.clone());
            species.members.push(index);
            self.species.insert(id, species);
        }
    }

    /// Updates improvement tracking and removes stagnant species.
    ///
    /// Neither the species holding the generation's best genome nor the one
    /// holding the genome keyed `champion` (the run's best so far) is removed.
    /// Returns the removed ids.
    pub fn remove_stagnant(
        &mut self,
        genomes: &[Genome],
        generation: u32,
        champion: Option<u64>,
        config: &SpeciesConfig,
    ) -> Vec<u32> {
        let best_index = genomes
            .iter()
            .enumerate()
            .filter_map(|(i, g)| g.fitness.map(|f| (i, f)))
            .fold(None, |best: Option<(usize, f64)>, candidate| match best {
                Some(b) if b.1 >= candidate.1 => Some(b),
                _ => Some(candidate),
            })
            .map(|(i, _)| i);

        let mut removed = Vec::new();
        for species in self.species.values_mut() {
            if let Some(fitness) = species.fitness(genomes) {
                if species.best_fitness.map_or(true, |best| fitness > best) {
                    species.best_fitness = Some(fitness);
                    species.last_improved = generation;
                }
            }

            let holds_best = species.members.iter().any(|&i| {
                Some(i) == best_index || Some(genomes[i].key) == champion
            });
            if species.stagnation(generation) >= config.stagnation_limit && !holds_best {
                removed.push(species.id);
            }
        }

        for id in &removed {
            self.species.remove(id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::{config::GenomeConfig, innovation::InnovationTracker};

    fn population(count: usize, seed: u64) -> (Vec<Genome>, GenomeConfig, InnovationTracker) {
        let config = GenomeConfig {
            num_inputs: 4,
            ..GenomeConfig::default()
        };
        let mut tracker = InnovationTracker::new(config.num_inputs, config.num_outputs);
        let mut rng = ChaCha20Rng::seed_from_u64(seed);

        let base = Genome::fully_connected(0, &config, &mut tracker, &mut rng);
        let mut genomes = Vec::new();
        for key in 0..count as u64 {
            let mut genome = base.offspring(key);
            for _ in 0..(key % 6) {
                genome = genome.mutate(&config, &mut tracker, &mut rng);
            }
            genomes.push(genome);
        }
        (genomes, config, tracker)
    }

    fn assert_partition(set: &SpeciesSet, genomes: &[Genome], config: &SpeciesConfig) {
        let mut seen = vec![0; genomes.len()];
        for species in set.iter() {
            for &member in &species.members {
                seen[member] += 1;
                let distance = species.representative.distance(&genomes[member], config);
                assert!(distance <= config.compatibility_threshold);
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn test_every_genome_in_exactly_one_species() {
        let config = SpeciesConfig {
            compatibility_threshold: 1.0,
            ..SpeciesConfig::default()
        };
        let (genomes, genome_config, mut tracker) = population(40, 1);
        let mut set = SpeciesSet::new();

        set.speciate(&genomes, 0, &config);
        assert_partition(&set, &genomes, &config);

        // Next generation: representatives carry over, membership is recomputed
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let next: Vec<Genome> = genomes
            .iter()
            .map(|g| g.mutate(&genome_config, &mut tracker, &mut rng))
            .collect();
        set.speciate(&next, 1, &config);
        assert_partition(&set, &next, &config);
    }

    #[test]
    fn test_identical_genomes_share_a_species() {
        let (genomes, _, _) = population(1, 0);
        let clones: Vec<Genome> = (0..10).map(|k| genomes[0].offspring(k)).collect();
        let mut set = SpeciesSet::new();

        set.speciate(&clones, 0, &SpeciesConfig::default());

        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().members.len(), 10);
    }

    #[test]
    fn test_zero_threshold_splits_distinct_genomes() {
        let config = SpeciesConfig {
            compatibility_threshold: 0.0,
            ..SpeciesConfig::default()
        };
        let (genomes, _, _) = population(12, 3);
        let mut set = SpeciesSet::new();
        set.speciate(&genomes, 0, &config);

        assert_partition(&set, &genomes, &config);
        assert!(set.len() > 1);
    }

    #[test]
    fn test_stagnant_species_removed_unless_best() {
        let config = SpeciesConfig {
            compatibility_threshold: 0.0,
            stagnation_limit: 2,
            ..SpeciesConfig::default()
        };
        let (mut genomes, _, _) = population(6, 4);
        for (i, genome) in genomes.iter_mut().enumerate() {
            genome.fitness = Some(i as f64);
        }

        let mut set = SpeciesSet::new();
        set.speciate(&genomes, 0, &config);
        let species_count = set.len();
        assert!(species_count > 1);

        assert!(set.remove_stagnant(&genomes, 0, None, &config).is_empty());
        assert!(set.remove_stagnant(&genomes, 1, None, &config).is_empty());

        let removed = set.remove_stagnant(&genomes, 2, None, &config);
        assert_eq!(removed.len(), species_count - 1);
        assert_eq!(set.len(), 1);
        assert!(set.iter().next().unwrap().members.contains(&5));
    }

    #[test]
    fn test_species_of_the_run_champion_survives_stagnation() {
        let config = SpeciesConfig {
            compatibility_threshold: 0.0,
            stagnation_limit: 1,
            ..SpeciesConfig::default()
        };
        let (mut genomes, _, _) = population(6, 4);
        for (i, genome) in genomes.iter_mut().enumerate() {
            genome.fitness = Some(i as f64);
        }

        let mut set = SpeciesSet::new();
        set.speciate(&genomes, 0, &config);
        let holds = |set: &SpeciesSet, index: usize| set.iter().any(|s| s.members.contains(&index));
        let lowest = (0..6).find(|&i| !holds_in_same(&set, i, 5)).unwrap();

        assert!(set.remove_stagnant(&genomes, 0, None, &config).is_empty());

        // The all-time best is now a weak genome of this generation.
        let champion = Some(genomes[lowest].key);
        set.remove_stagnant(&genomes, 1, champion, &config);
        assert!(holds(&set, 5));
        assert!(holds(&set, lowest));
        assert_eq!(set.len(), 2);
    }

    fn holds_in_same(set: &SpeciesSet, a: usize, b: usize) -> bool {
        set.iter()
            .any(|s| s.members.contains(&a) && s.members.contains(&b))
    }
}
