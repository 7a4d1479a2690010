use rand::{seq::SliceRandom, Rng};

use crate::{
    config::RunConfig, context::RunContext, error::NeatError, genome::Genome, species::SpeciesSet,
};

/// Produces the next generation from the speciated, evaluated `genomes`.
///
/// Fitness is shifted to be non-negative and shared within each species.
/// Offspring slots are split across species in proportion to their shared
/// fitness so that the population size stays exactly `population_size`.
pub fn reproduce<R: Rng>(
    species: &mut SpeciesSet,
    genomes: &[Genome],
    config: &RunConfig,
    context: &mut RunContext,
    rng: &mut R,
) -> Result<Vec<Genome>, NeatError> {
    if species.is_empty() || genomes.is_empty() {
        return Err(NeatError::EmptyPopulation);
    }

    let fitness = |i: usize| genomes[i].fitness.unwrap_or(f64::MIN);
    let min_fitness = genomes
        .iter()
        .filter_map(|g| g.fitness)
        .fold(f64::INFINITY, f64::min);
    let shift = if min_fitness.is_finite() && min_fitness < 0.0 {
        -min_fitness
    } else {
        0.0
    };

    for s in species.iter_mut() {
        let size = s.members.len().max(1) as f64;
        s.adjusted_fitness = s
            .members
            .iter()
            .map(|&i| (genomes[i].fitness.unwrap_or(0.0) + shift).max(0.0) / size)
            .sum();
    }

    let shares: Vec<f64> = species.iter().map(|s| s.adjusted_fitness).collect();
    let allocation = allocate_offspring(
        &shares,
        config.run.population_size,
        config.reproduction.min_species_size,
    );

    let repro = &config.reproduction;
    let mut next = Vec::with_capacity(config.run.population_size);

    for (s, &spawn) in species.iter().zip(&allocation) {
        let mut members = s.members.clone();
        members.sort_by(|&a, &b| fitness(b).total_cmp(&fitness(a)).then(a.cmp(&b)));

        let mut produced = 0;
        if members.len() >= repro.elitism_min_size {
            for &i in members.iter().take(repro.elitism.min(spawn)) {
                next.push(genomes[i].offspring(genomes[i].key));
                produced += 1;
            }
        }

        let survivors = ((repro.survival_threshold * members.len() as f64).ceil() as usize)
            .max(2)
            .min(members.len());
        let parents = &members[..survivors];

        while produced < spawn {
            let Some(&first) = parents.choose(rng) else {
                break;
            };
            let key = context.next_genome_key();

            let child = match parents.choose(rng) {
                Some(&second) if parents.len() > 1 && rng.gen_bool(repro.crossover_prob) => {
                    Genome::crossover(
                        &genomes[first],
                        &genomes[second],
                        key,
                        repro.crossover_averaging,
                        rng,
                    )
                }
                _ => genomes[first].offspring(key),
            };

            next.push(child.mutate(&config.genome, &mut context.tracker, rng));
            produced += 1;
        }
    }

    log::debug!(
        "Reproduced {} genomes across {} species (allocation {:?})",
        next.len(),
        species.len(),
        allocation
    );

    Ok(next)
}

/// Splits `total` slots across species by largest remainder.
///
/// Every species receives at least `min_size` slots while the total allows it.
/// The result always sums to `total`.
pub fn allocate_offspring(shares: &[f64], total: usize, min_size: usize) -> Vec<usize> {
    let n = shares.len();
    if n == 0 {
        return Vec::new();
    }

    let floor = min_size.min(total / n);
    let mut allocation = vec![floor; n];
    let remaining = total - floor * n;

    let positive: Vec<f64> = shares
        .iter()
        .map(|&s| if s.is_finite() { s.max(0.0) } else { 0.0 })
        .collect();
    let sum: f64 = positive.iter().sum();
    let exact: Vec<f64> = positive
        .iter()
        .map(|&s| {
            let weight = if sum > 0.0 { s / sum } else { 1.0 / n as f64 };
            weight * remaining as f64
        })
        .collect();

    let mut assigned = 0;
    for (slot, &e) in allocation.iter_mut().zip(&exact) {
        let whole = (e.floor() as usize).min(remaining - assigned);
        *slot += whole;
        assigned += whole;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for &i in order.iter().cycle().take(remaining - assigned) {
        allocation[i] += 1;
    }

    allocation
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::config::RunConfig;

    #[test]
    fn test_allocation_sums_to_total() {
        let cases: [(&[f64], usize, usize); 5] = [
            (&[1.0, 1.0, 1.0], 10, 2),
            (&[0.0, 0.0], 7, 2),
            (&[5.0, 0.1, 0.1, 0.1], 50, 2),
            (&[3.0, 1.0], 3, 2),
            (&[f64::NAN, 2.0], 9, 1),
        ];

        for (shares, total, min_size) in cases {
            let allocation = allocate_offspring(shares, total, min_size);
            assert_eq!(allocation.iter().sum::<usize>(), total, "{:?}", shares);
        }
    }

    #[test]
    fn test_allocation_is_proportional_with_floor() {
        assert_eq!(allocate_offspring(&[3.0, 1.0], 12, 2), vec![8, 4]);
        assert_eq!(allocate_offspring(&[1.0, 0.0], 10, 2), vec![8, 2]);
        assert_eq!(allocate_offspring(&[1.0, 1.0, 1.0], 10, 0), vec![4, 3, 3]);
    }

    #[test]
    fn test_population_size_is_preserved() {
        let mut config = RunConfig::default();
        config.run.population_size = 30;
        config.species.compatibility_threshold = 0.5;

        let mut context = RunContext::new(1, config.genome.num_inputs, config.genome.num_outputs);
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        let mut genomes: Vec<Genome> = (0..30)
            .map(|_| {
                let key = context.next_genome_key();
                Genome::initial(key, &config.genome, &mut context.tracker, &mut rng)
            })
            .collect();

        let mut species = SpeciesSet::new();
        for generation in 0..5 {
            for (i, genome) in genomes.iter_mut().enumerate() {
                genome.fitness = Some(i as f64 - 10.0);
            }
            species.speciate(&genomes, generation, &config.species);

            genomes = reproduce(&mut species, &genomes, &config, &mut context, &mut rng).unwrap();
            assert_eq!(genomes.len(), 30);
            assert!(genomes.iter().all(|g| g.fitness.is_none()));
        }
    }

    #[test]
    fn test_elites_are_copied_unchanged() {
        let mut config = RunConfig::default();
        config.run.population_size = 10;
        config.reproduction.elitism = 1;
        config.reproduction.elitism_min_size = 1;
        config.species.compatibility_threshold = 1_000.0;

        let mut context = RunContext::new(5, config.genome.num_inputs, config.genome.num_outputs);
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let genomes: Vec<Genome> = (0..10)
            .map(|i| {
                let key = context.next_genome_key();
                let mut genome =
                    Genome::initial(key, &config.genome, &mut context.tracker, &mut rng);
                genome.fitness = Some(i as f64);
                genome
            })
            .collect();

        let mut species = SpeciesSet::new();
        species.speciate(&genomes, 0, &config.species);
        assert_eq!(species.len(), 1);

        let next = reproduce(&mut species, &genomes, &config, &mut context, &mut rng).unwrap();
        let mut best = genomes[9].clone();
        best.fitness = None;
        assert!(next.contains(&best));
    }
}
