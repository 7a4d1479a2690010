use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{
    error::NeatError,
    reporter::{GenerationReport, Reporter},
};

pub const STATS_FILE: &str = "stats.csv";
pub const SPECIES_FILE: &str = "species.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationStats {
    pub generation: u32,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub stdev_fitness: f64,
    pub best_ever_fitness: f64,
    pub num_species: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesStats {
    pub generation: u32,
    pub species: u32,
    pub size: usize,
    pub best_fitness: Option<f64>,
    pub mean_fitness: f64,
    pub stagnation: u32,
}

/// Per-generation fitness and speciation history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statistics {
    pub generations: Vec<GenerationStats>,
    pub species: Vec<SpeciesStats>,
}

impl Statistics {
    pub fn record(&mut self, report: &GenerationReport) {
        self.generations.push(GenerationStats {
            generation: report.generation,
            best_fitness: report.best_fitness,
            mean_fitness: report.mean_fitness,
            stdev_fitness: report.stdev_fitness,
            best_ever_fitness: report.best_ever_fitness,
            num_species: report.species.len(),
        });

        self.species
            .extend(report.species.iter().map(|s| SpeciesStats {
                generation: report.generation,
                species: s.id,
                size: s.size,
                best_fitness: s.best_fitness,
                mean_fitness: s.mean_fitness,
                stagnation: s.stagnation,
            }));
    }

    /// Drops every row from `generation` onwards.
    pub fn truncate(&mut self, generation: u32) {
        self.generations.retain(|g| g.generation < generation);
        self.species.retain(|s| s.generation < generation);
    }

    /// Best fitness of the run so far, one entry per generation.
    pub fn best_fitness_curve(&self) -> Vec<f64> {
        self.generations.iter().map(|g| g.best_ever_fitness).collect()
    }

    /// `(species id, size)` for every species alive in `generation`.
    pub fn species_sizes(&self, generation: u32) -> Vec<(u32, usize)> {
        self.species
            .iter()
            .filter(|s| s.generation == generation)
            .map(|s| (s.species, s.size))
            .collect()
    }

    pub fn write_generations<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "generation,best,mean,stdev,best_ever,species")?;
        for g in &self.generations {
            writeln!(
                writer,
                "{},{},{},{},{},{}",
                g.generation,
                g.best_fitness,
                g.mean_fitness,
                g.stdev_fitness,
                g.best_ever_fitness,
                g.num_species
            )?;
        }
        Ok(())
    }

    pub fn write_species<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "generation,species,size,best,mean,stagnation")?;
        for s in &self.species {
            let best = s.best_fitness.map(|f| f.to_string()).unwrap_or_default();
            writeln!(
                writer,
                "{},{},{},{},{},{}",
                s.generation, s.species, s.size, best, s.mean_fitness, s.stagnation
            )?;
        }
        Ok(())
    }

    pub fn read_generations<R: BufRead>(&mut self, reader: R) -> Result<(), NeatError> {
        for (index, line) in reader.lines().enumerate().skip(1) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_row(&line, 6, index)?;
            self.generations.push(GenerationStats {
                generation: parse_field(fields[0], index)?,
                best_fitness: parse_field(fields[1], index)?,
                mean_fitness: parse_field(fields[2], index)?,
                stdev_fitness: parse_field(fields[3], index)?,
                best_ever_fitness: parse_field(fields[4], index)?,
                num_species: parse_field(fields[5], index)?,
            });
        }
        Ok(())
    }

    pub fn read_species<R: BufRead>(&mut self, reader: R) -> Result<(), NeatError> {
        for (index, line) in reader.lines().enumerate().skip(1) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_row(&line, 6, index)?;
            let best_fitness = match fields[3] {
                "" => None,
                value => Some(parse_field(value, index)?),
            };
            self.species.push(SpeciesStats {
                generation: parse_field(fields[0], index)?,
                species: parse_field(fields[1], index)?,
                size: parse_field(fields[2], index)?,
                best_fitness,
                mean_fitness: parse_field(fields[4], index)?,
                stagnation: parse_field(fields[5], index)?,
            });
        }
        Ok(())
    }
}

fn split_row(line: &str, expected: usize, index: usize) -> Result<Vec<&str>, NeatError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != expected {
        return Err(NeatError::Checkpoint(format!(
            "line {}: expected {} fields, found {}",
            index + 1,
            expected,
            fields.len()
        )));
    }
    Ok(fields)
}

fn parse_field<T: std::str::FromStr>(value: &str, index: usize) -> Result<T, NeatError> {
    value
        .parse()
        .map_err(|_| NeatError::Checkpoint(format!("line {}: bad value '{}'", index + 1, value)))
}

/// Keeps `stats.csv` and `species.csv` in a run directory up to date.
pub struct StatisticsReporter {
    dir: PathBuf,
    stats: Statistics,
}

impl StatisticsReporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            stats: Statistics::default(),
        }
    }

    /// Loads existing CSV files, dropping rows at or after `generation`
    /// since those generations are about to be replayed.
    pub fn resume(dir: impl Into<PathBuf>, generation: u32) -> Result<Self, NeatError> {
        let dir = dir.into();
        let mut stats = Self::load(&dir)?;
        stats.truncate(generation);
        Ok(Self { dir, stats })
    }

    /// Reads whatever statistics a run directory holds.
    pub fn load(dir: &Path) -> Result<Statistics, NeatError> {
        let mut stats = Statistics::default();

        let path = dir.join(STATS_FILE);
        if path.exists() {
            stats.read_generations(BufReader::new(File::open(path)?))?;
        }
        let path = dir.join(SPECIES_FILE);
        if path.exists() {
            stats.read_species(BufReader::new(File::open(path)?))?;
        }
        Ok(stats)
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    fn flush(&self) -> Result<(), NeatError> {
        std::fs::create_dir_all(&self.dir)?;

        let mut writer = BufWriter::new(File::create(self.dir.join(STATS_FILE))?);
        self.stats.write_generations(&mut writer)?;
        writer.flush()?;

        let mut writer = BufWriter::new(File::create(self.dir.join(SPECIES_FILE))?);
        self.stats.write_species(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl Reporter for StatisticsReporter {
    fn post_evaluate(&mut self, report: &GenerationReport) -> Result<(), NeatError> {
        self.stats.record(report);
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> Statistics {
        Statistics {
            generations: vec![
                GenerationStats {
                    generation: 0,
                    best_fitness: 0.5,
                    mean_fitness: 0.1,
                    stdev_fitness: 0.2,
                    best_ever_fitness: 0.5,
                    num_species: 2,
                },
                GenerationStats {
                    generation: 1,
                    best_fitness: 0.25,
                    mean_fitness: 0.0,
                    stdev_fitness: 0.125,
                    best_ever_fitness: 0.5,
                    num_species: 1,
                },
            ],
            species: vec![
                SpeciesStats {
                    generation: 0,
                    species: 1,
                    size: 3,
                    best_fitness: Some(0.5),
                    mean_fitness: 0.25,
                    stagnation: 0,
                },
                SpeciesStats {
                    generation: 0,
                    species: 2,
                    size: 1,
                    best_fitness: None,
                    mean_fitness: 0.0,
                    stagnation: 0,
                },
                SpeciesStats {
                    generation: 1,
                    species: 1,
                    size: 4,
                    best_fitness: Some(0.25),
                    mean_fitness: 0.0,
                    stagnation: 1,
                },
            ],
        }
    }

    #[test]
    fn test_csv_survives_reload() {
        let stats = stats();

        let mut generations = Vec::new();
        stats.write_generations(&mut generations).unwrap();
        let mut species = Vec::new();
        stats.write_species(&mut species).unwrap();

        let mut loaded = Statistics::default();
        loaded.read_generations(generations.as_slice()).unwrap();
        loaded.read_species(species.as_slice()).unwrap();

        assert_eq!(loaded, stats);
    }

    #[test]
    fn test_truncate_and_queries() {
        let mut stats = stats();
        assert_eq!(stats.best_fitness_curve(), vec![0.5, 0.5]);
        assert_eq!(stats.species_sizes(0), vec![(1, 3), (2, 1)]);

        stats.truncate(1);
        assert_eq!(stats.generations.len(), 1);
        assert!(stats.species_sizes(1).is_empty());
    }

    #[test]
    fn test_malformed_row_is_an_error() {
        let mut stats = Statistics::default();
        let text = "generation,best,mean,stdev,best_ever,species\n0,1.0,oops\n";
        assert!(matches!(
            stats.read_generations(text.as_bytes()),
            Err(NeatError::Checkpoint(_))
        ));
    }
}
