use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::RunConfig,
    error::NeatError,
    fitness::MatchRecord,
    genome::Genome,
    population::PopulationState,
    reporter::{GenerationReport, Reporter},
};

const CHECKPOINT_DIR: &str = "checkpoints";
const BEST_DIR: &str = "best";
const MATCHES_DIR: &str = "matches";
const CONFIG_FILE: &str = "config.json";

/// Layout of a training run directory.
///
/// ```text
/// <root>/config.json
/// <root>/checkpoints/generation-N.json
/// <root>/best/N.json
/// <root>/matches/N.json
/// <root>/stats.csv
/// <root>/species.csv
/// ```
pub struct CheckpointManager {
    root_path: PathBuf,
}

impl CheckpointManager {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, NeatError> {
        let root_path = root.into();
        for dir in [CHECKPOINT_DIR, BEST_DIR, MATCHES_DIR] {
            fs::create_dir_all(root_path.join(dir))?;
        }
        Ok(Self { root_path })
    }

    pub fn root(&self) -> &Path {
        &self.root_path
    }

    /// Generations with a saved population, ascending.
    pub fn generations(&self) -> Result<Vec<u32>, NeatError> {
        let mut generations = Vec::new();
        for entry in fs::read_dir(self.root_path.join(CHECKPOINT_DIR))? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let number = name
                .strip_prefix("generation-")
                .and_then(|rest| rest.strip_suffix(".json"))
                .and_then(|n| n.parse::<u32>().ok());
            if let Some(number) = number {
                generations.push(number);
            }
        }
        generations.sort_unstable();
        Ok(generations)
    }

    pub fn latest_generation(&self) -> Result<Option<u32>, NeatError> {
        Ok(self.generations()?.last().cloned())
    }

    pub fn checkpoint_path(&self, generation: u32) -> PathBuf {
        self.root_path
            .join(CHECKPOINT_DIR)
            .join(format!("generation-{}.json", generation))
    }

    pub fn best_path(&self, generation: u32) -> PathBuf {
        self.root_path
            .join(BEST_DIR)
            .join(format!("{}.json", generation))
    }

    pub fn matches_path(&self, generation: u32) -> PathBuf {
        self.root_path
            .join(MATCHES_DIR)
            .join(format!("{}.json", generation))
    }

    pub fn config_path(&self) -> PathBuf {
        self.root_path.join(CONFIG_FILE)
    }

    pub fn save_checkpoint(&self, state: &PopulationState) -> Result<PathBuf, NeatError> {
        let path = self.checkpoint_path(state.generation);
        save_json(&path, state)?;
        Ok(path)
    }

    pub fn load_checkpoint(&self, generation: u32) -> Result<PopulationState, NeatError> {
        let path = self.checkpoint_path(generation);
        if !path.exists() {
            return Err(NeatError::Checkpoint(format!(
                "no checkpoint for generation {} in {}",
                generation,
                self.root_path.display()
            )));
        }

        let state: PopulationState = load_json(&path)?;
        if state.generation != generation {
            return Err(NeatError::Checkpoint(format!(
                "{} holds generation {}",
                path.display(),
                state.generation
            )));
        }
        Ok(state)
    }

    pub fn load_latest(&self) -> Result<Option<PopulationState>, NeatError> {
        match self.latest_generation()? {
            Some(generation) => self.load_checkpoint(generation).map(Some),
            None => Ok(None),
        }
    }

    pub fn save_best(&self, generation: u32, genome: &Genome) -> Result<(), NeatError> {
        save_json(&self.best_path(generation), genome)
    }

    pub fn load_best(&self, generation: u32) -> Result<Genome, NeatError> {
        load_json(&self.best_path(generation))
    }

    pub fn save_matches(&self, generation: u32, matches: &[MatchRecord]) -> Result<(), NeatError> {
        save_json(&self.matches_path(generation), &matches)
    }

    pub fn load_matches(&self, generation: u32) -> Result<Vec<MatchRecord>, NeatError> {
        load_json(&self.matches_path(generation))
    }

    pub fn save_config(&self, config: &RunConfig) -> Result<(), NeatError> {
        save_json(&self.config_path(), config)
    }

    pub fn load_config(&self) -> Result<RunConfig, NeatError> {
        let config: RunConfig = load_json(&self.config_path())?;
        config.validate()?;
        Ok(config)
    }
}

pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), NeatError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, NeatError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Reads a genome saved by `save_best`, or any genome JSON file.
pub fn load_genome(path: &Path) -> Result<Genome, NeatError> {
    load_json(path)
}

/// Persists checkpoints, best genomes and match archives as a run progresses.
pub struct CheckpointReporter {
    manager: CheckpointManager,
}

impl CheckpointReporter {
    pub fn new(manager: CheckpointManager) -> Self {
        Self { manager }
    }
}

impl Reporter for CheckpointReporter {
    fn post_evaluate(&mut self, report: &GenerationReport) -> Result<(), NeatError> {
        self.manager
            .save_best(report.generation, &report.best_genome)?;
        self.manager
            .save_matches(report.generation, &report.matches)?;
        Ok(())
    }

    fn end_generation(&mut self, state: &PopulationState) -> Result<(), NeatError> {
        let path = self.manager.save_checkpoint(state)?;
        log::debug!("Saved checkpoint {}", path.display());
        Ok(())
    }
}
