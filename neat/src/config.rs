use std::{fmt, fs, path::Path, str::FromStr};

use search::MctsConfig;
use serde::{Deserialize, Serialize};
use utils::{
    config::{split_override, Any},
    define_config, parse_param_from_str, ConfigError,
};

use crate::{activation::Activation, encoding::NUM_FEATURES, error::NeatError};

/// Connections a fresh genome starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialConnection {
    /// Every input connected to every output.
    FullyConnected,
    /// No connections; structure is grown by mutation.
    Minimal,
}

impl FromStr for InitialConnection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fully_connected" | "full" => Ok(InitialConnection::FullyConnected),
            "minimal" | "unconnected" => Ok(InitialConnection::Minimal),
            other => Err(format!("unknown initial connection '{}'", other)),
        }
    }
}

impl fmt::Display for InitialConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitialConnection::FullyConnected => write!(f, "fully_connected"),
            InitialConnection::Minimal => write!(f, "minimal"),
        }
    }
}

/// Who a genome plays against during fitness evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opponent {
    /// Sampled members of the same population; both players are credited.
    Population,
    /// Fixed material-counting baseline.
    Material,
    /// The genome against itself.
    SelfPlay,
}

impl FromStr for Opponent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "population" => Ok(Opponent::Population),
            "material" => Ok(Opponent::Material),
            "self_play" | "self" => Ok(Opponent::SelfPlay),
            other => Err(format!("unknown opponent '{}'", other)),
        }
    }
}

impl fmt::Display for Opponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opponent::Population => write!(f, "population"),
            Opponent::Material => write!(f, "material"),
            Opponent::SelfPlay => write!(f, "self_play"),
        }
    }
}

parse_param_from_str!(InitialConnection, Opponent);

define_config!(
    /// Run-level parameters.
    RunParams {
        (population_size: usize, "population_size", 150, 2..=100_000),
        /// Total number of generations, counted from generation 0.
        (generations: u32, "generations", 100, 1..=1_000_000),
        (fitness_target: Option<f64>, "fitness_target", None, Any),
        (seed: u64, "seed", 0, Any),
        /// Worker threads for fitness evaluation. `None` uses every core.
        (threads: Option<usize>, "threads", None, 1..=1024),
    }
);

define_config!(
    /// Genome shape and mutation parameters.
    GenomeConfig {
        (num_inputs: usize, "num_inputs", NUM_FEATURES, 1..=4096),
        (num_outputs: usize, "num_outputs", 1, 1..=64),
        (initial_connection: InitialConnection, "initial_connection", InitialConnection::FullyConnected, Any),
        (output_activation: Activation, "output_activation", Activation::Sigmoid, Any),
        (hidden_activation: Activation, "hidden_activation", Activation::Sigmoid, Any),
        /// Allow connections that close a cycle. Networks are then evaluated recurrently.
        (allow_recurrent: bool, "allow_recurrent", false, Any),
        (recurrent_steps: usize, "recurrent_steps", 3, 1..=64),
        (weight_init_stdev: f64, "weight_init_stdev", 1.0, 0.0..=100.0),
        (weight_max: f64, "weight_max", 30.0, 0.0..=1_000.0),
        /// Per-gene probability of perturbing a weight or bias.
        (weight_mutate_rate: f64, "weight_mutate_rate", 0.8, 0.0..=1.0),
        (weight_mutate_power: f64, "weight_mutate_power", 0.5, 0.0..=100.0),
        /// Probability that a selected weight is replaced instead of perturbed.
        (weight_replace_rate: f64, "weight_replace_rate", 0.1, 0.0..=1.0),
        (conn_add_prob: f64, "conn_add_prob", 0.5, 0.0..=1.0),
        (node_add_prob: f64, "node_add_prob", 0.2, 0.0..=1.0),
        (toggle_enable_prob: f64, "toggle_enable_prob", 0.01, 0.0..=1.0),
    }
);

define_config!(
    /// Compatibility distance and stagnation parameters.
    SpeciesConfig {
        (compatibility_threshold: f64, "compatibility_threshold", 3.0, 0.0..=1_000.0),
        (excess_coefficient: f64, "excess_coefficient", 1.0, 0.0..=100.0),
        (disjoint_coefficient: f64, "disjoint_coefficient", 1.0, 0.0..=100.0),
        (weight_coefficient: f64, "weight_coefficient", 0.5, 0.0..=100.0),
        (stagnation_limit: u32, "stagnation_limit", 20, 1..=100_000),
    }
);

define_config!(
    ReproductionConfig {
        /// Top genomes copied unchanged from each large enough species.
        (elitism: usize, "elitism", 1, 0..=1_000),
        (elitism_min_size: usize, "elitism_min_size", 5, 1..=100_000),
        /// Fraction of each species allowed to reproduce.
        (survival_threshold: f64, "survival_threshold", 0.2, 0.0..=1.0),
        (crossover_prob: f64, "crossover_prob", 0.75, 0.0..=1.0),
        (crossover_averaging: bool, "crossover_averaging", false, Any),
        (min_species_size: usize, "min_species_size", 2, 1..=100_000),
    }
);

define_config!(
    /// Game setup and rewards for fitness evaluation.
    FitnessConfig {
        (games_per_genome: usize, "games_per_genome", 3, 1..=1_000),
        /// MCTS iterations per move.
        (move_budget: u32, "move_budget", 200, 1..=10_000_000),
        /// Games reaching this many plies are adjudicated as draws.
        (max_plies: usize, "max_plies", 100, 1..=10_000),
        (win_reward: f64, "win_reward", 1.25, -1_000.0..=1_000.0),
        (loss_reward: f64, "loss_reward", -1.0, -1_000.0..=1_000.0),
        (draw_reward: f64, "draw_reward", 0.0, -1_000.0..=1_000.0),
        /// Scale of the material tie-break on adjudicated draws.
        (material_weight: f64, "material_weight", 0.1, 0.0..=1_000.0),
        (random_opening_plies: usize, "random_opening_plies", 4, 0..=100),
        (opponent: Opponent, "opponent", Opponent::Population, Any),
    }
);

/// Every parameter of a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub run: RunParams,
    pub genome: GenomeConfig,
    pub species: SpeciesConfig,
    pub reproduction: ReproductionConfig,
    pub fitness: FitnessConfig,
    pub mcts: MctsConfig,
}

impl RunConfig {
    /// Every `section.key` path accepted by `set`.
    pub fn keys() -> Vec<String> {
        let tables: [(&str, &[&str]); 6] = [
            ("run", RunParams::KEYS),
            ("genome", GenomeConfig::KEYS),
            ("species", SpeciesConfig::KEYS),
            ("reproduction", ReproductionConfig::KEYS),
            ("fitness", FitnessConfig::KEYS),
            ("mcts", MctsConfig::KEYS),
        ];

        tables
            .iter()
            .flat_map(|(section, keys)| keys.iter().map(move |key| format!("{}.{}", section, key)))
            .collect()
    }

    /// Reads a TOML file. Missing sections and keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, NeatError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, NeatError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies a `section.key=value` override.
    pub fn apply_override(&mut self, text: &str) -> Result<(), ConfigError> {
        let (path, value) = split_override(text)?;
        self.set(path, value)
    }

    pub fn set(&mut self, path: &str, value: &str) -> Result<(), ConfigError> {
        let (section, key) = path
            .split_once('.')
            .ok_or_else(|| ConfigError::UnknownKey(path.to_string()))?;

        let mut candidate = self.clone();
        match section {
            "run" => candidate.run.set(key, value)?,
            "genome" => candidate.genome.set(key, value)?,
            "species" => candidate.species.set(key, value)?,
            "reproduction" => candidate.reproduction.set(key, value)?,
            "fitness" => candidate.fitness.set(key, value)?,
            "mcts" => candidate.mcts.set(key, value)?,
            _ => return Err(ConfigError::UnknownKey(path.to_string())),
        }
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    /// Checks every table and the constraints between them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.run.validate()?;
        self.genome.validate()?;
        self.species.validate()?;
        self.reproduction.validate()?;
        self.fitness.validate()?;
        self.mcts.validate()?;

        if self.genome.num_inputs != NUM_FEATURES {
            return Err(ConfigError::Invalid(format!(
                "genome.num_inputs must equal the board encoding size {}, got {}",
                NUM_FEATURES, self.genome.num_inputs
            )));
        }

        if self.fitness.opponent == Opponent::Population
            && self.fitness.games_per_genome >= self.run.population_size
        {
            return Err(ConfigError::Invalid(format!(
                "fitness.games_per_genome ({}) must be below run.population_size ({}) for population play",
                self.fitness.games_per_genome, self.run.population_size
            )));
        }

        if self.reproduction.survival_threshold <= 0.0 {
            return Err(ConfigError::Invalid(
                "reproduction.survival_threshold must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
