use std::io;

use thiserror::Error;
use utils::ConfigError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NetworkError {
    /// Input vector or genome does not match the expected input count.
    #[error("Input arity mismatch: expected {expected}, got {actual}")]
    InputArity { expected: usize, actual: usize },

    #[error("Feed-forward network contains a cycle")]
    Cycle,

    #[error("Connection {innovation} references unknown node {node}")]
    UnknownNode { innovation: u64, node: u32 },

    #[error("Genome has no output nodes")]
    NoOutputs,
}

#[derive(Debug, Error)]
pub enum NeatError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Fitness pass returned {actual} scores for {expected} genomes")]
    FitnessCount { expected: usize, actual: usize },

    #[error("Population is empty")]
    EmptyPopulation,
}
