pub mod activation;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod encoding;
pub mod error;
pub mod evaluator;
pub mod fitness;
pub mod gene;
pub mod genome;
pub mod innovation;
pub mod network;
pub mod population;
pub mod reporter;
pub mod reproduction;
pub mod species;
pub mod stats;

#[cfg(test)]
mod tests;

pub use checkpoint::{load_genome, CheckpointManager, CheckpointReporter};
pub use config::RunConfig;
pub use context::RunContext;
pub use error::{NeatError, NetworkError};
pub use evaluator::{network_kind, NetworkEvaluator};
pub use fitness::{FitnessFunction, FitnessPass, GameFitness, MatchRecord};
pub use genome::Genome;
pub use network::{Network, NetworkKind};
pub use population::{Population, PopulationState, RunSummary, Termination};
pub use reporter::{GenerationReport, LoggingReporter, Reporter};
pub use stats::StatisticsReporter;
