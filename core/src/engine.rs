use std::{error::Error, path::Path};

use cozy_chess::Board;
use evaluation::{Evaluator, MaterialEvaluator};
use neat::{load_genome, network_kind, NetworkEvaluator};
use search::{ChessOracle, MctsConfig, Player};
use utils::config::split_override;

pub type ChessPlayer = Player<ChessOracle, Box<dyn Evaluator<Board>>>;

/// Loads a genome as an evaluator, or the material baseline without one.
pub fn create_evaluator(
    genome: Option<&Path>,
    recurrent_steps: usize,
) -> Result<Box<dyn Evaluator<Board>>, Box<dyn Error>> {
    let Some(path) = genome else {
        return Ok(Box::new(MaterialEvaluator::default()));
    };

    let genome = load_genome(path)?;
    let kind = network_kind(genome.has_cycle(), recurrent_steps);
    log::info!(
        "Loaded genome {} from {} ({} nodes, {} enabled connections, {:?})",
        genome.key,
        path.display(),
        genome.num_nodes(),
        genome.num_enabled(),
        kind
    );

    Ok(Box::new(NetworkEvaluator::new(&genome, kind)?))
}

pub fn mcts_config(overrides: &[String]) -> Result<MctsConfig, Box<dyn Error>> {
    let mut config = MctsConfig::default();
    for text in overrides {
        let (key, value) = split_override(text)?;
        config.set(key, value)?;
    }
    Ok(config)
}

pub fn create(
    config: MctsConfig,
    evaluator: Box<dyn Evaluator<Board>>,
    budget: u32,
) -> ChessPlayer {
    Player::new(ChessOracle, config, evaluator, budget)
}
