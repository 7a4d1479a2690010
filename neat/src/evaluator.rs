use cozy_chess::Board;
use evaluation::{
    scores::{clamp_score, DRAW_VALUE},
    Evaluator,
};

use crate::{
    activation::Activation,
    encoding::{encode_board, NUM_FEATURES},
    error::NetworkError,
    genome::Genome,
    network::{Network, NetworkKind},
};

/// Value function backed by one genome's network.
#[derive(Debug, Clone)]
pub struct NetworkEvaluator {
    network: Network,
    /// Sigmoid outputs live in `[0, 1]` and are stretched to `[-1, 1]`.
    sigmoid_output: bool,
    key: u64,
}

impl NetworkEvaluator {
    /// Fails if the genome's input count differs from the board encoding.
    pub fn new(genome: &Genome, kind: NetworkKind) -> Result<Self, NetworkError> {
        if genome.num_inputs() != NUM_FEATURES {
            return Err(NetworkError::InputArity {
                expected: NUM_FEATURES,
                actual: genome.num_inputs(),
            });
        }

        let sigmoid_output = genome
            .output_ids()
            .next()
            .and_then(|id| genome.node(id))
            .map_or(false, |node| node.activation == Activation::Sigmoid);

        Ok(Self {
            network: Network::from_genome(genome, kind)?,
            sigmoid_output,
            key: genome.key,
        })
    }

    pub fn key(&self) -> u64 {
        self.key
    }
}

impl Evaluator<Board> for NetworkEvaluator {
    fn name(&self) -> String {
        format!("Genome {}", self.key)
    }

    #[inline(always)]
    fn evaluate(&mut self, board: &Board) -> f32 {
        let features = encode_board(board);
        let sigmoid_output = self.sigmoid_output;

        match self.network.activate(&features) {
            Ok(outputs) => {
                let y = outputs.first().copied().unwrap_or(DRAW_VALUE);
                if sigmoid_output {
                    clamp_score(2.0 * y - 1.0)
                } else {
                    clamp_score(y)
                }
            }
            // Arity is checked at construction
            Err(_) => DRAW_VALUE,
        }
    }
}

/// Picks the evaluation mode for genomes built under `allow_recurrent`.
pub fn network_kind(allow_recurrent: bool, steps: usize) -> NetworkKind {
    if allow_recurrent {
        NetworkKind::Recurrent { steps }
    } else {
        NetworkKind::FeedForward
    }
}
