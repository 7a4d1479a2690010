mod config;
pub mod engine;
mod oracle;
mod player;
mod tree;

pub use config::{MctsConfig, MoveSelection};
pub use engine::{ChildStats, Decision, Mcts, SearchError, SearchReport};
pub use oracle::{ChessOracle, Oracle, Outcome};
pub use player::Player;
pub use tree::{NodeId, SearchNode, SearchTree};
