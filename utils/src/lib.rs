pub mod config;
mod eval;
mod material;
mod moves;

pub use config::ConfigError;
pub use eval::flip_eval_perspective;
pub use material::{game_phase, has_insufficient_material};
pub use moves::{
    collect_legal_moves, has_check, has_legal_moves, line_to_uci, make_move, move_to_uci, only_move,
};
