mod material;
pub mod piece_values;
mod random;
pub mod scores;
mod traits;

pub use material::{material_balance, MaterialEvaluator};
pub use piece_values::PieceValues;
pub use random::RandomEvaluator;
pub use traits::Evaluator;
