use cozy_chess::Board;
use utils::{flip_eval_perspective, game_phase};

use crate::{piece_values::PieceValues, scores::clamp_score, Evaluator};

/// Centipawn difference that maps to tanh(1) ≈ 0.76.
const MATERIAL_SCALE: f32 = 400.0;

/// Material balance in centipawns from the side to move's perspective.
pub fn material_balance(board: &Board, piece_values: &PieceValues) -> f32 {
    let phase = game_phase(board);
    let white = piece_values.side_material(board, cozy_chess::Color::White, phase);
    let black = piece_values.side_material(board, cozy_chess::Color::Black, phase);

    flip_eval_perspective(board, white - black)
}

/// Baseline evaluator: tapered material balance squashed into the score range.
#[derive(Debug, Clone, Default)]
pub struct MaterialEvaluator {
    piece_values: PieceValues,
}

impl MaterialEvaluator {
    pub fn new(piece_values: PieceValues) -> Self {
        Self { piece_values }
    }
}

impl Evaluator<Board> for MaterialEvaluator {
    fn name(&self) -> String {
        "Material".to_string()
    }

    #[inline(always)]
    fn evaluate(&mut self, board: &Board) -> f32 {
        let balance = material_balance(board, &self.piece_values);
        clamp_score((balance / MATERIAL_SCALE).tanh())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_position_is_balanced() {
        let mut evaluator = MaterialEvaluator::default();
        assert_eq!(evaluator.evaluate(&Board::default()), 0.0);
    }

    #[test]
    fn test_extra_queen_is_winning_for_owner() {
        let mut evaluator = MaterialEvaluator::default();

        let white_to_move: Board = "k7/8/8/8/8/8/8/KQ6 w - - 0 1".parse().unwrap();
        let black_to_move: Board = "k7/8/8/8/8/8/8/KQ6 b - - 0 1".parse().unwrap();

        let white_score = evaluator.evaluate(&white_to_move);
        let black_score = evaluator.evaluate(&black_to_move);

        assert!(white_score > 0.9);
        assert!((white_score + black_score).abs() < 1e-6);
    }

    #[test]
    fn test_balance_in_centipawns() {
        let board: Board = "k7/8/8/8/8/8/8/KR6 w - - 0 1".parse().unwrap();
        let balance = material_balance(&board, &PieceValues::default());
        assert!(balance > 500.0 && balance < 560.0);
    }
}
