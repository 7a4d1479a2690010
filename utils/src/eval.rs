use cozy_chess::{Board, Color};

/// Flip a score between White's view and the side to move's view.
#[inline(always)]
pub fn flip_eval_perspective(board: &Board, score: f32) -> f32 {
    if board.side_to_move() == Color::White {
        score
    } else {
        -score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flip_for_black_to_move() {
        let board: Board = "k7/8/8/8/8/8/8/K7 b - - 0 1".parse().unwrap();
        assert_eq!(flip_eval_perspective(&board, 0.25), -0.25);
    }

    #[test]
    fn test_keep_for_white_to_move() {
        assert_eq!(flip_eval_perspective(&Board::default(), 0.25), 0.25);
    }
}
