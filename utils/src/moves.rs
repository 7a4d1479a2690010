// cozy-chess encodes castling as "king captures rook" (e1h1) while UCI expects
// e1g1, so moves are printed through the board they are played on.

use cozy_chess::{util::display_uci_move, Board, Move};

/// Make a move and return a new board.
#[inline(always)]
pub fn make_move(board: &Board, mv: Move) -> Board {
    let mut new_board = board.clone();
    new_board.play_unchecked(mv);
    new_board
}

/// Check if there are any legal moves in the position.
#[inline(always)]
pub fn has_legal_moves(board: &Board) -> bool {
    board.generate_moves(|_| true)
}

/// Check if there is exactly one legal move in the position.
#[inline(always)]
pub fn only_move(board: &Board) -> bool {
    let mut count = 0;
    board.generate_moves(|moves| {
        count += moves.len();
        count > 1
    });
    count == 1
}

/// Collect all legal moves into a Vec, in move generator order.
#[inline(always)]
pub fn collect_legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|batch| {
        moves.extend(batch);
        false
    });
    moves
}

/// Check if the side to move is in check.
#[inline(always)]
pub fn has_check(board: &Board) -> bool {
    !board.checkers().is_empty()
}

#[inline]
pub fn move_to_uci(board: &Board, mv: Move) -> String {
    display_uci_move(board, mv).to_string()
}

/// UCI strings for a line of moves played from `start`.
pub fn line_to_uci(start: &Board, line: &[Move]) -> Vec<String> {
    let mut result = Vec::with_capacity(line.len());
    let mut board = start.clone();

    for &mv in line {
        result.push(move_to_uci(&board, mv));
        board.play_unchecked(mv);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_position_has_twenty_moves() {
        assert_eq!(collect_legal_moves(&Board::default()).len(), 20);
    }

    #[test]
    fn test_move_order_is_stable() {
        let board = Board::default();
        assert_eq!(collect_legal_moves(&board), collect_legal_moves(&board));
    }

    #[test]
    fn test_make_move_leaves_original_untouched() {
        let board = Board::default();
        let mv = collect_legal_moves(&board)[0];
        let next = make_move(&board, mv);

        assert_eq!(board, Board::default());
        assert_ne!(next, board);
    }

    #[test]
    fn test_checkmated_side_has_no_moves() {
        // Fool's mate
        let board: Board = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3"
            .parse()
            .unwrap();
        assert!(has_check(&board));
        assert!(!has_legal_moves(&board));
    }

    #[test]
    fn test_only_move() {
        // The rook covers a2 and b1, so Kxb2 is the only move
        let board: Board = "k7/8/8/8/8/8/1r6/K7 w - - 0 1".parse().unwrap();
        assert!(only_move(&board));
        assert!(!only_move(&Board::default()));
    }

    #[test]
    fn test_castling_printed_as_uci() {
        let board: Board = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1".parse().unwrap();
        let castle: Move = "e1h1".parse().unwrap();

        assert_eq!(move_to_uci(&board, castle), "e1g1");
        assert_eq!(
            line_to_uci(&board, &[castle, "e8a8".parse().unwrap()]),
            vec!["e1g1".to_string(), "e8c8".to_string()]
        );
    }
}
