use cozy_chess::{BitBoard, Board, Color, Piece};

const DARK_SQUARES: BitBoard = BitBoard(0xAA55_AA55_AA55_AA55);

/// True if `color` has at most a king and one minor piece.
fn side_has_insufficient_material(board: &Board, color: Color) -> bool {
    let own = board.colors(color);
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !(heavy & own).is_empty() {
        return false;
    }

    let minors = (board.pieces(Piece::Knight) | board.pieces(Piece::Bishop)) & own;
    minors.len() <= 1
}

/// Dead positions where neither side can ever deliver mate.
///
/// Covers bare kings, a single minor piece against a bare king, and a bishop
/// each on the same square colour.
pub fn has_insufficient_material(board: &Board) -> bool {
    if !side_has_insufficient_material(board, Color::White)
        || !side_has_insufficient_material(board, Color::Black)
    {
        return false;
    }

    let minors = board.pieces(Piece::Knight) | board.pieces(Piece::Bishop);
    let white = minors & board.colors(Color::White);
    let black = minors & board.colors(Color::Black);
    if white.is_empty() || black.is_empty() {
        return true;
    }

    // One minor each: only two same-coloured bishops are dead.
    let bishops = board.pieces(Piece::Bishop);
    if white != white & bishops || black != black & bishops {
        return false;
    }
    (white & DARK_SQUARES).is_empty() == (black & DARK_SQUARES).is_empty()
}

/// Remaining non-pawn material as a fraction, 1.0 in the opening and 0.0 with
/// bare kings and pawns. Weights N=1, B=1, R=2, Q=4 out of 24.
pub fn game_phase(board: &Board) -> f32 {
    let weight = |piece: Piece, w: u32| board.pieces(piece).len() * w;
    let score = weight(Piece::Knight, 1)
        + weight(Piece::Bishop, 1)
        + weight(Piece::Rook, 2)
        + weight(Piece::Queen, 4);

    score.min(24) as f32 / 24.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dead(fen: &str) -> bool {
        has_insufficient_material(&fen.parse().unwrap())
    }

    #[test]
    fn test_lone_minor_pieces_are_dead() {
        assert!(dead("k7/8/8/8/8/8/8/K7 w - - 0 1"));
        assert!(dead("k7/8/8/8/8/8/8/KN6 w - - 0 1"));
        assert!(dead("kb6/8/8/8/8/8/8/K7 b - - 0 1"));
    }

    #[test]
    fn test_bishops_by_square_colour() {
        // b1 and c8 are both light
        assert!(dead("k1b5/8/8/8/8/8/8/KB6 w - - 0 1"));
        // b8 is dark
        assert!(!dead("kb6/8/8/8/8/8/8/KB6 w - - 0 1"));
        assert!(!dead("kn6/8/8/8/8/8/8/KB6 w - - 0 1"));
    }

    #[test]
    fn test_mating_material() {
        assert!(!dead("k7/8/8/8/8/8/8/KNN5 w - - 0 1"));
        assert!(!dead("k7/p7/8/8/8/8/8/K7 w - - 0 1"));
        assert!(!dead("k7/8/8/8/8/8/8/KR6 w - - 0 1"));
    }

    #[test]
    fn test_game_phase() {
        assert_eq!(game_phase(&Board::default()), 1.0);

        let board: Board = "k7/8/8/8/8/8/8/KR6 w - - 0 1".parse().unwrap();
        assert_eq!(game_phase(&board), 2.0 / 24.0);
    }
}
