use cozy_chess::{BitBoard, Board, Color, Piece, Rank, Square};

// Feature layout (17 total), always from the side to move's perspective.
// The board is mirrored vertically when Black is to move.
//
//   [0-5]   own P, N, B, R, Q, K bitboards
//   [6-11]  opponent P, N, B, R, Q, K bitboards
//   [12]    en-passant target bitboard
//   [13-16] castling: own short, own long, opponent short, opponent long
//
// Bitboards are scaled to [0, 1] by dividing the raw 64-bit value by u64::MAX.

const NUM_PIECE_FEATURES: usize = Piece::NUM * Color::NUM;
const EN_PASSANT_IDX: usize = NUM_PIECE_FEATURES;
const CASTLING_START: usize = EN_PASSANT_IDX + 1;

pub const NUM_FEATURES: usize = CASTLING_START + 4;

pub fn encode_board(board: &Board) -> [f32; NUM_FEATURES] {
    let mut features = [0f32; NUM_FEATURES];
    let us = board.side_to_move();
    let them = !us;

    for (offset, color) in [(0, us), (Piece::NUM, them)] {
        for piece in Piece::ALL {
            let bitboard = orient(board.colored_pieces(color, piece), us);
            features[offset + piece as usize] = scale(bitboard);
        }
    }

    // The target square is always on the sixth rank once oriented
    if let Some(file) = board.en_passant() {
        features[EN_PASSANT_IDX] = scale(Square::new(file, Rank::Sixth).bitboard());
    }

    for (i, color) in [us, them].into_iter().enumerate() {
        let rights = board.castle_rights(color);
        features[CASTLING_START + 2 * i] = flag(rights.short.is_some());
        features[CASTLING_START + 2 * i + 1] = flag(rights.long.is_some());
    }

    features
}

#[inline(always)]
fn orient(bitboard: BitBoard, perspective: Color) -> BitBoard {
    match perspective {
        Color::White => bitboard,
        Color::Black => bitboard.flip_ranks(),
    }
}

#[inline(always)]
fn scale(bitboard: BitBoard) -> f32 {
    (bitboard.0 as f64 / u64::MAX as f64) as f32
}

#[inline(always)]
fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_count() {
        assert_eq!(NUM_FEATURES, 17);
    }

    #[test]
    fn test_start_position_is_symmetric() {
        let white = encode_board(&Board::default());
        let black: Board = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1"
            .parse()
            .unwrap();

        assert_eq!(white, encode_board(&black));
    }

    #[test]
    fn test_features_in_unit_range() {
        let board: Board = "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3"
            .parse()
            .unwrap();
        let features = encode_board(&board);

        assert!(features.iter().all(|&f| (0.0..=1.0).contains(&f)));
        assert!(features[EN_PASSANT_IDX] > 0.0);
        assert_eq!(&features[CASTLING_START..], &[1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_castling_flags_follow_side_to_move() {
        let board: Board = "r3k2r/8/8/8/8/8/8/R3K3 b Qk - 0 1".parse().unwrap();
        let features = encode_board(&board);

        // Black to move: own short, own long, then White's
        assert_eq!(&features[CASTLING_START..], &[1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_own_pieces_come_first() {
        let board: Board = "k7/8/8/8/8/8/8/KQ6 w - - 0 1".parse().unwrap();
        let white = encode_board(&board);
        assert!(white[Piece::Queen as usize] > 0.0);
        assert_eq!(white[Piece::NUM + Piece::Queen as usize], 0.0);

        let board: Board = "k7/8/8/8/8/8/8/KQ6 b - - 0 1".parse().unwrap();
        let black = encode_board(&board);
        assert_eq!(black[Piece::Queen as usize], 0.0);
        assert!(black[Piece::NUM + Piece::Queen as usize] > 0.0);
    }
}
