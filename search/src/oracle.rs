use std::fmt::Debug;

use cozy_chess::{Board, Move};
use utils::{collect_legal_moves, has_check, has_insufficient_material, has_legal_moves, make_move};

/// Halfmove clock value at which the fifty-move rule ends the game.
const FIFTY_MOVE_PLIES: u8 = 100;

/// Game-theoretic result of a finished game, seen from the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    /// +1 for a win, -1 for a loss, 0 for a draw.
    #[inline(always)]
    pub fn value(self) -> f32 {
        match self {
            Outcome::Win => evaluation::scores::WIN_VALUE,
            Outcome::Loss => evaluation::scores::LOSS_VALUE,
            Outcome::Draw => evaluation::scores::DRAW_VALUE,
        }
    }

    /// The same outcome seen from the other side.
    #[inline(always)]
    pub fn flip(self) -> Self {
        match self {
            Outcome::Win => Outcome::Loss,
            Outcome::Loss => Outcome::Win,
            Outcome::Draw => Outcome::Draw,
        }
    }
}

/// Rules of the game, consumed as an opaque capability.
///
/// Positions are values: applying a move returns a new position and never
/// mutates the input, so search nodes can hold positions independently.
pub trait Oracle {
    type Position: Clone + PartialEq;
    type Move: Copy + Eq + Debug;

    /// Legal moves in a stable order.
    fn legal_moves(&self, position: &Self::Position) -> Vec<Self::Move>;

    fn apply_move(&self, position: &Self::Position, mv: Self::Move) -> Self::Position;

    /// `None` while the game is still in progress.
    fn outcome(&self, position: &Self::Position) -> Option<Outcome>;
}

/// Chess rules backed by `cozy-chess`.
///
/// Repetition is not detected here; positions carry no game history.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChessOracle;

impl Oracle for ChessOracle {
    type Position = Board;
    type Move = Move;

    #[inline(always)]
    fn legal_moves(&self, board: &Board) -> Vec<Move> {
        collect_legal_moves(board)
    }

    #[inline(always)]
    fn apply_move(&self, board: &Board, mv: Move) -> Board {
        make_move(board, mv)
    }

    fn outcome(&self, board: &Board) -> Option<Outcome> {
        if !has_legal_moves(board) {
            return Some(if has_check(board) {
                Outcome::Loss
            } else {
                Outcome::Draw
            });
        }

        if board.halfmove_clock() >= FIFTY_MOVE_PLIES || has_insufficient_material(board) {
            return Some(Outcome::Draw);
        }

        None
    }
}
