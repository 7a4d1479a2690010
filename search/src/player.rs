use evaluation::{scores::clamp_score, Evaluator};

use crate::{
    engine::{ChildStats, Decision, Mcts, SearchError, SearchReport},
    oracle::Oracle,
    MctsConfig,
};

/// An engine bound to one evaluator and a fixed per-move budget.
///
/// This is the surface a front end talks to: it asks for a move and a score
/// and never touches the tree.
pub struct Player<O: Oracle, E> {
    engine: Mcts<O>,
    evaluator: E,
    budget: u32,
    last_report: Option<SearchReport<O::Move>>,
}

impl<O, E> Player<O, E>
where
    O: Oracle,
    E: Evaluator<O::Position>,
{
    pub fn new(oracle: O, config: MctsConfig, evaluator: E, budget: u32) -> Self {
        Self {
            engine: Mcts::new(oracle, config),
            evaluator,
            budget,
            last_report: None,
        }
    }

    pub fn name(&self) -> String {
        self.evaluator.name()
    }

    /// Searches `position` and returns the chosen move, or `None` if the game is over.
    pub fn current_best_move(
        &mut self,
        position: &O::Position,
    ) -> Result<Option<O::Move>, SearchError> {
        match self.engine.search(&mut self.evaluator, position, self.budget)? {
            Decision::Move(report) => {
                let mv = report.best_move;
                self.last_report = Some(report);
                Ok(Some(mv))
            }
            Decision::Terminal(_) => {
                self.last_report = None;
                Ok(None)
            }
        }
    }

    /// Static evaluation for the side to move, in `[-1, 1]`.
    pub fn evaluate(&mut self, position: &O::Position) -> f32 {
        if let Some(outcome) = self.engine.oracle().outcome(position) {
            return outcome.value();
        }
        clamp_score(self.evaluator.evaluate(position))
    }

    /// Informs the engine that `mv` was played, by either side.
    pub fn observe(&mut self, mv: O::Move) {
        self.engine.commit(mv);
    }

    pub fn last_report(&self) -> Option<&SearchReport<O::Move>> {
        self.last_report.as_ref()
    }

    pub fn root_statistics(&self) -> Vec<ChildStats<O::Move>> {
        self.engine.root_statistics()
    }

    pub fn reset(&mut self) {
        self.engine.reset();
        self.last_report = None;
    }
}

#[cfg(test)]
mod tests {
    use cozy_chess::{Board, Move};
    use evaluation::MaterialEvaluator;

    use super::*;
    use crate::ChessOracle;

    fn player(budget: u32) -> Player<ChessOracle, MaterialEvaluator> {
        Player::new(
            ChessOracle,
            MctsConfig::default(),
            MaterialEvaluator::default(),
            budget,
        )
    }

    #[test]
    fn test_best_move_is_legal() {
        let mut player = player(64);
        let board = Board::default();
        let mv = player.current_best_move(&board).unwrap().unwrap();

        assert!(utils::collect_legal_moves(&board).contains(&mv));
        assert_eq!(player.last_report().map(|r| r.root_visits), Some(64));
    }

    #[test]
    fn test_no_move_when_game_over() {
        let mut player = player(64);
        let mated: Board = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3"
            .parse()
            .unwrap();

        assert_eq!(player.current_best_move(&mated), Ok(None));
        assert_eq!(player.evaluate(&mated), -1.0);
    }

    #[test]
    fn test_captures_hanging_queen() {
        let mut player = player(400);
        let board: Board = "k7/8/8/3q4/8/8/8/K2R4 w - - 0 1".parse().unwrap();
        let capture: Move = "d1d5".parse().unwrap();

        assert_eq!(player.current_best_move(&board), Ok(Some(capture)));
        assert!(player.evaluate(&board) < 0.0);
    }
}
