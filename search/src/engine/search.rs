use evaluation::{scores::clamp_score, Evaluator};

use crate::{
    oracle::Oracle,
    tree::{NodeId, SearchTree},
    MoveSelection,
};

use super::{Mcts, SearchError, SearchReport};

impl<O: Oracle> Mcts<O> {
    /// One selection, expansion, evaluation and backpropagation pass.
    pub(super) fn iterate<E>(
        &self,
        tree: &mut SearchTree<O::Position, O::Move>,
        evaluator: &mut E,
    ) -> Result<(), SearchError>
    where
        E: Evaluator<O::Position> + ?Sized,
    {
        let leaf = self.select_and_expand(tree)?;

        let node = tree.node(leaf);
        // Both the outcome and the evaluator score the side to move at the leaf;
        // the node stores value for the player who moved into it.
        let value = match node.terminal {
            Some(outcome) => -outcome.value(),
            None => -clamp_score(evaluator.evaluate(&node.position)),
        };

        tree.backpropagate(leaf, value as f64);
        Ok(())
    }

    fn select_and_expand(
        &self,
        tree: &mut SearchTree<O::Position, O::Move>,
    ) -> Result<NodeId, SearchError> {
        let mut current = NodeId::ROOT;

        loop {
            if tree.node(current).is_terminal() {
                return Ok(current);
            }

            if !tree.node(current).is_expanded() {
                let moves = self.oracle.legal_moves(&tree.node(current).position);
                if moves.is_empty() {
                    return Err(SearchError::OracleInconsistency(
                        "non-terminal position has no legal moves".to_string(),
                    ));
                }
                tree.node_mut(current).set_moves(moves);
            }

            if let Some(mv) = tree.node(current).untried_move() {
                let position = self.oracle.apply_move(&tree.node(current).position, mv);
                let terminal = self.oracle.outcome(&position);
                return Ok(tree.add_child(current, mv, position, terminal));
            }

            current = tree
                .select_child(current, self.config.exploration)
                .ok_or_else(|| {
                    SearchError::OracleInconsistency("expanded node has no children".to_string())
                })?;
        }
    }

    /// Picks the root child according to the configured policy.
    pub(super) fn select_move(
        &self,
        tree: &SearchTree<O::Position, O::Move>,
        iterations: u32,
    ) -> Result<SearchReport<O::Move>, SearchError> {
        let root = tree.root();
        let mut best: Option<NodeId> = None;

        for &id in root.children() {
            let child = tree.node(id);
            if child.visits == 0 {
                continue;
            }

            let better = match best.map(|b| tree.node(b)) {
                None => true,
                Some(current) => match self.config.move_selection {
                    MoveSelection::RobustChild => child.visits > current.visits,
                    MoveSelection::MaxMeanValue => {
                        child.mean_value().unwrap_or(f64::MIN)
                            > current.mean_value().unwrap_or(f64::MIN)
                    }
                },
            };

            if better {
                best = Some(id);
            }
        }

        let best = best.map(|id| tree.node(id)).ok_or(SearchError::EmptySearch {
            legal_moves: root.moves().map_or(0, |moves| moves.len()),
        })?;
        let best_move = best.mv.ok_or_else(|| {
            SearchError::OracleInconsistency("root child without a move".to_string())
        })?;

        Ok(SearchReport {
            best_move,
            value: root.mean_value().map_or(0.0, |v| -v as f32),
            iterations,
            root_visits: root.visits,
            best_visits: best.visits,
        })
    }
}
