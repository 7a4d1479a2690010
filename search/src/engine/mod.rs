use evaluation::Evaluator;
use thiserror::Error;

use crate::{
    oracle::{Oracle, Outcome},
    tree::{NodeId, SearchTree},
    MctsConfig,
};

mod search;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchError {
    /// Zero budget and the position does not have exactly one legal move.
    #[error("Empty search: zero budget with {legal_moves} legal moves")]
    EmptySearch { legal_moves: usize },

    #[error("Oracle inconsistency: {0}")]
    OracleInconsistency(String),
}

/// Result of a finished search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport<M> {
    pub best_move: M,
    /// Estimated value of the root for the side to move, in `[-1, 1]`.
    pub value: f32,
    pub iterations: u32,
    pub root_visits: u32,
    pub best_visits: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision<M> {
    Move(SearchReport<M>),
    /// The root is already decided. Carries the outcome for the side to move.
    Terminal(Outcome),
}

impl<M: Copy> Decision<M> {
    pub fn best_move(&self) -> Option<M> {
        match self {
            Decision::Move(report) => Some(report.best_move),
            Decision::Terminal(_) => None,
        }
    }
}

/// Statistics of one root child, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildStats<M> {
    pub mv: M,
    pub visits: u32,
    /// Mean value for the side to move at the root. `None` if never visited.
    pub mean_value: Option<f32>,
}

pub struct Mcts<O: Oracle> {
    oracle: O,
    config: MctsConfig,

    /// Tree of the last search, kept for statistics and reuse.
    tree: Option<SearchTree<O::Position, O::Move>>,
}

impl<O: Oracle> Mcts<O> {
    pub fn new(oracle: O, config: MctsConfig) -> Self {
        Self {
            oracle,
            config,
            tree: None,
        }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Drops any retained tree.
    pub fn reset(&mut self) {
        self.tree = None;
    }

    /// Advances the retained tree past `mv`.
    ///
    /// With `reuse_tree` enabled the child subtree becomes the new root, otherwise
    /// the tree is dropped. Can be called for both sides' moves.
    pub fn commit(&mut self, mv: O::Move) {
        let tree = match self.tree.take() {
            Some(tree) if self.config.reuse_tree => tree,
            _ => return,
        };

        if let Some(child) = tree.child_by_move(NodeId::ROOT, mv) {
            self.tree = Some(tree.detach(child));
        }
    }

    /// Visits accumulated at the retained root, 0 when nothing is retained.
    pub fn root_visits(&self) -> u32 {
        self.tree.as_ref().map_or(0, |tree| tree.root().visits)
    }

    /// Per-child statistics of the retained root in oracle move order.
    pub fn root_statistics(&self) -> Vec<ChildStats<O::Move>> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };

        tree.root()
            .children()
            .iter()
            .filter_map(|&id| {
                let child = tree.node(id);
                child.mv.map(|mv| ChildStats {
                    mv,
                    visits: child.visits,
                    mean_value: child.mean_value().map(|v| v as f32),
                })
            })
            .collect()
    }

    /// Runs `budget` iterations from `root` and picks a move.
    pub fn search<E>(
        &mut self,
        evaluator: &mut E,
        root: &O::Position,
        budget: u32,
    ) -> Result<Decision<O::Move>, SearchError>
    where
        E: Evaluator<O::Position> + ?Sized,
    {
        if let Some(outcome) = self.oracle.outcome(root) {
            self.tree = None;
            return Ok(Decision::Terminal(outcome));
        }

        if budget == 0 {
            return self.zero_budget(root);
        }

        let mut tree = self.take_tree(root);
        for _ in 0..budget {
            self.iterate(&mut tree, evaluator)?;
        }

        let report = self.select_move(&tree, budget)?;
        log::debug!(
            "mcts: {} iterations, {} root visits, {} nodes, best {:?} ({} visits, value {:.3})",
            report.iterations,
            report.root_visits,
            tree.len(),
            report.best_move,
            report.best_visits,
            report.value
        );

        self.tree = Some(tree);
        Ok(Decision::Move(report))
    }

    fn zero_budget(&mut self, root: &O::Position) -> Result<Decision<O::Move>, SearchError> {
        let moves = self.oracle.legal_moves(root);
        match moves.as_slice() {
            [] => Err(SearchError::OracleInconsistency(
                "non-terminal root has no legal moves".to_string(),
            )),
            [only] => Ok(Decision::Move(SearchReport {
                best_move: *only,
                value: 0.0,
                iterations: 0,
                root_visits: 0,
                best_visits: 0,
            })),
            _ => Err(SearchError::EmptySearch {
                legal_moves: moves.len(),
            }),
        }
    }

    /// Retained tree if its root matches, a fresh one otherwise.
    fn take_tree(&mut self, root: &O::Position) -> SearchTree<O::Position, O::Move> {
        match self.tree.take() {
            Some(tree) if self.config.reuse_tree && tree.root().position == *root => tree,
            _ => SearchTree::new(root.clone(), None),
        }
    }
}
