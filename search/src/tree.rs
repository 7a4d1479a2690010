use std::collections::VecDeque;

use crate::oracle::Outcome;

/// Index of a node inside a [`SearchTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    #[inline(always)]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One position reached from the root.
///
/// `value_sum` is accumulated from the perspective of the player who made the
/// move leading into this node, so a parent can rank its children directly.
#[derive(Debug, Clone)]
pub struct SearchNode<P, M> {
    pub position: P,
    pub parent: Option<NodeId>,
    /// Move that led here from the parent. `None` for the root.
    pub mv: Option<M>,
    pub visits: u32,
    pub value_sum: f64,
    pub terminal: Option<Outcome>,
    /// Legal moves in oracle order, filled on the first visit.
    moves: Option<Vec<M>>,
    /// `children[i]` is the child reached by `moves[i]`.
    children: Vec<NodeId>,
}

impl<P, M: Copy> SearchNode<P, M> {
    fn new(position: P, parent: Option<NodeId>, mv: Option<M>, terminal: Option<Outcome>) -> Self {
        Self {
            position,
            parent,
            mv,
            visits: 0,
            value_sum: 0.0,
            terminal,
            moves: None,
            children: Vec::new(),
        }
    }

    /// Mean value, or `None` before the first visit.
    #[inline(always)]
    pub fn mean_value(&self) -> Option<f64> {
        if self.visits == 0 {
            None
        } else {
            Some(self.value_sum / self.visits as f64)
        }
    }

    #[inline(always)]
    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    #[inline(always)]
    pub fn is_expanded(&self) -> bool {
        self.moves.is_some()
    }

    pub fn is_fully_expanded(&self) -> bool {
        match &self.moves {
            Some(moves) => self.children.len() == moves.len(),
            None => false,
        }
    }

    pub fn moves(&self) -> Option<&[M]> {
        self.moves.as_deref()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn set_moves(&mut self, moves: Vec<M>) {
        self.moves = Some(moves);
    }

    /// Next move in oracle order without a child.
    pub fn untried_move(&self) -> Option<M> {
        self.moves
            .as_ref()
            .and_then(|moves| moves.get(self.children.len()).copied())
    }
}

/// Arena-allocated search tree. Node 0 is always the root.
#[derive(Debug, Clone)]
pub struct SearchTree<P, M> {
    nodes: Vec<SearchNode<P, M>>,
}

impl<P, M: Copy> SearchTree<P, M> {
    pub fn new(root: P, terminal: Option<Outcome>) -> Self {
        Self {
            nodes: vec![SearchNode::new(root, None, None, terminal)],
        }
    }

    #[inline(always)]
    pub fn root(&self) -> &SearchNode<P, M> {
        &self.nodes[NodeId::ROOT.0]
    }

    #[inline(always)]
    pub fn node(&self, id: NodeId) -> &SearchNode<P, M> {
        &self.nodes[id.0]
    }

    #[inline(always)]
    pub fn node_mut(&mut self, id: NodeId) -> &mut SearchNode<P, M> {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Materialises the child for the parent's next untried move.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        mv: M,
        position: P,
        terminal: Option<Outcome>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(SearchNode::new(position, Some(parent), Some(mv), terminal));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Child maximising `mean + c * sqrt(ln(N) / (1 + n))`.
    ///
    /// Ties go to the earliest child in oracle order.
    pub fn select_child(&self, parent: NodeId, exploration: f64) -> Option<NodeId> {
        let node = &self.nodes[parent.0];
        let log_visits = (node.visits.max(1) as f64).ln();

        let mut best: Option<(NodeId, f64)> = None;
        for &child_id in &node.children {
            let child = &self.nodes[child_id.0];
            let mean = child.mean_value().unwrap_or(0.0);
            let score = mean + exploration * (log_visits / (1.0 + child.visits as f64)).sqrt();

            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((child_id, score)),
            }
        }

        best.map(|(id, _)| id)
    }

    /// Adds `value` to `leaf` and every ancestor, flipping sign each ply.
    ///
    /// `value` is from the perspective of the player who moved into `leaf`.
    pub fn backpropagate(&mut self, leaf: NodeId, value: f64) {
        let mut current = Some(leaf);
        let mut value = value;

        while let Some(id) = current {
            let node = &mut self.nodes[id.0];
            node.visits += 1;
            node.value_sum += value;
            value = -value;
            current = node.parent;
        }
    }

    /// Root child reached by `mv`, if it has been materialised.
    pub fn child_by_move(&self, parent: NodeId, mv: M) -> Option<NodeId>
    where
        M: PartialEq,
    {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|&id| self.nodes[id.0].mv == Some(mv))
    }
}

impl<P: Clone, M: Copy> SearchTree<P, M> {
    /// Copies the subtree under `id` into a new arena rooted at that node.
    ///
    /// Statistics are kept; everything outside the subtree is dropped with `self`.
    pub fn detach(&self, id: NodeId) -> SearchTree<P, M> {
        let mut nodes: Vec<SearchNode<P, M>> = Vec::new();
        let mut queue = VecDeque::new();

        let mut root = self.nodes[id.0].clone();
        root.parent = None;
        root.mv = None;
        queue.push_back((id, NodeId(0)));
        nodes.push(root);

        while let Some((old_id, new_id)) = queue.pop_front() {
            let old_children = self.nodes[old_id.0].children.clone();
            let mut new_children = Vec::with_capacity(old_children.len());

            for old_child in old_children {
                let child_id = NodeId(nodes.len());
                let mut child = self.nodes[old_child.0].clone();
                child.parent = Some(new_id);
                nodes.push(child);
                new_children.push(child_id);
                queue.push_back((old_child, child_id));
            }

            nodes[new_id.0].children = new_children;
        }

        SearchTree { nodes }
    }
}
