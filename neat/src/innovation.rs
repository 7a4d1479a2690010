use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::gene::{Innovation, NodeId};

/// Historical markings for one evolutionary run.
///
/// A connection between the same ordered node pair always receives the same
/// innovation number, however many genomes discover it. Splitting the same
/// connection reuses the same hidden node id unless the genome already has it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TrackerState", into = "TrackerState")]
pub struct InnovationTracker {
    next_innovation: Innovation,
    next_node: NodeId,
    connections: AHashMap<(NodeId, NodeId), Innovation>,
    splits: AHashMap<Innovation, NodeId>,
}

impl InnovationTracker {
    /// Input and output nodes take ids `0..num_inputs + num_outputs`.
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self {
        Self {
            next_innovation: 0,
            next_node: (num_inputs + num_outputs) as NodeId,
            connections: AHashMap::new(),
            splits: AHashMap::new(),
        }
    }

    /// Innovation number of the `input -> output` connection, assigned on first use.
    pub fn connection(&mut self, input: NodeId, output: NodeId) -> Innovation {
        if let Some(&innovation) = self.connections.get(&(input, output)) {
            return innovation;
        }

        let innovation = self.next_innovation;
        self.next_innovation += 1;
        self.connections.insert((input, output), innovation);
        innovation
    }

    /// Hidden node id for splitting the connection `innovation`.
    ///
    /// `taken` reports whether the genome being mutated already holds a node id.
    pub fn split(&mut self, innovation: Innovation, taken: impl Fn(NodeId) -> bool) -> NodeId {
        match self.splits.get(&innovation) {
            Some(&node) if !taken(node) => node,
            Some(_) => self.fresh_node(),
            None => {
                let node = self.fresh_node();
                self.splits.insert(innovation, node);
                node
            }
        }
    }

    pub fn fresh_node(&mut self) -> NodeId {
        let node = self.next_node;
        self.next_node += 1;
        node
    }

    /// Number of innovation numbers handed out so far.
    pub fn innovation_count(&self) -> Innovation {
        self.next_innovation
    }

    pub fn node_count(&self) -> NodeId {
        self.next_node
    }
}

#[derive(Serialize, Deserialize)]
struct TrackerState {
    next_innovation: Innovation,
    next_node: NodeId,
    /// `(input, output, innovation)`, sorted by innovation.
    connections: Vec<(NodeId, NodeId, Innovation)>,
    /// `(split connection, hidden node)`, sorted by innovation.
    splits: Vec<(Innovation, NodeId)>,
}

impl From<TrackerState> for InnovationTracker {
    fn from(state: TrackerState) -> Self {
        Self {
            next_innovation: state.next_innovation,
            next_node: state.next_node,
            connections: state
                .connections
                .into_iter()
                .map(|(input, output, innovation)| ((input, output), innovation))
                .collect(),
            splits: state.splits.into_iter().collect(),
        }
    }
}

impl From<InnovationTracker> for TrackerState {
    fn from(tracker: InnovationTracker) -> Self {
        let mut connections: Vec<_> = tracker
            .connections
            .into_iter()
            .map(|((input, output), innovation)| (input, output, innovation))
            .collect();
        connections.sort_unstable_by_key(|&(_, _, innovation)| innovation);

        let mut splits: Vec<_> = tracker.splits.into_iter().collect();
        splits.sort_unstable();

        Self {
            next_innovation: tracker.next_innovation,
            next_node: tracker.next_node,
            connections,
            splits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_pair_same_innovation() {
        let mut tracker = InnovationTracker::new(3, 1);
        let a = tracker.connection(0, 3);
        let b = tracker.connection(1, 3);
        assert_ne!(a, b);
        assert_eq!(tracker.connection(0, 3), a);
        assert_eq!(tracker.innovation_count(), 2);
    }

    #[test]
    fn test_direction_matters() {
        let mut tracker = InnovationTracker::new(3, 2);
        assert_ne!(tracker.connection(3, 4), tracker.connection(4, 3));
    }

    #[test]
    fn test_split_reuses_node_unless_taken() {
        let mut tracker = InnovationTracker::new(2, 1);
        let innovation = tracker.connection(0, 2);

        let first = tracker.split(innovation, |_| false);
        assert_eq!(first, 3);
        assert_eq!(tracker.split(innovation, |_| false), first);

        let fresh = tracker.split(innovation, |id| id == first);
        assert_ne!(fresh, first);
        assert_eq!(tracker.node_count(), 5);
    }

    #[test]
    fn test_serde_keeps_registry() {
        let mut tracker = InnovationTracker::new(2, 1);
        let innovation = tracker.connection(0, 2);
        tracker.connection(1, 2);
        tracker.split(innovation, |_| false);

        let json = serde_json::to_string(&tracker).unwrap();
        let restored: InnovationTracker = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, tracker);
    }
}
