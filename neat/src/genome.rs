use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rand::{seq::SliceRandom, Rng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::{
    config::{GenomeConfig, InitialConnection, SpeciesConfig},
    gene::{ConnectionGene, Innovation, NodeGene, NodeId, NodeKind},
    innovation::InnovationTracker,
};

/// Gene counts below this are not normalised in the compatibility distance.
const SMALL_GENOME_GENES: usize = 20;

/// Chance that a gene disabled in either parent stays disabled in the child.
const INHERIT_DISABLED_PROB: f64 = 0.75;

/// Evolvable encoding of one network.
///
/// Node ids `0..num_inputs` are inputs and the next `num_outputs` ids are
/// outputs. Connection genes are keyed by innovation number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub key: u64,
    pub fitness: Option<f64>,
    num_inputs: usize,
    num_outputs: usize,
    nodes: BTreeMap<NodeId, NodeGene>,
    connections: BTreeMap<Innovation, ConnectionGene>,
}

impl Genome {
    /// Inputs and outputs only, no connections.
    pub fn minimal<R: Rng>(key: u64, config: &GenomeConfig, rng: &mut R) -> Self {
        let mut nodes = BTreeMap::new();
        for id in 0..config.num_inputs as NodeId {
            nodes.insert(id, NodeGene::input(id));
        }

        let first_output = config.num_inputs as NodeId;
        for id in first_output..first_output + config.num_outputs as NodeId {
            let mut node = NodeGene::new(id, NodeKind::Output, config.output_activation);
            node.bias = sample_gaussian(rng, config.weight_init_stdev);
            nodes.insert(id, node);
        }

        Self {
            key,
            fitness: None,
            num_inputs: config.num_inputs,
            num_outputs: config.num_outputs,
            nodes,
            connections: BTreeMap::new(),
        }
    }

    /// Every input connected to every output with random weights.
    pub fn fully_connected<R: Rng>(
        key: u64,
        config: &GenomeConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> Self {
        let mut genome = Self::minimal(key, config, rng);
        let outputs: Vec<NodeId> = genome.output_ids().collect();

        for input in genome.input_ids().collect::<Vec<_>>() {
            for &output in &outputs {
                let weight = sample_gaussian(rng, config.weight_init_stdev);
                genome.insert_connection(tracker, input, output, weight);
            }
        }
        genome
    }

    /// Initial genome according to `config.initial_connection`.
    pub fn initial<R: Rng>(
        key: u64,
        config: &GenomeConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> Self {
        match config.initial_connection {
            InitialConnection::FullyConnected => Self::fully_connected(key, config, tracker, rng),
            InitialConnection::Minimal => Self::minimal(key, config, rng),
        }
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    pub fn input_ids(&self) -> impl Iterator<Item = NodeId> {
        0..self.num_inputs as NodeId
    }

    pub fn output_ids(&self) -> impl Iterator<Item = NodeId> {
        let first = self.num_inputs as NodeId;
        first..first + self.num_outputs as NodeId
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeGene> {
        self.nodes.values()
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeGene> {
        self.nodes.get(&id)
    }

    /// Connection genes in innovation order.
    pub fn connections(&self) -> impl Iterator<Item = &ConnectionGene> {
        self.connections.values()
    }

    pub fn connection(&self, innovation: Innovation) -> Option<&ConnectionGene> {
        self.connections.get(&innovation)
    }

    #[cfg(test)]
    pub(crate) fn connection_mut(&mut self, innovation: Innovation) -> Option<&mut ConnectionGene> {
        self.connections.get_mut(&innovation)
    }

    #[cfg(test)]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeGene> {
        self.nodes.get_mut(&id)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_hidden(&self) -> usize {
        self.nodes
            .values()
            .filter(|node| node.kind == NodeKind::Hidden)
            .count()
    }

    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }

    pub fn num_enabled(&self) -> usize {
        self.connections.values().filter(|c| c.enabled).count()
    }

    pub fn has_connection(&self, input: NodeId, output: NodeId) -> bool {
        self.connections
            .values()
            .any(|c| c.input == input && c.output == output)
    }

    /// Whether adding `input -> output` would close a cycle over existing connections.
    pub fn creates_cycle(&self, input: NodeId, output: NodeId) -> bool {
        if input == output {
            return true;
        }

        let mut seen = BTreeSet::from([output]);
        let mut queue = VecDeque::from([output]);
        while let Some(node) = queue.pop_front() {
            for c in self.connections.values().filter(|c| c.input == node) {
                if c.output == input {
                    return true;
                }
                if seen.insert(c.output) {
                    queue.push_back(c.output);
                }
            }
        }
        false
    }

    /// Whether any connection, enabled or not, takes part in a cycle.
    pub fn has_cycle(&self) -> bool {
        self.connections
            .values()
            .any(|c| self.reaches(c.output, c.input))
    }

    fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }
        let mut seen = BTreeSet::from([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(node) = queue.pop_front() {
            for c in self.connections.values().filter(|c| c.input == node) {
                if c.output == to {
                    return true;
                }
                if seen.insert(c.output) {
                    queue.push_back(c.output);
                }
            }
        }
        false
    }

    /// The same genes under a new key, without fitness.
    pub fn offspring(&self, key: u64) -> Self {
        Self {
            key,
            fitness: None,
            ..self.clone()
        }
    }

    fn insert_connection(
        &mut self,
        tracker: &mut InnovationTracker,
        input: NodeId,
        output: NodeId,
        weight: f32,
    ) -> Innovation {
        let innovation = tracker.connection(input, output);
        self.connections.insert(
            innovation,
            ConnectionGene {
                innovation,
                input,
                output,
                weight,
                enabled: true,
            },
        );
        innovation
    }

    /// Perturbs enabled weights and non-input biases with Gaussian noise.
    ///
    /// Each gene is touched with probability `weight_mutate_rate`; a touched gene
    /// is replaced outright with probability `weight_replace_rate`.
    pub fn mutate_weights<R: Rng>(&self, config: &GenomeConfig, rng: &mut R) -> Self {
        let mut child = self.clone();
        let limit = config.weight_max as f32;

        for connection in child.connections.values_mut().filter(|c| c.enabled) {
            if let Some(weight) = mutate_value(connection.weight, config, rng) {
                connection.weight = weight.clamp(-limit, limit);
            }
        }

        for node in child
            .nodes
            .values_mut()
            .filter(|n| n.kind != NodeKind::Input)
        {
            if let Some(bias) = mutate_value(node.bias, config, rng) {
                node.bias = bias.clamp(-limit, limit);
            }
        }

        child
    }

    /// Adds one connection between a currently unconnected node pair.
    ///
    /// Never targets an input node or duplicates an existing pair; closes no
    /// cycle unless `allow_recurrent` is set. Returns an unchanged copy when no
    /// pair qualifies.
    pub fn mutate_add_connection<R: Rng>(
        &self,
        config: &GenomeConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> Self {
        let mut child = self.clone();

        let mut candidates: Vec<(NodeId, NodeId)> = Vec::new();
        for input in self.nodes.values() {
            for output in self.nodes.values().filter(|n| n.kind != NodeKind::Input) {
                if !self.has_connection(input.id, output.id) {
                    candidates.push((input.id, output.id));
                }
            }
        }
        candidates.shuffle(rng);

        let chosen = candidates
            .into_iter()
            .find(|&(input, output)| config.allow_recurrent || !self.creates_cycle(input, output));

        if let Some((input, output)) = chosen {
            let weight = sample_gaussian(rng, config.weight_init_stdev);
            child.insert_connection(tracker, input, output, weight);
        }
        child
    }

    /// Splits a random enabled connection through a new hidden node.
    ///
    /// The original connection is disabled. The incoming half gets weight 1 and
    /// the outgoing half keeps the original weight. Returns an unchanged copy
    /// when there is no enabled connection.
    pub fn mutate_add_node<R: Rng>(
        &self,
        config: &GenomeConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> Self {
        let mut child = self.clone();

        let enabled: Vec<Innovation> = self
            .connections
            .values()
            .filter(|c| c.enabled)
            .map(|c| c.innovation)
            .collect();
        let Some(&innovation) = enabled.choose(rng) else {
            return child;
        };

        let Some(split) = child.connections.get_mut(&innovation) else {
            return child;
        };
        split.enabled = false;
        let (input, output, weight) = (split.input, split.output, split.weight);

        let node = tracker.split(innovation, |id| self.nodes.contains_key(&id));
        child.nodes.insert(
            node,
            NodeGene::new(node, NodeKind::Hidden, config.hidden_activation),
        );
        child.insert_connection(tracker, input, node, 1.0);
        child.insert_connection(tracker, node, output, weight);
        child
    }

    /// Flips the enabled flag of a random connection.
    ///
    /// Cycle checks cover disabled genes too, so re-enabling never closes a
    /// forbidden cycle.
    pub fn mutate_toggle_enable<R: Rng>(&self, rng: &mut R) -> Self {
        let mut child = self.clone();
        let innovations: Vec<Innovation> = self.connections.keys().copied().collect();
        let Some(&innovation) = innovations.choose(rng) else {
            return child;
        };

        if let Some(connection) = child.connections.get_mut(&innovation) {
            connection.enabled = !connection.enabled;
        }
        child
    }

    /// Applies each operator with its configured probability, weights last.
    pub fn mutate<R: Rng>(
        &self,
        config: &GenomeConfig,
        tracker: &mut InnovationTracker,
        rng: &mut R,
    ) -> Self {
        let mut child = self.clone();

        if rng.gen_bool(config.node_add_prob) {
            child = child.mutate_add_node(config, tracker, rng);
        }
        if rng.gen_bool(config.conn_add_prob) {
            child = child.mutate_add_connection(config, tracker, rng);
        }
        if rng.gen_bool(config.toggle_enable_prob) {
            child = child.mutate_toggle_enable(rng);
        }
        child.mutate_weights(config, rng)
    }

    /// Aligns connection genes by innovation number and produces one child.
    ///
    /// Matching genes come from either parent at random, or are averaged when
    /// `averaging` is set. Disjoint and excess genes come from the fitter
    /// parent; on equal fitness `a` counts as fitter.
    pub fn crossover<R: Rng>(a: &Genome, b: &Genome, key: u64, averaging: bool, rng: &mut R) -> Self {
        let (fitter, other) = if b.fitness.unwrap_or(f64::MIN) > a.fitness.unwrap_or(f64::MIN) {
            (b, a)
        } else {
            (a, b)
        };

        let mut connections = BTreeMap::new();
        for (&innovation, gene) in &fitter.connections {
            let mut child_gene = gene.clone();

            if let Some(partner) = other.connections.get(&innovation) {
                child_gene.weight = if averaging {
                    (gene.weight + partner.weight) / 2.0
                } else if rng.gen_bool(0.5) {
                    gene.weight
                } else {
                    partner.weight
                };

                child_gene.enabled = if !gene.enabled || !partner.enabled {
                    !rng.gen_bool(INHERIT_DISABLED_PROB)
                } else {
                    true
                };
            }

            connections.insert(innovation, child_gene);
        }

        let mut nodes = BTreeMap::new();
        for (&id, gene) in &fitter.nodes {
            let mut child_gene = gene.clone();
            if let Some(partner) = other.nodes.get(&id) {
                if averaging {
                    child_gene.bias = (gene.bias + partner.bias) / 2.0;
                } else if rng.gen_bool(0.5) {
                    child_gene.bias = partner.bias;
                    child_gene.activation = partner.activation;
                }
            }
            nodes.insert(id, child_gene);
        }

        Self {
            key,
            fitness: None,
            num_inputs: fitter.num_inputs,
            num_outputs: fitter.num_outputs,
            nodes,
            connections,
        }
    }

    /// Compatibility distance `c1 * E / N + c2 * D / N + c3 * W`.
    ///
    /// `E` and `D` count excess and disjoint connection genes, `W` is the mean
    /// weight difference of matching genes and `N` the larger gene count (1 for
    /// small genomes).
    pub fn distance(&self, other: &Genome, config: &SpeciesConfig) -> f64 {
        let self_max = self.connections.keys().next_back().copied();
        let other_max = other.connections.keys().next_back().copied();

        let mut matching = 0usize;
        let mut weight_difference = 0.0f64;
        let mut disjoint = 0usize;
        let mut excess = 0usize;

        for (innovation, gene) in &self.connections {
            match other.connections.get(innovation) {
                Some(partner) => {
                    matching += 1;
                    weight_difference += (gene.weight - partner.weight).abs() as f64;
                }
                None if other_max.map_or(true, |max| *innovation > max) => excess += 1,
                None => disjoint += 1,
            }
        }

        for innovation in other.connections.keys() {
            if !self.connections.contains_key(innovation) {
                if self_max.map_or(true, |max| *innovation > max) {
                    excess += 1;
                } else {
                    disjoint += 1;
                }
            }
        }

        let genes = self.connections.len().max(other.connections.len());
        let n = if genes < SMALL_GENOME_GENES { 1.0 } else { genes as f64 };
        let mean_weight_difference = if matching > 0 {
            weight_difference / matching as f64
        } else {
            0.0
        };

        config.excess_coefficient * excess as f64 / n
            + config.disjoint_coefficient * disjoint as f64 / n
            + config.weight_coefficient * mean_weight_difference
    }
}

fn sample_gaussian<R: Rng>(rng: &mut R, stdev: f64) -> f32 {
    match Normal::new(0.0, stdev) {
        Ok(normal) => normal.sample(rng) as f32,
        Err(_) => 0.0,
    }
}

/// New value for a weight or bias, or `None` if it is left alone.
fn mutate_value<R: Rng>(value: f32, config: &GenomeConfig, rng: &mut R) -> Option<f32> {
    if !rng.gen_bool(config.weight_mutate_rate) {
        return None;
    }
    if rng.gen_bool(config.weight_replace_rate) {
        Some(sample_gaussian(rng, config.weight_init_stdev))
    } else {
        Some(value + sample_gaussian(rng, config.weight_mutate_power))
    }
}
