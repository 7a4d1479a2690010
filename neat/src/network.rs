use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::{
    activation::Activation,
    error::NetworkError,
    gene::{NodeId, NodeKind},
    genome::Genome,
};

/// How a genome's graph is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkKind {
    /// Single pass in topological order. Fails on cyclic genomes.
    FeedForward,
    /// `steps` synchronous updates starting from a zeroed state on every call.
    Recurrent { steps: usize },
}

#[derive(Debug, Clone)]
struct Neuron {
    bias: f32,
    activation: Activation,
    /// `(source slot, weight)` for every enabled incoming connection.
    incoming: Vec<(usize, f32)>,
}

/// Index-addressed compiled form of a [`Genome`].
///
/// Slots `0..num_inputs` hold the inputs; the remaining slots hold neurons in
/// node-id order.
#[derive(Debug, Clone)]
pub struct Network {
    kind: NetworkKind,
    num_inputs: usize,
    neurons: Vec<Neuron>,
    /// Neuron indices in evaluation order.
    order: Vec<usize>,
    /// Slots of the output nodes.
    outputs: Vec<usize>,
    values: Vec<f32>,
    previous: Vec<f32>,
    output_values: Vec<f32>,
}

impl Network {
    pub fn from_genome(genome: &Genome, kind: NetworkKind) -> Result<Self, NetworkError> {
        let num_inputs = genome.num_inputs();
        if genome.num_outputs() == 0 {
            return Err(NetworkError::NoOutputs);
        }

        let mut slots: BTreeMap<NodeId, usize> = BTreeMap::new();
        let mut neurons = Vec::new();
        for node in genome.nodes() {
            let slot = match node.kind {
                NodeKind::Input => node.id as usize,
                _ => {
                    neurons.push(Neuron {
                        bias: node.bias,
                        activation: node.activation,
                        incoming: Vec::new(),
                    });
                    num_inputs + neurons.len() - 1
                }
            };
            slots.insert(node.id, slot);
        }

        for connection in genome.connections().filter(|c| c.enabled) {
            let lookup = |node: NodeId| {
                slots
                    .get(&node)
                    .copied()
                    .ok_or(NetworkError::UnknownNode {
                        innovation: connection.innovation,
                        node,
                    })
            };
            let source = lookup(connection.input)?;
            let target = lookup(connection.output)?;
            if target < num_inputs {
                continue;
            }
            neurons[target - num_inputs]
                .incoming
                .push((source, connection.weight));
        }

        let order = match kind {
            NetworkKind::FeedForward => topological_order(num_inputs, &neurons)?,
            NetworkKind::Recurrent { .. } => (0..neurons.len()).collect(),
        };

        let outputs = genome
            .output_ids()
            .map(|id| slots.get(&id).copied().ok_or(NetworkError::NoOutputs))
            .collect::<Result<Vec<_>, _>>()?;

        let size = num_inputs + neurons.len();
        Ok(Self {
            kind,
            num_inputs,
            order,
            output_values: vec![0.0; outputs.len()],
            outputs,
            neurons,
            values: vec![0.0; size],
            previous: vec![0.0; size],
        })
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn kind(&self) -> NetworkKind {
        self.kind
    }

    /// Evaluates the network. The result depends only on `inputs`.
    pub fn activate(&mut self, inputs: &[f32]) -> Result<&[f32], NetworkError> {
        if inputs.len() != self.num_inputs {
            return Err(NetworkError::InputArity {
                expected: self.num_inputs,
                actual: inputs.len(),
            });
        }

        self.values.fill(0.0);
        self.values[..self.num_inputs].copy_from_slice(inputs);

        match self.kind {
            NetworkKind::FeedForward => {
                for &index in &self.order {
                    let neuron = &self.neurons[index];
                    let value = fire(neuron, &self.values);
                    self.values[self.num_inputs + index] = value;
                }
            }
            NetworkKind::Recurrent { steps } => {
                for _ in 0..steps.max(1) {
                    self.previous.copy_from_slice(&self.values);
                    for &index in &self.order {
                        let value = fire(&self.neurons[index], &self.previous);
                        self.values[self.num_inputs + index] = value;
                    }
                }
            }
        }

        for (out, &slot) in self.output_values.iter_mut().zip(&self.outputs) {
            *out = self.values[slot];
        }
        Ok(&self.output_values)
    }
}

#[inline(always)]
fn fire(neuron: &Neuron, values: &[f32]) -> f32 {
    let sum = neuron
        .incoming
        .iter()
        .fold(neuron.bias, |acc, &(source, weight)| acc + weight * values[source]);
    neuron.activation.apply(sum)
}

/// Kahn's algorithm over the neuron graph.
fn topological_order(num_inputs: usize, neurons: &[Neuron]) -> Result<Vec<usize>, NetworkError> {
    let mut indegree = vec![0usize; neurons.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); neurons.len()];

    for (index, neuron) in neurons.iter().enumerate() {
        for &(source, _) in &neuron.incoming {
            if source >= num_inputs {
                indegree[index] += 1;
                dependents[source - num_inputs].push(index);
            }
        }
    }

    let mut queue: VecDeque<usize> = (0..neurons.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(neurons.len());

    while let Some(index) = queue.pop_front() {
        order.push(index);
        for &dependent in &dependents[index] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    if order.len() == neurons.len() {
        Ok(order)
    } else {
        Err(NetworkError::Cycle)
    }
}
