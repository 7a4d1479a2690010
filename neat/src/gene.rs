use serde::{Deserialize, Serialize};

use crate::activation::Activation;

pub type NodeId = u32;
pub type Innovation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Input,
    Hidden,
    Output,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Unused for input nodes.
    pub bias: f32,
    pub activation: Activation,
}

impl NodeGene {
    pub fn input(id: NodeId) -> Self {
        Self {
            id,
            kind: NodeKind::Input,
            bias: 0.0,
            activation: Activation::Identity,
        }
    }

    pub fn new(id: NodeId, kind: NodeKind, activation: Activation) -> Self {
        Self {
            id,
            kind,
            bias: 0.0,
            activation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    pub innovation: Innovation,
    pub input: NodeId,
    pub output: NodeId,
    pub weight: f32,
    pub enabled: bool,
}
