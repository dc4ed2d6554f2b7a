//! Topology model of the signal graph
//!
//! Nodes are processing points; edges join one output port to one input
//! port. An output port feeds at most one target, while inputs may sum
//! any number of sources. The audio thread never reads this model: it
//! only receives the chain layout derived from it.

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// What a node does in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Source,
    /// Passthrough node feeding the analysis tap
    Analyser,
    Gain,
    Destination,
    /// External input or output of a stage
    Port,
    Filter,
    Splitter,
    Merger,
    WaveShaper,
    Compressor,
    NoiseSource,
    Mixer,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub from: NodeId,
    pub output: u8,
    pub to: NodeId,
    pub input: u8,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WiringError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("output {output} of {node:?} already feeds another node")]
    PortBusy { node: NodeId, output: u8 },
    #[error("cannot connect {0:?} to itself")]
    SelfLoop(NodeId),
}

#[derive(Debug, Default, Clone)]
pub struct AudioGraph {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeSet<Edge>,
    next_id: u32,
}

impl AudioGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, kind: NodeKind, label: &'static str) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node { kind, label });
        id
    }

    /// Remove a node along with every edge touching it
    pub fn remove_node(&mut self, id: NodeId) {
        self.nodes.remove(&id);
        self.edges.retain(|e| e.from != id && e.to != id);
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&id).map(|n| n.kind)
    }

    pub fn label(&self, id: NodeId) -> Option<&'static str> {
        self.nodes.get(&id).map(|n| n.label)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Connect output 0 of `from` to input 0 of `to`
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), WiringError> {
        self.connect_ports(from, 0, to, 0)
    }

    /// Connect a specific output to a specific input.
    ///
    /// Repeating an existing connection is a no-op.
    pub fn connect_ports(
        &mut self,
        from: NodeId,
        output: u8,
        to: NodeId,
        input: u8,
    ) -> Result<(), WiringError> {
        for id in [from, to] {
            if !self.contains(id) {
                return Err(WiringError::UnknownNode(id));
            }
        }
        if from == to {
            return Err(WiringError::SelfLoop(from));
        }

        let edge = Edge {
            from,
            output,
            to,
            input,
        };
        if self.edges.contains(&edge) {
            return Ok(());
        }
        if self.edges.iter().any(|e| e.from == from && e.output == output) {
            return Err(WiringError::PortBusy { node: from, output });
        }

        self.edges.insert(edge);
        Ok(())
    }

    /// Drop every outgoing edge of `from`
    pub fn disconnect(&mut self, from: NodeId) {
        self.edges.retain(|e| e.from != from);
    }

    pub fn outputs(&self, from: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |e| e.from == from)
    }

    pub fn inputs(&self, to: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |e| e.to == to)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter()
    }

    /// Snapshot of the current connectivity
    pub fn edge_set(&self) -> BTreeSet<Edge> {
        self.edges.clone()
    }

    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.iter().any(|e| e.from == from && e.to == to)
    }

    /// Whether signal leaving `from` can arrive at `to`
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack = vec![from];
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if !seen.insert(node) {
                continue;
            }
            stack.extend(self.outputs(node).map(|e| e.to));
        }
        false
    }
}
