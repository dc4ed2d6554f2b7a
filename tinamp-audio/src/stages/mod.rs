//! Optional processing stages inserted between the source and the gain
//!
//! A stage owns its internal sub-graph and exposes one input port and one
//! output port. The router only ever wires those two ports.

mod equalizer;
mod retro;

pub use equalizer::{EqPreset, EqualizerStage, PresetLabel};
pub use retro::{RetroStage, AM_RADIO_SUFFIX};

use crate::graph::{AudioGraph, NodeId, WiringError};

/// Stage identity, in fixed chain order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    Equalizer,
    RetroEffect,
}

impl StageKind {
    pub const COUNT: usize = 2;
    pub const ALL: [StageKind; Self::COUNT] = [StageKind::Equalizer, StageKind::RetroEffect];

    pub fn order(self) -> usize {
        match self {
            StageKind::Equalizer => 0,
            StageKind::RetroEffect => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StageKind::Equalizer => "equalizer",
            StageKind::RetroEffect => "retro",
        }
    }
}

/// Capability set the router needs from an optional stage
pub trait Stage {
    fn kind(&self) -> StageKind;

    /// External input, `None` until the stage is built
    fn input_port(&self) -> Option<NodeId>;

    /// External output, `None` until the stage is built
    fn output_port(&self) -> Option<NodeId>;

    fn is_enabled(&self) -> bool;

    fn is_ready(&self) -> bool {
        self.input_port().is_some() && self.output_port().is_some()
    }

    /// Make sure the internal chain between the ports is wired.
    /// Calling this repeatedly must not duplicate connections.
    fn connect(&mut self, graph: &mut AudioGraph) -> Result<(), WiringError>;

    /// Detach the external output port from whatever it feeds
    fn disconnect(&mut self, graph: &mut AudioGraph) {
        if let Some(output) = self.output_port() {
            graph.disconnect(output);
        }
    }
}

/// Which stages the audio thread runs, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChainLayout {
    slots: [Option<StageKind>; StageKind::COUNT],
    len: usize,
}

impl ChainLayout {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_kinds(kinds: &[StageKind]) -> Self {
        let mut layout = Self::default();
        for &kind in kinds {
            layout.push(kind);
        }
        layout
    }

    /// Append a stage. Out-of-order or repeated kinds are ignored.
    pub fn push(&mut self, kind: StageKind) {
        if self.len >= StageKind::COUNT {
            return;
        }
        if let Some(last) = self.iter().last() {
            if kind.order() <= last.order() {
                return;
            }
        }
        self.slots[self.len] = Some(kind);
        self.len += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = StageKind> + '_ {
        self.slots[..self.len].iter().flatten().copied()
    }

    pub fn contains(&self, kind: StageKind) -> bool {
        self.iter().any(|k| k == kind)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
