//! Retro stage - AM radio coloration behind two stable ports
//!
//! Built lazily the first time it is switched on, once the output sample
//! rate is known. The processor (distortion table, noise loop) is
//! allocated here on the control thread and shipped to the audio thread.

use super::{Stage, StageKind};
use crate::dsp::{Effect, RetroEffect};
use crate::engine::AudioCommand;
use crate::graph::{AudioGraph, NodeId, NodeKind, WiringError};
use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Appended to the track title while the effect is on
pub const AM_RADIO_SUFFIX: &str = " [AM RADIO]";

#[derive(Debug, Clone, Copy)]
struct RetroNodes {
    input: NodeId,
    output: NodeId,
    splitter: NodeId,
    merger: NodeId,
    highpass: NodeId,
    lowpass: NodeId,
    shaper: NodeId,
    compressor: NodeId,
    noise: NodeId,
    noise_gain: NodeId,
    mixer: NodeId,
}

impl RetroNodes {
    fn create(graph: &mut AudioGraph) -> Self {
        Self {
            input: graph.add_node(NodeKind::Port, "retro.input"),
            output: graph.add_node(NodeKind::Port, "retro.output"),
            splitter: graph.add_node(NodeKind::Splitter, "retro.splitter"),
            merger: graph.add_node(NodeKind::Merger, "retro.merger"),
            highpass: graph.add_node(NodeKind::Filter, "retro.highpass"),
            lowpass: graph.add_node(NodeKind::Filter, "retro.lowpass"),
            shaper: graph.add_node(NodeKind::WaveShaper, "retro.shaper"),
            compressor: graph.add_node(NodeKind::Compressor, "retro.compressor"),
            noise: graph.add_node(NodeKind::NoiseSource, "retro.noise"),
            noise_gain: graph.add_node(NodeKind::Gain, "retro.noise_gain"),
            mixer: graph.add_node(NodeKind::Mixer, "retro.mixer"),
        }
    }

    /// Every node with outgoing internal edges
    fn internal(&self) -> [NodeId; 10] {
        [
            self.input,
            self.splitter,
            self.merger,
            self.highpass,
            self.lowpass,
            self.shaper,
            self.compressor,
            self.noise,
            self.noise_gain,
            self.mixer,
        ]
    }
}

pub struct RetroStage {
    enabled: bool,
    nodes: Option<RetroNodes>,
    /// Internal chain has been wired at least once
    wired: bool,
    sample_rate: Option<u32>,
    rng: StdRng,
    commands: Sender<AudioCommand>,
}

impl RetroStage {
    pub fn new(commands: Sender<AudioCommand>) -> Self {
        Self::with_rng(commands, StdRng::from_entropy())
    }

    /// Use a fixed generator for the noise bed
    pub fn with_rng(commands: Sender<AudioCommand>, rng: StdRng) -> Self {
        Self {
            enabled: false,
            nodes: None,
            wired: false,
            sample_rate: None,
            rng,
            commands,
        }
    }

    pub fn is_built(&self) -> bool {
        self.nodes.is_some()
    }

    /// Record the output rate. Builds the stage if it was switched on
    /// before the engine was ready.
    pub fn set_sample_rate(&mut self, graph: &mut AudioGraph, sample_rate: u32) {
        self.sample_rate = Some(sample_rate);
        if self.enabled && self.nodes.is_none() {
            self.build(graph, sample_rate);
        }
    }

    /// Flip the effect and return the new state
    pub fn toggle(&mut self, graph: &mut AudioGraph) -> bool {
        self.set_enabled(graph, !self.enabled);
        self.enabled
    }

    pub fn set_enabled(&mut self, graph: &mut AudioGraph, enabled: bool) {
        self.enabled = enabled;

        if self.nodes.is_none() {
            match (enabled, self.sample_rate) {
                (true, Some(sample_rate)) => self.build(graph, sample_rate),
                (true, None) => tracing::debug!("retro enabled before output is ready"),
                (false, _) => {}
            }
            return;
        }

        self.wire_or_bypass(graph);
        self.send(AudioCommand::SetRetroEnabled(enabled));
        tracing::info!(enabled, "retro mode toggled");
    }

    /// Wire the internal chain once. Later calls are no-ops.
    pub fn ensure_connection(&mut self, graph: &mut AudioGraph) {
        if self.nodes.is_some() && !self.wired {
            self.wire_or_bypass(graph);
            self.wired = true;
        }
    }

    /// Track title as displayed, tagged while the effect is on
    pub fn decorate_title(&self, title: &str) -> String {
        let base = title.strip_suffix(AM_RADIO_SUFFIX).unwrap_or(title);
        if self.enabled {
            format!("{base}{AM_RADIO_SUFFIX}")
        } else {
            base.to_string()
        }
    }

    fn build(&mut self, graph: &mut AudioGraph, sample_rate: u32) {
        let nodes = RetroNodes::create(graph);
        self.nodes = Some(nodes);

        let mut effect = RetroEffect::new(sample_rate, &mut self.rng);
        effect.set_enabled(self.enabled);
        self.send(AudioCommand::InstallRetro(Box::new(effect)));

        self.wire_or_bypass(graph);
        self.wired = true;
        tracing::info!(sample_rate, "retro stage built");
    }

    fn wire_or_bypass(&mut self, graph: &mut AudioGraph) {
        let Some(nodes) = self.nodes else {
            return;
        };
        if let Err(err) = self.wire_internal(graph, nodes) {
            tracing::error!("retro wiring failed, bypassing: {err}");
            Self::clear_internal(graph, nodes);
            if let Err(err) = graph.connect(nodes.input, nodes.output) {
                tracing::error!("retro bypass failed: {err}");
            }
        }
    }

    fn wire_internal(&self, graph: &mut AudioGraph, n: RetroNodes) -> Result<(), WiringError> {
        Self::clear_internal(graph, n);
        if !self.enabled {
            return graph.connect(n.input, n.output);
        }

        // Fold both channels into one
        graph.connect(n.input, n.splitter)?;
        graph.connect_ports(n.splitter, 0, n.merger, 0)?;
        graph.connect_ports(n.splitter, 1, n.merger, 0)?;

        graph.connect(n.merger, n.highpass)?;
        graph.connect(n.highpass, n.lowpass)?;
        graph.connect(n.lowpass, n.shaper)?;
        graph.connect(n.shaper, n.compressor)?;
        graph.connect(n.compressor, n.mixer)?;

        graph.connect(n.noise, n.noise_gain)?;
        graph.connect(n.noise_gain, n.mixer)?;

        graph.connect(n.mixer, n.output)
    }

    fn clear_internal(graph: &mut AudioGraph, nodes: RetroNodes) {
        for node in nodes.internal() {
            graph.disconnect(node);
        }
    }

    fn send(&self, cmd: AudioCommand) {
        if let Err(err) = self.commands.try_send(cmd) {
            tracing::warn!("dropped retro command: {err}");
        }
    }
}

impl Stage for RetroStage {
    fn kind(&self) -> StageKind {
        StageKind::RetroEffect
    }

    fn input_port(&self) -> Option<NodeId> {
        self.nodes.map(|n| n.input)
    }

    fn output_port(&self) -> Option<NodeId> {
        self.nodes.map(|n| n.output)
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn connect(&mut self, graph: &mut AudioGraph) -> Result<(), WiringError> {
        self.ensure_connection(graph);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineState;
    use crossbeam_channel::{bounded, Receiver};

    fn stage() -> (RetroStage, Receiver<AudioCommand>, AudioGraph) {
        let (tx, rx) = bounded(64);
        let stage = RetroStage::with_rng(tx, StdRng::seed_from_u64(7));
        (stage, rx, AudioGraph::new())
    }

    #[test]
    fn test_starts_off_and_unbuilt() {
        let (retro, _rx, _graph) = stage();
        assert!(!retro.is_enabled());
        assert!(!retro.is_ready());
        assert_eq!(retro.decorate_title("Song"), "Song");
    }

    #[test]
    fn test_first_enable_builds_once_rate_known() {
        let (mut retro, rx, mut graph) = stage();
        assert!(retro.toggle(&mut graph));
        assert!(!retro.is_built());
        assert_eq!(graph.node_count(), 0);

        retro.set_sample_rate(&mut graph, 44100);
        assert!(retro.is_built());

        let mut engine = EngineState::new(44100);
        while let Ok(cmd) = rx.try_recv() {
            engine.handle_command(cmd);
        }
        assert!(engine.retro().is_some_and(|r| r.is_enabled() && r.noise_playing()));
    }

    #[test]
    fn test_enabled_chain_runs_through_processing() {
        let (mut retro, _rx, mut graph) = stage();
        retro.set_sample_rate(&mut graph, 44100);
        retro.toggle(&mut graph);
        let (Some(input), Some(output)) = (retro.input_port(), retro.output_port()) else {
            panic!("stage not built");
        };
        assert!(graph.reaches(input, output));
        assert!(!graph.is_connected(input, output));
        // splitter feeds the merger twice
        assert_eq!(graph.edges().count(), 11);
    }

    #[test]
    fn test_toggle_twice_restores_edges() {
        let (mut retro, rx, mut graph) = stage();
        retro.set_sample_rate(&mut graph, 44100);
        retro.toggle(&mut graph);
        retro.toggle(&mut graph);
        let bypassed = graph.edge_set();
        assert_eq!(bypassed.len(), 1);

        retro.toggle(&mut graph);
        retro.toggle(&mut graph);
        assert_eq!(graph.edge_set(), bypassed);

        let mut engine = EngineState::new(44100);
        while let Ok(cmd) = rx.try_recv() {
            engine.handle_command(cmd);
        }
        assert!(engine.retro().is_some_and(|r| !r.is_enabled() && !r.noise_playing()));
    }

    #[test]
    fn test_ensure_connection_is_idempotent() {
        let (mut retro, _rx, mut graph) = stage();
        retro.set_sample_rate(&mut graph, 48000);
        retro.toggle(&mut graph);
        let before = graph.edge_set();
        retro.ensure_connection(&mut graph);
        retro.connect(&mut graph).unwrap();
        assert_eq!(graph.edge_set(), before);
    }

    #[test]
    fn test_title_suffix() {
        let (mut retro, _rx, mut graph) = stage();
        retro.set_sample_rate(&mut graph, 48000);
        retro.toggle(&mut graph);
        assert_eq!(retro.decorate_title("Song"), "Song [AM RADIO]");
        assert_eq!(retro.decorate_title("Song [AM RADIO]"), "Song [AM RADIO]");
        retro.toggle(&mut graph);
        assert_eq!(retro.decorate_title("Song [AM RADIO]"), "Song");
    }
}
