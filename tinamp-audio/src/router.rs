//! Signal router - owns the graph and decides which stages are active
//!
//! Topology: source, then every stage that is both built and enabled in
//! fixed order, then the analysis node, gain and destination.

use crate::engine::AudioCommand;
use crate::graph::{AudioGraph, NodeId, NodeKind, WiringError};
use crate::stages::{ChainLayout, Stage};
use crossbeam_channel::Sender;

pub struct SignalRouter {
    graph: AudioGraph,
    source: NodeId,
    analyser: NodeId,
    gain: NodeId,
    destination: NodeId,
    layout: ChainLayout,
    pending: ChainLayout,
    /// Layout has been pushed to the audio thread at least once
    synced: bool,
    commands: Sender<AudioCommand>,
}

impl SignalRouter {
    /// Create the fixed nodes. The tail (analyser, gain, destination) is
    /// wired once here and never rewired.
    pub fn new(commands: Sender<AudioCommand>) -> Result<Self, WiringError> {
        let mut graph = AudioGraph::new();
        let source = graph.add_node(NodeKind::Source, "source");
        let analyser = graph.add_node(NodeKind::Analyser, "analyser");
        let gain = graph.add_node(NodeKind::Gain, "gain");
        let destination = graph.add_node(NodeKind::Destination, "destination");
        graph.connect(analyser, gain)?;
        graph.connect(gain, destination)?;

        Ok(Self {
            graph,
            source,
            analyser,
            gain,
            destination,
            layout: ChainLayout::empty(),
            pending: ChainLayout::empty(),
            synced: false,
            commands,
        })
    }

    pub fn graph(&self) -> &AudioGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut AudioGraph {
        &mut self.graph
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn analyser(&self) -> NodeId {
        self.analyser
    }

    pub fn gain(&self) -> NodeId {
        self.gain
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// Layout from the last `connect`
    pub fn layout(&self) -> ChainLayout {
        self.layout
    }

    /// Stages switched on but not built yet at the last `connect`
    pub fn pending(&self) -> ChainLayout {
        self.pending
    }

    /// Rebuild the path from the source to the analysis node.
    ///
    /// Enabled stages that are not built yet are skipped with a warning; disabled
    /// stages are left out and their external edges cut. A stage whose
    /// wiring fails is logged and left out. Safe to call repeatedly.
    pub fn connect(&mut self, stages: &mut [&mut dyn Stage]) -> ChainLayout {
        self.graph.disconnect(self.source);
        for stage in stages.iter_mut() {
            stage.disconnect(&mut self.graph);
        }

        stages.sort_by_key(|stage| stage.kind().order());

        let mut layout = ChainLayout::empty();
        let mut pending = ChainLayout::empty();
        let mut upstream = self.source;

        for stage in stages.iter_mut() {
            let kind = stage.kind();
            if !stage.is_enabled() {
                continue;
            }
            let (Some(input), Some(output)) = (stage.input_port(), stage.output_port()) else {
                tracing::warn!(stage = kind.name(), "stage enabled but not built, skipping");
                pending.push(kind);
                continue;
            };

            let wired = self
                .graph
                .connect(upstream, input)
                .and_then(|()| stage.connect(&mut self.graph));
            match wired {
                Ok(()) => {
                    layout.push(kind);
                    upstream = output;
                }
                Err(err) => {
                    tracing::error!(stage = kind.name(), "failed to wire stage: {err}");
                    self.graph.disconnect(upstream);
                }
            }
        }

        self.pending = pending;
        if let Err(err) = self.graph.connect(upstream, self.analyser) {
            tracing::error!("failed to close chain: {err}");
        }

        if layout != self.layout || !self.synced {
            let stages: Vec<_> = layout.iter().map(|k| k.name()).collect();
            tracing::info!(?stages, "audio chain connected");
            if let Err(err) = self.commands.try_send(AudioCommand::SetChain(layout)) {
                tracing::warn!("dropped chain update: {err}");
            } else {
                self.synced = true;
            }
        }
        self.layout = layout;
        layout
    }

    /// Top-level nodes from the source to the destination
    pub fn active_path(&self) -> Vec<NodeId> {
        let mut path = vec![self.source];
        let mut current = self.source;
        while current != self.destination && path.len() <= self.graph.node_count() {
            let Some(next) = self.next_top_level(current) else {
                break;
            };
            path.push(next);
            current = next;
        }
        path
    }

    /// Follow the edge out of `node`, jumping across stage internals
    fn next_top_level(&self, node: NodeId) -> Option<NodeId> {
        if let Some(output) = self.stage_output_of(node) {
            return Some(output);
        }
        self.graph.outputs(node).next().map(|edge| edge.to)
    }

    /// Output port of the stage whose input port is `input`
    fn stage_output_of(&self, input: NodeId) -> Option<NodeId> {
        if self.graph.kind(input) != Some(NodeKind::Port) {
            return None;
        }
        let prefix = self.graph.label(input)?.strip_suffix(".input")?;
        let mut stack = vec![input];
        let mut seen = std::collections::BTreeSet::new();
        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            for edge in self.graph.outputs(node) {
                let is_output = self
                    .graph
                    .label(edge.to)
                    .and_then(|l| l.strip_suffix(".output"))
                    == Some(prefix);
                if is_output {
                    return Some(edge.to);
                }
                stack.push(edge.to);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{EqualizerStage, RetroStage, StageKind};
    use crossbeam_channel::{bounded, Receiver};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Rig {
        router: SignalRouter,
        eq: EqualizerStage,
        retro: RetroStage,
        rx: Receiver<AudioCommand>,
    }

    impl Rig {
        fn new() -> Self {
            let (tx, rx) = bounded(256);
            Self {
                router: SignalRouter::new(tx.clone()).unwrap(),
                eq: EqualizerStage::new(tx.clone()),
                retro: RetroStage::with_rng(tx, StdRng::seed_from_u64(1)),
                rx,
            }
        }

        fn connect(&mut self) -> ChainLayout {
            let mut stages: [&mut dyn Stage; 2] = [&mut self.retro, &mut self.eq];
            self.router.connect(&mut stages)
        }

        fn last_chain(&self) -> Option<ChainLayout> {
            let mut last = None;
            while let Ok(cmd) = self.rx.try_recv() {
                if let AudioCommand::SetChain(layout) = cmd {
                    last = Some(layout);
                }
            }
            last
        }
    }

    #[test]
    fn test_empty_chain_reaches_destination() {
        let mut rig = Rig::new();
        let layout = rig.connect();
        assert!(layout.is_empty());
        let r = &rig.router;
        assert!(r.graph().is_connected(r.source(), r.analyser()));
        assert_eq!(
            r.active_path(),
            vec![r.source(), r.analyser(), r.gain(), r.destination()]
        );
        // unready stages are skipped without wiring anything
        assert_eq!(r.graph().edges().count(), 3);
    }

    #[test]
    fn test_only_enabled_unbuilt_stages_are_pending() {
        let mut rig = Rig::new();
        assert!(rig.eq.is_enabled() && !rig.retro.is_enabled());
        rig.connect();
        assert_eq!(rig.router.pending(), ChainLayout::from_kinds(&[StageKind::Equalizer]));

        rig.eq.build(rig.router.graph_mut(), 48000);
        rig.connect();
        assert!(rig.router.pending().is_empty());
        assert!(!rig.router.pending().contains(StageKind::RetroEffect));
    }

    #[test]
    fn test_order_is_fixed() {
        let mut rig = Rig::new();
        rig.eq.build(rig.router.graph_mut(), 48000);
        rig.retro.set_sample_rate(rig.router.graph_mut(), 48000);
        rig.retro.toggle(rig.router.graph_mut());

        let layout = rig.connect();
        let kinds: Vec<_> = layout.iter().collect();
        assert_eq!(kinds, vec![StageKind::Equalizer, StageKind::RetroEffect]);

        let r = &rig.router;
        let path = r.active_path();
        let eq_in = rig.eq.input_port().unwrap();
        let eq_out = rig.eq.output_port().unwrap();
        let retro_in = rig.retro.input_port().unwrap();
        let retro_out = rig.retro.output_port().unwrap();
        assert_eq!(
            path,
            vec![
                r.source(),
                eq_in,
                eq_out,
                retro_in,
                retro_out,
                r.analyser(),
                r.gain(),
                r.destination()
            ]
        );
        assert_eq!(rig.last_chain(), Some(layout));
    }

    #[test]
    fn test_disabled_stage_is_left_out() {
        let mut rig = Rig::new();
        rig.eq.build(rig.router.graph_mut(), 48000);
        rig.retro.set_sample_rate(rig.router.graph_mut(), 48000);
        rig.retro.toggle(rig.router.graph_mut());
        rig.connect();

        rig.retro.toggle(rig.router.graph_mut());
        let layout = rig.connect();
        assert_eq!(layout, ChainLayout::from_kinds(&[StageKind::Equalizer]));

        let r = &rig.router;
        let eq_out = rig.eq.output_port().unwrap();
        assert!(r.graph().is_connected(eq_out, r.analyser()));
        let retro_out = rig.retro.output_port().unwrap();
        assert_eq!(r.graph().outputs(retro_out).count(), 0);
        assert!(!r.graph().reaches(r.source(), rig.retro.input_port().unwrap()));
    }

    #[test]
    fn test_reconnect_is_stable() {
        let mut rig = Rig::new();
        rig.eq.build(rig.router.graph_mut(), 44100);
        rig.connect();
        let edges = rig.router.graph().edge_set();
        assert!(rig.last_chain().is_some());

        rig.connect();
        rig.connect();
        assert_eq!(rig.router.graph().edge_set(), edges);
        // unchanged layouts are not resent
        assert_eq!(rig.last_chain(), None);
    }

    #[test]
    fn test_retro_toggle_twice_restores_topology() {
        let mut rig = Rig::new();
        rig.eq.build(rig.router.graph_mut(), 44100);
        rig.retro.set_sample_rate(rig.router.graph_mut(), 44100);
        rig.retro.toggle(rig.router.graph_mut());
        rig.retro.toggle(rig.router.graph_mut());
        rig.connect();
        let before = rig.router.graph().edge_set();

        rig.retro.toggle(rig.router.graph_mut());
        rig.connect();
        rig.retro.toggle(rig.router.graph_mut());
        rig.connect();
        assert_eq!(rig.router.graph().edge_set(), before);
    }

    #[test]
    fn test_gain_always_feeds_destination() {
        let mut rig = Rig::new();
        rig.eq.build(rig.router.graph_mut(), 44100);
        for _ in 0..3 {
            rig.connect();
            let r = &rig.router;
            assert!(r.graph().is_connected(r.gain(), r.destination()));
            assert!(r.graph().reaches(r.source(), r.destination()));
            rig.eq.set_enabled(rig.router.graph_mut(), !rig.eq.is_enabled());
        }
    }
}
