//! Equalizer stage - ten peaking filters between two stable ports

use super::{Stage, StageKind};
use crate::dsp::{Effect, Equalizer, EQ_BANDS, EQ_MAX_GAIN_DB};
use crate::engine::AudioCommand;
use crate::graph::{AudioGraph, NodeId, NodeKind, WiringError};
use crossbeam_channel::Sender;

/// Built-in gain curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EqPreset {
    Flat,
    Rock,
    Pop,
    Jazz,
    Classical,
    Bass,
    Treble,
}

impl EqPreset {
    pub const ALL: [EqPreset; 7] = [
        EqPreset::Flat,
        EqPreset::Rock,
        EqPreset::Pop,
        EqPreset::Jazz,
        EqPreset::Classical,
        EqPreset::Bass,
        EqPreset::Treble,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EqPreset::Flat => "Flat",
            EqPreset::Rock => "Rock",
            EqPreset::Pop => "Pop",
            EqPreset::Jazz => "Jazz",
            EqPreset::Classical => "Classical",
            EqPreset::Bass => "Bass",
            EqPreset::Treble => "Treble",
        }
    }

    /// Case-insensitive lookup
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Band gains in dB, lowest band first
    pub fn gains(self) -> [f32; EQ_BANDS] {
        match self {
            EqPreset::Flat => [0.0; EQ_BANDS],
            EqPreset::Rock => [5.0, 4.0, -1.0, -2.0, -1.0, 2.0, 4.0, 6.0, 6.0, 6.0],
            EqPreset::Pop => [-1.0, 2.0, 4.0, 4.0, 1.0, -1.0, -2.0, -2.0, -1.0, -1.0],
            EqPreset::Jazz => [4.0, 3.0, 1.0, 2.0, -1.0, -1.0, 0.0, 2.0, 3.0, 4.0],
            EqPreset::Classical => [5.0, 4.0, 3.0, 2.0, -1.0, -1.0, 0.0, 2.0, 4.0, 5.0],
            EqPreset::Bass => [8.0, 6.0, 4.0, 2.0, 1.0, -1.0, -2.0, -3.0, -3.0, -3.0],
            EqPreset::Treble => [-3.0, -3.0, -2.0, -1.0, 1.0, 2.0, 4.0, 6.0, 8.0, 8.0],
        }
    }

    /// Next preset in display order, wrapping
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|&p| p == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

/// What the preset selector shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetLabel {
    Preset(EqPreset),
    /// Gains were edited by hand
    Custom,
}

impl PresetLabel {
    pub fn name(self) -> &'static str {
        match self {
            PresetLabel::Preset(preset) => preset.name(),
            PresetLabel::Custom => "Custom",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct EqNodes {
    input: NodeId,
    output: NodeId,
    bands: [NodeId; EQ_BANDS],
}

pub struct EqualizerStage {
    gains: [f32; EQ_BANDS],
    label: PresetLabel,
    enabled: bool,
    nodes: Option<EqNodes>,
    commands: Sender<AudioCommand>,
}

impl EqualizerStage {
    /// Flat and enabled, not yet built
    pub fn new(commands: Sender<AudioCommand>) -> Self {
        Self {
            gains: [0.0; EQ_BANDS],
            label: PresetLabel::Preset(EqPreset::Flat),
            enabled: true,
            nodes: None,
            commands,
        }
    }

    /// Create the graph nodes and hand a processor to the audio thread.
    /// Does nothing when already built.
    pub fn build(&mut self, graph: &mut AudioGraph, sample_rate: u32) {
        if self.nodes.is_some() {
            return;
        }

        let input = graph.add_node(NodeKind::Port, "eq.input");
        let output = graph.add_node(NodeKind::Port, "eq.output");
        let mut bands = [input; EQ_BANDS];
        for band in bands.iter_mut() {
            *band = graph.add_node(NodeKind::Filter, "eq.band");
        }
        self.nodes = Some(EqNodes {
            input,
            output,
            bands,
        });

        let mut processor = Equalizer::with_gains(sample_rate as f32, &self.gains);
        processor.set_enabled(self.enabled);
        self.send(AudioCommand::InstallEqualizer(Box::new(processor)));
        self.apply_enabled_state(graph);
        tracing::info!(sample_rate, "equalizer stage built");
    }

    pub fn is_built(&self) -> bool {
        self.nodes.is_some()
    }

    pub fn gains(&self) -> [f32; EQ_BANDS] {
        self.gains
    }

    pub fn band_gain(&self, index: usize) -> Option<f32> {
        self.gains.get(index).copied()
    }

    pub fn preset_label(&self) -> PresetLabel {
        self.label
    }

    /// Set one band, clamped to +/- 20 dB. Marks the curve as custom.
    /// Returns the stored gain, or `None` for an out-of-range index.
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) -> Option<f32> {
        let slot = self.gains.get_mut(index)?;
        let gain_db = gain_db.clamp(-EQ_MAX_GAIN_DB, EQ_MAX_GAIN_DB);
        *slot = gain_db;
        self.label = PresetLabel::Custom;
        self.send(AudioCommand::SetEqBandGain(index, gain_db));
        Some(gain_db)
    }

    /// Apply a whole preset in one update
    pub fn load_preset(&mut self, preset: EqPreset) {
        self.gains = preset.gains();
        self.label = PresetLabel::Preset(preset);
        self.send(AudioCommand::SetEqGains(self.gains));
        tracing::debug!(preset = preset.name(), "eq preset loaded");
    }

    /// Returns false for unknown names, leaving the curve untouched
    pub fn load_preset_by_name(&mut self, name: &str) -> bool {
        match EqPreset::from_name(name) {
            Some(preset) => {
                self.load_preset(preset);
                true
            }
            None => {
                tracing::warn!(name, "unknown eq preset");
                false
            }
        }
    }

    /// Advance to the next preset. From a custom curve this starts at Flat.
    pub fn cycle_preset(&mut self) -> EqPreset {
        let next = match self.label {
            PresetLabel::Preset(preset) => preset.next(),
            PresetLabel::Custom => EqPreset::Flat,
        };
        self.load_preset(next);
        next
    }

    pub fn set_enabled(&mut self, graph: &mut AudioGraph, enabled: bool) {
        self.enabled = enabled;
        self.apply_enabled_state(graph);
        self.send(AudioCommand::SetEqEnabled(enabled));
    }

    /// Rewire the inside of the stage: the band cascade when enabled,
    /// a straight input-to-output bypass otherwise. External ports keep
    /// their identity, so upstream and downstream edges are untouched.
    pub fn apply_enabled_state(&mut self, graph: &mut AudioGraph) {
        let Some(nodes) = self.nodes else {
            return;
        };
        if let Err(err) = self.wire_internal(graph, nodes) {
            tracing::error!("equalizer wiring failed, bypassing: {err}");
            Self::clear_internal(graph, nodes);
            if let Err(err) = graph.connect(nodes.input, nodes.output) {
                tracing::error!("equalizer bypass failed: {err}");
            }
        }
    }

    fn wire_internal(&self, graph: &mut AudioGraph, nodes: EqNodes) -> Result<(), WiringError> {
        Self::clear_internal(graph, nodes);
        if !self.enabled {
            return graph.connect(nodes.input, nodes.output);
        }
        let mut previous = nodes.input;
        for &band in &nodes.bands {
            graph.connect(previous, band)?;
            previous = band;
        }
        graph.connect(previous, nodes.output)
    }

    fn clear_internal(graph: &mut AudioGraph, nodes: EqNodes) {
        graph.disconnect(nodes.input);
        for &band in &nodes.bands {
            graph.disconnect(band);
        }
    }

    /// Internal nodes in signal order, empty until built
    pub fn band_nodes(&self) -> Vec<NodeId> {
        self.nodes.map(|n| n.bands.to_vec()).unwrap_or_default()
    }

    fn send(&self, cmd: AudioCommand) {
        if self.nodes.is_none() {
            // Picked up by `build`
            return;
        }
        if let Err(err) = self.commands.try_send(cmd) {
            tracing::warn!("dropped equalizer command: {err}");
        }
    }
}

impl Stage for EqualizerStage {
    fn kind(&self) -> StageKind {
        StageKind::Equalizer
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
        let Some(nodes) = self.nodes else {
            return Ok(());
        };
        if graph.outputs(nodes.input).next().is_none() {
            self.wire_internal(graph, nodes)?;
        }
        Ok(())
    }
}
