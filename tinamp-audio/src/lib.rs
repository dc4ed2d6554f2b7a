//! Audio engine for Tinamp - signal routing, stages and transport
//!
//! This crate provides the playback pipeline:
//! - Graph: topology model the router rewires
//! - Stages: optional equalizer and AM radio processing
//! - Router: keeps the active chain in fixed order
//! - Engine: audio-thread state driven by commands
//! - Player: transport and playlist control on the UI thread

pub mod dsp;
mod engine;
pub mod graph;
mod player;
mod router;
mod source;
pub mod stages;
mod tap;

pub use dsp::{Effect, Equalizer, RetroEffect, EQ_BANDS, EQ_FREQUENCIES};
pub use engine::{
    run_command_loop, AudioCommand, AudioEngine, AudioEvent, EngineError, EngineState,
    STATE_UPDATE_INTERVAL,
};
pub use graph::{AudioGraph, NodeId, NodeKind, WiringError};
pub use player::{
    EngineStatus, PlaybackState, Player, PlayerError, PlayerEvent, NO_TRACK_TITLE,
    RESTART_THRESHOLD_SECS,
};
pub use router::SignalRouter;
pub use source::{SourceState, TrackSource};
pub use stages::{
    ChainLayout, EqPreset, EqualizerStage, PresetLabel, RetroStage, Stage, StageKind,
    AM_RADIO_SUFFIX,
};
pub use tap::{tap_channel, LiveTap, TapReader, TapWriter, TAP_CAPACITY};
