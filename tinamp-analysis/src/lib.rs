//! Audio analysis for Tinamp
//!
//! Provides the analysis tap contract consumed by the visualizer, an
//! FFT analyser producing byte-scaled frequency and time-domain data,
//! threshold-relative beat detection and the smoothed band meter used
//! by the mini spectrum.

mod analyser;
mod bands;
mod beat;

pub use analyser::{
    AnalysisError, AnalysisTap, Analyser, DEFAULT_FFT_SIZE, DEFAULT_SMOOTHING, MAX_DECIBELS,
    MIN_DECIBELS,
};
pub use bands::{BandMeter, BAND_COUNT, BAND_RANGES};
pub use beat::{bass_energy, BeatDetector, BEAT_HISTORY, BEAT_MIN_INTERVAL_MS, BEAT_THRESHOLD};
