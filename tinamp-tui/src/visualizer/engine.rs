//! Visualizer state machine and frame loop
//!
//! The engine is `Idle` until playback starts while the panel is visible.
//! While `Running` each frame samples the analysis tap, runs beat
//! detection, renders the active mode and asks the scheduler for the next
//! frame. Stopping cancels the pending frame, and a frame whose token is
//! not the pending one is ignored, so nothing renders after a stop.

use std::time::{Duration, Instant};

use tinamp_analysis::{
    bass_energy, AnalysisError, AnalysisTap, BeatDetector, DEFAULT_FFT_SIZE, DEFAULT_SMOOTHING,
};
use tracing::debug;

use super::canvas::{PixelCanvas, BACKGROUND};
use super::modes::VisualizerMode;

/// How long a fired beat keeps the indicator lit
pub const BEAT_FLASH_MS: f64 = 100.0;

/// Handle for one scheduled frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameToken(u64);

/// Host display-refresh callback
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameToken;
    fn cancel_frame(&mut self, token: FrameToken);
}

/// Fires at most one pending frame once its interval has elapsed
#[derive(Debug)]
pub struct IntervalScheduler {
    interval: Duration,
    origin: Instant,
    pending: Option<(FrameToken, Instant)>,
    next_id: u64,
}

impl IntervalScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            origin: Instant::now(),
            pending: None,
            next_id: 0,
        }
    }

    /// Scheduler ticking at `fps` frames per second
    pub fn with_frame_rate(fps: u32) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / fps.max(1) as f64))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending frame if it is due at `now`
    pub fn poll(&mut self, now: Instant) -> Option<FrameToken> {
        match self.pending {
            Some((token, due)) if now >= due => {
                self.pending = None;
                Some(token)
            }
            _ => None,
        }
    }

    /// Milliseconds since the scheduler was created
    pub fn elapsed_ms(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.origin).as_secs_f64() * 1000.0
    }
}

impl FrameScheduler for IntervalScheduler {
    fn request_frame(&mut self) -> FrameToken {
        let token = FrameToken(self.next_id);
        self.next_id += 1;
        self.pending = Some((token, Instant::now() + self.interval));
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        if matches!(self.pending, Some((pending, _)) if pending == token) {
            self.pending = None;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualizerState {
    Idle,
    Running,
}

pub struct VisualizerEngine<S> {
    scheduler: S,
    state: VisualizerState,
    panel_visible: bool,
    pending: Option<FrameToken>,
    mode: VisualizerMode,
    canvas: PixelCanvas,
    frequency: Vec<u8>,
    time_domain: Vec<u8>,
    beat: BeatDetector,
    flash_until_ms: Option<f64>,
    fft_size: usize,
    smoothing: f32,
}

impl<S: FrameScheduler> VisualizerEngine<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            state: VisualizerState::Idle,
            panel_visible: true,
            pending: None,
            mode: VisualizerMode::default(),
            canvas: PixelCanvas::default(),
            frequency: Vec::new(),
            time_domain: Vec::new(),
            beat: BeatDetector::new(),
            flash_until_ms: None,
            fft_size: DEFAULT_FFT_SIZE,
            smoothing: DEFAULT_SMOOTHING,
        }
    }

    /// Override the transform size and smoothing applied on start
    pub fn with_analysis(mut self, fft_size: usize, smoothing: f32) -> Self {
        self.fft_size = fft_size;
        self.smoothing = smoothing;
        self
    }

    pub fn state(&self) -> VisualizerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == VisualizerState::Running
    }

    pub fn panel_visible(&self) -> bool {
        self.panel_visible
    }

    pub fn mode(&self) -> VisualizerMode {
        self.mode
    }

    pub fn canvas(&self) -> &PixelCanvas {
        &self.canvas
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Latest byte frequency data, for widgets that share the frame
    pub fn frequency_data(&self) -> &[u8] {
        &self.frequency
    }

    /// Begin rendering. Returns `Ok(false)` while the panel is hidden.
    pub fn start(&mut self, tap: &mut dyn AnalysisTap) -> Result<bool, AnalysisError> {
        if !self.panel_visible {
            return Ok(false);
        }
        if self.is_running() {
            return Ok(true);
        }

        tap.set_fft_size(self.fft_size)?;
        tap.set_smoothing(self.smoothing);
        let bins = tap.bin_count();
        self.frequency = vec![0; bins];
        self.time_domain = vec![128; bins];

        self.state = VisualizerState::Running;
        self.pending = Some(self.scheduler.request_frame());
        debug!(mode = self.mode.name(), bins, "visualizer started");
        Ok(true)
    }

    pub fn stop(&mut self) {
        if let Some(token) = self.pending.take() {
            self.scheduler.cancel_frame(token);
        }
        if self.is_running() {
            debug!("visualizer stopped");
        }
        self.state = VisualizerState::Idle;
    }

    /// Show the panel, resuming if playback is in progress
    pub fn show_panel(&mut self, playing: bool, tap: &mut dyn AnalysisTap) -> Result<bool, AnalysisError> {
        self.panel_visible = true;
        if playing {
            self.start(tap)
        } else {
            Ok(false)
        }
    }

    pub fn hide_panel(&mut self) {
        self.panel_visible = false;
        self.stop();
    }

    pub fn toggle_panel(&mut self, playing: bool, tap: &mut dyn AnalysisTap) -> Result<bool, AnalysisError> {
        if self.panel_visible {
            self.hide_panel();
            Ok(false)
        } else {
            self.show_panel(playing, tap)
        }
    }

    /// Run one frame. Returns whether anything was rendered.
    pub fn on_frame(&mut self, token: FrameToken, tap: &mut dyn AnalysisTap, now_ms: f64) -> bool {
        if self.pending != Some(token) {
            return false;
        }
        self.pending = None;
        if !self.is_running() || !self.panel_visible {
            return false;
        }

        tap.frequency_data(&mut self.frequency);
        tap.time_domain_data(&mut self.time_domain);

        if self.beat.process(bass_energy(&self.frequency), now_ms) {
            self.flash_until_ms = Some(now_ms + BEAT_FLASH_MS);
        }

        if self.mode.clears_background() {
            self.canvas.clear(BACKGROUND);
        }
        self.mode
            .render(&mut self.canvas, &self.frequency, &self.time_domain, now_ms / 1000.0);

        self.pending = Some(self.scheduler.request_frame());
        true
    }

    /// Whether the beat indicator is lit at `now_ms`
    pub fn beat_active(&self, now_ms: f64) -> bool {
        self.flash_until_ms.is_some_and(|until| now_ms < until)
    }

    pub fn set_mode(&mut self, mode: VisualizerMode) {
        if mode != self.mode {
            self.mode = mode;
            self.canvas.clear(BACKGROUND);
            debug!(mode = mode.name(), "visualizer mode changed");
        }
    }

    pub fn cycle_mode(&mut self) -> VisualizerMode {
        self.set_mode(self.mode.next());
        self.mode
    }
}

impl VisualizerEngine<IntervalScheduler> {
    /// Drive the engine from the UI loop
    pub fn tick(&mut self, tap: &mut dyn AnalysisTap, now: Instant) -> bool {
        let now_ms = self.scheduler.elapsed_ms(now);
        match self.scheduler.poll(now) {
            Some(token) => self.on_frame(token, tap, now_ms),
            None => false,
        }
    }

    pub fn beat_active_at(&self, now: Instant) -> bool {
        self.beat_active(self.scheduler.elapsed_ms(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records requests and cancellations, fires only on demand
    #[derive(Default)]
    struct ManualScheduler {
        pending: Option<FrameToken>,
        next_id: u64,
        requested: usize,
        cancelled: usize,
    }

    impl ManualScheduler {
        fn fire(&mut self) -> Option<FrameToken> {
            self.pending.take()
        }
    }

    impl FrameScheduler for ManualScheduler {
        fn request_frame(&mut self) -> FrameToken {
            let token = FrameToken(self.next_id);
            self.next_id += 1;
            self.requested += 1;
            self.pending = Some(token);
            token
        }

        fn cancel_frame(&mut self, token: FrameToken) {
            if self.pending == Some(token) {
                self.pending = None;
                self.cancelled += 1;
            }
        }
    }

    /// Tap returning a constant level, counts reads
    struct FakeTap {
        fft_size: usize,
        smoothing: f32,
        level: u8,
        reads: usize,
    }

    impl FakeTap {
        fn new(level: u8) -> Self {
            Self {
                fft_size: 256,
                smoothing: 0.0,
                level,
                reads: 0,
            }
        }
    }

    impl AnalysisTap for FakeTap {
        fn fft_size(&self) -> usize {
            self.fft_size
        }

        fn sample_rate(&self) -> u32 {
            44100
        }

        fn set_fft_size(&mut self, size: usize) -> Result<(), AnalysisError> {
            self.fft_size = size;
            Ok(())
        }

        fn set_smoothing(&mut self, smoothing: f32) {
            self.smoothing = smoothing;
        }

        fn frequency_data(&mut self, out: &mut [u8]) {
            self.reads += 1;
            out.fill(self.level);
        }

        fn time_domain_data(&mut self, out: &mut [u8]) {
            out.fill(128);
        }
    }

    fn make_engine() -> VisualizerEngine<ManualScheduler> {
        VisualizerEngine::new(ManualScheduler::default())
    }

    fn run_frame(engine: &mut VisualizerEngine<ManualScheduler>, tap: &mut FakeTap, now_ms: f64) -> bool {
        match engine.scheduler_mut().fire() {
            Some(token) => engine.on_frame(token, tap, now_ms),
            None => false,
        }
    }

    #[test]
    fn test_starts_idle_with_panel_visible() {
        let engine = make_engine();
        assert_eq!(engine.state(), VisualizerState::Idle);
        assert!(engine.panel_visible());
        assert_eq!(engine.scheduler().requested, 0);
    }

    #[test]
    fn test_start_configures_tap() {
        let mut engine = make_engine();
        let mut tap = FakeTap::new(0);
        assert!(engine.start(&mut tap).unwrap());
        assert_eq!(tap.fft_size, 2048);
        assert!((tap.smoothing - 0.6).abs() < 1e-6);
        assert_eq!(engine.frequency_data().len(), 1024);
        assert_eq!(engine.scheduler().requested, 1);
    }

    #[test]
    fn test_analysis_override() {
        let mut engine = make_engine().with_analysis(512, 0.8);
        let mut tap = FakeTap::new(0);
        engine.start(&mut tap).unwrap();
        assert_eq!(tap.fft_size, 512);
        assert_eq!(engine.frequency_data().len(), 256);
    }

    #[test]
    fn test_start_twice_schedules_once() {
        let mut engine = make_engine();
        let mut tap = FakeTap::new(0);
        engine.start(&mut tap).unwrap();
        engine.start(&mut tap).unwrap();
        assert_eq!(engine.scheduler().requested, 1);
    }

    #[test]
    fn test_frames_reschedule_while_running() {
        let mut engine = make_engine();
        let mut tap = FakeTap::new(50);
        engine.start(&mut tap).unwrap();
        for i in 0..5 {
            assert!(run_frame(&mut engine, &mut tap, i as f64 * 16.0));
        }
        assert_eq!(tap.reads, 5);
        assert_eq!(engine.scheduler().requested, 6);
    }

    #[test]
    fn test_no_frame_after_stop() {
        let mut engine = make_engine();
        let mut tap = FakeTap::new(50);
        engine.start(&mut tap).unwrap();
        run_frame(&mut engine, &mut tap, 0.0);
        engine.stop();

        assert_eq!(engine.scheduler().cancelled, 1);
        assert!(!run_frame(&mut engine, &mut tap, 16.0));
        assert_eq!(tap.reads, 1);
    }

    #[test]
    fn test_stale_token_is_ignored() {
        let mut engine = make_engine();
        let mut tap = FakeTap::new(50);
        engine.start(&mut tap).unwrap();
        let stale = engine.scheduler_mut().fire().unwrap();
        engine.stop();
        engine.start(&mut tap).unwrap();

        assert!(!engine.on_frame(stale, &mut tap, 0.0));
        assert_eq!(tap.reads, 0);
        assert!(run_frame(&mut engine, &mut tap, 0.0));
    }

    #[test]
    fn test_hidden_panel_blocks_start() {
        let mut engine = make_engine();
        let mut tap = FakeTap::new(0);
        engine.hide_panel();
        assert!(!engine.start(&mut tap).unwrap());
        assert_eq!(engine.state(), VisualizerState::Idle);

        assert!(!engine.show_panel(false, &mut tap).unwrap());
        assert_eq!(engine.state(), VisualizerState::Idle);
        assert!(engine.show_panel(true, &mut tap).unwrap());
        assert!(engine.is_running());
    }

    #[test]
    fn test_hide_panel_cancels_frame() {
        let mut engine = make_engine();
        let mut tap = FakeTap::new(0);
        engine.start(&mut tap).unwrap();
        engine.hide_panel();
        assert_eq!(engine.state(), VisualizerState::Idle);
        assert!(engine.scheduler().pending.is_none());
    }

    #[test]
    fn test_beat_flash_lasts_100ms() {
        let mut engine = make_engine();
        let mut quiet = FakeTap::new(10);
        engine.start(&mut quiet).unwrap();
        for i in 0..10 {
            run_frame(&mut engine, &mut quiet, i as f64);
        }

        // the detector needs 200ms since its last beat before firing again
        let mut loud = FakeTap::new(250);
        let t = 1000.0;
        assert!(run_frame(&mut engine, &mut loud, t));
        assert!(engine.beat_active(t + 50.0));
        assert!(!engine.beat_active(t + 100.0));
    }

    #[test]
    fn test_mode_change_clears_canvas() {
        let mut engine = make_engine();
        let mut tap = FakeTap::new(200);
        engine.start(&mut tap).unwrap();
        run_frame(&mut engine, &mut tap, 0.0);
        assert!(engine.canvas().count_not(BACKGROUND) > 0);

        assert_eq!(engine.cycle_mode(), VisualizerMode::Waterfall);
        assert_eq!(engine.canvas().count_not(BACKGROUND), 0);
    }

    #[test]
    fn test_interval_scheduler_fires_when_due() {
        let mut scheduler = IntervalScheduler::with_frame_rate(30);
        let token = scheduler.request_frame();
        assert_eq!(scheduler.poll(Instant::now() + Duration::from_secs(1)), Some(token));
        assert_eq!(scheduler.poll(Instant::now() + Duration::from_secs(2)), None);
    }

    #[test]
    fn test_interval_scheduler_cancel() {
        let mut scheduler = IntervalScheduler::new(Duration::from_millis(10));
        let token = scheduler.request_frame();
        scheduler.cancel_frame(token);
        assert!(!scheduler.is_pending());
        assert_eq!(scheduler.poll(Instant::now() + Duration::from_secs(1)), None);
    }
}
