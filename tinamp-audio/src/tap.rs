//! Analysis tap between the audio thread and the visualizer
//!
//! The audio callback folds each block to mono and pushes it into a
//! lock-free ring. The UI side drains the ring into an [`Analyser`] right
//! before it reads frequency or waveform data.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tinamp_analysis::{AnalysisError, AnalysisTap, Analyser};

/// Ring capacity in mono samples, about 370 ms at 44.1 kHz
pub const TAP_CAPACITY: usize = 16384;

/// Build a connected writer/reader pair
pub fn tap_channel(capacity: usize) -> (TapWriter, TapReader) {
    let (producer, consumer) = HeapRb::<f32>::new(capacity.max(1)).split();
    (
        TapWriter {
            producer,
            mono: vec![0.0; 4096],
        },
        TapReader {
            consumer,
            scratch: vec![0.0; capacity.max(1)],
        },
    )
}

/// Audio-thread half
pub struct TapWriter {
    producer: HeapProd<f32>,
    /// Pre-allocated fold buffer
    mono: Vec<f32>,
}

impl TapWriter {
    /// Push one interleaved stereo block. Samples that do not fit are dropped.
    pub fn write_stereo(&mut self, block: &[f32]) {
        let frames = block.len() / 2;
        if frames > self.mono.len() {
            self.mono.resize(frames, 0.0);
        }
        for (out, frame) in self.mono.iter_mut().zip(block.chunks_exact(2)) {
            *out = (frame[0] + frame[1]) * 0.5;
        }
        self.producer.push_slice(&self.mono[..frames]);
    }
}

/// UI-thread half
pub struct TapReader {
    consumer: HeapCons<f32>,
    scratch: Vec<f32>,
}

impl TapReader {
    pub fn pending(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Move everything queued so far into `analyser`
    pub fn drain_into(&mut self, analyser: &mut Analyser) -> usize {
        let mut total = 0;
        loop {
            let read = self.consumer.pop_slice(&mut self.scratch);
            if read == 0 {
                break;
            }
            analyser.push_samples(&self.scratch[..read]);
            total += read;
        }
        total
    }
}

/// Analysis tap fed by the live output
pub struct LiveTap {
    reader: TapReader,
    analyser: Analyser,
}

impl LiveTap {
    pub fn new(reader: TapReader, sample_rate: u32) -> Self {
        Self {
            reader,
            analyser: Analyser::new(sample_rate),
        }
    }

    /// Follow an output that came up at a different rate
    pub fn rebind(&mut self, sample_rate: u32) {
        if sample_rate != self.analyser.sample_rate() {
            self.analyser = Analyser::new(sample_rate);
        }
    }

    fn pump(&mut self) {
        self.reader.drain_into(&mut self.analyser);
    }
}

impl AnalysisTap for LiveTap {
    fn fft_size(&self) -> usize {
        self.analyser.fft_size()
    }

    fn sample_rate(&self) -> u32 {
        self.analyser.sample_rate()
    }

    fn set_fft_size(&mut self, size: usize) -> Result<(), AnalysisError> {
        self.analyser.set_fft_size(size)
    }

    fn set_smoothing(&mut self, smoothing: f32) {
        self.analyser.set_smoothing(smoothing);
    }

    fn frequency_data(&mut self, out: &mut [u8]) {
        self.pump();
        self.analyser.frequency_data(out);
    }

    fn time_domain_data(&mut self, out: &mut [u8]) {
        self.pump();
        self.analyser.time_domain_data(out);
    }
}
