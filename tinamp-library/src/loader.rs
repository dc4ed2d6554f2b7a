//! Whole-file decoding into stereo buffers at the output rate

use std::path::Path;
use rubato::{FftFixedInOut, Resampler};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey};
use symphonia::core::probe::{Hint, ProbeResult};
use thiserror::Error;

/// File extensions accepted by `load`
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["mp3", "flac", "ogg", "wav", "m4a", "aac"];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),
    #[error("file has no audio track")]
    NoAudioTrack,
    #[error("could not decode: {0}")]
    Decode(String),
}

/// Whether `path` carries one of the supported audio extensions
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Track metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Decoded audio held fully in memory
#[derive(Debug, Clone)]
pub struct LoadedTrack {
    /// Interleaved L/R in -1.0..=1.0
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Track metadata
    pub metadata: TrackMetadata,
}

impl LoadedTrack {
    /// Duration in seconds of the decoded stereo samples
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        (self.samples.len() / 2) as f64 / self.sample_rate as f64
    }
}

/// Turns a path into a playable track at the output rate
pub trait Decode {
    fn decode(&self, path: &Path, sample_rate: u32) -> Result<LoadedTrack, LoadError>;
}

/// Symphonia-backed decoder producing stereo at a fixed output rate
pub struct TrackLoader {
    target_sample_rate: u32,
}

impl Default for TrackLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackLoader {
    pub fn new() -> Self {
        Self::with_sample_rate(48000)
    }

    /// Loader resampling everything to `target_sample_rate`
    pub fn with_sample_rate(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Decode a whole file into memory as interleaved stereo
    pub fn load(&self, path: &Path) -> Result<LoadedTrack, LoadError> {
        if !is_supported(path) {
            return Err(LoadError::UnsupportedFormat(path.display().to_string()));
        }

        let mut probed = probe(path)?;
        let mut metadata = extract_metadata(&mut probed, path);
        let mut reader = probed.format;

        let (track_id, params) = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .map(|t| (t.id, t.codec_params.clone()))
            .ok_or(LoadError::NoAudioTrack)?;

        metadata.sample_rate = params.sample_rate.unwrap_or(44100);
        metadata.channels = params.channels.map_or(2, |c| c.count() as u16);

        let mut decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(decode_error)?;

        let mut interleaved = Vec::new();
        while let Ok(packet) = reader.next_packet() {
            if packet.track_id() != track_id {
                continue;
            }
            match decoder.decode(&packet) {
                Ok(buffer) => {
                    let mut copy = SampleBuffer::<f32>::new(buffer.capacity() as u64, *buffer.spec());
                    copy.copy_interleaved_ref(buffer);
                    interleaved.extend_from_slice(copy.samples());
                }
                Err(SymphoniaError::DecodeError(reason)) => {
                    tracing::debug!(reason, "skipping corrupt packet");
                }
                Err(other) => return Err(decode_error(other)),
            }
        }

        if interleaved.is_empty() {
            return Err(LoadError::Decode("no audio frames decoded".to_string()));
        }

        let stereo = to_stereo(&interleaved, metadata.channels);
        metadata.duration_secs = (stereo.len() / 2) as f64 / metadata.sample_rate as f64;

        let samples = if metadata.sample_rate == self.target_sample_rate {
            stereo
        } else {
            resample_stereo(&stereo, metadata.sample_rate, self.target_sample_rate)?
        };

        tracing::info!(
            path = %path.display(),
            duration = metadata.duration_secs,
            source_rate = metadata.sample_rate,
            "decoded track"
        );

        Ok(LoadedTrack {
            samples,
            sample_rate: self.target_sample_rate,
            metadata,
        })
    }
}

fn decode_error(err: impl std::fmt::Display) -> LoadError {
    LoadError::Decode(err.to_string())
}

fn probe(path: &Path) -> Result<ProbeResult, LoadError> {
    let source = MediaSourceStream::new(Box::new(std::fs::File::open(path)?), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }
    symphonia::default::get_probe()
        .format(&hint, source, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(decode_error)
}

/// Rate-convert interleaved stereo in fixed blocks, zero-padding the last
/// block and keeping only its proportional share of output.
fn resample_stereo(samples: &[f32], from: u32, to: u32) -> Result<Vec<f32>, LoadError> {
    const BLOCK: usize = 1024;

    let mut resampler =
        FftFixedInOut::<f32>::new(from as usize, to as usize, BLOCK, 2).map_err(decode_error)?;
    let block_len = resampler.input_frames_next();

    let (left, right): (Vec<f32>, Vec<f32>) =
        samples.chunks_exact(2).map(|frame| (frame[0], frame[1])).unzip();

    let mut out = [Vec::new(), Vec::new()];
    for start in (0..left.len()).step_by(block_len) {
        let end = (start + block_len).min(left.len());
        let mut block = [left[start..end].to_vec(), right[start..end].to_vec()];
        for channel in &mut block {
            channel.resize(block_len, 0.0);
        }

        let converted = resampler.process(&block[..], None).map_err(decode_error)?;
        let keep = if end - start == block_len {
            usize::MAX
        } else {
            (end - start) * to as usize / from as usize
        };
        for (dst, src) in out.iter_mut().zip(converted) {
            dst.extend(src.into_iter().take(keep));
        }
    }

    let [l, r] = out;
    Ok(l.into_iter().zip(r).flat_map(|(l, r)| [l, r]).collect())
}

impl Decode for TrackLoader {
    fn decode(&self, path: &Path, sample_rate: u32) -> Result<LoadedTrack, LoadError> {
        if sample_rate == self.target_sample_rate {
            self.load(path)
        } else {
            Self::with_sample_rate(sample_rate).load(path)
        }
    }
}

/// Fold any channel layout to interleaved stereo
fn to_stereo(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        2 => samples.to_vec(),
        0 | 1 => samples.iter().flat_map(|&s| [s, s]).collect(),
        n => samples
            .chunks_exact(n as usize)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect(),
    }
}

/// Read title, artist and album tags, falling back to the file stem
///
/// Container tags (ID3v2 ahead of an MP3 stream) live on the probe
/// result; in-stream tags (Vorbis comments, RIFF INFO) on the reader.
pub(crate) fn extract_metadata(probed: &mut ProbeResult, path: &Path) -> TrackMetadata {
    let mut metadata = TrackMetadata {
        title: crate::file_info::file_stem(path),
        artist: crate::file_info::UNKNOWN_ARTIST.to_string(),
        album: crate::file_info::UNKNOWN_ALBUM.to_string(),
        ..Default::default()
    };

    if let Some(container) = probed.metadata.get() {
        if let Some(revision) = container.current() {
            apply_tags(&mut metadata, revision);
        }
    }
    if let Some(revision) = probed.format.metadata().current() {
        apply_tags(&mut metadata, revision);
    }

    metadata
}

fn apply_tags(metadata: &mut TrackMetadata, revision: &MetadataRevision) {
    for tag in revision.tags() {
        let value = tag.value.to_string();
        if value.trim().is_empty() {
            continue;
        }
        match tag.std_key {
            Some(StandardTagKey::TrackTitle) => metadata.title = value,
            Some(StandardTagKey::Artist) => metadata.artist = value,
            Some(StandardTagKey::Album) => metadata.album = value,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported(Path::new("song.mp3")));
        assert!(is_supported(Path::new("/music/Song.FLAC")));
        assert!(is_supported(Path::new("a.wav")));
        assert!(!is_supported(Path::new("notes.txt")));
        assert!(!is_supported(Path::new("no_extension")));
    }

    #[test]
    fn test_rejects_wrong_extension() {
        let loader = TrackLoader::new();
        let err = loader.load(Path::new("cover.jpg")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let loader = TrackLoader::new();
        let path = PathBuf::from("/definitely/not/here/track.mp3");
        let err = loader.load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_garbage_file_is_decode_error() {
        let path = std::env::temp_dir().join("tinamp_loader_garbage.wav");
        std::fs::write(&path, b"this is not a riff file at all").unwrap();
        let err = TrackLoader::new().load(&path).unwrap_err();
        assert!(matches!(err, LoadError::Decode(_)));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_to_stereo() {
        assert_eq!(to_stereo(&[0.1, 0.2], 1), vec![0.1, 0.1, 0.2, 0.2]);
        assert_eq!(to_stereo(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 3), vec![0.1, 0.2, 0.4, 0.5]);
        assert_eq!(to_stereo(&[0.1, 0.2], 2), vec![0.1, 0.2]);
    }

    #[test]
    fn test_duration_from_samples() {
        let track = LoadedTrack {
            samples: vec![0.0; 96000],
            sample_rate: 48000,
            metadata: TrackMetadata::default(),
        };
        assert!((track.duration_secs() - 1.0).abs() < 1e-9);
    }
}
