//! Display metadata for a file, never failing

use std::path::{Path, PathBuf};
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Display metadata for a playlist entry
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub path: PathBuf,
    /// File name without extension
    pub name: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_secs: f64,
    pub size_bytes: u64,
}

impl FileInfo {
    /// Filename-derived defaults used when tags can't be read
    pub fn fallback(path: &Path) -> Self {
        let name = file_stem(path);
        Self {
            path: path.to_path_buf(),
            title: name.clone(),
            name,
            artist: UNKNOWN_ARTIST.to_string(),
            album: UNKNOWN_ALBUM.to_string(),
            duration_secs: 0.0,
            size_bytes: 0,
        }
    }

    /// "Artist - Title" as shown in the playlist
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.artist, self.title)
    }
}

/// Probe `path` for tags, duration and size.
///
/// Read failures degrade to `FileInfo::fallback` values.
pub fn file_info(path: &Path) -> FileInfo {
    match probe(path) {
        Ok(info) => info,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "file info fallback");
            FileInfo::fallback(path)
        }
    }
}

fn probe(path: &Path) -> Result<FileInfo, Box<dyn std::error::Error>> {
    let size_bytes = std::fs::metadata(path)?.len();
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let meta = crate::loader::extract_metadata(&mut probed, path);

    let duration_secs = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .and_then(|t| {
            let frames = t.codec_params.n_frames?;
            let rate = t.codec_params.sample_rate?;
            Some(frames as f64 / rate as f64)
        })
        .unwrap_or(0.0);

    Ok(FileInfo {
        path: path.to_path_buf(),
        name: file_stem(path),
        title: meta.title,
        artist: meta.artist,
        album: meta.album,
        duration_secs,
        size_bytes,
    })
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_falls_back() {
        let info = file_info(Path::new("/no/such/dir/My Song.mp3"));
        assert_eq!(info.name, "My Song");
        assert_eq!(info.title, "My Song");
        assert_eq!(info.artist, UNKNOWN_ARTIST);
        assert_eq!(info.album, UNKNOWN_ALBUM);
        assert_eq!(info.duration_secs, 0.0);
        assert_eq!(info.size_bytes, 0);
    }

    #[test]
    fn test_unreadable_file_falls_back() {
        let path = std::env::temp_dir().join("tinamp_info_garbage.mp3");
        std::fs::write(&path, [0u8; 16]).unwrap();
        let info = file_info(&path);
        assert_eq!(info, FileInfo::fallback(&path));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_display_name() {
        let mut info = FileInfo::fallback(Path::new("x.mp3"));
        info.artist = "Band".into();
        info.title = "Tune".into();
        assert_eq!(info.display_name(), "Band - Tune");
    }
}
