//! Extended M3U playlist persistence
//!
//! Only the path lines are authoritative; `#EXTINF` metadata is read
//! back on a best-effort basis.

use crate::file_info::FileInfo;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const HEADER: &str = "#EXTM3U";
const EXTINF: &str = "#EXTINF:";

#[derive(Error, Debug)]
pub enum PlaylistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One entry read back from a playlist file
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntry {
    pub path: PathBuf,
    /// Whole seconds from the preceding `#EXTINF` line
    pub duration_secs: Option<u64>,
    /// "Artist - Title" from the preceding `#EXTINF` line
    pub display: Option<String>,
}

/// Render tracks as extended M3U text
pub fn generate(tracks: &[FileInfo]) -> String {
    let mut content = String::from(HEADER);
    content.push('\n');
    for track in tracks {
        let secs = track.duration_secs.max(0.0).floor() as u64;
        content.push_str(&format!(
            "{}{},{} - {}\n",
            EXTINF, secs, track.artist, track.title
        ));
        content.push_str(&format!("{}\n", track.path.display()));
    }
    content
}

/// Parse playlist text into entries, in file order
pub fn parse(content: &str) -> Vec<PlaylistEntry> {
    let mut entries = Vec::new();
    let mut pending: Option<(Option<u64>, Option<String>)> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(info) = line.strip_prefix(EXTINF) {
            pending = Some(parse_extinf(info));
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let (duration_secs, display) = pending.take().unwrap_or((None, None));
        entries.push(PlaylistEntry {
            path: PathBuf::from(line),
            duration_secs,
            display,
        });
    }

    entries
}

fn parse_extinf(info: &str) -> (Option<u64>, Option<String>) {
    match info.split_once(',') {
        Some((secs, display)) => {
            let display = display.trim();
            (
                secs.trim().parse().ok(),
                (!display.is_empty()).then(|| display.to_string()),
            )
        }
        None => (info.trim().parse().ok(), None),
    }
}

/// Write `tracks` to `path`, creating parent directories
pub fn write(path: &Path, tracks: &[FileInfo]) -> Result<(), PlaylistError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, generate(tracks))?;
    tracing::info!(path = %path.display(), tracks = tracks.len(), "saved playlist");
    Ok(())
}

/// Read the entries of the playlist at `path`
pub fn read(path: &Path) -> Result<Vec<PlaylistEntry>, PlaylistError> {
    let content = fs::read_to_string(path)?;
    Ok(parse(&content))
}

/// Whether `path` looks like an M3U playlist
pub fn is_playlist(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("m3u") || e.eq_ignore_ascii_case("m3u8"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(path: &str, artist: &str, title: &str, secs: f64) -> FileInfo {
        let mut info = FileInfo::fallback(Path::new(path));
        info.artist = artist.to_string();
        info.title = title.to_string();
        info.duration_secs = secs;
        info
    }

    #[test]
    fn test_generate_format() {
        let content = generate(&[track("/m/a.mp3", "Band", "Song", 187.9)]);
        assert_eq!(content, "#EXTM3U\n#EXTINF:187,Band - Song\n/m/a.mp3\n");
    }

    #[test]
    fn test_roundtrip_preserves_path_order() {
        let tracks = vec![
            track("/music/one.mp3", "A", "One", 61.0),
            track("/music/two.flac", "B", "Two", 0.0),
            track("/music/three.ogg", "C", "Three", 240.5),
        ];
        let entries = parse(&generate(&tracks));
        let paths: Vec<PathBuf> = entries.iter().map(|e| e.path.clone()).collect();
        let expected: Vec<PathBuf> = tracks.iter().map(|t| t.path.clone()).collect();
        assert_eq!(paths, expected);
        assert_eq!(entries[2].duration_secs, Some(240));
        assert_eq!(entries[0].display.as_deref(), Some("A - One"));
    }

    #[test]
    fn test_parse_plain_list_and_comments() {
        let content = "# my mix\n\n/a.mp3\r\n  /b.mp3  \n#EXTINF:bad\n/c.mp3\n";
        let entries = parse(content);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].path, PathBuf::from("/b.mp3"));
        assert_eq!(entries[0].duration_secs, None);
        assert_eq!(entries[2].duration_secs, None);
    }

    #[test]
    fn test_empty_playlist() {
        assert_eq!(generate(&[]), "#EXTM3U\n");
        assert!(parse("#EXTM3U\n").is_empty());
    }

    #[test]
    fn test_write_then_read() {
        let path = std::env::temp_dir().join("tinamp_playlist_test").join("mix.m3u");
        let tracks = vec![track("/x/1.mp3", "A", "1", 1.0), track("/x/2.mp3", "B", "2", 2.0)];
        write(&path, &tracks).unwrap();
        let entries = read(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].path, PathBuf::from("/x/2.mp3"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_is_playlist() {
        assert!(is_playlist(Path::new("mix.m3u")));
        assert!(is_playlist(Path::new("mix.M3U8")));
        assert!(!is_playlist(Path::new("song.mp3")));
    }
}
