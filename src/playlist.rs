//! In-memory song list.
//!
//! Songs are kept sorted and unique. A cursor marks the current song;
//! moving it past either end wraps around.

use std::io;
use std::path::{Path, PathBuf};

/// Going back from further into a song than this restarts it instead.
pub const BACK_CUTOFF_MS: u64 = 10_000;

/// File extensions picked up when scanning a directory.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "ogg", "flac", "wav"];

/// What "previous" should do at a given playback position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Back {
    /// Seek the current song to its start.
    Restart,
    /// Move to the previous song.
    Previous,
}

/// Decide "previous" for a song playing at `position_ms`.
pub fn back_action(position_ms: u64) -> Back {
    if position_ms > BACK_CUTOFF_MS {
        Back::Restart
    } else {
        Back::Previous
    }
}

#[derive(Debug, Clone, Default)]
pub struct Playlist {
    songs: Vec<PathBuf>,
    current: usize,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut playlist = Self::new();
        for path in paths {
            playlist.insert(path);
        }
        playlist.current = 0;
        playlist
    }

    /// Build from a command-line argument: a single file, or a directory
    /// whose audio files are added.
    pub fn from_arg(path: &Path) -> io::Result<Self> {
        if path.is_dir() {
            Self::scan_dir(path)
        } else {
            // Surfaces "not found" here rather than at playback
            std::fs::metadata(path)?;
            Ok(Self::from_paths([path]))
        }
    }

    /// Every file in `dir` (not recursive) with an audio extension.
    pub fn scan_dir(dir: &Path) -> io::Result<Self> {
        let mut playlist = Self::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_audio(&path) {
                playlist.insert(path);
            }
        }
        playlist.current = 0;
        log::info!("Found {} songs in {}", playlist.len(), dir.display());
        Ok(playlist)
    }

    /// Sorted insert. Returns the song's index, or `None` if it was
    /// already listed.
    pub fn insert(&mut self, path: impl Into<PathBuf>) -> Option<usize> {
        let path = path.into();
        match self.songs.binary_search(&path) {
            Ok(_) => None,
            Err(index) => {
                let had_current = self.current < self.songs.len();
                self.songs.insert(index, path);
                // Keep the cursor on the same song
                if had_current && index <= self.current {
                    self.current += 1;
                }
                Some(index)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn songs(&self) -> &[PathBuf] {
        &self.songs
    }

    pub fn index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&Path> {
        self.songs.get(self.current).map(PathBuf::as_path)
    }

    /// File stem of the current song.
    pub fn title(&self) -> Option<String> {
        self.current()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
    }

    /// Move the cursor by `offset`, wrapping at both ends.
    pub fn advance(&mut self, offset: isize) -> Option<&Path> {
        if self.songs.is_empty() {
            self.current = 0;
            return None;
        }
        let len = self.songs.len() as isize;
        self.current = (self.current as isize + offset).rem_euclid(len) as usize;
        self.current()
    }

    pub fn next(&mut self) -> Option<&Path> {
        self.advance(1)
    }

    pub fn select(&mut self, index: usize) -> Option<&Path> {
        if index < self.songs.len() {
            self.current = index;
        }
        self.current()
    }
}

fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
