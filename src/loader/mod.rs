// Turning bytes on disk into decoded sample buffers, and grouping those into kits.

use std::path::PathBuf;

use crate::audio::SampleBuffer;

pub mod kit;

pub use kit::{Kit, KitSet, Pad, PadDescriptor, Rgb};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed wav data: {0}")]
    Wav(#[from] hound::Error),

    #[error("unsupported audio: {0}")]
    Unsupported(String),
}

/// Where pad sample bytes come from.
pub trait AssetSource: Sync {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, DecodeError>;
}

// Resolves pad paths relative to a root directory.
#[derive(Clone, Debug)]
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirAssets {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, DecodeError> {
        let full = self.root.join(path);
        std::fs::read(&full).map_err(|source| DecodeError::Io {
            path: full.display().to_string(),
            source,
        })
    }
}

// The collaborator boundary: raw bytes in, playable buffer out.
pub fn decode(bytes: &[u8], target_rate: u32) -> Result<SampleBuffer, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Unsupported("empty file".into()));
    }
    SampleBuffer::decode_wav(bytes, target_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_assets_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let assets = DirAssets::new(dir.path());
        assert!(matches!(assets.fetch("nope.wav"), Err(DecodeError::Io { .. })));

        std::fs::write(dir.path().join("a.wav"), crate::audio::wav_bytes(&[1, 2], 8000)).unwrap();
        let bytes = assets.fetch("a.wav").unwrap();
        assert_eq!(decode(&bytes, 8000).unwrap().len(), 2);
    }

    #[test]
    fn empty_bytes_are_unsupported() {
        assert!(matches!(decode(&[], 44100), Err(DecodeError::Unsupported(_))));
    }
}
