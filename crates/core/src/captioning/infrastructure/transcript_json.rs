use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::captioning::domain::segment::Segment;
use crate::captioning::domain::word::Word;

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid transcript JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode segments: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WordsDocument {
    Wrapped { words: Vec<Word> },
    Bare(Vec<Word>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SegmentsDocument {
    Wrapped { segments: Vec<Segment> },
    Bare(Vec<Segment>),
}

#[derive(Serialize)]
struct SegmentsOut<'a> {
    segments: &'a [Segment],
}

fn read(path: &Path) -> Result<String, TranscriptError> {
    fs::read_to_string(path).map_err(|source| TranscriptError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a word list, either `{"words": [...]}` or a bare array.
pub fn load_words(path: &Path) -> Result<Vec<Word>, TranscriptError> {
    let json = read(path)?;
    let doc: WordsDocument = serde_json::from_str(&json).map_err(|source| TranscriptError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(match doc {
        WordsDocument::Wrapped { words } | WordsDocument::Bare(words) => words,
    })
}

/// Reads segments written by [`save_segments`] or edited by hand.
pub fn load_segments(path: &Path) -> Result<Vec<Segment>, TranscriptError> {
    let json = read(path)?;
    let doc: SegmentsDocument =
        serde_json::from_str(&json).map_err(|source| TranscriptError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(match doc {
        SegmentsDocument::Wrapped { segments } | SegmentsDocument::Bare(segments) => segments,
    })
}

/// Writes `{"segments": [...]}` as pretty JSON, creating parent directories.
pub fn save_segments(path: &Path, segments: &[Segment]) -> Result<(), TranscriptError> {
    let json = serde_json::to_string_pretty(&SegmentsOut { segments })
        .map_err(TranscriptError::Encode)?;
    let write_err = |source| TranscriptError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, json).map_err(write_err)
}
