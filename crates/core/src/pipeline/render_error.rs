use std::path::PathBuf;

use thiserror::Error;

use crate::captioning::infrastructure::transcript_json::TranscriptError;
use crate::config::render_config::ConfigError;

/// Fatal failures of a caption render.
///
/// Remux failures are not in here: they degrade to
/// [`RenderOutcome::SilentFallback`].
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot open source video {}: {reason}", path.display())]
    SourceOpen { path: PathBuf, reason: String },
    #[error("cannot open output video {}: {reason}", path.display())]
    SinkOpen { path: PathBuf, reason: String },
    #[error("frame {index}: {reason}")]
    Frame { index: usize, reason: String },
    #[error("cannot finalize rendered video: {reason}")]
    Finalize { reason: String },
    #[error("cannot create working directory: {0}")]
    WorkDir(#[source] std::io::Error),
    #[error(transparent)]
    Artifact(#[from] TranscriptError),
    #[error("invalid reconciliation pattern: {0}")]
    Reconcile(#[from] regex::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("render cancelled")]
    Cancelled,
    #[error("render already executed")]
    AlreadyExecuted,
}

/// How a render that did not fail ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Captioned video with the source audio.
    Captioned,
    /// Captioned video delivered without audio because both remux attempts
    /// failed.
    SilentFallback { reason: String },
    /// The transcript had no words; no output was produced.
    NothingToCaption,
}

impl RenderOutcome {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, RenderOutcome::Captioned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_path() {
        let err = RenderError::SourceOpen {
            path: PathBuf::from("/videos/in.mp4"),
            reason: "No such file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot open source video /videos/in.mp4: No such file"
        );
    }

    #[test]
    fn test_degraded_outcomes() {
        assert!(!RenderOutcome::Captioned.is_degraded());
        assert!(RenderOutcome::NothingToCaption.is_degraded());
        assert!(RenderOutcome::SilentFallback {
            reason: "no audio".to_string()
        }
        .is_degraded());
    }
}
