use std::path::Path;

/// How strictly the source audio stream is selected during a remux.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioMapping {
    /// The source must carry an audio stream or the remux fails.
    Required,
    /// A missing source audio stream yields a video-only output.
    Optional,
}

/// Combines a silent rendered video with the audio of the original source.
///
/// The output's video stream is the rendered one, its audio stream is the
/// source's, and the result is trimmed to the shorter of the two.
pub trait AudioRemuxer: Send {
    fn remux(
        &self,
        silent_video: &Path,
        audio_source: &Path,
        output: &Path,
        mapping: AudioMapping,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
