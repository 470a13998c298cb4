use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::audio_remuxer::{AudioMapping, AudioRemuxer};
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

pub const SILENT_BYTES: &[u8] = b"silent-video";
pub const MUXED_BYTES: &[u8] = b"muxed-video";

pub fn metadata(width: u32, height: u32, fps: f64, total_frames: usize) -> VideoMetadata {
    VideoMetadata {
        width,
        height,
        fps,
        total_frames,
        codec: "stub".to_string(),
        source_path: None,
    }
}

pub fn black_frames(width: u32, height: u32, count: usize) -> Vec<Frame> {
    (0..count)
        .map(|i| Frame::solid(width, height, [0, 0, 0], i))
        .collect()
}

pub fn has_ink(frame: &Frame) -> bool {
    frame.data().iter().any(|&b| b != 0)
}

// --- Reader ---

pub struct StubReader {
    metadata: VideoMetadata,
    frames: Vec<Frame>,
    fail_at: Option<usize>,
    fail_open: bool,
    pub opened: Arc<Mutex<bool>>,
    pub closed: Arc<Mutex<bool>>,
}

impl StubReader {
    pub fn new(metadata: VideoMetadata) -> Self {
        let frames = black_frames(metadata.width, metadata.height, metadata.total_frames);
        Self {
            metadata,
            frames,
            fail_at: None,
            fail_open: false,
            opened: Arc::new(Mutex::new(false)),
            closed: Arc::new(Mutex::new(false)),
        }
    }

    /// Yields a decode error in place of the frame at `index`.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }
}

impl VideoReader for StubReader {
    fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        if self.fail_open {
            return Err("No such file or directory".into());
        }
        *self.opened.lock().unwrap() = true;
        Ok(self.metadata.clone())
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let fail_at = self.fail_at;
        Box::new(self.frames.drain(..).map(move |frame| {
            if Some(frame.index()) == fail_at {
                Err("corrupt packet".into())
            } else {
                Ok(frame)
            }
        }))
    }

    fn close(&mut self) {
        *self.closed.lock().unwrap() = true;
    }
}

// --- Writer ---

/// Records frames and writes a placeholder file at the output path on
/// close, standing in for the encoded silent video.
pub struct StubWriter {
    path: Option<PathBuf>,
    fail_open: bool,
    pub opened_with: Arc<Mutex<Option<VideoMetadata>>>,
    pub written: Arc<Mutex<Vec<Frame>>>,
    pub closed: Arc<Mutex<bool>>,
}

impl StubWriter {
    pub fn new() -> Self {
        Self {
            path: None,
            fail_open: false,
            opened_with: Arc::new(Mutex::new(None)),
            written: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(Mutex::new(false)),
        }
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }
}

impl VideoWriter for StubWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if self.fail_open {
            return Err("encoder unavailable".into());
        }
        self.path = Some(path.to_path_buf());
        *self.opened_with.lock().unwrap() = Some(metadata.clone());
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        self.written.lock().unwrap().push(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        *self.closed.lock().unwrap() = true;
        if let Some(path) = self.path.take() {
            std::fs::write(path, SILENT_BYTES)?;
        }
        Ok(())
    }
}

// --- Remuxer ---

/// Replays scripted results; a success writes a placeholder output file.
/// Once the script runs out every call succeeds.
pub struct StubRemuxer {
    results: Mutex<VecDeque<Result<(), String>>>,
    pub calls: Arc<Mutex<Vec<AudioMapping>>>,
}

impl StubRemuxer {
    pub fn new(results: Vec<Result<(), String>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(Vec::new())
    }
}

impl AudioRemuxer for StubRemuxer {
    fn remux(
        &self,
        _silent_video: &Path,
        _audio_source: &Path,
        output: &Path,
        mapping: AudioMapping,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.calls.lock().unwrap().push(mapping);
        let result = self.results.lock().unwrap().pop_front().unwrap_or(Ok(()));
        match result {
            Ok(()) => {
                std::fs::write(output, MUXED_BYTES)?;
                Ok(())
            }
            Err(message) => Err(message.into()),
        }
    }
}
