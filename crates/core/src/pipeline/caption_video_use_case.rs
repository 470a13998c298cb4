use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::captioning::domain::timeline::TimelineResolver;
use crate::pipeline::pipeline_logger::{
    NullPipelineLogger, PipelineLogger, STAGE_DECODE, STAGE_ENCODE, STAGE_RENDER,
};
use crate::pipeline::render_error::{RenderError, RenderOutcome};
use crate::rendering::domain::layer_compositor::LayerCompositor;
use crate::shared::rotation::Rotation;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::audio_remuxer::{AudioMapping, AudioRemuxer};
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

pub const CAPTIONED_FRAMES_METRIC: &str = "captioned_frames";

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

/// Burns captions into every frame of a video and merges the source audio
/// back in.
///
/// Frames are processed one at a time in source order: rotate, resolve the
/// caption at the frame's playback time, composite, encode. The encoded
/// video is silent; audio is merged afterwards by the remuxer, with one
/// retry that treats the audio stream as optional. When both attempts fail
/// the silent video is delivered instead.
///
/// Single-use: `execute` consumes the reader and writer.
pub struct CaptionVideoUseCase {
    reader: Option<Box<dyn VideoReader>>,
    writer: Option<Box<dyn VideoWriter>>,
    remuxer: Box<dyn AudioRemuxer>,
    compositor: LayerCompositor,
    timeline: TimelineResolver,
    rotation: Rotation,
    logger: Box<dyn PipelineLogger>,
    on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    cancelled: Arc<AtomicBool>,
}

impl CaptionVideoUseCase {
    /// `reader` must already be open; its metadata is passed to `execute`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        remuxer: Box<dyn AudioRemuxer>,
        compositor: LayerCompositor,
        timeline: TimelineResolver,
        rotation: Rotation,
        logger: Option<Box<dyn PipelineLogger>>,
        on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            reader: Some(reader),
            writer: Some(writer),
            remuxer,
            compositor,
            timeline,
            rotation,
            logger: logger.unwrap_or_else(|| Box::new(NullPipelineLogger)),
            on_progress,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    /// Renders into `silent_path`, then delivers the result to
    /// `output_path`.
    ///
    /// `metadata` describes the source as decoded, before rotation.
    pub fn execute(
        &mut self,
        metadata: &VideoMetadata,
        source_path: &Path,
        output_path: &Path,
        silent_path: &Path,
    ) -> Result<RenderOutcome, RenderError> {
        let mut reader = self.reader.take().ok_or(RenderError::AlreadyExecuted)?;
        let mut writer = self.writer.take().ok_or(RenderError::AlreadyExecuted)?;
        let output_meta = metadata.rotated(self.rotation);

        if let Err(e) = writer.open(silent_path, &output_meta) {
            reader.close();
            return Err(RenderError::SinkOpen {
                path: silent_path.to_path_buf(),
                reason: e.to_string(),
            });
        }

        let rendered = self.render_frames(reader.as_mut(), writer.as_mut(), &output_meta);
        reader.close();
        let closed = writer.close();
        self.logger.summary();

        let frames = rendered?;
        closed.map_err(|e| RenderError::Finalize {
            reason: e.to_string(),
        })?;
        log::info!("Rendered {frames} frames to {}", silent_path.display());

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| RenderError::Output {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        self.deliver(silent_path, source_path, output_path)
    }

    fn render_frames(
        &mut self,
        reader: &mut dyn VideoReader,
        writer: &mut dyn VideoWriter,
        metadata: &VideoMetadata,
    ) -> Result<usize, RenderError> {
        let total = metadata.total_frames;
        let mut done = 0;
        let mut frames = reader.frames();

        loop {
            if self.cancelled.load(Ordering::Relaxed) {
                return Err(RenderError::Cancelled);
            }

            let decode_start = Instant::now();
            let Some(next) = frames.next() else {
                break;
            };
            let frame = next.map_err(|e| RenderError::Frame {
                index: done,
                reason: e.to_string(),
            })?;
            self.logger.timing(STAGE_DECODE, elapsed_ms(decode_start));

            let render_start = Instant::now();
            let mut frame = self.rotation.apply(frame);
            let index = frame.index();
            let active = self.timeline.resolve(metadata.frame_time(index));
            let drawn = self
                .compositor
                .caption_frame(&mut frame, active.as_ref())
                .map_err(|e| RenderError::Frame {
                    index,
                    reason: e.to_string(),
                })?;
            self.logger.timing(STAGE_RENDER, elapsed_ms(render_start));
            self.logger
                .metric(CAPTIONED_FRAMES_METRIC, if drawn { 1.0 } else { 0.0 });

            let encode_start = Instant::now();
            writer.write(&frame).map_err(|e| RenderError::Frame {
                index,
                reason: e.to_string(),
            })?;
            self.logger.timing(STAGE_ENCODE, elapsed_ms(encode_start));

            done += 1;
            self.logger.progress(done, total);
            if let Some(ref callback) = self.on_progress {
                if !callback(done, total) {
                    return Err(RenderError::Cancelled);
                }
            }
        }

        Ok(done)
    }

    fn deliver(
        &self,
        silent_path: &Path,
        source_path: &Path,
        output_path: &Path,
    ) -> Result<RenderOutcome, RenderError> {
        match self
            .remuxer
            .remux(silent_path, source_path, output_path, AudioMapping::Required)
        {
            Ok(()) => return Ok(RenderOutcome::Captioned),
            Err(e) => log::warn!("Audio merge failed ({e}), retrying with optional audio"),
        }

        match self
            .remuxer
            .remux(silent_path, source_path, output_path, AudioMapping::Optional)
        {
            Ok(()) => Ok(RenderOutcome::Captioned),
            Err(e) => {
                log::warn!("Audio merge failed again ({e}), delivering the video without audio");
                fs::copy(silent_path, output_path).map_err(|source| RenderError::Output {
                    path: output_path.to_path_buf(),
                    source,
                })?;
                Ok(RenderOutcome::SilentFallback {
                    reason: e.to_string(),
                })
            }
        }
    }
}
