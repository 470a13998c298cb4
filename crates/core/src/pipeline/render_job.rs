use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::captioning::domain::segment::Segment;
use crate::captioning::domain::segment_packer::SegmentPacker;
use crate::captioning::domain::timeline::TimelineResolver;
use crate::captioning::domain::transcript_reconciler::{
    ensure_non_overlapping, reconcile_edited_segments, DEFAULT_SEGMENT_GAP,
};
use crate::captioning::domain::word::Word;
use crate::captioning::infrastructure::transcript_json::save_segments;
use crate::config::render_config::RenderConfig;
use crate::pipeline::caption_video_use_case::CaptionVideoUseCase;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::render_error::{RenderError, RenderOutcome};
use crate::pipeline::render_session::RenderSession;
use crate::rendering::domain::caption_font::CaptionFont;
use crate::rendering::domain::layer_blurrer::LayerBlurrer;
use crate::rendering::domain::layer_compositor::LayerCompositor;
use crate::rendering::infrastructure::cpu_layer_blurrer::CpuLayerBlurrer;
use crate::rendering::infrastructure::font_loader::{FontLoadSession, FontLoader};
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::audio_remuxer::AudioRemuxer;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

/// Where the captions of a render come from.
#[derive(Clone, Debug)]
pub enum CaptionSource {
    /// Word timings from a transcription, packed into segments.
    Words(Vec<Word>),
    /// Segments rendered as given.
    Segments(Vec<Segment>),
    /// Hand-edited segments re-timed against the original words.
    EditedSegments { edited: Vec<Segment>, words: Vec<Word> },
}

impl CaptionSource {
    /// True when there is no caption text at all.
    pub fn is_empty(&self) -> bool {
        let blank = |segments: &[Segment]| {
            segments
                .iter()
                .all(|s| s.text.trim().is_empty() && s.words.is_empty())
        };
        match self {
            CaptionSource::Words(words) => words.is_empty(),
            CaptionSource::Segments(segments) => blank(segments),
            CaptionSource::EditedSegments { edited, .. } => blank(edited),
        }
    }
}

/// The font and segments of one render. Packing measures with the same
/// font that later draws the captions.
pub struct CaptionPlan {
    pub font: Box<dyn CaptionFont>,
    pub segments: Vec<Segment>,
}

impl CaptionPlan {
    /// `metadata` is the frame geometry after rotation.
    pub fn prepare(
        config: &RenderConfig,
        captions: &CaptionSource,
        metadata: &VideoMetadata,
        fonts: &FontLoader,
        session: &mut FontLoadSession,
    ) -> Result<Self, RenderError> {
        let font = fonts.load(config.font_size_for(metadata.height), session);

        let segments = match captions {
            CaptionSource::Words(words) => {
                let packer = SegmentPacker::new(config.packing_limits(metadata.width));
                packer.pack_words(words, font.as_ref())
            }
            CaptionSource::Segments(segments) => segments.clone(),
            CaptionSource::EditedSegments { edited, words } => {
                let estimate = reconcile_edited_segments(edited, words, &config.reconcile)?;
                log::info!(
                    "Re-timed edited captions: {} words matched, {} estimated",
                    estimate.matched_words(),
                    estimate.estimated_words()
                );
                ensure_non_overlapping(estimate.into_value(), DEFAULT_SEGMENT_GAP)
            }
        };
        log::info!("{} caption segments", segments.len());

        Ok(Self { font, segments })
    }
}

/// Video I/O used by a render.
pub struct RenderPorts {
    /// Not yet opened.
    pub reader: Box<dyn VideoReader>,
    pub writer: Box<dyn VideoWriter>,
    pub remuxer: Box<dyn AudioRemuxer>,
}

#[derive(Default)]
pub struct RenderHooks {
    pub logger: Option<Box<dyn PipelineLogger>>,
    pub on_progress: Option<Box<dyn Fn(usize, usize) -> bool + Send>>,
    pub cancelled: Option<Arc<AtomicBool>>,
}

#[derive(Debug)]
pub struct RenderReport {
    pub outcome: RenderOutcome,
    pub segments: Vec<Segment>,
    /// Set when the working directory was kept.
    pub kept_work_dir: Option<PathBuf>,
}

/// One captioned render of one video, from validated config to delivered
/// output.
pub struct RenderJob {
    config: RenderConfig,
    captions: CaptionSource,
    fonts: FontLoader,
    work_parent: Option<PathBuf>,
}

impl RenderJob {
    pub fn new(config: RenderConfig, captions: CaptionSource) -> Self {
        let fonts = FontLoader::new(config.font_path.clone(), config.fonts_dir.clone());
        Self {
            config,
            captions,
            fonts,
            work_parent: None,
        }
    }

    pub fn with_font_loader(mut self, fonts: FontLoader) -> Self {
        self.fonts = fonts;
        self
    }

    /// Creates the working directory inside `parent` instead of the system
    /// temp dir.
    pub fn with_work_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.work_parent = Some(parent.into());
        self
    }

    /// Segments for a source of the given decoded geometry, without
    /// rendering anything.
    pub fn plan_segments(&self, source: &VideoMetadata) -> Result<Vec<Segment>, RenderError> {
        self.config.validate()?;
        let metadata = source.rotated(self.config.rotation()?);
        let plan = CaptionPlan::prepare(
            &self.config,
            &self.captions,
            &metadata,
            &self.fonts,
            &mut FontLoadSession::new(),
        )?;
        Ok(plan.segments)
    }

    pub fn run(
        self,
        input: &Path,
        output: &Path,
        ports: RenderPorts,
        hooks: RenderHooks,
    ) -> Result<RenderReport, RenderError> {
        self.config.validate()?;
        let rotation = self.config.rotation()?;

        if self.captions.is_empty() {
            log::warn!("Transcript has no words, nothing to caption");
            return Ok(RenderReport {
                outcome: RenderOutcome::NothingToCaption,
                segments: Vec::new(),
                kept_work_dir: None,
            });
        }

        let RenderPorts {
            mut reader,
            writer,
            remuxer,
        } = ports;
        let source_meta = reader.open(input).map_err(|e| RenderError::SourceOpen {
            path: input.to_path_buf(),
            reason: e.to_string(),
        })?;
        log::info!(
            "Source: {}x{} @ {:.3} fps, {} frames",
            source_meta.width,
            source_meta.height,
            source_meta.effective_fps(),
            source_meta.total_frames
        );

        let prepared = self.prepare(&source_meta.rotated(rotation));
        let (session, plan) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                reader.close();
                return Err(e);
            }
        };
        if plan.segments.is_empty() {
            reader.close();
            log::warn!("No caption segments produced, nothing to caption");
            return Ok(RenderReport {
                outcome: RenderOutcome::NothingToCaption,
                segments: Vec::new(),
                kept_work_dir: session.finish(),
            });
        }

        let blurrer: Option<Box<dyn LayerBlurrer>> = match self.config.blur_radius {
            0 => None,
            radius => Some(Box::new(CpuLayerBlurrer::new(radius))),
        };
        let compositor = LayerCompositor::new(self.config.caption_style(), plan.font, blurrer);
        let mut use_case = CaptionVideoUseCase::new(
            reader,
            writer,
            remuxer,
            compositor,
            TimelineResolver::new(plan.segments.clone()),
            rotation,
            hooks.logger,
            hooks.on_progress,
            hooks.cancelled,
        );

        let silent_path = session.silent_video_path();
        let outcome = use_case.execute(&source_meta, input, output, &silent_path)?;
        let kept_work_dir = session.finish();

        Ok(RenderReport {
            outcome,
            segments: plan.segments,
            kept_work_dir,
        })
    }

    fn prepare(&self, metadata: &VideoMetadata) -> Result<(RenderSession, CaptionPlan), RenderError> {
        let keep = self.config.keep_work_dir;
        let mut session = match &self.work_parent {
            Some(parent) => RenderSession::in_dir(parent, keep)?,
            None => RenderSession::create(keep)?,
        };
        let plan = CaptionPlan::prepare(
            &self.config,
            &self.captions,
            metadata,
            &self.fonts,
            session.fonts(),
        )?;
        save_segments(&session.segments_path(), &plan.segments)?;
        Ok((session, plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captioning::infrastructure::transcript_json::load_segments;
    use crate::config::render_config::ConfigError;
    use crate::pipeline::test_doubles::*;
    use crate::shared::constants::{SEGMENTS_ARTIFACT_FILENAME, WORK_DIR_PREFIX};
    use approx::assert_relative_eq;

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::create_dir_all(dir.path().join("work")).unwrap();
            std::fs::create_dir_all(dir.path().join("fonts")).unwrap();
            Self { dir }
        }

        fn job(&self, config: RenderConfig, captions: CaptionSource) -> RenderJob {
            let fonts = FontLoader::new(None, Some(self.dir.path().join("fonts")))
                .with_platform_candidates(Vec::new());
            RenderJob::new(config, captions)
                .with_font_loader(fonts)
                .with_work_parent(self.dir.path().join("work"))
        }

        fn output(&self) -> PathBuf {
            self.dir.path().join("captioned.mp4")
        }

        fn work_dirs(&self) -> Vec<PathBuf> {
            std::fs::read_dir(self.dir.path().join("work"))
                .unwrap()
                .map(|e| e.unwrap().path())
                .filter(|p| {
                    p.file_name()
                        .unwrap()
                        .to_string_lossy()
                        .starts_with(WORK_DIR_PREFIX)
                })
                .collect()
        }
    }

    fn words() -> Vec<Word> {
        vec![
            Word::new("Hello", 0.0, 0.4),
            Word::new("world", 0.4, 0.8),
            Word::new(".", 0.8, 0.9),
        ]
    }

    fn ports(reader: StubReader, writer: StubWriter) -> RenderPorts {
        RenderPorts {
            reader: Box::new(reader),
            writer: Box::new(writer),
            remuxer: Box::new(StubRemuxer::succeeding()),
        }
    }

    #[test]
    fn test_words_render_to_captioned_output() {
        let fixture = Fixture::new();
        let writer = StubWriter::new();
        let written = writer.written.clone();
        let reader = StubReader::new(metadata(320, 180, 10.0, 12));

        let report = fixture
            .job(RenderConfig::default(), CaptionSource::Words(words()))
            .run(
                Path::new("in.mp4"),
                &fixture.output(),
                ports(reader, writer),
                RenderHooks::default(),
            )
            .unwrap();

        assert_eq!(report.outcome, RenderOutcome::Captioned);
        assert_eq!(report.segments.len(), 1);
        assert_eq!(report.segments[0].text, "Hello world.");
        assert_relative_eq!(report.segments[0].end, 0.9);
        assert_eq!(written.lock().unwrap().len(), 12);
        assert!(fixture.output().is_file());
        assert!(report.kept_work_dir.is_none());
        assert!(fixture.work_dirs().is_empty());
    }

    #[test]
    fn test_empty_transcript_skips_video() {
        let fixture = Fixture::new();
        let reader = StubReader::new(metadata(320, 180, 10.0, 12));
        let opened = reader.opened.clone();

        let report = fixture
            .job(RenderConfig::default(), CaptionSource::Words(Vec::new()))
            .run(
                Path::new("in.mp4"),
                &fixture.output(),
                ports(reader, StubWriter::new()),
                RenderHooks::default(),
            )
            .unwrap();

        assert_eq!(report.outcome, RenderOutcome::NothingToCaption);
        assert!(!*opened.lock().unwrap());
        assert!(!fixture.output().exists());
    }

    #[test]
    fn test_unopenable_source() {
        let fixture = Fixture::new();
        let reader = StubReader::new(metadata(320, 180, 10.0, 12)).failing_open();

        let err = fixture
            .job(RenderConfig::default(), CaptionSource::Words(words()))
            .run(
                Path::new("missing.mp4"),
                &fixture.output(),
                ports(reader, StubWriter::new()),
                RenderHooks::default(),
            )
            .unwrap_err();

        match err {
            RenderError::SourceOpen { path, .. } => assert_eq!(path, PathBuf::from("missing.mp4")),
            other => panic!("expected SourceOpen, got {other:?}"),
        }
        assert!(fixture.work_dirs().is_empty());
    }

    #[test]
    fn test_invalid_config_fails_before_opening_source() {
        let fixture = Fixture::new();
        let reader = StubReader::new(metadata(320, 180, 10.0, 12));
        let opened = reader.opened.clone();
        let config = RenderConfig {
            font_size_scale: 0.0,
            ..RenderConfig::default()
        };

        let err = fixture
            .job(config, CaptionSource::Words(words()))
            .run(
                Path::new("in.mp4"),
                &fixture.output(),
                ports(reader, StubWriter::new()),
                RenderHooks::default(),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            RenderError::Config(ConfigError::OutOfRange {
                field: "font_size_scale",
                ..
            })
        ));
        assert!(!*opened.lock().unwrap());
    }

    #[test]
    fn test_edited_segments_take_original_timing() {
        let fixture = Fixture::new();
        let edited = vec![Segment {
            index: 1,
            start: 0.0,
            end: 0.9,
            text: "Hello, world!".to_string(),
            words: Vec::new(),
        }];
        let captions = CaptionSource::EditedSegments {
            edited,
            words: words(),
        };

        let report = fixture
            .job(RenderConfig::default(), captions)
            .run(
                Path::new("in.mp4"),
                &fixture.output(),
                ports(StubReader::new(metadata(320, 180, 10.0, 10)), StubWriter::new()),
                RenderHooks::default(),
            )
            .unwrap();

        let segment = &report.segments[0];
        assert_eq!(segment.text, "Hello, world!");
        assert_eq!(segment.words.len(), 2);
        assert_relative_eq!(segment.start, 0.0);
        assert_relative_eq!(segment.end, 0.8);
    }

    #[test]
    fn test_kept_work_dir_holds_segments_artifact() {
        let fixture = Fixture::new();
        let config = RenderConfig {
            keep_work_dir: true,
            ..RenderConfig::default()
        };

        let report = fixture
            .job(config, CaptionSource::Words(words()))
            .run(
                Path::new("in.mp4"),
                &fixture.output(),
                ports(StubReader::new(metadata(320, 180, 10.0, 10)), StubWriter::new()),
                RenderHooks::default(),
            )
            .unwrap();

        let kept = report.kept_work_dir.unwrap();
        let saved = load_segments(&kept.join(SEGMENTS_ARTIFACT_FILENAME)).unwrap();
        assert_eq!(saved.len(), report.segments.len());
        assert_eq!(saved[0].text, report.segments[0].text);
    }

    #[test]
    fn test_plan_segments_without_rendering() {
        let fixture = Fixture::new();
        let job = fixture.job(RenderConfig::default(), CaptionSource::Words(words()));

        let segments = job.plan_segments(&metadata(320, 180, 10.0, 10)).unwrap();

        assert_eq!(segments.len(), 1);
        assert!(fixture.work_dirs().is_empty());
    }

    #[test]
    fn test_blank_segments_are_empty_source() {
        let blank = Segment {
            index: 1,
            start: 0.0,
            end: 1.0,
            text: "  ".to_string(),
            words: Vec::new(),
        };
        assert!(CaptionSource::Segments(vec![blank.clone()]).is_empty());
        assert!(CaptionSource::EditedSegments {
            edited: vec![blank],
            words: words(),
        }
        .is_empty());
        assert!(!CaptionSource::Words(words()).is_empty());
    }
}
