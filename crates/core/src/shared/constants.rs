/// Font size as a fraction of the (rotated) frame height.
pub const DEFAULT_FONT_SIZE_SCALE: f64 = 0.045;
pub const DEFAULT_MAX_WIDTH_PIXELS: u32 = 800;
/// Segments never exceed this share of the effective frame width.
pub const MAX_WIDTH_FRAME_RATIO: f64 = 0.8;
pub const DEFAULT_MAX_DURATION_SECONDS: f64 = 1.5;
pub const DEFAULT_WORD_SPACING_PIXELS: u32 = 10;
pub const DEFAULT_BLUR_RADIUS: u32 = 5;

/// Used when the container reports no usable frame rate.
pub const FALLBACK_FPS: f64 = 30.0;

pub const BACKGROUND_ALPHA: u8 = 180;
pub const HIGHLIGHT_BACKGROUND_ALPHA: u8 = 200;

pub const DEFAULT_REMUX_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_FFMPEG_BINARY: &str = "ffmpeg";

pub const SILENT_VIDEO_FILENAME: &str = "captioned_silent.mp4";
pub const SEGMENTS_ARTIFACT_FILENAME: &str = "segments.json";
pub const WORK_DIR_PREFIX: &str = "wordcaption_";

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "webm", "m4v"];
