use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use wordcaption_core::captioning::infrastructure::transcript_json::{
    load_segments, load_words, save_segments,
};
use wordcaption_core::config::presets::{FontSize, Preset};
use wordcaption_core::config::render_config::{
    parse_highlight_mode, parse_optional_color, parse_position, RenderConfig,
};
use wordcaption_core::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use wordcaption_core::pipeline::render_error::RenderOutcome;
use wordcaption_core::pipeline::render_job::{CaptionSource, RenderHooks, RenderJob, RenderPorts};
use wordcaption_core::shared::constants::VIDEO_EXTENSIONS;
use wordcaption_core::video::domain::video_reader::VideoReader;
use wordcaption_core::video::infrastructure::ffmpeg_cli_remuxer::FfmpegCliRemuxer;
use wordcaption_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use wordcaption_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;

/// Burn word-highlighted captions into a video.
#[derive(Parser)]
#[command(name = "wordcaption")]
struct Cli {
    /// Input video file.
    input: PathBuf,

    /// Output video file (not needed with --segments-only).
    output: Option<PathBuf>,

    /// Word timings JSON ({"words": [...]} or a bare array).
    #[arg(long)]
    words: Option<PathBuf>,

    /// Render these segments as-is instead of packing words.
    #[arg(long, conflicts_with = "edited_segments")]
    segments: Option<PathBuf>,

    /// Hand-edited segments, re-timed against --words before rendering.
    #[arg(long)]
    edited_segments: Option<PathBuf>,

    /// JSON config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Preset: default, large_text, minimal, current_word, background_highlight.
    #[arg(long)]
    preset: Option<String>,

    /// TrueType/OpenType font file.
    #[arg(long)]
    font_path: Option<PathBuf>,

    /// Font size as a fraction of frame height (e.g. 0.045).
    #[arg(long, conflicts_with = "font_size")]
    font_scale: Option<f64>,

    /// Font size: small, medium, large, extra-large.
    #[arg(long)]
    font_size: Option<String>,

    /// Text color: name, "r,g,b" or #rrggbb.
    #[arg(long)]
    text_color: Option<String>,

    /// Color of the spoken word.
    #[arg(long)]
    highlight_color: Option<String>,

    /// Caption backing color, or "none".
    #[arg(long)]
    background_color: Option<String>,

    /// Box color behind the spoken word.
    #[arg(long)]
    highlight_bg_color: Option<String>,

    /// Caption center as "x,y" or "y" fractions of the frame.
    #[arg(long)]
    position: Option<String>,

    /// Highlight mode: text, background, both, current_word_only.
    #[arg(long)]
    highlight_mode: Option<String>,

    /// Maximum caption width in pixels.
    #[arg(long)]
    max_width: Option<u32>,

    /// Maximum caption duration in seconds.
    #[arg(long)]
    max_duration: Option<f64>,

    /// Pixels between words.
    #[arg(long)]
    word_spacing: Option<u32>,

    /// Shadow blur radius in pixels (0 disables the blur).
    #[arg(long)]
    blur_radius: Option<u32>,

    /// Rotate frames clockwise: 0, 90, 180 or 270.
    #[arg(long)]
    rotation: Option<i32>,

    /// Keep the working directory (silent video, segments.json).
    #[arg(long)]
    keep_temp: bool,

    /// Also write the caption segments to this file.
    #[arg(long)]
    segments_out: Option<PathBuf>,

    /// Only pack and write segments (requires --segments-out).
    #[arg(long)]
    segments_only: bool,

    /// Write the effective config to this file.
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// ffmpeg executable used to merge audio.
    #[arg(long)]
    ffmpeg: Option<String>,

    /// No progress output.
    #[arg(long)]
    quiet: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = build_config(&cli)?;
    if let Some(path) = &cli.save_config {
        config.save(path)?;
        log::info!("Config written to {}", path.display());
    }

    let captions = load_captions(&cli)?;
    let remuxer = FfmpegCliRemuxer::new(config.ffmpeg_binary.clone(), config.remux_timeout());
    let job = RenderJob::new(config, captions);

    if cli.segments_only {
        return run_segments_only(&cli.input, cli.segments_out.as_deref(), &job);
    }

    let output = cli.output.as_deref().ok_or("Output file is required")?;
    run_render(&cli, output, job, remuxer)
}

fn run_segments_only(
    input: &Path,
    segments_out: Option<&Path>,
    job: &RenderJob,
) -> Result<(), Box<dyn std::error::Error>> {
    let segments_out = segments_out.ok_or("--segments-only requires --segments-out")?;
    let mut reader = FfmpegReader::new();
    let metadata = reader.open(input)?;
    reader.close();

    let segments = job.plan_segments(&metadata)?;
    save_segments(segments_out, &segments)?;
    log::info!(
        "Wrote {} segments to {}",
        segments.len(),
        segments_out.display()
    );
    Ok(())
}

fn run_render(
    cli: &Cli,
    output: &Path,
    job: RenderJob,
    remuxer: FfmpegCliRemuxer,
) -> Result<(), Box<dyn std::error::Error>> {
    let ports = RenderPorts {
        reader: Box::new(FfmpegReader::new()),
        writer: Box::new(FfmpegWriter::new()),
        remuxer: Box::new(remuxer),
    };

    let mut hooks = RenderHooks::default();
    if !cli.quiet {
        let logger: Box<dyn PipelineLogger> = Box::new(StdoutPipelineLogger::default());
        hooks.logger = Some(logger);
        hooks.on_progress = Some(Box::new(|current: usize, total: usize| {
            if total > 0 {
                eprint!("\rCaptioning frame {current}/{total}");
            } else {
                eprint!("\rCaptioning frame {current}");
            }
            true
        }));
    }

    let report = job.run(&cli.input, output, ports, hooks)?;
    if !cli.quiet {
        eprintln!();
    }

    if let Some(path) = &cli.segments_out {
        save_segments(path, &report.segments)?;
        log::info!("Segments written to {}", path.display());
    }
    if let Some(dir) = &report.kept_work_dir {
        log::info!("Working files kept in {}", dir.display());
    }

    match report.outcome {
        RenderOutcome::Captioned => {
            log::info!("Output written to {}", output.display());
        }
        RenderOutcome::SilentFallback { reason } => {
            log::warn!("Audio could not be merged ({reason})");
            eprintln!("Warning: {} was written without audio", output.display());
        }
        RenderOutcome::NothingToCaption => {
            eprintln!("Warning: transcript has no words, no output written");
        }
    }
    Ok(())
}

fn load_captions(cli: &Cli) -> Result<CaptionSource, Box<dyn std::error::Error>> {
    if let Some(path) = &cli.segments {
        return Ok(CaptionSource::Segments(load_segments(path)?));
    }
    let words_path = cli.words.as_ref().ok_or("--words is required")?;
    let words = load_words(words_path)?;
    match &cli.edited_segments {
        Some(path) => Ok(CaptionSource::EditedSegments {
            edited: load_segments(path)?,
            words,
        }),
        None => Ok(CaptionSource::Words(words)),
    }
}

/// Config file, then preset, then individual flags.
fn build_config(cli: &Cli) -> Result<RenderConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };

    if let Some(name) = &cli.preset {
        name.parse::<Preset>()?.apply(&mut config);
    }

    if let Some(path) = &cli.font_path {
        config.font_path = Some(path.clone());
    }
    if let Some(size) = &cli.font_size {
        config.font_size_scale = size.parse::<FontSize>()?.scale();
    }
    if let Some(scale) = cli.font_scale {
        config.font_size_scale = scale;
    }
    if let Some(color) = &cli.text_color {
        config.text_color = color.parse()?;
    }
    if let Some(color) = &cli.highlight_color {
        config.highlight_color = color.parse()?;
    }
    if let Some(color) = &cli.background_color {
        config.background_color = parse_optional_color(color)?;
    }
    if let Some(color) = &cli.highlight_bg_color {
        config.highlight_background_color = color.parse()?;
    }
    if let Some(position) = &cli.position {
        config.position = parse_position(position)?;
    }
    if let Some(mode) = &cli.highlight_mode {
        config.highlighting_mode = parse_highlight_mode(mode)?;
    }
    if let Some(width) = cli.max_width {
        config.max_width_pixels = width;
    }
    if let Some(duration) = cli.max_duration {
        config.max_duration_seconds = duration;
    }
    if let Some(spacing) = cli.word_spacing {
        config.word_spacing_pixels = spacing;
    }
    if let Some(radius) = cli.blur_radius {
        config.blur_radius = radius;
    }
    if let Some(degrees) = cli.rotation {
        config.rotation_degrees = degrees;
    }
    if cli.keep_temp {
        config.keep_work_dir = true;
    }
    if let Some(binary) = &cli.ffmpeg {
        config.ffmpeg_binary = binary.clone();
    }

    config.validate()?;
    Ok(config)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if !is_video(&cli.input) {
        log::warn!(
            "{} does not have a known video extension ({})",
            cli.input.display(),
            VIDEO_EXTENSIONS.join(", ")
        );
    }
    if cli.words.is_none() && cli.segments.is_none() {
        return Err("Either --words or --segments is required".into());
    }
    if cli.edited_segments.is_some() && cli.words.is_none() {
        return Err("--edited-segments needs --words to take timings from".into());
    }
    if cli.segments_only {
        if cli.segments_out.is_none() {
            return Err("--segments-only requires --segments-out".into());
        }
    } else if cli.output.is_none() {
        return Err("Output file is required unless --segments-only is used".into());
    }
    if !cli.segments_only && cli.output.as_ref() == Some(&cli.input) {
        return Err("Output file must differ from the input file".into());
    }
    Ok(())
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
