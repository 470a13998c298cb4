use std::collections::BTreeMap;
use std::time::Instant;

pub const STAGE_DECODE: &str = "decode";
pub const STAGE_RENDER: &str = "render";
pub const STAGE_ENCODE: &str = "encode";

/// Observer for caption render events.
///
/// Keeps the frame loop free of any particular output mechanism: the CLI
/// logs through [`StdoutPipelineLogger`], tests use [`NullPipelineLogger`].
pub trait PipelineLogger: Send {
    /// Frames finished so far out of `total` (0 when the source does not
    /// report a frame count).
    fn progress(&mut self, current: usize, total: usize);

    /// Milliseconds spent in one stage for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A per-frame measurement such as the number of captioned frames.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// Emitted once when the frame loop ends. Default: no-op.
    fn summary(&self) {}
}

pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

#[derive(Default)]
struct Series {
    count: usize,
    total: f64,
}

impl Series {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Logs progress every `throttle_frames` frames through the `log` facade
/// and prints a per-stage timing table at the end.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: BTreeMap<String, Series>,
    metrics: BTreeMap<String, Series>,
    start_time: Instant,
    frames_done: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            frames_done: 0,
        }
    }

    /// Formatted report, or `None` before anything was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames_done;
        let mut lines = vec![format!(
            "Caption render summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        for (stage, series) in &self.timings {
            let share = if elapsed_ms > 0.0 {
                series.total / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:8}: avg {:6.1}ms  total {:7.0}ms  ({share:4.1}%)",
                series.mean(),
                series.total
            ));
        }

        for (name, series) in &self.metrics {
            lines.push(format!("  {name}: total {:.0}, avg {:.2}", series.total, series.mean()));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn mean_timing(&self, stage: &str) -> Option<f64> {
        self.timings.get(stage).map(Series::mean)
    }

    pub fn metric_total(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).map(|s| s.total)
    }

    pub fn frames_done(&self) -> usize {
        self.frames_done
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_done = current;
        if current % self.throttle_frames != 0 && current != total {
            return;
        }
        if total > 0 {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Captioning: {current}/{total} frames ({pct:.1}%)");
        } else {
            log::info!("Captioning: {current} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings.entry(stage.to_string()).or_default().push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
