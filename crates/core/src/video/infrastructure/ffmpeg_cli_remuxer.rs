use std::ffi::OsString;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::shared::constants::{DEFAULT_FFMPEG_BINARY, DEFAULT_REMUX_TIMEOUT_SECS};
use crate::video::domain::audio_remuxer::{AudioMapping, AudioRemuxer};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const STDERR_TAIL_BYTES: usize = 2000;

#[derive(Error, Debug)]
pub enum RemuxError {
    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("remux did not finish within {seconds}s")]
    Timeout { seconds: u64 },
    #[error("ffmpeg exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
    #[error("remux produced no output at {}", .0.display())]
    MissingOutput(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Merges audio by running the `ffmpeg` command-line tool.
///
/// The video stream is stream-copied, the audio re-encoded to AAC, and the
/// output cut to the shorter stream. The child is killed when it outlives
/// the timeout.
pub struct FfmpegCliRemuxer {
    binary: PathBuf,
    timeout: Duration,
    poll_interval: Duration,
}

impl FfmpegCliRemuxer {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn run(
        &self,
        silent_video: &Path,
        audio_source: &Path,
        output: &Path,
        mapping: AudioMapping,
    ) -> Result<(), RemuxError> {
        let args = remux_args(silent_video, audio_source, output, mapping);
        log::debug!("Running {} {:?}", self.binary.display(), args);

        let mut stderr_file = tempfile::tempfile()?;
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_file.try_clone()?))
            .spawn()
            .map_err(|source| RemuxError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(RemuxError::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
            std::thread::sleep(self.poll_interval);
        };

        if !status.success() {
            return Err(RemuxError::Failed {
                status,
                stderr: read_tail(&mut stderr_file)?,
            });
        }

        match std::fs::metadata(output) {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(RemuxError::MissingOutput(output.to_path_buf())),
        }
    }
}

impl Default for FfmpegCliRemuxer {
    fn default() -> Self {
        Self::new(
            DEFAULT_FFMPEG_BINARY,
            Duration::from_secs(DEFAULT_REMUX_TIMEOUT_SECS),
        )
    }
}

impl AudioRemuxer for FfmpegCliRemuxer {
    fn remux(
        &self,
        silent_video: &Path,
        audio_source: &Path,
        output: &Path,
        mapping: AudioMapping,
    ) -> Result<(), Box<dyn std::error::Error>> {
        Ok(self.run(silent_video, audio_source, output, mapping)?)
    }
}

fn remux_args(
    silent_video: &Path,
    audio_source: &Path,
    output: &Path,
    mapping: AudioMapping,
) -> Vec<OsString> {
    let audio_map = match mapping {
        AudioMapping::Required => "1:a:0",
        AudioMapping::Optional => "1:a:0?",
    };

    let mut args: Vec<OsString> = ["-y", "-loglevel", "error", "-i"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(silent_video.into());
    args.push("-i".into());
    args.push(audio_source.into());
    for flag in [
        "-c:v", "copy", "-c:a", "aac", "-map", "0:v:0", "-map", audio_map, "-shortest",
    ] {
        args.push(flag.into());
    }
    args.push(output.into());
    args
}

fn read_tail(file: &mut std::fs::File) -> std::io::Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    let start = buf.len().saturating_sub(STDERR_TAIL_BYTES);
    Ok(String::from_utf8_lossy(&buf[start..]).trim().to_string())
}
