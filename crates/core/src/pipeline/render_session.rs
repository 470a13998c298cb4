use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir};

use crate::pipeline::render_error::RenderError;
use crate::rendering::infrastructure::font_loader::FontLoadSession;
use crate::shared::constants::{SEGMENTS_ARTIFACT_FILENAME, SILENT_VIDEO_FILENAME, WORK_DIR_PREFIX};

/// Per-render scratch state: the working directory holding the silent
/// video and the segments artifact, plus the font announcement flag.
///
/// The directory is removed when the session is dropped, on success and
/// on failure alike, unless `keep` was requested.
pub struct RenderSession {
    dir: Option<TempDir>,
    keep: bool,
    fonts: FontLoadSession,
}

impl RenderSession {
    /// Creates the working directory under the system temp dir.
    pub fn create(keep: bool) -> Result<Self, RenderError> {
        let dir = Builder::new()
            .prefix(WORK_DIR_PREFIX)
            .tempdir()
            .map_err(RenderError::WorkDir)?;
        Ok(Self::from_dir(dir, keep))
    }

    /// Creates the working directory inside `parent`.
    pub fn in_dir(parent: &Path, keep: bool) -> Result<Self, RenderError> {
        let dir = Builder::new()
            .prefix(WORK_DIR_PREFIX)
            .tempdir_in(parent)
            .map_err(RenderError::WorkDir)?;
        Ok(Self::from_dir(dir, keep))
    }

    fn from_dir(dir: TempDir, keep: bool) -> Self {
        log::debug!("Working directory: {}", dir.path().display());
        Self {
            dir: Some(dir),
            keep,
            fonts: FontLoadSession::new(),
        }
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }

    pub fn silent_video_path(&self) -> PathBuf {
        self.path().join(SILENT_VIDEO_FILENAME)
    }

    pub fn segments_path(&self) -> PathBuf {
        self.path().join(SEGMENTS_ARTIFACT_FILENAME)
    }

    pub fn fonts(&mut self) -> &mut FontLoadSession {
        &mut self.fonts
    }

    /// Ends the session. Returns the directory path when it was kept.
    pub fn finish(mut self) -> Option<PathBuf> {
        self.release()
    }

    fn release(&mut self) -> Option<PathBuf> {
        let dir = self.dir.take()?;
        if self.keep {
            let path = dir.keep();
            log::info!("Keeping working directory {}", path.display());
            Some(path)
        } else {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                log::warn!("Failed to remove working directory {}: {e}", path.display());
            }
            None
        }
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.release();
    }
}
