use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::rendering::domain::caption_font::CaptionFont;
use crate::rendering::infrastructure::block_font::BlockFont;
use crate::rendering::infrastructure::fontdue_font::FontdueFont;

/// File names looked up in the bundled fonts directory, in order.
const BUNDLED_FONT_NAMES: &[&str] = &[
    "roboto.ttf",
    "roboto-regular.ttf",
    "Roboto-Regular.ttf",
    "opensans.ttf",
    "opensans-regular.ttf",
    "OpenSans-Regular.ttf",
    "inter.ttf",
    "inter-regular.ttf",
    "Inter-Regular.ttf",
    "arial.ttf",
    "Arial.ttf",
];

const PLATFORM_FONT_PATHS: &[&str] = &[
    "C:/Windows/Fonts/arial.ttf",
    "C:/Windows/Fonts/calibri.ttf",
    "C:/Windows/Fonts/tahoma.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/roboto/Roboto-Regular.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
];

/// File names tried in the user's font directory.
const USER_FONT_NAMES: &[&str] = &["Roboto-Regular.ttf", "DejaVuSans.ttf", "Arial.ttf"];

/// Where a candidate font file came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontOrigin {
    Explicit,
    Bundled,
    Platform,
}

impl fmt::Display for FontOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontOrigin::Explicit => write!(f, "specified"),
            FontOrigin::Bundled => write!(f, "bundled"),
            FontOrigin::Platform => write!(f, "system"),
        }
    }
}

/// Tracks whether the font choice has been reported during one render.
#[derive(Debug, Default)]
pub struct FontLoadSession {
    announced: bool,
}

impl FontLoadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn announced(&self) -> bool {
        self.announced
    }

    fn announce(&mut self, fallback: bool, message: &str) {
        if self.announced {
            return;
        }
        self.announced = true;
        if fallback {
            warn!("{message}");
        } else {
            info!("{message}");
        }
    }
}

/// `fonts/` next to the running executable.
pub fn default_fonts_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("fonts")))
}

fn platform_candidates() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = PLATFORM_FONT_PATHS.iter().map(PathBuf::from).collect();
    if let Some(user_dir) = dirs::font_dir() {
        paths.extend(USER_FONT_NAMES.iter().map(|name| user_dir.join(name)));
    }
    paths
}

/// Resolves the caption font: explicit path, then bundled fonts, then
/// platform fonts, then the built-in block font. Never fails.
pub struct FontLoader {
    explicit: Option<PathBuf>,
    fonts_dir: Option<PathBuf>,
    platform: Vec<PathBuf>,
}

impl FontLoader {
    pub fn new(explicit: Option<PathBuf>, fonts_dir: Option<PathBuf>) -> Self {
        Self {
            explicit,
            fonts_dir: fonts_dir.or_else(default_fonts_dir),
            platform: platform_candidates(),
        }
    }

    /// Replaces the platform font search list.
    pub fn with_platform_candidates(mut self, paths: Vec<PathBuf>) -> Self {
        self.platform = paths;
        self
    }

    /// Candidate files in lookup order.
    pub fn candidates(&self) -> Vec<(FontOrigin, PathBuf)> {
        let mut out = Vec::new();
        if let Some(path) = &self.explicit {
            out.push((FontOrigin::Explicit, path.clone()));
        }
        if let Some(dir) = &self.fonts_dir {
            out.extend(
                BUNDLED_FONT_NAMES
                    .iter()
                    .map(|name| (FontOrigin::Bundled, dir.join(name))),
            );
        }
        out.extend(self.platform.iter().map(|p| (FontOrigin::Platform, p.clone())));
        out
    }

    pub fn load(&self, size: u32, session: &mut FontLoadSession) -> Box<dyn CaptionFont> {
        let size = size.max(1);
        for (origin, path) in self.candidates() {
            if !path.is_file() {
                if origin == FontOrigin::Explicit {
                    warn!("Font {} not found, searching fallbacks", path.display());
                }
                continue;
            }
            match FontdueFont::from_file(&path, size) {
                Ok(font) => {
                    session.announce(
                        false,
                        &format!("Using {origin} font {} at {size}px", display(&path)),
                    );
                    return Box::new(font);
                }
                Err(e) => debug!("Skipping font {}: {e}", path.display()),
            }
        }

        session.announce(
            true,
            &format!(
                "No usable font file found, using the built-in block font at {size}px; \
                 put a TrueType font in the fonts directory or pass an explicit font path"
            ),
        );
        Box::new(BlockFont::new(size))
    }
}

fn display(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn isolated_loader(explicit: Option<PathBuf>, fonts_dir: &Path) -> FontLoader {
        FontLoader::new(explicit, Some(fonts_dir.to_path_buf())).with_platform_candidates(Vec::new())
    }

    #[test]
    fn test_falls_back_to_block_font() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = FontLoadSession::new();
        let font = isolated_loader(None, dir.path()).load(36, &mut session);
        assert_eq!(font.name(), "built-in block font");
        assert_eq!(font.size(), 36);
        assert!(session.announced());
    }

    #[test]
    fn test_unparsable_candidates_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("roboto.ttf"), b"not a font").unwrap();
        let explicit = dir.path().join("custom.ttf");
        fs::write(&explicit, b"also not a font").unwrap();

        let mut session = FontLoadSession::new();
        let font = isolated_loader(Some(explicit), dir.path()).load(20, &mut session);
        assert_eq!(font.name(), "built-in block font");
    }

    #[test]
    fn test_candidate_order() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FontLoader::new(Some(PathBuf::from("/x/mine.ttf")), Some(dir.path().to_path_buf()))
            .with_platform_candidates(vec![PathBuf::from("/sys/font.ttf")]);
        let candidates = loader.candidates();

        assert_eq!(candidates[0], (FontOrigin::Explicit, PathBuf::from("/x/mine.ttf")));
        assert_eq!(candidates[1], (FontOrigin::Bundled, dir.path().join("roboto.ttf")));
        assert_eq!(
            candidates.last().unwrap(),
            &(FontOrigin::Platform, PathBuf::from("/sys/font.ttf"))
        );
        assert_eq!(candidates.len(), 2 + BUNDLED_FONT_NAMES.len());
    }

    #[test]
    fn test_session_announces_once() {
        let mut session = FontLoadSession::new();
        assert!(!session.announced());
        session.announce(false, "first");
        session.announce(true, "second");
        assert!(session.announced());
    }

    #[test]
    fn test_zero_size_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let font = isolated_loader(None, dir.path()).load(0, &mut FontLoadSession::new());
        assert_eq!(font.size(), 1);
    }
}
