//! Monospace font discovery and cell metrics

use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use tracing::{debug, warn};

use crate::errors::{CowpostError, Result};

/// System locations searched when no font path is configured
pub const FONT_CANDIDATES: [&str; 3] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation2/LiberationMono-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
];

/// Extra vertical space between rows, in pixels
const LINE_SPACING: u32 = 4;

/// DejaVu Sans Mono shipped with the test suite
#[cfg(test)]
pub(crate) const TEST_FONT: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/DejaVuSansMono.ttf");

/// Size of one character cell in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMetrics {
    /// Horizontal advance of one cell
    pub width: u32,
    /// Distance between consecutive baselines
    pub line_height: u32,
    /// Baseline offset from the top of a cell
    pub ascent: f32,
}

impl CellMetrics {
    /// Measure a font at the given pixel size
    pub fn measure<F: Font>(font: &F, size: f32) -> Self {
        let scaled = font.as_scaled(PxScale::from(size));
        let advance = scaled.h_advance(scaled.glyph_id('M'));
        let height = scaled.ascent() - scaled.descent();

        Self {
            width: (advance.ceil() as u32).max(1),
            line_height: (height.ceil() as u32).max(1) + LINE_SPACING,
            ascent: scaled.ascent(),
        }
    }
}

/// A loaded font together with the file it came from
pub struct LoadedFont {
    pub font: FontVec,
    pub path: PathBuf,
}

impl std::fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedFont").field("path", &self.path).finish()
    }
}

/// Load the configured font, or the first candidate that exists
pub fn load_monospace_font(requested: Option<&Path>) -> Result<LoadedFont> {
    let candidates: Vec<PathBuf> = requested
        .map(Path::to_path_buf)
        .into_iter()
        .chain(FONT_CANDIDATES.iter().map(PathBuf::from))
        .collect();

    for path in candidates {
        if !path.is_file() {
            debug!("Font candidate not found: {}", path.display());
            continue;
        }
        match load_font_file(&path) {
            Ok(font) => return Ok(font),
            Err(e) if requested.is_some_and(|r| r == path.as_path()) => return Err(e),
            Err(e) => warn!("Skipping font {}: {}", path.display(), e),
        }
    }

    Err(CowpostError::RenderError(
        "No monospace TTF font found. Install DejaVu Sans Mono or set BSKY_FONT_PATH.".to_string(),
    ))
}

/// Load a single font file
pub fn load_font_file(path: &Path) -> Result<LoadedFont> {
    let data = std::fs::read(path).map_err(|e| {
        CowpostError::RenderError(format!("Failed to read font {}: {}", path.display(), e))
    })?;
    let font = FontVec::try_from_vec(data).map_err(|e| {
        CowpostError::RenderError(format!("Invalid font {}: {}", path.display(), e))
    })?;

    debug!("Loaded font {}", path.display());
    Ok(LoadedFont {
        font,
        path: path.to_path_buf(),
    })
}

/// First system candidate present on this machine, if any
pub fn find_system_font() -> Option<PathBuf> {
    FONT_CANDIDATES.iter().map(PathBuf::from).find(|p| p.is_file())
}
