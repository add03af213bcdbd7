//! ANSI text to PNG rasterization
//!
//! The raw generator output is split into color runs, laid out on a fixed
//! monospace grid and drawn glyph by glyph onto an RGB canvas.

mod font;

use std::io::Cursor;
use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, PxScale, ScaleFont};
use image::{ImageFormat, RgbImage};
use tracing::{debug, info};

use crate::ansi::{parse_color_runs, Rgb, TextGrid};
use crate::errors::{CowpostError, Result};

pub use font::{
    find_system_font, load_font_file, load_monospace_font, CellMetrics, LoadedFont,
    FONT_CANDIDATES,
};

pub const DEFAULT_FONT_SIZE: u32 = 18;
pub const DEFAULT_FOREGROUND: Rgb = Rgb::from_hex(0x00EE_EEEE);
pub const DEFAULT_BACKGROUND: Rgb = Rgb::from_hex(0x000B_0E14);

/// Margin around the text block, in pixels
pub const PADDING: u32 = 20;
pub const MIN_WIDTH: u32 = 200;
pub const MIN_HEIGHT: u32 = 120;
/// Largest accepted image side, in pixels
pub const MAX_DIMENSION: u32 = 10_000;

/// Font and color settings for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Font file to use before the system candidates
    pub font_path: Option<PathBuf>,
    /// Font size in pixels
    pub font_size: u32,
    /// Color for text without an SGR color
    pub foreground: Rgb,
    /// Canvas color
    pub background: Rgb,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            font_path: None,
            font_size: DEFAULT_FONT_SIZE,
            foreground: DEFAULT_FOREGROUND,
            background: DEFAULT_BACKGROUND,
        }
    }
}

/// Pixel size of the image for a grid with the given metrics
///
/// Fails when either side would exceed [`MAX_DIMENSION`].
pub fn canvas_size(grid: &TextGrid, metrics: &CellMetrics) -> Result<(u32, u32)> {
    let width = padded_extent(grid.columns, metrics.width, "columns")?;
    let height = padded_extent(grid.rows, metrics.line_height, "rows")?;
    Ok((width.max(MIN_WIDTH), height.max(MIN_HEIGHT)))
}

fn padded_extent(cells: usize, cell_size: u32, what: &str) -> Result<u32> {
    u32::try_from(cells)
        .ok()
        .and_then(|cells| cells.checked_mul(cell_size))
        .and_then(|extent| extent.checked_add(PADDING * 2))
        .filter(|extent| *extent <= MAX_DIMENSION)
        .ok_or_else(|| {
            CowpostError::RenderError(format!(
                "Text too large to render: {} {} of {} px exceed {} px",
                cells, what, cell_size, MAX_DIMENSION
            ))
        })
}

/// An immutable rendered raster
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pixels: RgbImage,
}

impl RenderedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Raw pixel buffer
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Encode as PNG
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| CowpostError::RenderError(format!("PNG encoding failed: {}", e)))?;
        Ok(bytes)
    }

    /// Encode as PNG and write to `path`, returning the encoded bytes
    pub fn save_png(&self, path: &Path) -> Result<Vec<u8>> {
        let bytes = self.to_png()?;
        std::fs::write(path, &bytes).map_err(|e| CowpostError::FileWriteError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        info!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(bytes)
    }
}

/// Renders ANSI text with one loaded font
pub struct Renderer {
    font: LoadedFont,
    options: RenderOptions,
    metrics: CellMetrics,
}

impl Renderer {
    /// Load the font described by `options`
    pub fn new(options: RenderOptions) -> Result<Self> {
        let font = load_monospace_font(options.font_path.as_deref())?;
        Ok(Self::with_font(font, options))
    }

    /// Use an already loaded font
    pub fn with_font(font: LoadedFont, options: RenderOptions) -> Self {
        let metrics = CellMetrics::measure(&font.font, options.font_size as f32);
        debug!(
            "Renderer using {} at {}px (cell {}x{})",
            font.path.display(),
            options.font_size,
            metrics.width,
            metrics.line_height
        );
        Self {
            font,
            options,
            metrics,
        }
    }

    pub fn metrics(&self) -> &CellMetrics {
        &self.metrics
    }

    /// Render raw ANSI text into an image
    pub fn render(&self, raw: &str) -> Result<RenderedImage> {
        let grid = parse_color_runs(raw, self.options.foreground);
        self.render_grid(&grid)
    }

    /// Render an already parsed grid
    pub fn render_grid(&self, grid: &TextGrid) -> Result<RenderedImage> {
        if grid.is_empty() {
            return Err(CowpostError::RenderError(
                "Nothing to render: text is empty after stripping ANSI codes".to_string(),
            ));
        }

        let (width, height) = canvas_size(grid, &self.metrics)?;
        let mut pixels = RgbImage::from_pixel(width, height, self.options.background.into());

        for run in &grid.runs {
            let top = PADDING + run.row as u32 * self.metrics.line_height;
            for (offset, c) in run.text.chars().enumerate() {
                if c.is_whitespace() {
                    continue;
                }
                let left = PADDING + (run.col + offset) as u32 * self.metrics.width;
                self.draw_glyph(&mut pixels, c, left, top, run.color);
            }
        }

        info!(
            "Rendered {} runs on a {}x{} grid into {}x{} px",
            grid.runs.len(),
            grid.columns,
            grid.rows,
            width,
            height
        );
        Ok(RenderedImage { pixels })
    }

    /// Draw one glyph with its cell's top-left corner at (`left`, `top`)
    fn draw_glyph(&self, pixels: &mut RgbImage, c: char, left: u32, top: u32, color: Rgb) {
        let scaled = self.font.font.as_scaled(PxScale::from(self.options.font_size as f32));
        let mut glyph = scaled.scaled_glyph(c);
        glyph.position = point(left as f32, top as f32 + self.metrics.ascent);

        let Some(outlined) = self.font.font.outline_glyph(glyph) else {
            return;
        };
        let bounds = outlined.px_bounds();
        let (width, height) = pixels.dimensions();

        outlined.draw(|gx, gy, coverage| {
            let x = bounds.min.x as i64 + i64::from(gx);
            let y = bounds.min.y as i64 + i64::from(gy);
            if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
                return;
            }
            let pixel = pixels.get_pixel_mut(x as u32, y as u32);
            let under = Rgb::new(pixel[0], pixel[1], pixel[2]);
            *pixel = under.mix(color, coverage).into();
        });
    }
}

/// Load the configured font and render `raw` in one step
pub fn render_ansi(raw: &str, options: &RenderOptions) -> Result<RenderedImage> {
    Renderer::new(options.clone())?.render(raw)
}
