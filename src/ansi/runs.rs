//! Color run extraction
//!
//! Feeds the raw generator output through a `vte` parser and records every
//! printed character against the foreground color that was active when it
//! arrived. Adjacent characters on the same row with the same color are
//! merged into one [`ColorRun`].

use tracing::debug;
use vte::{Params, Parser, Perform};

use super::codes::{ansi_256_to_rgb, Rgb};

/// Tab stops every 8 columns
const TAB_WIDTH: usize = 8;

/// A contiguous span of visible characters sharing one foreground color
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorRun {
    /// Characters in the run
    pub text: String,
    /// Foreground color
    pub color: Rgb,
    /// Grid row of the first character
    pub row: usize,
    /// Grid column of the first character
    pub col: usize,
}

impl ColorRun {
    /// Number of grid cells the run covers
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Column just past the last character
    pub fn end_col(&self) -> usize {
        self.col + self.len()
    }
}

/// Colored character grid derived from raw ANSI text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextGrid {
    /// Runs in reading order
    pub runs: Vec<ColorRun>,
    /// Number of rows, trailing empty rows excluded
    pub rows: usize,
    /// Widest row in cells
    pub columns: usize,
}

impl TextGrid {
    /// True when no visible character was found
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Runs that start on the given row
    pub fn row(&self, row: usize) -> impl Iterator<Item = &ColorRun> {
        self.runs.iter().filter(move |run| run.row == row)
    }

    /// Total number of visible characters
    pub fn cell_count(&self) -> usize {
        self.runs.iter().map(ColorRun::len).sum()
    }
}

/// `vte` performer that tracks cursor and foreground color
struct RunCollector {
    default_fg: Rgb,
    color: Rgb,
    row: usize,
    col: usize,
    runs: Vec<ColorRun>,
}

impl RunCollector {
    fn new(default_fg: Rgb) -> Self {
        Self {
            default_fg,
            color: default_fg,
            row: 0,
            col: 0,
            runs: Vec::new(),
        }
    }

    fn push_char(&mut self, c: char) {
        let (row, col, color) = (self.row, self.col, self.color);
        let extends_last = matches!(
            self.runs.last(),
            Some(last) if last.row == row && last.color == color && last.end_col() == col
        );

        if extends_last {
            if let Some(last) = self.runs.last_mut() {
                last.text.push(c);
            }
        } else {
            self.runs.push(ColorRun {
                text: c.to_string(),
                color,
                row,
                col,
            });
        }
        self.col += 1;
    }

    /// Apply one SGR parameter list to the current color
    fn apply_sgr(&mut self, params: &Params) {
        let groups: Vec<&[u16]> = params.iter().collect();
        if groups.is_empty() {
            self.color = self.default_fg;
            return;
        }

        let mut i = 0;
        while i < groups.len() {
            let group = groups[i];
            let code = group.first().copied().unwrap_or(0);
            match code {
                0 | 39 => self.color = self.default_fg,
                30..=37 => self.color = ansi_256_to_rgb((code - 30) as u8),
                90..=97 => self.color = ansi_256_to_rgb((code - 90 + 8) as u8),
                // Background and underline colors are not drawn, but their
                // arguments still have to be skipped.
                38 | 48 | 58 => {
                    let (color, consumed) = extended_color(&groups, i);
                    if code == 38 {
                        if let Some(color) = color {
                            self.color = color;
                        }
                    }
                    i += consumed;
                }
                _ => {}
            }
            i += 1;
        }
    }
}

/// Decode the `5;n` or `2;r;g;b` arguments of an extended color code at `groups[i]`
///
/// Returns the color, if well formed, and how many following groups the
/// arguments occupied. The colon form keeps its arguments inside the group.
fn extended_color(groups: &[&[u16]], i: usize) -> (Option<Rgb>, usize) {
    let group = groups[i];
    let (args, inline): (Vec<u16>, bool) = if group.len() > 1 {
        (group[1..].to_vec(), true)
    } else {
        let rest = groups[i + 1..].iter().filter_map(|g| g.first().copied()).collect();
        (rest, false)
    };

    let (color, len) = match args.as_slice() {
        [5, n, ..] => (Some(ansi_256_to_rgb((*n).min(255) as u8)), 2),
        [2, r, g, b, ..] => (
            Some(Rgb::new(
                (*r).min(255) as u8,
                (*g).min(255) as u8,
                (*b).min(255) as u8,
            )),
            4,
        ),
        // Truncated argument list: the rest of the sequence belongs to it
        [5] | [2, ..] => (None, args.len()),
        _ => (None, 0),
    };

    (color, if inline { 0 } else { len })
}

impl Perform for RunCollector {
    fn print(&mut self, c: char) {
        self.push_char(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' => {
                self.row += 1;
                self.col = 0;
            }
            b'\t' => {
                self.col = (self.col / TAB_WIDTH + 1) * TAB_WIDTH;
            }
            // Carriage returns come from CRLF output and are dropped
            b'\r' => {}
            _ => {
                debug!("Ignoring control byte {:#04x}", byte);
            }
        }
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], _ignore: bool, action: char) {
        if action == 'm' && intermediates.is_empty() {
            self.apply_sgr(params);
        }
    }
}

/// Scan raw ANSI text into color runs
///
/// Unrecognized SGR codes and non-SGR sequences leave the color unchanged.
pub fn parse_color_runs(raw: &str, default_fg: Rgb) -> TextGrid {
    let mut collector = RunCollector::new(default_fg);
    let mut parser = Parser::new();
    parser.advance(&mut collector, raw.as_bytes());

    let runs = collector.runs;
    let rows = runs.last().map_or(0, |run| run.row + 1);
    let columns = runs.iter().map(ColorRun::end_col).max().unwrap_or(0);

    TextGrid { runs, rows, columns }
}
