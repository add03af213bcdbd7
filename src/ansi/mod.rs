//! ANSI text handling: escape stripping, palette and color runs

mod codes;
mod runs;

pub use codes::{ansi_256_to_rgb, contains_ansi, strip_ansi_codes, Rgb};
pub use runs::{parse_color_runs, ColorRun, TextGrid};
