//! Terminal colour primitives.

use colored::Colorize;

/// A colour the UI can apply to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// No decoration.
    Plain,
    /// In-progress work and modifications.
    Blue,
    /// Failures, rollbacks and removals.
    Red,
    /// Completed work and additions.
    Green,
    /// Headings.
    Yellow,
}

/// Maps a tone to decorated text.
pub trait Palette: Send + Sync {
    /// Returns `text` decorated with `tone`.
    fn paint(&self, tone: Tone, text: &str) -> String;
}

/// ANSI colours via `colored`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiPalette;

impl Palette for AnsiPalette {
    fn paint(&self, tone: Tone, text: &str) -> String {
        match tone {
            Tone::Plain => text.to_string(),
            Tone::Blue => text.blue().to_string(),
            Tone::Red => text.red().to_string(),
            Tone::Green => text.green().to_string(),
            Tone::Yellow => text.yellow().to_string(),
        }
    }
}

/// Leaves text untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainPalette;

impl Palette for PlainPalette {
    fn paint(&self, _tone: Tone, text: &str) -> String {
        text.to_string()
    }
}
