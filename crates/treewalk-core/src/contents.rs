//! Text of one audited file, split into lines.

use crate::utils::text::{is_blank, length_expanded_tabs, split_lines};
use std::path::{Path, PathBuf};

/// File text shared by checks and filters during one walk.
#[derive(Debug, Clone, Default)]
pub struct FileContents {
    path: PathBuf,
    text: String,
    lines: Vec<String>,
}

impl FileContents {
    /// Wraps already loaded text.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = split_lines(&text);
        Self {
            path: path.into(),
            text,
            lines,
        }
    }

    /// Reads a file from disk. Invalid UTF-8 is replaced, not rejected.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be read.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Self::new(path, text))
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// All lines, without terminators.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Line `number` (1-indexed).
    #[must_use]
    pub fn line(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
    }

    /// Number of lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Column of a 0-based character position with tabs expanded.
    #[must_use]
    pub fn expanded_column(&self, line: usize, column: usize, tab_width: usize) -> usize {
        self.line(line)
            .map_or(column, |text| length_expanded_tabs(text, column, tab_width))
    }

    /// Returns true if line `number` is missing or whitespace only.
    #[must_use]
    pub fn is_blank_line(&self, number: usize) -> bool {
        self.line(number).map_or(true, is_blank)
    }
}
