//! Code frame extraction and rendering.
//!
//! Reads the original source file (UTF-8, split on line boundaries, cached
//! by absolute path in a bounded cache), takes a symmetric window of context
//! lines around the target clamped to file bounds, and renders a gutter with
//! common-width line numbers, a `>` marker on the target line, and a caret
//! line under the target column.
//!
//! The caret offset treats each tab as exactly two rendered columns. This is
//! a deliberate approximation carried over from the system's documented
//! behavior, not a terminal-accurate tab expansion.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::cache::{BoundedCache, CacheStats};
use crate::highlight::highlight_line;
use crate::style::{Style, ThemeColors};
use crate::types::{CodeFrame, CodeLine};

/// Default bound for the file-content cache.
pub const DEFAULT_FILE_CACHE_ENTRIES: usize = 64;

/// Builds code excerpts around error locations, caching file contents.
pub struct CodeFrameBuilder {
    /// File contents split into lines, keyed by absolute path.
    files: Mutex<BoundedCache<PathBuf, Arc<Vec<String>>>>,
    /// Number of file reads performed (cache effectiveness instrumentation).
    read_count: AtomicU64,
}

impl Default for CodeFrameBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_CACHE_ENTRIES)
    }
}

impl CodeFrameBuilder {
    /// Create a builder whose file-content cache holds at most
    /// `max_cached_files` entries.
    pub fn new(max_cached_files: usize) -> Self {
        Self {
            files: Mutex::new(BoundedCache::new(max_cached_files)),
            read_count: AtomicU64::new(0),
        }
    }

    /// Build a code frame for `file` around `line`.
    ///
    /// Returns `None` when the file cannot be read, when `line` is 0, or
    /// when `line` exceeds the file's line count.
    pub fn build(
        &self,
        file: &Path,
        line: u32,
        column: u32,
        context_lines: usize,
    ) -> Option<CodeFrame> {
        let lines = self.file_lines(file)?;
        window(&lines, line, column, context_lines)
    }

    /// Build a code frame from already-loaded source text.
    ///
    /// Used when the original file is not on disk but the source map carried
    /// its content inline.
    pub fn build_from_text(
        text: &str,
        line: u32,
        column: u32,
        context_lines: usize,
    ) -> Option<CodeFrame> {
        let lines: Vec<String> = text.lines().map(String::from).collect();
        window(&lines, line, column, context_lines)
    }

    /// Number of file reads performed so far.
    pub fn file_reads(&self) -> u64 {
        self.read_count.load(Ordering::Relaxed)
    }

    /// Snapshot of the file-content cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.files.lock().stats()
    }

    /// Drop all cached file contents.
    pub fn clear(&self) {
        self.files.lock().clear();
    }

    /// Cached file contents, reading the file on first access.
    ///
    /// Read failures are not cached: the file may appear later, and a failed
    /// lookup is cheap.
    fn file_lines(&self, file: &Path) -> Option<Arc<Vec<String>>> {
        if let Some(lines) = self.files.lock().get(&file.to_path_buf()) {
            return Some(Arc::clone(lines));
        }
        self.read_count.fetch_add(1, Ordering::Relaxed);
        let text = match std::fs::read_to_string(file) {
            Ok(text) => text,
            Err(err) => {
                log::debug!("code frame: cannot read {}: {err}", file.display());
                return None;
            }
        };
        let lines: Arc<Vec<String>> = Arc::new(text.lines().map(String::from).collect());
        self.files
            .lock()
            .put(file.to_path_buf(), Arc::clone(&lines));
        Some(lines)
    }
}

/// Take the symmetric context window around `line`, clamped to file bounds.
fn window(lines: &[String], line: u32, column: u32, context_lines: usize) -> Option<CodeFrame> {
    if line == 0 || line as usize > lines.len() {
        return None;
    }
    let first = (line as usize).saturating_sub(context_lines).max(1);
    let last = (line as usize + context_lines).min(lines.len());

    let code_lines = (first..=last)
        .map(|n| CodeLine {
            number: n as u32,
            text: lines[n - 1].clone(),
            is_target: n as u32 == line,
        })
        .collect();

    Some(CodeFrame {
        lines: code_lines,
        target_line: line,
        target_column: column,
    })
}

/// Render a code frame as gutter-prefixed text lines.
///
/// Line numbers are padded to a common width; the target line carries a `>`
/// marker; when the target column is known a caret line is appended beneath
/// the target. Tabs before the caret count as two rendered columns.
pub fn render_code_frame(frame: &CodeFrame, theme: &ThemeColors, color: bool) -> String {
    let width = frame
        .lines
        .iter()
        .map(|l| l.number.to_string().len())
        .max()
        .unwrap_or(1);

    let gutter_style = Style::fg(theme.palette[8]);
    let marker_style = Style::fg(theme.palette[9]).bold();

    let mut out = Vec::with_capacity(frame.lines.len() + 1);
    for code_line in &frame.lines {
        let number = format!("{:>width$}", code_line.number);
        let text = highlight_line(&code_line.text, theme, color);
        if code_line.is_target {
            out.push(format!(
                "{} {} {} {}",
                marker_style.paint(">", color),
                marker_style.paint(&number, color),
                gutter_style.paint("|", color),
                text
            ));
            if frame.target_column > 0 {
                let offset = caret_offset(&code_line.text, frame.target_column);
                out.push(format!(
                    "  {} {} {}{}",
                    " ".repeat(width),
                    gutter_style.paint("|", color),
                    " ".repeat(offset),
                    marker_style.paint("^", color)
                ));
            }
        } else {
            out.push(format!(
                "  {} {} {}",
                gutter_style.paint(&number, color),
                gutter_style.paint("|", color),
                text
            ));
        }
    }
    out.join("\n")
}

/// Rendered-column offset of a 1-based column, counting tabs as two columns.
fn caret_offset(text: &str, column: u32) -> usize {
    text.chars()
        .take(column.saturating_sub(1) as usize)
        .map(|c| if c == '\t' { 2 } else { 1 })
        .sum()
}
