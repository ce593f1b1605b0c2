//! Stack trace formatting: the pipeline orchestrator.
//!
//! Composes the resolver, classifier, collapser, code-frame builder, and
//! highlighter into the final multi-line report: header, kept frame lines,
//! fold markers, and at most one code frame for the first kept project
//! frame.
//!
//! Formatting never raises: resolution misses keep the frame as given, and
//! a missing code frame is simply omitted. Anything worse is caught by the
//! install hook's fallback, not suppressed here.

use std::path::{Path, PathBuf};

use crate::cache::CacheStats;
use crate::classify::classify;
use crate::code_frame::{CodeFrameBuilder, render_code_frame};
use crate::collapse::collapse;
use crate::config::TraceConfig;
use crate::source_map::SourceMapResolver;
use crate::style::{Style, ThemeColors};
use crate::types::{CollapsedMarker, FrameInfo, FrameKind, RawFrame, TraceEntry};

/// Placeholder path for frames whose file the runtime did not resolve.
/// Classified internal, so such frames never reach the output.
const UNRESOLVED_FILE: &str = "<unknown>";

/// Snapshot of all pipeline cache counters.
#[derive(Debug, Clone, Copy)]
pub struct FormatterStats {
    /// Source-map record cache.
    pub record_cache: CacheStats,
    /// Resolved-position cache.
    pub position_cache: CacheStats,
    /// File-content cache.
    pub file_cache: CacheStats,
    /// File reads performed by the resolver.
    pub resolver_reads: u64,
    /// File reads performed by the code-frame builder.
    pub code_frame_reads: u64,
}

/// Formats raw stack traces into human-readable reports.
pub struct TraceFormatter {
    config: TraceConfig,
    theme: ThemeColors,
    resolver: SourceMapResolver,
    code_frames: CodeFrameBuilder,
}

impl TraceFormatter {
    /// Create a formatter with the default theme.
    pub fn new(config: TraceConfig) -> Self {
        Self::with_theme(config, ThemeColors::default())
    }

    /// Create a formatter with a specific theme.
    pub fn with_theme(config: TraceConfig, theme: ThemeColors) -> Self {
        Self {
            config,
            theme,
            resolver: SourceMapResolver::default(),
            code_frames: CodeFrameBuilder::default(),
        }
    }

    /// The formatter's configuration.
    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Format one error report.
    ///
    /// `name` and `message` form the header; `frames` is the runtime's
    /// ordered capture, outermost call last.
    pub fn format(&self, name: &str, message: &str, frames: &[RawFrame]) -> String {
        let color = self.config.color;
        let root = &self.config.project_root;

        let mapped: Vec<FrameInfo> = frames.iter().map(|raw| self.map_frame(raw)).collect();
        let entries = collapse(
            &mapped,
            self.config.max_project_frames,
            self.config.show_vendor,
        );

        let header_style = Style::fg(self.theme.palette[9]).bold();
        let mut out = Vec::with_capacity(entries.len() + 1);
        out.push(header_style.paint(&format!("{name}: {message}"), color));

        for entry in &entries {
            match entry {
                TraceEntry::Frame(frame) => out.push(self.frame_line(frame, root)),
                TraceEntry::Collapsed(marker) => {
                    if self.config.show_markers {
                        out.push(self.marker_line(marker));
                    }
                }
            }
        }

        if let Some(rendered) = self.first_project_code_frame(&entries) {
            out.push(String::new());
            out.push(rendered);
        }

        out.join("\n")
    }

    /// Drop every cached source map, position, and file content.
    pub fn clear_caches(&self) {
        self.resolver.clear();
        self.code_frames.clear();
    }

    /// Snapshot of all cache counters.
    pub fn stats(&self) -> FormatterStats {
        FormatterStats {
            record_cache: self.resolver.record_stats(),
            position_cache: self.resolver.position_stats(),
            file_cache: self.code_frames.cache_stats(),
            resolver_reads: self.resolver.file_reads(),
            code_frame_reads: self.code_frames.file_reads(),
        }
    }

    /// Map one raw frame through the resolver and classify the result.
    ///
    /// Resolution misses keep the frame as given; frames without a file get
    /// a placeholder path and the internal kind, which drops them later.
    fn map_frame(&self, raw: &RawFrame) -> FrameInfo {
        let root = &self.config.project_root;
        let (file, line, column) = match raw.file.as_deref() {
            Some(reported) => {
                match self
                    .resolver
                    .resolve_position(Path::new(reported), raw.line, raw.column, root)
                {
                    Some(mapped) => (mapped.file, mapped.line, mapped.column),
                    None => (PathBuf::from(reported), raw.line, raw.column),
                }
            }
            None => (PathBuf::from(UNRESOLVED_FILE), raw.line, raw.column),
        };

        let kind = match raw.file {
            Some(_) => classify(file.to_str(), root),
            None => FrameKind::Internal,
        };

        FrameInfo {
            file,
            line,
            column,
            function_name: raw.function_name.clone(),
            is_async: raw.is_async,
            kind,
        }
    }

    /// Render one kept frame as `at [async ]name (relpath:line:col)`.
    fn frame_line(&self, frame: &FrameInfo, root: &Path) -> String {
        let color = self.config.color;
        let location = format!(
            "{}:{}:{}",
            relative_path(&frame.file, root),
            frame.line,
            frame.column
        );
        let async_prefix = if frame.is_async { "async " } else { "" };

        if frame.kind == FrameKind::Vendor {
            // Vendor frames render in one dimmed sweep.
            let dim = Style::fg(self.theme.palette[8]);
            let line = match &frame.function_name {
                Some(name) => format!("    at {async_prefix}{name} ({location})"),
                None => format!("    at {async_prefix}{location}"),
            };
            return dim.paint(&line, color);
        }

        let at = Style::fg(self.theme.palette[8]).paint("at", color);
        let path = Style::fg(self.theme.palette[6]).paint(&location, color);
        match &frame.function_name {
            Some(name) => format!("    {at} {async_prefix}{name} ({path})"),
            None => format!("    {at} {async_prefix}{path}"),
        }
    }

    /// Render one fold marker line.
    fn marker_line(&self, marker: &CollapsedMarker) -> String {
        let text = match marker.kind {
            FrameKind::Project => format!(
                "    ... {} more project frame{}",
                marker.count,
                plural(marker.count)
            ),
            _ => format!(
                "    ... {} frame{} hidden",
                marker.count,
                plural(marker.count)
            ),
        };
        Style::fg(self.theme.palette[8])
            .italic()
            .paint(&text, self.config.color)
    }

    /// Build the code frame for the first kept project frame, if any.
    ///
    /// Falls back to source text recovered from the map's `sourcesContent`
    /// when the original file is not on disk. At most one code frame per
    /// report.
    fn first_project_code_frame(&self, entries: &[TraceEntry]) -> Option<String> {
        let frame = entries.iter().find_map(|entry| match entry {
            TraceEntry::Frame(frame) if frame.kind == FrameKind::Project => Some(frame),
            _ => None,
        })?;

        let built = self
            .code_frames
            .build(
                &frame.file,
                frame.line,
                frame.column,
                self.config.context_lines,
            )
            .or_else(|| {
                let content = self.resolver.original_content(&frame.file)?;
                CodeFrameBuilder::build_from_text(
                    &content,
                    frame.line,
                    frame.column,
                    self.config.context_lines,
                )
            })?;

        Some(render_code_frame(&built, &self.theme, self.config.color))
    }
}

/// A path rendered relative to the project root when possible.
fn relative_path(file: &Path, root: &Path) -> String {
    file.strip_prefix(root)
        .unwrap_or(file)
        .display()
        .to_string()
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}
