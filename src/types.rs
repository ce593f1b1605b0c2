//! Core data types for the trace-lens pipeline.

use std::path::PathBuf;

/// A raw, unmapped stack location as captured by the host runtime.
///
/// Lives for the duration of one formatting call; the pipeline never mutates
/// it and never captures frames itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// The file path as reported by the runtime (`None` for eval'd or
    /// native frames).
    pub file: Option<String>,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
    /// The function name, if the runtime knew one.
    pub function_name: Option<String>,
    /// Whether this frame was an `await` continuation.
    pub is_async: bool,
}

impl RawFrame {
    /// Convenience constructor for a named frame.
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: Some(file.into()),
            line,
            column,
            function_name: None,
            is_async: false,
        }
    }

    /// Builder-style function name setter.
    pub fn with_function(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    /// Builder-style async flag setter.
    pub fn with_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }
}

/// A raw frame's location translated through a source map to
/// original-source coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedPosition {
    /// Normalized absolute path of the original source file.
    pub file: PathBuf,
    /// 1-based line in the original source.
    pub line: u32,
    /// 1-based column in the original source.
    pub column: u32,
}

/// Classification of a frame by origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Application code under the configured project root.
    Project,
    /// Third-party dependency code.
    Vendor,
    /// Runtime built-ins, framework internals, or unresolved locations.
    /// Always dropped from output.
    Internal,
}

/// A frame after mapping and classification.
///
/// `kind` is a pure function of `file` and the configured project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    /// Resolved (possibly source-mapped) file path.
    pub file: PathBuf,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
    /// The function name, if known.
    pub function_name: Option<String>,
    /// Whether this frame was an `await` continuation.
    pub is_async: bool,
    /// Origin classification.
    pub kind: FrameKind,
}

/// A placeholder for one or more consecutive omitted frames of one kind.
///
/// Never represents `Internal` frames; those are dropped, not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollapsedMarker {
    /// How many consecutive frames were folded (≥ 1).
    pub count: usize,
    /// The kind of the folded frames (`Project` or `Vendor`).
    pub kind: FrameKind,
}

/// One entry of a collapsed trace: either a kept frame or a fold marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEntry {
    /// A frame kept in place.
    Frame(FrameInfo),
    /// A run of omitted frames.
    Collapsed(CollapsedMarker),
}

/// A single line of a code excerpt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLine {
    /// 1-based line number in the source file.
    pub number: u32,
    /// The raw line text, without trailing newline.
    pub text: String,
    /// Whether this is the error's target line.
    pub is_target: bool,
}

/// A rendered excerpt of source lines surrounding an error location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFrame {
    /// Context lines in file order, exactly one marked as target.
    pub lines: Vec<CodeLine>,
    /// 1-based target line number.
    pub target_line: u32,
    /// 1-based target column (0 means no column known, so no caret line).
    pub target_column: u32,
}
