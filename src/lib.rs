//! Source-map aware stack trace pretty-printing.
//!
//! Takes a raw, unmapped stack trace captured by the host runtime, resolves
//! each frame through source maps back to original source locations,
//! classifies frames by origin, collapses uninteresting runs, and renders a
//! human-readable, optionally ANSI-colorized report with an inline excerpt
//! of the offending source line.
//!
//! # Module Structure
//!
//! The pipeline is organized into three functional layers:
//!
//! ## Resolution Layer
//! - [`source_map`] — loads, parses, and caches source maps for compiled
//!   files (inline `data:` or external `.map`, base64 or percent-encoded)
//!   and maps generated positions to original ones.
//! - [`classify`] — assigns each resolved path a kind: project, vendor, or
//!   internal.
//! - [`collapse`] — folds runs of uninteresting frames into markers.
//!
//! ## Rendering Layer
//! - [`code_frame`] — extracts and renders source excerpts with a gutter,
//!   target marker, and column caret.
//! - [`highlight`] — single-line syntax highlighting with masked comments
//!   and strings.
//! - [`style`] — theme palette and SGR escape rendering.
//! - [`format`] — `TraceFormatter`: the orchestrator composing all of the
//!   above into the final report.
//!
//! ## Hosting Layer
//! - [`config`] — `TraceConfig`: pipeline settings from a host config file
//!   or `TRACE_LENS_*` environment variables.
//! - [`install`] — process-wide, idempotent registration of the formatter
//!   as the host's error-stringification strategy, with the single
//!   panic-to-fallback boundary.
//!
//! ## Shared
//! - [`types`] — frame, marker, and code-frame data types.
//! - [`cache`] — bounded insertion-order cache with drop-oldest-half
//!   eviction.
//! - [`util`] — the `catch_or` safe-call wrapper.
//!
//! # Example
//!
//! ```
//! use trace_lens::config::TraceConfig;
//! use trace_lens::format::TraceFormatter;
//! use trace_lens::types::RawFrame;
//!
//! let config = TraceConfig::default()
//!     .with_project_root("/srv/app")
//!     .with_color(false);
//! let formatter = TraceFormatter::new(config);
//!
//! let frames = vec![
//!     RawFrame::new("/srv/app/src/index.ts", 10, 5).with_function("handle"),
//!     RawFrame::new("/srv/app/node_modules/lib/run.js", 3, 1),
//! ];
//! let report = formatter.format("TypeError", "x is undefined", &frames);
//! assert!(report.starts_with("TypeError: x is undefined"));
//! ```

pub mod cache;
pub mod classify;
pub mod code_frame;
pub mod collapse;
pub mod config;
pub mod format;
pub mod highlight;
pub mod install;
pub mod source_map;
pub mod style;
pub mod types;
pub mod util;

pub use cache::{BoundedCache, CacheStats};
pub use classify::classify;
pub use code_frame::CodeFrameBuilder;
pub use collapse::collapse;
pub use config::TraceConfig;
pub use format::{FormatterStats, TraceFormatter};
pub use highlight::highlight_line;
pub use install::{format_error, install, is_installed};
pub use source_map::SourceMapResolver;
pub use style::{Style, ThemeColors};
pub use types::{
    CodeFrame, CodeLine, CollapsedMarker, FrameInfo, FrameKind, MappedPosition, RawFrame,
    TraceEntry,
};
