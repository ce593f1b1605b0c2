//! Pipeline configuration.
//!
//! `TraceConfig` is read once and cached for the process lifetime by the
//! install hook. It deserializes from a host config file (every field has a
//! serde default) and can be assembled from `TRACE_LENS_*` environment
//! variables. Invalid numeric or boolean values fall back to the documented
//! default with a one-line warning naming the offending setting.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default cap on consecutive project frames shown before folding.
pub const DEFAULT_MAX_PROJECT_FRAMES: usize = 8;
/// Default number of context lines on each side of a code frame target.
pub const DEFAULT_CONTEXT_LINES: usize = 2;

fn default_enabled() -> bool {
    true
}

fn default_project_root() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn default_color() -> bool {
    true
}

fn default_max_project_frames() -> usize {
    DEFAULT_MAX_PROJECT_FRAMES
}

fn default_show_vendor() -> bool {
    false
}

fn default_show_markers() -> bool {
    true
}

fn default_context_lines() -> usize {
    DEFAULT_CONTEXT_LINES
}

/// Immutable settings for the trace formatting pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Whether the formatter installs at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Absolute root of the application's source tree.
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,
    /// Whether to emit ANSI color sequences.
    #[serde(default = "default_color")]
    pub color: bool,
    /// Consecutive project frames kept before folding (default: 8).
    #[serde(default = "default_max_project_frames")]
    pub max_project_frames: usize,
    /// Whether vendor frames are shown or folded into a marker.
    #[serde(default = "default_show_vendor")]
    pub show_vendor: bool,
    /// Whether fold markers are emitted; when false, collapsed frames
    /// vanish silently.
    #[serde(default = "default_show_markers")]
    pub show_markers: bool,
    /// Context lines on each side of a code frame target (default: 2).
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            project_root: default_project_root(),
            color: default_color(),
            max_project_frames: default_max_project_frames(),
            show_vendor: default_show_vendor(),
            show_markers: default_show_markers(),
            context_lines: default_context_lines(),
        }
    }
}

impl TraceConfig {
    /// Build a config from `TRACE_LENS_*` environment variables, falling
    /// back to defaults for unset or unparsable values.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_bool("TRACE_LENS_ENABLED") {
            config.enabled = v;
        }
        if let Ok(root) = std::env::var("TRACE_LENS_PROJECT_ROOT") {
            if !root.is_empty() {
                config.project_root = PathBuf::from(root);
            }
        }
        if let Some(v) = env_bool("TRACE_LENS_COLOR") {
            config.color = v;
        }
        if let Some(v) = env_usize(
            "TRACE_LENS_MAX_PROJECT_FRAMES",
            DEFAULT_MAX_PROJECT_FRAMES,
        ) {
            config.max_project_frames = v;
        }
        if let Some(v) = env_bool("TRACE_LENS_SHOW_VENDOR") {
            config.show_vendor = v;
        }
        if let Some(v) = env_bool("TRACE_LENS_SHOW_MARKERS") {
            config.show_markers = v;
        }
        if let Some(v) = env_usize("TRACE_LENS_CONTEXT_LINES", DEFAULT_CONTEXT_LINES) {
            config.context_lines = v;
        }
        config
    }

    /// Builder-style project root setter.
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    /// Builder-style color setter.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Builder-style project frame cap setter.
    pub fn with_max_project_frames(mut self, max: usize) -> Self {
        self.max_project_frames = max;
        self
    }

    /// Builder-style vendor visibility setter.
    pub fn with_show_vendor(mut self, show: bool) -> Self {
        self.show_vendor = show;
        self
    }

    /// Builder-style marker visibility setter.
    pub fn with_show_markers(mut self, show: bool) -> Self {
        self.show_markers = show;
        self
    }

    /// Builder-style context line count setter.
    pub fn with_context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }
}

/// Parse a boolean environment variable; `None` when unset or unparsable.
fn env_bool(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            log::warn!("{name}={raw} is not a boolean; keeping the default");
            None
        }
    }
}

/// Parse an integer environment variable; `None` when unset or unparsable.
fn env_usize(name: &str, default: usize) -> Option<usize> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("{name}={raw} is not an integer; using the default {default}");
            None
        }
    }
}
