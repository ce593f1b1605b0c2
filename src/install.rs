//! Install hook: registers the formatter as the process's error
//! stringification strategy.
//!
//! The hook owns the deliberate process-wide singleton: an explicit
//! installed flag plus the formatter instance, guarded by one lock. The flag
//! is set before any fallible work so repeated registration (hot reload) is
//! idempotent. `reset` exists for tests.
//!
//! `format_error` is the outermost orchestration boundary: the single place
//! where a pipeline failure is caught and replaced with the minimal
//! `Name: message` fallback, so error reporting can never crash the host or
//! produce no output at all.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::config::TraceConfig;
use crate::format::TraceFormatter;
use crate::types::RawFrame;
use crate::util::catch_or;

struct InstallState {
    /// Set before any fallible work; repeated installs are no-ops.
    installed: bool,
    formatter: Option<Arc<TraceFormatter>>,
}

static STATE: OnceLock<Mutex<InstallState>> = OnceLock::new();

fn state() -> &'static Mutex<InstallState> {
    STATE.get_or_init(|| {
        Mutex::new(InstallState {
            installed: false,
            formatter: None,
        })
    })
}

/// Install the formatter as the active error-stringification strategy.
///
/// Returns true only when this call performed the installation. A no-op
/// when the feature is disabled or a formatter is already installed.
pub fn install(config: TraceConfig) -> bool {
    if !config.enabled {
        log::debug!("trace-lens disabled by config; install skipped");
        return false;
    }
    let mut state = state().lock();
    if state.installed {
        return false;
    }
    state.installed = true;
    state.formatter = Some(Arc::new(TraceFormatter::new(config)));
    true
}

/// Whether a formatter is currently installed.
pub fn is_installed() -> bool {
    state().lock().installed
}

/// The installed formatter, for diagnostics and cache control.
pub fn formatter() -> Option<Arc<TraceFormatter>> {
    state().lock().formatter.clone()
}

/// Format an error through the installed formatter.
///
/// Never panics: a pipeline failure (or a missing installation) yields the
/// minimal `Name: message` fallback.
pub fn format_error(name: &str, message: &str, frames: &[RawFrame]) -> String {
    let fallback = format!("{name}: {message}");
    let Some(formatter) = formatter() else {
        return fallback;
    };
    catch_or(fallback, || formatter.format(name, message, frames))
}

/// Uninstall and drop the formatter. Intended for tests and hot-reload
/// teardown.
pub fn reset() {
    let mut state = state().lock();
    state.installed = false;
    state.formatter = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serializes tests that touch the process-wide install state.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    fn enabled_config() -> TraceConfig {
        TraceConfig::default()
            .with_project_root("/srv/app")
            .with_color(false)
    }

    #[test]
    fn test_install_is_idempotent() {
        let _guard = TEST_LOCK.lock();
        reset();

        assert!(install(enabled_config()));
        assert!(is_installed());
        // Second install (hot reload) is a no-op.
        assert!(!install(enabled_config()));
        assert!(is_installed());

        reset();
        assert!(!is_installed());
    }

    #[test]
    fn test_disabled_install_is_noop() {
        let _guard = TEST_LOCK.lock();
        reset();

        let mut config = enabled_config();
        config.enabled = false;
        assert!(!install(config));
        assert!(!is_installed());
        assert!(formatter().is_none());
    }

    #[test]
    fn test_format_error_without_install_falls_back() {
        let _guard = TEST_LOCK.lock();
        reset();

        let out = format_error("TypeError", "x is undefined", &[]);
        assert_eq!(out, "TypeError: x is undefined");
    }

    #[test]
    fn test_format_error_through_installed_formatter() {
        let _guard = TEST_LOCK.lock();
        reset();
        install(enabled_config());

        let frames = vec![RawFrame::new("/srv/app/src/index.ts", 3, 1).with_function("main")];
        let out = format_error("Error", "boom", &frames);
        assert!(out.starts_with("Error: boom"));
        assert!(out.contains("at main (src/index.ts:3:1)"));

        reset();
    }
}
