//! Frame classification: project / vendor / internal from a resolved path.
//!
//! `kind` is a pure function of the file path and the configured project
//! root. Rules apply in priority order; the order matters because a
//! build-output path is only rescued to project status when it sits inside
//! the chunks subdirectory (the part expected to source-map back to project
//! code). Every other build-output path is framework internals.

use std::path::Path;

use crate::types::FrameKind;

/// Scheme marker for runtime built-in modules (`node:internal/...`).
const BUILTIN_SCHEME: &str = "node:";
/// Directory segment used by runtime internals (`internal/process/...`).
const INTERNAL_SEGMENT: &str = "internal";
/// Build-output directory produced by the bundler.
pub(crate) const BUILD_OUTPUT_DIR: &str = ".next";
/// Subdirectory of the build output holding mappable compiled chunks.
const CHUNKS_SEGMENT: &str = "chunks";
/// Directory segment holding third-party dependencies.
const VENDOR_SEGMENT: &str = "node_modules";

/// Classify a frame's file path.
///
/// Rules, in priority order:
/// 1. no file, or a runtime built-in scheme (`node:...`) → internal
/// 2. an `internal/` runtime directory segment → internal
/// 3. under the build-output directory but not its `chunks` subdirectory
///    → internal
/// 4. a `node_modules` segment → vendor
/// 5. under the project root → project
/// 6. anything else → internal
pub fn classify(file: Option<&str>, project_root: &Path) -> FrameKind {
    let Some(file) = file else {
        return FrameKind::Internal;
    };
    if file.is_empty() || file.starts_with(BUILTIN_SCHEME) {
        return FrameKind::Internal;
    }
    if has_dir_segment(file, INTERNAL_SEGMENT) {
        return FrameKind::Internal;
    }
    if has_dir_segment(file, BUILD_OUTPUT_DIR) && !has_dir_segment(file, CHUNKS_SEGMENT) {
        return FrameKind::Internal;
    }
    if has_dir_segment(file, VENDOR_SEGMENT) {
        return FrameKind::Vendor;
    }
    if Path::new(file).starts_with(project_root) {
        return FrameKind::Project;
    }
    FrameKind::Internal
}

/// Whether `path` contains `segment` as a whole path component.
///
/// Runtimes report paths with forward slashes regardless of platform, so
/// both separators are honored.
pub(crate) fn has_dir_segment(path: &str, segment: &str) -> bool {
    path.split(['/', '\\']).any(|part| part == segment)
}
