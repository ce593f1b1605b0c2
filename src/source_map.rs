//! Source map loading, parsing, caching, and position resolution.
//!
//! Maps a position in a compiled artifact back to its original source:
//!
//! - **Directive scan**: the compiled file's trailing `sourceMappingURL`
//!   comment is located; the *last* occurrence wins, tolerating minifier
//!   artifacts that leave stale directives behind.
//! - **Payload loading**: the directive may carry an inline `data:` URL
//!   (base64 or percent-encoded JSON) or a relative/absolute path to an
//!   external `.map` file, where the URL-decoded candidate is tried before
//!   the raw one.
//! - **Mappings decoding**: the map's base64-VLQ `mappings` string is decoded
//!   into per-line, column-sorted segment tables.
//! - **Lookup**: greatest mapping at or before the queried column, with one
//!   unadjusted retry for runtimes that report 0-based columns.
//!
//! Any failure along the way degrades to "no mapping", cached, never
//! raised. Records and resolved positions (including misses) live in bounded
//! caches guarded by their own locks; a read-compute-write race may repeat
//! work but never corrupts state, since every value is a deterministic
//! function of its key.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Deserialize;

use crate::cache::{BoundedCache, CacheStats};
use crate::classify::{BUILD_OUTPUT_DIR, has_dir_segment};
use crate::types::MappedPosition;

/// Default bound for the source-map record cache.
pub const DEFAULT_RECORD_CACHE_ENTRIES: usize = 32;
/// Default bound for the resolved-position cache.
pub const DEFAULT_POSITION_CACHE_ENTRIES: usize = 4096;
/// Default bound for the recovered original-source content cache.
const DEFAULT_CONTENT_CACHE_ENTRIES: usize = 32;

/// Prefix a bundler uses for project-relative paths in `sources` entries.
const PROJECT_PREFIX: &str = "[project]/";

/// Internal failure taxonomy for map loading. Converted to a cached miss at
/// the cache boundary and logged at debug level, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum SourceMapError {
    /// Reading the compiled file or the external map file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The map payload was not valid JSON.
    #[error("invalid source map JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The compiled file carries no `sourceMappingURL` directive.
    #[error("no sourceMappingURL directive")]
    MissingDirective,
    /// The directive's `data:` payload could not be decoded.
    #[error("undecodable data: URL payload")]
    Payload,
    /// The `mappings` field contained malformed VLQ data.
    #[error("malformed VLQ mappings")]
    Vlq,
}

fn re_source_mapping_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"//[#@]\s*sourceMappingURL=(\S+)")
            .expect("sourceMappingURL pattern is a compile-time constant and must be valid")
    })
}

fn re_url_scheme() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://")
            .expect("URL scheme pattern is a compile-time constant and must be valid")
    })
}

// ---------------------------------------------------------------------------
// Parsed source map
// ---------------------------------------------------------------------------

/// Wire shape of a source map file (the fields this resolver consumes).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap {
    sources: Vec<String>,
    #[serde(default)]
    source_root: Option<String>,
    mappings: String,
    #[serde(default)]
    sources_content: Vec<Option<String>>,
}

/// One decoded mapping segment on a generated line.
#[derive(Debug, Clone, Copy)]
struct Segment {
    /// 0-based column in the generated file.
    generated_column: u32,
    /// Original location, absent for unsourced segments.
    source: Option<SourceRef>,
}

/// A segment's original location (all 0-based).
#[derive(Debug, Clone, Copy)]
struct SourceRef {
    index: u32,
    line: u32,
    column: u32,
}

/// Parsed mapping table for one compiled file.
///
/// Loaded lazily on first lookup for that file and retained subject to cache
/// eviction.
#[derive(Debug)]
pub struct SourceMapRecord {
    sources: Vec<String>,
    source_root: Option<String>,
    sources_content: Vec<Option<String>>,
    /// Per generated line (0-based), column-sorted segments.
    lines: Vec<Vec<Segment>>,
}

impl SourceMapRecord {
    fn parse(json: &[u8]) -> Result<Self, SourceMapError> {
        let raw: RawSourceMap = serde_json::from_slice(json)?;
        let lines = parse_mappings(&raw.mappings, raw.sources.len())?;
        Ok(Self {
            sources: raw.sources,
            source_root: raw.source_root,
            sources_content: raw.sources_content,
            lines,
        })
    }

    /// Greatest segment at or before `column` on `line` (both 0-based).
    ///
    /// Only the nearest segment is consulted; an unsourced nearest segment is
    /// a miss, not a license to scan further left.
    fn lookup(&self, line: u32, column: u32) -> Option<SourceRef> {
        let segments = self.lines.get(line as usize)?;
        let idx = segments.partition_point(|s| s.generated_column <= column);
        segments[..idx].last()?.source
    }

    /// The `sources` entry for a segment, with `sourceRoot` applied.
    fn source_path(&self, index: u32) -> Option<String> {
        let source = self.sources.get(index as usize)?;
        match self.source_root.as_deref() {
            Some(root) if !root.is_empty() => {
                Some(format!("{}/{}", root.trim_end_matches('/'), source))
            }
            _ => Some(source.clone()),
        }
    }

    /// Embedded original text for a source index, when the map carried it.
    fn source_content(&self, index: u32) -> Option<&str> {
        self.sources_content
            .get(index as usize)
            .and_then(|c| c.as_deref())
    }
}

// ---------------------------------------------------------------------------
// VLQ decoding
// ---------------------------------------------------------------------------

fn b64_value(c: char) -> Option<i64> {
    match c {
        'A'..='Z' => Some(c as i64 - 'A' as i64),
        'a'..='z' => Some(c as i64 - 'a' as i64 + 26),
        '0'..='9' => Some(c as i64 - '0' as i64 + 52),
        '+' => Some(62),
        '/' => Some(63),
        _ => None,
    }
}

/// Decode one comma-separated mapping segment of base64 VLQ values.
fn decode_vlq(segment: &str) -> Result<Vec<i64>, SourceMapError> {
    let mut values = Vec::with_capacity(5);
    let mut value: i64 = 0;
    let mut shift: u32 = 0;
    for c in segment.chars() {
        let digit = b64_value(c).ok_or(SourceMapError::Vlq)?;
        value |= (digit & 31) << shift;
        if digit & 32 != 0 {
            shift += 5;
            // 31 << 58 is the last safe shift for an i64 accumulator.
            if shift > 55 {
                return Err(SourceMapError::Vlq);
            }
        } else {
            let negative = value & 1 == 1;
            let magnitude = value >> 1;
            values.push(if negative { -magnitude } else { magnitude });
            value = 0;
            shift = 0;
        }
    }
    if shift != 0 {
        // Trailing continuation bit with no final digit.
        return Err(SourceMapError::Vlq);
    }
    Ok(values)
}

/// Decode the `mappings` string into per-line segment tables.
///
/// Source index, line, and column are running deltas across the whole map;
/// the generated column delta resets at each `;` line boundary.
fn parse_mappings(mappings: &str, source_count: usize) -> Result<Vec<Vec<Segment>>, SourceMapError> {
    let mut lines = Vec::new();
    let mut src_index: i64 = 0;
    let mut src_line: i64 = 0;
    let mut src_column: i64 = 0;

    for group in mappings.split(';') {
        let mut segments = Vec::new();
        let mut generated_column: i64 = 0;
        for raw in group.split(',') {
            if raw.is_empty() {
                continue;
            }
            let fields = decode_vlq(raw)?;
            if fields.is_empty() {
                continue;
            }
            generated_column += fields[0];
            if generated_column < 0 {
                return Err(SourceMapError::Vlq);
            }
            let source = if fields.len() >= 4 {
                src_index += fields[1];
                src_line += fields[2];
                src_column += fields[3];
                if src_index < 0 || src_line < 0 || src_column < 0 {
                    return Err(SourceMapError::Vlq);
                }
                ((src_index as usize) < source_count).then_some(SourceRef {
                    index: src_index as u32,
                    line: src_line as u32,
                    column: src_column as u32,
                })
            } else {
                None
            };
            segments.push(Segment {
                generated_column: generated_column as u32,
                source,
            });
        }
        // Lookup binary-searches on column; maps in the wild are already
        // sorted, but a malformed one must not break the search invariant.
        segments.sort_by_key(|s| s.generated_column);
        lines.push(segments);
    }
    Ok(lines)
}

// ---------------------------------------------------------------------------
// SourceMapResolver
// ---------------------------------------------------------------------------

/// Loads, caches, and queries source maps for compiled files.
pub struct SourceMapResolver {
    /// Parsed records keyed by compiled-file path; misses cached as `None`.
    records: Mutex<BoundedCache<PathBuf, Option<Arc<SourceMapRecord>>>>,
    /// Resolved positions keyed by `(file, line, column)`; misses cached.
    positions: Mutex<BoundedCache<(PathBuf, u32, u32), Option<MappedPosition>>>,
    /// Original text recovered from `sourcesContent`, keyed by normalized
    /// original path.
    contents: Mutex<BoundedCache<PathBuf, Arc<String>>>,
    /// Number of file reads performed (cache effectiveness instrumentation).
    read_count: AtomicU64,
}

impl Default for SourceMapResolver {
    fn default() -> Self {
        Self::new(DEFAULT_RECORD_CACHE_ENTRIES, DEFAULT_POSITION_CACHE_ENTRIES)
    }
}

impl SourceMapResolver {
    /// Create a resolver with the given cache bounds.
    pub fn new(record_entries: usize, position_entries: usize) -> Self {
        Self {
            records: Mutex::new(BoundedCache::new(record_entries)),
            positions: Mutex::new(BoundedCache::new(position_entries)),
            contents: Mutex::new(BoundedCache::new(DEFAULT_CONTENT_CACHE_ENTRIES)),
            read_count: AtomicU64::new(0),
        }
    }

    /// Map a generated position back to its original source location.
    ///
    /// Returns `None`, never an error, when `file` is not a compiled
    /// artifact, carries no usable source map, or has no mapping at the
    /// position. All outcomes, including misses, are cached.
    pub fn resolve_position(
        &self,
        file: &Path,
        line: u32,
        column: u32,
        project_root: &Path,
    ) -> Option<MappedPosition> {
        if file.as_os_str().is_empty() || line == 0 {
            return None;
        }

        let key = (file.to_path_buf(), line, column);
        if let Some(cached) = self.positions.lock().get(&key) {
            return cached.clone();
        }

        let resolved = if is_compiled_artifact(file) {
            self.resolve_uncached(file, line, column, project_root)
        } else {
            // Already-original files are cached as misses so they are never
            // re-examined.
            None
        };

        self.positions.lock().put(key, resolved.clone());
        resolved
    }

    /// Original source text recovered from a map's `sourcesContent`, if a
    /// prior resolution surfaced it for this normalized path.
    pub fn original_content(&self, file: &Path) -> Option<Arc<String>> {
        self.contents.lock().get(&file.to_path_buf()).cloned()
    }

    /// Number of file reads performed so far.
    pub fn file_reads(&self) -> u64 {
        self.read_count.load(Ordering::Relaxed)
    }

    /// Snapshot of the record-cache counters.
    pub fn record_stats(&self) -> CacheStats {
        self.records.lock().stats()
    }

    /// Snapshot of the position-cache counters.
    pub fn position_stats(&self) -> CacheStats {
        self.positions.lock().stats()
    }

    /// Drop all cached records, positions, and recovered contents.
    pub fn clear(&self) {
        self.records.lock().clear();
        self.positions.lock().clear();
        self.contents.lock().clear();
    }

    fn resolve_uncached(
        &self,
        file: &Path,
        line: u32,
        column: u32,
        project_root: &Path,
    ) -> Option<MappedPosition> {
        let record = self.record_for(file)?;

        // Source maps are 0-based in column; retry unadjusted for runtimes
        // that already report 0-based columns.
        let generated_line = line - 1;
        let hit = record
            .lookup(generated_line, column.saturating_sub(1))
            .or_else(|| record.lookup(generated_line, column))?;

        let source = record.source_path(hit.index)?;
        let normalized = normalize_source_path(&source, project_root);

        if let Some(content) = record.source_content(hit.index) {
            self.contents
                .lock()
                .put(normalized.clone(), Arc::new(content.to_string()));
        }

        Some(MappedPosition {
            file: normalized,
            line: hit.line + 1,
            column: hit.column + 1,
        })
    }

    /// Cached record lookup; loads and parses on first access.
    fn record_for(&self, file: &Path) -> Option<Arc<SourceMapRecord>> {
        let key = file.to_path_buf();
        if let Some(cached) = self.records.lock().get(&key) {
            return cached.clone();
        }
        // The lock is not held across I/O; a concurrent resolve may repeat
        // the parse, and either result is valid for the key.
        let record = match self.load_record(file) {
            Ok(record) => Some(Arc::new(record)),
            Err(err) => {
                log::debug!("no source map for {}: {err}", file.display());
                None
            }
        };
        self.records.lock().put(key, record.clone());
        record
    }

    /// Read the compiled file, follow its directive, and parse the map.
    fn load_record(&self, file: &Path) -> Result<SourceMapRecord, SourceMapError> {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        let compiled = std::fs::read_to_string(file)?;
        let directive =
            extract_directive(&compiled).ok_or(SourceMapError::MissingDirective)?;

        let json = if let Some(payload) = directive.strip_prefix("data:") {
            decode_data_url(payload)?
        } else {
            self.read_external_map(file, directive)?
        };
        SourceMapRecord::parse(&json)
    }

    /// Load an external `.map` file referenced by path or URL.
    ///
    /// The URL-decoded candidate is tried before the raw one; candidates are
    /// resolved relative to the compiled file's directory.
    fn read_external_map(&self, file: &Path, reference: &str) -> Result<Vec<u8>, SourceMapError> {
        let reference = reference.strip_prefix("file://").unwrap_or(reference);
        if re_url_scheme().is_match(reference) {
            // A remote map is out of reach for this resolver.
            return Err(SourceMapError::MissingDirective);
        }

        let decoded = percent_decode_str(reference)
            .decode_utf8()
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| reference.to_string());

        let mut candidates = vec![decoded];
        if candidates[0] != reference {
            candidates.push(reference.to_string());
        }

        let dir = file.parent().unwrap_or_else(|| Path::new("."));
        let mut last_err: SourceMapError = SourceMapError::MissingDirective;
        for candidate in candidates {
            let path = if Path::new(&candidate).is_absolute() {
                PathBuf::from(&candidate)
            } else {
                dir.join(&candidate)
            };
            self.read_count.fetch_add(1, Ordering::Relaxed);
            match std::fs::read(&path) {
                Ok(bytes) => return Ok(bytes),
                Err(err) => last_err = SourceMapError::Io(err),
            }
        }
        Err(last_err)
    }
}

/// Whether a path has the shape of a compiled build artifact worth mapping.
///
/// Anything else is treated as already-original and cached as a miss.
fn is_compiled_artifact(file: &Path) -> bool {
    let Some(text) = file.to_str() else {
        return false;
    };
    has_dir_segment(text, BUILD_OUTPUT_DIR)
        && (has_dir_segment(text, "server") || has_dir_segment(text, "chunks"))
}

/// The last `sourceMappingURL` directive in the compiled text, if any.
fn extract_directive(compiled: &str) -> Option<&str> {
    re_source_mapping_url()
        .captures_iter(compiled)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Decode an inline `data:` source map payload.
///
/// The media type declares `;base64` or else the payload is
/// URL-percent-encoded JSON.
fn decode_data_url(rest: &str) -> Result<Vec<u8>, SourceMapError> {
    use base64::Engine as _;
    let (header, payload) = rest.split_once(',').ok_or(SourceMapError::Payload)?;
    if header.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|_| SourceMapError::Payload)
    } else {
        Ok(percent_decode_str(payload).collect())
    }
}

/// Normalize a map's original path onto the project root.
///
/// `[project]/`-prefixed paths expand against the root; scheme-prefixed URLs
/// lose their scheme and leading slashes; remaining relative paths join onto
/// the root; absolute paths pass through.
fn normalize_source_path(source: &str, project_root: &Path) -> PathBuf {
    if let Some(rest) = source.strip_prefix(PROJECT_PREFIX) {
        return project_root.join(rest);
    }

    let stripped = match re_url_scheme().find(source) {
        Some(scheme) => source[scheme.end()..].trim_start_matches('/'),
        None => source,
    };
    let stripped = stripped.strip_prefix("./").unwrap_or(stripped);

    let path = Path::new(stripped);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}
