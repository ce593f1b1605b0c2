//! Frame collapsing: folds uninteresting runs into markers.
//!
//! A single left-to-right pass over classified frames. Internal frames are
//! dropped unconditionally and never counted. Runs are determined strictly
//! by adjacency *after* internal removal, so an internal frame between two
//! project frames does not split their run, while a vendor frame does.

use crate::types::{CollapsedMarker, FrameInfo, FrameKind, TraceEntry};

/// Collapse a classified frame sequence into kept frames and fold markers.
///
/// - `internal` frames are dropped (never counted, never shown).
/// - A run of consecutive `project` frames keeps at most
///   `max_project_frames`; the remainder folds into one project marker.
/// - A run of consecutive `vendor` frames is kept whole when `show_vendor`,
///   otherwise the whole run folds into one vendor marker.
///
/// A count-1 marker is still emitted rather than showing the single frame,
/// keeping marker emission predictable for callers.
pub fn collapse(
    frames: &[FrameInfo],
    max_project_frames: usize,
    show_vendor: bool,
) -> Vec<TraceEntry> {
    let kept: Vec<&FrameInfo> = frames
        .iter()
        .filter(|f| f.kind != FrameKind::Internal)
        .collect();

    let mut out = Vec::with_capacity(kept.len());
    let mut i = 0;
    while i < kept.len() {
        let kind = kept[i].kind;
        let start = i;
        while i < kept.len() && kept[i].kind == kind {
            i += 1;
        }
        let run = &kept[start..i];

        match kind {
            FrameKind::Project => {
                let visible = run.len().min(max_project_frames);
                for frame in &run[..visible] {
                    out.push(TraceEntry::Frame((*frame).clone()));
                }
                let folded = run.len() - visible;
                if folded > 0 {
                    out.push(TraceEntry::Collapsed(CollapsedMarker {
                        count: folded,
                        kind,
                    }));
                }
            }
            FrameKind::Vendor => {
                if show_vendor {
                    for frame in run {
                        out.push(TraceEntry::Frame((*frame).clone()));
                    }
                } else {
                    out.push(TraceEntry::Collapsed(CollapsedMarker {
                        count: run.len(),
                        kind,
                    }));
                }
            }
            FrameKind::Internal => unreachable!("internal frames filtered above"),
        }
    }
    out
}
