//! Identity resolver: one canonical frame per completed track.

use crate::config::ResolverSettings;
use crate::tracker::{CompletedTree, TrackEntry};

/// Pick the representative entry of a completed track.
///
/// Gap entries are ignored. Tracks with fewer than `min_track_len` valid
/// entries are noise and yield nothing. Otherwise the entry whose `y` is
/// closest to `center_y` wins; ties keep the earliest frame.
pub fn resolve_identity(tree: &CompletedTree, settings: &ResolverSettings) -> Option<TrackEntry> {
    let valid = tree.valid_len();
    if valid < settings.min_track_len {
        log::debug!(
            "resolver: discarded track of {} valid frames (< {})",
            valid,
            settings.min_track_len
        );
        return None;
    }

    tree.valid_entries()
        .filter_map(|entry| entry.selected_y.map(|y| (entry, (y - settings.center_y).abs())))
        .fold(None, |best: Option<(&TrackEntry, f64)>, (entry, dist)| match best {
            Some((b, best_dist)) if best_dist <= dist => Some((b, best_dist)),
            _ => Some((entry, dist)),
        })
        .map(|(entry, _)| *entry)
}
