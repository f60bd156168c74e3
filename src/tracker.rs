//! Continuity tracker.
//!
//! Folds the per-frame candidate signal of one stream into tree tracks.
//! Normalized `y` shrinks as a trunk that entered at the bottom of the frame
//! moves up while the vehicle advances; a reading that jumps by `y_gap` or
//! more from the last one belongs to a new trunk.
//!
//! One tracker per stream. State is owned exclusively by the instance, so
//! trackers for different streams can run on different threads.

use crate::config::TrackerSettings;
use crate::detect::Detection;

/// One frame's contribution to a track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackEntry {
    /// `None` for a gap frame.
    pub selected_y: Option<f64>,
    pub frame_id: u64,
    /// Diagnostic non-black ratio of the fixed crop, when the image was readable.
    pub ratio: Option<f64>,
}

/// A track at the moment it was closed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompletedTree {
    pub entries: Vec<TrackEntry>,
}

impl CompletedTree {
    /// Entries with a selected `y`, in frame order.
    pub fn valid_entries(&self) -> impl Iterator<Item = &TrackEntry> {
        self.entries.iter().filter(|e| e.selected_y.is_some())
    }

    pub fn valid_len(&self) -> usize {
        self.valid_entries().count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn frame_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().map(|e| e.frame_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerState {
    /// No track open.
    Empty,
    /// Accumulating frames into the open track.
    Tracking,
}

pub struct ContinuityTracker {
    settings: TrackerSettings,
    active_track: Vec<TrackEntry>,
    last_nonempty_y: Option<f64>,
}

impl ContinuityTracker {
    pub fn new(settings: TrackerSettings) -> Self {
        Self {
            settings,
            active_track: Vec::new(),
            last_nonempty_y: None,
        }
    }

    pub fn state(&self) -> TrackerState {
        if self.active_track.is_empty() {
            TrackerState::Empty
        } else {
            TrackerState::Tracking
        }
    }

    pub fn active_track(&self) -> &[TrackEntry] {
        &self.active_track
    }

    pub fn last_nonempty_y(&self) -> Option<f64> {
        self.last_nonempty_y
    }

    /// Reduce a frame's gated candidates to the single tracked `y`.
    pub fn select_y(&self, candidates: &[Detection]) -> Option<f64> {
        match candidates {
            [] => None,
            [only] => Some(only.y_center),
            many => {
                let ys = many.iter().map(|d| d.y_center);
                match self.last_nonempty_y {
                    Some(last) => closest_below(ys.clone(), last).or_else(|| max_y(ys)),
                    // New trunks enter near the bottom of the frame.
                    None => max_y(ys),
                }
            }
        }
    }

    /// Fold one frame's gated candidates into the tracker.
    ///
    /// Returns the previous track when this frame starts a new tree.
    pub fn observe(
        &mut self,
        frame_id: u64,
        candidates: &[Detection],
        ratio: Option<f64>,
    ) -> Option<CompletedTree> {
        let selected_y = self.select_y(candidates);
        self.observe_y(frame_id, selected_y, ratio)
    }

    /// Fold an already-selected `y` (or a gap) into the tracker.
    pub fn observe_y(
        &mut self,
        frame_id: u64,
        selected_y: Option<f64>,
        ratio: Option<f64>,
    ) -> Option<CompletedTree> {
        let entry = TrackEntry {
            selected_y,
            frame_id,
            ratio,
        };
        let prev_y = self.last_nonempty_y;

        let completed = match (selected_y, prev_y) {
            (Some(y), Some(prev)) if (y - prev).abs() < self.settings.y_gap => {
                log::debug!("frame {}: y={:.4} continues track (prev {:.4})", frame_id, y, prev);
                self.active_track.push(entry);
                None
            }
            (Some(y), Some(prev)) => {
                log::debug!(
                    "frame {}: y={:.4} jumps from {:.4}, new tree",
                    frame_id,
                    y,
                    prev
                );
                let finished = std::mem::replace(&mut self.active_track, vec![entry]);
                (!finished.is_empty()).then_some(CompletedTree { entries: finished })
            }
            (Some(y), None) => {
                log::debug!("frame {}: y={:.4} opens track", frame_id, y);
                self.active_track.push(entry);
                None
            }
            (None, _) => {
                log::debug!("frame {}: gap", frame_id);
                self.active_track.push(entry);
                None
            }
        };

        if selected_y.is_some() {
            self.last_nonempty_y = selected_y;
        }
        completed
    }

    /// Close the open track at end of stream. The tracker starts fresh afterwards.
    pub fn finish(&mut self) -> Option<CompletedTree> {
        self.last_nonempty_y = None;
        let finished = std::mem::take(&mut self.active_track);
        (!finished.is_empty()).then_some(CompletedTree { entries: finished })
    }

    /// Drop the open track without emitting it. Returns how many entries were discarded.
    pub fn cancel(&mut self) -> usize {
        self.last_nonempty_y = None;
        let dropped = self.active_track.len();
        self.active_track.clear();
        dropped
    }
}

/// Largest `y` strictly below `last` (the one closest to it). Ties keep the first.
fn closest_below(ys: impl Iterator<Item = f64>, last: f64) -> Option<f64> {
    ys.filter(|y| *y < last)
        .fold(None, |best: Option<f64>, y| match best {
            Some(b) if (b - last).abs() <= (y - last).abs() => Some(b),
            _ => Some(y),
        })
}

fn max_y(ys: impl Iterator<Item = f64>) -> Option<f64> {
    ys.fold(None, |best: Option<f64>, y| match best {
        Some(b) if b >= y => Some(b),
        _ => Some(y),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(y: f64) -> Detection {
        Detection::new(0, 0.2, y, 0.1, 0.1)
    }

    fn tracker() -> ContinuityTracker {
        ContinuityTracker::new(TrackerSettings::default())
    }

    #[test]
    fn selects_single_candidate() {
        let t = tracker();
        assert_eq!(t.select_y(&[]), None);
        assert_eq!(t.select_y(&[det(0.42)]), Some(0.42));
    }

    #[test]
    fn multi_candidate_without_history_takes_lowest_box() {
        let t = tracker();
        assert_eq!(t.select_y(&[det(0.3), det(0.8), det(0.5)]), Some(0.8));
    }

    #[test]
    fn multi_candidate_prefers_closest_below_last() {
        let mut t = tracker();
        t.observe_y(1, Some(0.6), None);
        assert_eq!(t.select_y(&[det(0.2), det(0.55), det(0.9)]), Some(0.55));
    }

    #[test]
    fn multi_candidate_falls_back_to_max_when_none_below() {
        let mut t = tracker();
        t.observe_y(1, Some(0.3), None);
        assert_eq!(t.select_y(&[det(0.4), det(0.7)]), Some(0.7));
    }

    #[test]
    fn last_nonempty_y_survives_gaps() {
        let mut t = tracker();
        t.observe_y(1, Some(0.7), None);
        t.observe_y(2, None, None);
        assert_eq!(t.last_nonempty_y(), Some(0.7));
        assert_eq!(t.select_y(&[det(0.65), det(0.9)]), Some(0.65));
    }

    #[test]
    fn state_moves_from_empty_to_tracking() {
        let mut t = tracker();
        assert_eq!(t.state(), TrackerState::Empty);
        assert!(t.observe_y(1, Some(0.9), Some(0.4)).is_none());
        assert_eq!(t.state(), TrackerState::Tracking);
        assert_eq!(t.active_track().len(), 1);
    }

    #[test]
    fn jump_flushes_and_resets_to_current_frame() {
        let mut t = tracker();
        for (i, y) in [0.9, 0.8, 0.7].iter().enumerate() {
            assert!(t.observe_y(i as u64, Some(*y), None).is_none());
        }
        let done = t.observe_y(3, Some(0.95), Some(0.5)).expect("flush");
        assert_eq!(done.len(), 3);
        assert_eq!(done.frame_ids().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(
            t.active_track(),
            &[TrackEntry {
                selected_y: Some(0.95),
                frame_id: 3,
                ratio: Some(0.5)
            }]
        );
        assert_eq!(t.last_nonempty_y(), Some(0.95));
    }

    #[test]
    fn gap_frames_never_flush() {
        let mut t = tracker();
        t.observe_y(1, Some(0.70), None);
        assert!(t.observe_y(2, None, None).is_none());
        assert!(t.observe_y(3, Some(0.65), None).is_none());
        assert_eq!(t.active_track().len(), 3);
    }

    #[test]
    fn finish_flushes_and_cancel_discards() {
        let mut t = tracker();
        assert!(t.finish().is_none());

        t.observe_y(1, Some(0.5), None);
        t.observe_y(2, None, None);
        let done = t.finish().expect("final flush");
        assert_eq!(done.len(), 2);
        assert_eq!(done.valid_len(), 1);
        assert_eq!(t.state(), TrackerState::Empty);
        assert_eq!(t.last_nonempty_y(), None);

        t.observe_y(3, Some(0.5), None);
        assert_eq!(t.cancel(), 1);
        assert!(t.finish().is_none());
    }
}
