//! Coordinate mapper: normalized detection back to pixel coordinates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::MapperSettings;
use crate::detect::{Detection, FrameObservation};
use crate::tracker::{CompletedTree, TrackEntry};

/// One confirmed tree.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeRecord {
    pub frame_id: u64,
    pub pixel_x: f64,
    pub pixel_y: f64,
}

/// How the mapper re-queries a frame's original, unfiltered detections.
pub trait DetectionLookup {
    fn observation(&self, frame_id: u64) -> Option<&FrameObservation>;
}

impl DetectionLookup for HashMap<u64, FrameObservation> {
    fn observation(&self, frame_id: u64) -> Option<&FrameObservation> {
        self.get(&frame_id)
    }
}

/// Find the detection whose `y_center` matches `y` within `tolerance`.
pub fn find_detection(detections: &[Detection], y: f64, tolerance: f64) -> Option<&Detection> {
    detections
        .iter()
        .find(|d| (d.y_center - y).abs() < tolerance)
}

/// Denormalize a detection's center.
pub fn to_pixels(detection: &Detection, width: u32, height: u32) -> (f64, f64) {
    (
        detection.x_center * width as f64,
        detection.y_center * height as f64,
    )
}

/// Map a resolved track entry to its output record.
///
/// Returns `None` for a gap entry, an unknown frame, or when no detection of
/// the frame matches the entry's `y`.
pub fn map_entry(
    entry: &TrackEntry,
    lookup: &impl DetectionLookup,
    settings: &MapperSettings,
) -> Option<TreeRecord> {
    let y = entry.selected_y?;
    let Some(observation) = lookup.observation(entry.frame_id) else {
        log::warn!("mapper: no detections cached for frame {}", entry.frame_id);
        return None;
    };
    let Some(detection) = find_detection(&observation.detections, y, settings.match_tolerance)
    else {
        log::warn!(
            "mapper: frame {} has no detection at y={:.6}",
            entry.frame_id,
            y
        );
        return None;
    };

    let (width, height) = if observation.width == 0 || observation.height == 0 {
        (settings.frame_width, settings.frame_height)
    } else {
        (observation.width, observation.height)
    };
    let (pixel_x, pixel_y) = to_pixels(detection, width, height);
    Some(TreeRecord {
        frame_id: entry.frame_id,
        pixel_x,
        pixel_y,
    })
}

/// Pixel position of the tracked trunk in every valid frame of a track.
pub fn map_track(
    tree: &CompletedTree,
    lookup: &impl DetectionLookup,
    settings: &MapperSettings,
) -> Vec<TreeRecord> {
    tree.valid_entries()
        .filter_map(|entry| map_entry(entry, lookup, settings))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(detections: Vec<Detection>) -> FrameObservation {
        FrameObservation {
            detections,
            width: 640,
            height: 480,
        }
    }

    fn entry(frame_id: u64, y: Option<f64>) -> TrackEntry {
        TrackEntry {
            selected_y: y,
            frame_id,
            ratio: None,
        }
    }

    #[test]
    fn maps_center_to_pixels() {
        let mut lookup = HashMap::new();
        lookup.insert(
            7,
            observation(vec![
                Detection::new(0, 0.6, 0.2, 0.1, 0.1),
                Detection::new(0, 0.20, 0.50, 0.10, 0.10),
            ]),
        );
        let record = map_entry(&entry(7, Some(0.5)), &lookup, &MapperSettings::default())
            .expect("mapped");
        assert_eq!(record.frame_id, 7);
        assert!((record.pixel_x - 128.0).abs() < 1e-9);
        assert!((record.pixel_y - 240.0).abs() < 1e-9);
    }

    #[test]
    fn match_uses_tolerance() {
        let dets = [Detection::new(0, 0.1, 0.4000004, 0.1, 0.1)];
        assert!(find_detection(&dets, 0.4, 1e-6).is_some());
        assert!(find_detection(&dets, 0.4, 1e-7).is_none());
    }

    #[test]
    fn unknown_frame_or_gap_maps_to_nothing() {
        let lookup: HashMap<u64, FrameObservation> = HashMap::new();
        let settings = MapperSettings::default();
        assert!(map_entry(&entry(1, Some(0.5)), &lookup, &settings).is_none());
        assert!(map_entry(&entry(1, None), &lookup, &settings).is_none());
    }

    #[test]
    fn missing_dimensions_fall_back_to_configured_size() {
        let mut lookup = HashMap::new();
        lookup.insert(
            3,
            FrameObservation {
                detections: vec![Detection::new(0, 0.5, 0.25, 0.1, 0.1)],
                width: 0,
                height: 0,
            },
        );
        let record = map_entry(&entry(3, Some(0.25)), &lookup, &MapperSettings::default())
            .expect("mapped");
        assert_eq!((record.pixel_x, record.pixel_y), (320.0, 120.0));
    }

    #[test]
    fn track_trace_covers_valid_frames() {
        let mut lookup = HashMap::new();
        lookup.insert(1, observation(vec![Detection::new(0, 0.25, 0.75, 0.1, 0.1)]));
        lookup.insert(3, observation(vec![Detection::new(0, 0.25, 0.5, 0.1, 0.1)]));
        let tree = CompletedTree {
            entries: vec![entry(1, Some(0.75)), entry(2, None), entry(3, Some(0.5))],
        };
        let trace = map_track(&tree, &lookup, &MapperSettings::default());
        assert_eq!(
            trace,
            vec![
                TreeRecord {
                    frame_id: 1,
                    pixel_x: 160.0,
                    pixel_y: 360.0
                },
                TreeRecord {
                    frame_id: 3,
                    pixel_x: 160.0,
                    pixel_y: 240.0
                },
            ]
        );
    }
}
