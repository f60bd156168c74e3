//! Candidate filter: reduces a frame's raw detections to plausible trunk
//! candidates using position and size alone.

use crate::config::FilterSettings;
use crate::detect::Detection;

/// Keep on-path, non-noise boxes and at most one box per horizontal band.
///
/// A box survives the first pass when `x_center < x_threshold` and its area
/// is at least `min_area`. Among survivors, two boxes whose `y_center`s are
/// closer than `band_threshold` describe the same band; the one further
/// left wins. Several boxes may remain when they sit in distinct bands.
pub fn filter_candidates(detections: &[Detection], settings: &FilterSettings) -> Vec<Detection> {
    let candidates: Vec<Detection> = detections
        .iter()
        .filter(|d| d.x_center < settings.x_threshold && d.area() >= settings.min_area)
        .copied()
        .collect();

    if candidates.len() <= 1 {
        return candidates;
    }

    let mut keep = vec![true; candidates.len()];
    for i in 0..candidates.len() {
        if !keep[i] {
            continue;
        }
        for j in (i + 1)..candidates.len() {
            if !keep[j] {
                continue;
            }
            if (candidates[i].y_center - candidates[j].y_center).abs() < settings.band_threshold {
                if candidates[i].x_center < candidates[j].x_center {
                    keep[j] = false;
                } else {
                    // `i` lost its band; it takes no part in later comparisons.
                    keep[i] = false;
                    break;
                }
            }
        }
    }

    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(d, kept)| kept.then_some(d))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f64, y: f64, w: f64, h: f64) -> Detection {
        Detection::new(0, x, y, w, h)
    }

    #[test]
    fn drops_off_path_and_tiny_boxes() {
        let settings = FilterSettings::default();
        let out = filter_candidates(
            &[
                det(0.45, 0.5, 0.1, 0.1), // branch, too far right
                det(0.20, 0.5, 0.05, 0.05), // 0.0025 < min area
                det(0.30, 0.2, 0.1, 0.1), // x == threshold is rejected
            ],
            &settings,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn min_area_is_inclusive() {
        let settings = FilterSettings::default();
        let boxed = det(0.1, 0.5, 0.05, 0.125);
        assert!(boxed.area() >= settings.min_area);
        assert_eq!(filter_candidates(&[boxed], &settings), vec![boxed]);
    }

    #[test]
    fn single_survivor_is_returned_as_is() {
        let settings = FilterSettings::default();
        let keep = det(0.2, 0.6, 0.1, 0.1);
        let out = filter_candidates(&[keep, det(0.8, 0.6, 0.1, 0.1)], &settings);
        assert_eq!(out, vec![keep]);
    }

    #[test]
    fn same_band_keeps_leftmost() {
        let settings = FilterSettings::default();
        let left = det(0.10, 0.55, 0.1, 0.1);
        let right = det(0.25, 0.50, 0.1, 0.1);

        assert_eq!(filter_candidates(&[right, left], &settings), vec![left]);
        assert_eq!(filter_candidates(&[left, right], &settings), vec![left]);
    }

    #[test]
    fn distinct_bands_all_survive() {
        let settings = FilterSettings::default();
        let low = det(0.2, 0.85, 0.1, 0.1);
        let high = det(0.25, 0.30, 0.1, 0.1);
        assert_eq!(filter_candidates(&[low, high], &settings), vec![low, high]);
    }

    #[test]
    fn dropped_box_stops_comparing() {
        let settings = FilterSettings::default();
        // a loses to b; a would also have beaten c, but a is already out.
        let a = det(0.20, 0.50, 0.1, 0.1);
        let b = det(0.10, 0.45, 0.1, 0.1);
        let c = det(0.25, 0.62, 0.1, 0.1);
        let out = filter_candidates(&[a, b, c], &settings);
        // b vs c are 0.17 apart, so c keeps its own band.
        assert_eq!(out, vec![b, c]);
    }
}
