//! Plausibility gate: checks candidates against the frame's pixels.
//!
//! Depth-aligned frames are black wherever there is no return, so a box over
//! a mostly-black strip is background or a detector false positive.

use crate::config::GateSettings;
use crate::detect::Detection;
use crate::frame::{CropRect, FrameImage};

/// Crop sampled for a candidate: fixed columns, top edge at the candidate's
/// `y_center` in pixels.
pub fn candidate_crop(candidate: &Detection, image_height: u32, settings: &GateSettings) -> CropRect {
    let y = (candidate.y_center * image_height as f64).max(0.0) as u32;
    CropRect::new(settings.crop_x, y, settings.crop_width, settings.crop_height)
}

/// Fixed crop recorded on every frame as a diagnostic signal.
pub fn diagnostic_crop(settings: &GateSettings) -> CropRect {
    CropRect::new(
        settings.crop_x,
        settings.diagnostic_y,
        settings.crop_width,
        settings.crop_height,
    )
}

/// Drop candidates whose crop has a non-black ratio below `ratio_min`.
pub fn gate_candidates(
    candidates: Vec<Detection>,
    image: &FrameImage,
    settings: &GateSettings,
) -> Vec<Detection> {
    candidates
        .into_iter()
        .filter(|candidate| {
            let crop = candidate_crop(candidate, image.height(), settings);
            let ratio = image.nonblack_ratio(crop);
            if ratio < settings.ratio_min {
                log::debug!(
                    "gate: rejected y={:.4} (non-black ratio {:.3} < {:.3})",
                    candidate.y_center,
                    ratio,
                    settings.ratio_min
                );
                false
            } else {
                true
            }
        })
        .collect()
}

/// Non-black ratio of the fixed diagnostic crop. Never used for gating.
pub fn diagnostic_ratio(image: &FrameImage, settings: &GateSettings) -> f64 {
    image.nonblack_ratio(diagnostic_crop(settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_crop_starts_at_pixel_y() {
        let settings = GateSettings::default();
        let crop = candidate_crop(&Detection::new(0, 0.2, 0.5, 0.1, 0.1), 480, &settings);
        assert_eq!(crop, CropRect::new(92, 240, 177, 65));

        let crop = candidate_crop(&Detection::new(0, 0.2, 0.999, 0.1, 0.1), 480, &settings);
        assert_eq!(crop.y, 479);
    }

    #[test]
    fn rejects_boxes_over_black_background() {
        let settings = GateSettings::default();
        let mut image = FrameImage::blank(640, 480);
        // Texture only in the lower half.
        image.fill_rect(CropRect::new(0, 240, 640, 240), [80, 60, 40]);

        let over_trunk = Detection::new(0, 0.2, 0.6, 0.1, 0.1);
        let over_hole = Detection::new(0, 0.2, 0.1, 0.1, 0.1);
        let kept = gate_candidates(vec![over_trunk, over_hole], &image, &settings);
        assert_eq!(kept, vec![over_trunk]);
    }

    #[test]
    fn ratio_at_threshold_passes() {
        let settings = GateSettings {
            ratio_min: 0.2,
            ..GateSettings::default()
        };
        let mut image = FrameImage::blank(640, 480);
        // 13 of 65 crop rows coloured: exactly 0.2.
        image.fill_rect(CropRect::new(0, 120, 640, 13), [1, 1, 1]);
        let candidate = Detection::new(0, 0.2, 0.25, 0.1, 0.1);
        let crop = candidate_crop(&candidate, 480, &settings);
        assert_eq!(crop.y, 120);
        assert_eq!(image.nonblack_ratio(crop), 0.2);
        assert_eq!(gate_candidates(vec![candidate], &image, &settings).len(), 1);
    }

    #[test]
    fn diagnostic_ratio_uses_fixed_crop() {
        let settings = GateSettings::default();
        let mut image = FrameImage::blank(640, 480);
        image.fill_rect(diagnostic_crop(&settings), [255, 0, 0]);
        assert_eq!(diagnostic_ratio(&image, &settings), 1.0);
        assert_eq!(FrameImage::blank(640, 480).nonblack_ratio(diagnostic_crop(&settings)), 0.0);
    }
}
