use std::collections::VecDeque;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::error::TrackError;
use crate::frame::{FrameImage, FrameRef};

/// One scripted detector answer.
#[derive(Clone, Debug)]
pub enum ScriptStep {
    Detections(Vec<Detection>),
    Fail(String),
}

/// Scripted backend for testing. Replays a fixed sequence of per-frame
/// results, one step per `detect` call, ignoring the image content.
///
/// Once the script is exhausted every frame yields an empty list.
#[derive(Clone, Debug, Default)]
pub struct ScriptedBackend {
    steps: VecDeque<ScriptStep>,
    calls: u64,
}

impl ScriptedBackend {
    pub fn new(frames: Vec<Vec<Detection>>) -> Self {
        Self::from_steps(frames.into_iter().map(ScriptStep::Detections).collect())
    }

    pub fn from_steps(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps: steps.into(),
            calls: 0,
        }
    }

    /// Script one box per frame at the given `y_center`s, `None` for a frame
    /// without detections. Boxes sit at `x_center = 0.2` with a 0.1 × 0.1 size.
    pub fn from_y_sequence(ys: &[Option<f64>]) -> Self {
        Self::new(
            ys.iter()
                .map(|y| match y {
                    Some(y) => vec![Detection::new(0, 0.2, *y, 0.1, 0.1)],
                    None => Vec::new(),
                })
                .collect(),
        )
    }

    pub fn push(&mut self, step: ScriptStep) {
        self.steps.push_back(step);
    }

    /// Number of `detect` calls served so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(
        &mut self,
        frame: &FrameRef,
        _image: &FrameImage,
    ) -> Result<Vec<Detection>, TrackError> {
        self.calls += 1;
        match self.steps.pop_front() {
            Some(ScriptStep::Detections(detections)) => Ok(detections),
            Some(ScriptStep::Fail(reason)) => Err(TrackError::DetectorInvocation {
                frame_id: frame.id,
                backend: self.name(),
                reason,
            }),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_script_in_order_then_goes_quiet() {
        let mut backend = ScriptedBackend::from_steps(vec![
            ScriptStep::Detections(vec![Detection::new(0, 0.1, 0.9, 0.1, 0.1)]),
            ScriptStep::Fail("model crashed".to_string()),
        ]);
        let image = FrameImage::blank(4, 4);

        let r1 = backend.detect(&FrameRef::new(1, "0000001"), &image).unwrap();
        assert_eq!(r1.len(), 1);
        assert_eq!(r1[0].y_center, 0.9);

        let r2 = backend.detect(&FrameRef::new(2, "0000002"), &image);
        assert!(matches!(
            r2,
            Err(TrackError::DetectorInvocation { frame_id: 2, .. })
        ));

        let r3 = backend.detect(&FrameRef::new(3, "0000003"), &image).unwrap();
        assert!(r3.is_empty());
        assert_eq!(backend.calls(), 3);
        assert_eq!(backend.remaining(), 0);
    }
}
