use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::error::TrackError;
use crate::frame::{FrameImage, FrameRef};
use crate::labels::read_label_file;

/// Backend over materialised detector output.
///
/// Each frame `<stem>.png` has its detections in `<labels_dir>/<stem>.txt`.
/// A frame with nothing detected must have an empty file; a missing file is
/// reported as `TrackError::MissingLabel`.
#[derive(Clone, Debug)]
pub struct LabelDirBackend {
    labels_dir: PathBuf,
}

impl LabelDirBackend {
    pub fn new(labels_dir: impl Into<PathBuf>) -> Self {
        Self {
            labels_dir: labels_dir.into(),
        }
    }

    pub fn labels_dir(&self) -> &Path {
        &self.labels_dir
    }

    pub fn label_path(&self, frame: &FrameRef) -> PathBuf {
        self.labels_dir.join(format!("{}.txt", frame.name))
    }

    /// Re-read a frame's full, unfiltered detection record.
    pub fn reload(&self, frame: &FrameRef) -> Result<Vec<Detection>, TrackError> {
        read_label_file(&self.label_path(frame), frame.id)
    }
}

impl DetectorBackend for LabelDirBackend {
    fn name(&self) -> &'static str {
        "labels"
    }

    fn detect(
        &mut self,
        frame: &FrameRef,
        _image: &FrameImage,
    ) -> Result<Vec<Detection>, TrackError> {
        self.reload(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        if !self.labels_dir.is_dir() {
            return Err(anyhow!(
                "label directory {} does not exist",
                self.labels_dir.display()
            ));
        }
        log::info!("LabelDirBackend: reading labels from {}", self.labels_dir.display());
        Ok(())
    }
}
