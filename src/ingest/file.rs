//! Directory frame source.
//!
//! `DirectorySource` lists the image files of one stream directory and
//! orders them by sequence number. It only produces `FrameRef`s; pixels are
//! decoded lazily by an `ImageSource` when the pipeline reaches the frame.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use super::frame_sequence;
use crate::frame::FrameRef;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Ordered frames of one stream directory.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    dir: PathBuf,
    frames: Vec<FrameRef>,
}

impl DirectorySource {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let mut ordered: BTreeMap<u64, FrameRef> = BTreeMap::new();
        for (stem, path) in list_files(&dir, IMAGE_EXTENSIONS)? {
            let id = frame_sequence(&stem)
                .with_context(|| format!("unordered frame {}", path.display()))?;
            if let Some(existing) = ordered.get(&id) {
                return Err(anyhow!(
                    "duplicate frame sequence {}: {} and {}",
                    id,
                    existing.name,
                    stem
                ));
            }
            ordered.insert(id, FrameRef::new(id, stem).with_path(path));
        }
        log::info!(
            "DirectorySource: {} frames in {}",
            ordered.len(),
            dir.display()
        );
        Ok(Self {
            dir,
            frames: ordered.into_values().collect(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn frames(&self) -> &[FrameRef] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<FrameRef> {
        self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Frames and label files that have no partner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelAudit {
    pub frames_without_labels: Vec<String>,
    pub labels_without_frames: Vec<String>,
}

impl LabelAudit {
    pub fn is_clean(&self) -> bool {
        self.frames_without_labels.is_empty() && self.labels_without_frames.is_empty()
    }
}

/// Compare the stems of a frame directory and a label directory.
pub fn audit_label_pairs(frames_dir: &Path, labels_dir: &Path) -> Result<LabelAudit> {
    let frames: BTreeSet<String> = list_files(frames_dir, IMAGE_EXTENSIONS)?
        .into_iter()
        .map(|(stem, _)| stem)
        .collect();
    let labels: BTreeSet<String> = list_files(labels_dir, &["txt"])?
        .into_iter()
        .map(|(stem, _)| stem)
        .collect();
    Ok(LabelAudit {
        frames_without_labels: frames.difference(&labels).cloned().collect(),
        labels_without_frames: labels.difference(&frames).cloned().collect(),
    })
}

fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| anyhow!("failed to read directory {}: {}", dir.display(), e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)));
        if !matches {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        files.push((stem.to_string(), path.clone()));
    }
    Ok(files)
}
