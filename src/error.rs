use std::path::PathBuf;

use thiserror::Error;

/// Why a frame image could not be used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFailure {
    /// No image exists for the frame.
    Missing,
    /// The image exists but cannot be decoded.
    Corrupt,
}

/// Per-frame failures surfaced by the engine.
///
/// None of these abort a stream. `ImageRead` is recovered inside the
/// pipeline as a gap frame; the others are returned to the caller of the
/// per-frame step, which folds the frame in as a gap once it has handled
/// the error.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("frame {frame_id}: image unreadable ({kind:?}): {reason}")]
    ImageRead {
        frame_id: u64,
        kind: ImageFailure,
        reason: String,
    },

    #[error("malformed label record {}:{line}: {reason}", path.display())]
    MalformedLabel {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("frame {frame_id}: no label file at {}", path.display())]
    MissingLabel { frame_id: u64, path: PathBuf },

    #[error("frame {frame_id} arrived after frame {last}")]
    OutOfOrder { frame_id: u64, last: u64 },

    #[error("frame {frame_id}: detector '{backend}' failed: {reason}")]
    DetectorInvocation {
        frame_id: u64,
        backend: &'static str,
        reason: String,
    },
}

impl TrackError {
    /// Frame the failure belongs to, when known.
    pub fn frame_id(&self) -> Option<u64> {
        match self {
            TrackError::ImageRead { frame_id, .. }
            | TrackError::MissingLabel { frame_id, .. }
            | TrackError::OutOfOrder { frame_id, .. }
            | TrackError::DetectorInvocation { frame_id, .. } => Some(*frame_id),
            TrackError::MalformedLabel { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_frame() {
        let err = TrackError::DetectorInvocation {
            frame_id: 142,
            backend: "labels",
            reason: "timeout".to_string(),
        };
        assert_eq!(err.frame_id(), Some(142));
        assert_eq!(
            err.to_string(),
            "frame 142: detector 'labels' failed: timeout"
        );

        let err = TrackError::MalformedLabel {
            path: PathBuf::from("labels/0000142.txt"),
            line: 3,
            reason: "expected 5 or 6 fields, got 4".to_string(),
        };
        assert_eq!(err.frame_id(), None);
        assert!(err.to_string().contains("0000142.txt:3"));
    }
}
