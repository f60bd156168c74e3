//! Trunk Census
//!
//! Temporal deduplication and identity resolution for tree trunk detections.
//!
//! A vehicle-mounted camera passes a row of trees. The detector reports
//! trunk boxes per frame with no notion of identity, so one trunk shows up in
//! many consecutive frames. This crate folds that per-frame stream into one
//! `TreeRecord` per physical tree.
//!
//! # Pipeline
//!
//! Per frame, in stream order:
//!
//! 1. **Candidate filter** (`filter`): drop off-path and noise-sized boxes,
//!    keep one box per horizontal band.
//! 2. **Plausibility gate** (`gate`): drop boxes over empty background.
//! 3. **Continuity tracker** (`tracker`): fold the frame's single selected
//!    `y` into the open track, or close it when a new trunk appears.
//!
//! On track closure:
//!
//! 4. **Identity resolver** (`resolve`): discard short tracks, pick the most
//!    centred frame.
//! 5. **Coordinate mapper** (`mapper`): denormalize that frame's detection.
//!
//! # Module Structure
//!
//! - `detect`: detector backends (label files, scripted feed)
//! - `frame`: frame identity, RGB buffers, image sources
//! - `ingest`: ordered frame directories
//! - `labels`: label record format
//! - `pipeline`: per-stream wiring, parallel streams
//! - `config`: thresholds, file + env loading

pub mod config;
pub mod detect;
pub mod error;
pub mod filter;
pub mod frame;
pub mod gate;
pub mod ingest;
pub mod labels;
pub mod mapper;
pub mod pipeline;
pub mod resolve;
pub mod tracker;
pub mod ui;

pub use config::{CensusConfig, MIN_TRACK_LEN};
pub use detect::{
    Detection, DetectorBackend, FrameObservation, LabelDirBackend, ScriptStep, ScriptedBackend,
};
pub use error::{ImageFailure, TrackError};
pub use filter::filter_candidates;
pub use frame::{CropRect, FrameImage, FrameRef, FsImageSource, ImageSource, InMemoryImageSource};
pub use gate::{diagnostic_ratio, gate_candidates};
pub use ingest::{audit_label_pairs, frame_sequence, DirectorySource, LabelAudit};
pub use mapper::{map_entry, map_track, DetectionLookup, TreeRecord};
pub use pipeline::{run_streams, RunOptions, RunSummary, StreamJob, StreamOutcome, StreamPipeline};
pub use resolve::resolve_identity;
pub use tracker::{CompletedTree, ContinuityTracker, TrackEntry, TrackerState};
