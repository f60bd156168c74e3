//! Per-stream processing.
//!
//! A `StreamPipeline` owns everything one camera stream needs: its detector,
//! its image source, its continuity tracker, and a cache of the raw
//! detections of the frames in the open track. Frames must be fed in
//! sequence order; nothing is shared between pipelines, so streams run in
//! parallel with `run_streams`.
//!
//! Per frame: detect → filter → gate → tracker. When the tracker closes a
//! track, the resolver picks its representative frame and the mapper turns it
//! into a `TreeRecord`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::CensusConfig;
use crate::detect::{DetectorBackend, FrameObservation};
use crate::error::TrackError;
use crate::filter::filter_candidates;
use crate::frame::{FrameRef, ImageSource};
use crate::gate::{diagnostic_ratio, gate_candidates};
use crate::mapper::{map_entry, map_track, TreeRecord};
use crate::resolve::resolve_identity;
use crate::tracker::{CompletedTree, ContinuityTracker, TrackerState};

/// What happened to one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub frame_id: u64,
    /// Raw detections returned by the detector.
    pub detections: usize,
    /// Candidates left after the filter and the gate.
    pub candidates: usize,
    pub selected_y: Option<f64>,
    /// Diagnostic non-black ratio of the fixed crop.
    pub ratio: Option<f64>,
    /// The frame image could not be read and was folded in as a gap.
    pub image_failed: bool,
    /// Record emitted because this frame closed a track.
    pub record: Option<TreeRecord>,
}

/// Counters for one stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub gap_frames: u64,
    pub image_failures: u64,
    pub frame_failures: u64,
    pub tracks_completed: u64,
    pub tracks_discarded: u64,
    pub records: u64,
}

/// Result of driving a whole stream.
#[derive(Clone, Debug, Default)]
pub struct StreamOutcome {
    pub label: String,
    pub records: Vec<TreeRecord>,
    pub summary: RunSummary,
    pub cancelled: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RunOptions {
    /// Flush the open track when cancelled instead of discarding it.
    pub flush_on_cancel: bool,
    /// Log the pixel trace of every completed track at debug level.
    pub trace_tracks: bool,
}

pub struct StreamPipeline {
    label: String,
    config: CensusConfig,
    detector: Box<dyn DetectorBackend>,
    images: Box<dyn ImageSource>,
    tracker: ContinuityTracker,
    observations: HashMap<u64, FrameObservation>,
    summary: RunSummary,
    last_frame: Option<u64>,
    trace_tracks: bool,
}

impl StreamPipeline {
    pub fn new(
        label: impl Into<String>,
        config: CensusConfig,
        detector: Box<dyn DetectorBackend>,
        images: Box<dyn ImageSource>,
    ) -> Self {
        Self {
            label: label.into(),
            tracker: ContinuityTracker::new(config.tracker),
            config,
            detector,
            images,
            observations: HashMap::new(),
            summary: RunSummary::default(),
            last_frame: None,
            trace_tracks: false,
        }
    }

    pub fn with_track_trace(mut self, enabled: bool) -> Self {
        self.trace_tracks = enabled;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn tracker_state(&self) -> TrackerState {
        self.tracker.state()
    }

    pub fn tracker(&self) -> &ContinuityTracker {
        &self.tracker
    }

    /// Frames whose raw detections are currently cached.
    pub fn cached_frames(&self) -> usize {
        self.observations.len()
    }

    /// Process the next frame of the stream.
    ///
    /// An unreadable image is recovered here as a gap frame. Detector and
    /// label failures are returned without touching tracker state; the caller
    /// decides what to do and normally follows up with `record_gap`.
    pub fn process_frame(&mut self, frame: &FrameRef) -> Result<FrameReport, TrackError> {
        if let Some(last) = self.last_frame {
            if frame.id <= last {
                return Err(TrackError::OutOfOrder {
                    frame_id: frame.id,
                    last,
                });
            }
        }

        let image = match self.images.load(frame) {
            Ok(image) => image,
            Err(err) => {
                log::warn!("[{}] {}; treating as gap", self.label, err);
                self.summary.image_failures += 1;
                let mut report = self.fold_gap(frame.id);
                report.image_failed = true;
                return Ok(report);
            }
        };

        let detections = match self.detector.detect(frame, &image) {
            Ok(detections) => detections,
            Err(err) => {
                self.summary.frame_failures += 1;
                return Err(err);
            }
        };

        let filtered = filter_candidates(&detections, &self.config.filter);
        let gated = gate_candidates(filtered, &image, &self.config.gate);
        let ratio = diagnostic_ratio(&image, &self.config.gate);
        let selected_y = self.tracker.select_y(&gated);

        let report = FrameReport {
            frame_id: frame.id,
            detections: detections.len(),
            candidates: gated.len(),
            selected_y,
            ratio: Some(ratio),
            image_failed: false,
            record: None,
        };

        if selected_y.is_some() {
            self.observations.insert(
                frame.id,
                FrameObservation {
                    detections,
                    width: image.width(),
                    height: image.height(),
                },
            );
        } else {
            self.summary.gap_frames += 1;
        }

        self.last_frame = Some(frame.id);
        self.summary.frames += 1;
        let completed = self.tracker.observe_y(frame.id, selected_y, Some(ratio));
        let record = completed.and_then(|tree| self.complete(tree));
        Ok(FrameReport { record, ..report })
    }

    /// Fold a frame whose processing failed into the open track as a gap.
    pub fn record_gap(&mut self, frame_id: u64) {
        if self.last_frame.is_some_and(|last| frame_id <= last) {
            log::warn!("[{}] ignoring stale gap for frame {}", self.label, frame_id);
            return;
        }
        self.fold_gap(frame_id);
    }

    /// Flush the open track at end of stream.
    pub fn finish(&mut self) -> Option<TreeRecord> {
        let completed = self.tracker.finish();
        let record = completed.and_then(|tree| self.complete(tree));
        self.observations.clear();
        record
    }

    /// Discard the open track. Returns the number of entries dropped.
    pub fn cancel(&mut self) -> usize {
        let dropped = self.tracker.cancel();
        self.observations.clear();
        if dropped > 0 {
            log::info!(
                "[{}] cancelled with an open track of {} frames (discarded)",
                self.label,
                dropped
            );
        }
        dropped
    }

    /// Drive a whole stream in order.
    ///
    /// Per-frame failures are logged and recovered as gap frames. `cancel` is
    /// checked at every frame boundary.
    pub fn run(
        &mut self,
        frames: &[FrameRef],
        cancel: &AtomicBool,
        options: RunOptions,
    ) -> StreamOutcome {
        self.trace_tracks |= options.trace_tracks;
        if let Err(e) = self.detector.warm_up() {
            log::warn!("[{}] detector warm-up failed: {}", self.label, e);
        }
        log::info!(
            "[{}] processing {} frames with detector '{}'",
            self.label,
            frames.len(),
            self.detector.name()
        );

        let mut records = Vec::new();
        let mut cancelled = false;
        for frame in frames {
            if cancel.load(Ordering::SeqCst) {
                cancelled = true;
                break;
            }
            match self.process_frame(frame) {
                Ok(report) => records.extend(report.record),
                Err(err @ TrackError::OutOfOrder { .. }) => {
                    log::warn!("[{}] skipped: {}", self.label, err);
                }
                Err(err) => {
                    log::warn!("[{}] frame {} failed: {}", self.label, frame.id, err);
                    self.record_gap(frame.id);
                }
            }
        }

        if cancelled && !options.flush_on_cancel {
            self.cancel();
        } else {
            records.extend(self.finish());
        }

        log::info!(
            "[{}] done: {} frames, {} gaps, {} tracks ({} discarded), {} trees{}",
            self.label,
            self.summary.frames,
            self.summary.gap_frames,
            self.summary.tracks_completed,
            self.summary.tracks_discarded,
            self.summary.records,
            if cancelled { " (cancelled)" } else { "" }
        );

        StreamOutcome {
            label: self.label.clone(),
            records,
            summary: self.summary.clone(),
            cancelled,
        }
    }

    fn fold_gap(&mut self, frame_id: u64) -> FrameReport {
        self.last_frame = Some(frame_id);
        self.summary.frames += 1;
        self.summary.gap_frames += 1;
        // Gap frames never close a track.
        let _ = self.tracker.observe_y(frame_id, None, None);
        FrameReport {
            frame_id,
            ..FrameReport::default()
        }
    }

    fn complete(&mut self, tree: CompletedTree) -> Option<TreeRecord> {
        self.summary.tracks_completed += 1;

        if self.trace_tracks {
            let trace = map_track(&tree, &self.observations, &self.config.mapper);
            log::debug!("[{}] track trace: {:?}", self.label, trace);
        }

        let record = resolve_identity(&tree, &self.config.resolver)
            .and_then(|entry| map_entry(&entry, &self.observations, &self.config.mapper));

        for frame_id in tree.frame_ids() {
            self.observations.remove(&frame_id);
        }

        match record {
            Some(record) => {
                self.summary.records += 1;
                log::info!(
                    "[{}] tree at frame {} ({:.1}, {:.1}) from {} frames",
                    self.label,
                    record.frame_id,
                    record.pixel_x,
                    record.pixel_y,
                    tree.len()
                );
            }
            None => {
                self.summary.tracks_discarded += 1;
                log::debug!(
                    "[{}] track of {} frames ({} valid) discarded",
                    self.label,
                    tree.len(),
                    tree.valid_len()
                );
            }
        }
        record
    }
}

/// One stream's pipeline and its ordered frames.
pub struct StreamJob {
    pub pipeline: StreamPipeline,
    pub frames: Vec<FrameRef>,
}

/// Run independent streams in parallel, one thread each.
///
/// Outcomes come back in the order of `jobs`.
pub fn run_streams(jobs: Vec<StreamJob>, cancel: &AtomicBool, options: RunOptions) -> Vec<StreamOutcome> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|mut job| {
                scope.spawn(move || job.pipeline.run(&job.frames, cancel, options))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(outcome) => outcome,
                Err(_) => {
                    log::error!("stream worker panicked");
                    StreamOutcome {
                        cancelled: true,
                        ..StreamOutcome::default()
                    }
                }
            })
            .collect()
    })
}
