//! Materialised detector output.
//!
//! One text file per frame, one line per detection:
//!
//! ```text
//! class_id x_center y_center width height [confidence]
//! ```
//!
//! Spatial values are normalized to 0..1. A frame without detections is an
//! empty file, never a missing one.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use crate::detect::Detection;
use crate::error::TrackError;

/// Parse one label line. `Ok(None)` for a blank line.
pub fn parse_label_line(line: &str) -> Result<Option<Detection>, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.is_empty() {
        return Ok(None);
    }
    if fields.len() != 5 && fields.len() != 6 {
        return Err(format!("expected 5 or 6 fields, got {}", fields.len()));
    }

    let mut values = [0f64; 6];
    for (slot, field) in values.iter_mut().zip(fields.iter()) {
        *slot = field
            .parse::<f64>()
            .map_err(|_| format!("non-numeric field '{}'", field))?;
        if !slot.is_finite() {
            return Err(format!("non-finite field '{}'", field));
        }
    }

    // Some detectors write the class as a float (`0.0`).
    let class = values[0];
    if class < 0.0 || class.fract() != 0.0 || class > u32::MAX as f64 {
        return Err(format!("invalid class id '{}'", fields[0]));
    }
    for (name, value) in ["x_center", "y_center", "width", "height"]
        .iter()
        .zip(&values[1..5])
    {
        if !(0.0..=1.0).contains(value) {
            return Err(format!("{} {} outside [0, 1]", name, value));
        }
    }

    let detection = Detection::new(class as u32, values[1], values[2], values[3], values[4]);
    Ok(Some(if fields.len() == 6 {
        detection.with_confidence(values[5])
    } else {
        detection
    }))
}

/// Parse the full contents of a label file.
pub fn parse_label_text(path: &Path, text: &str) -> Result<Vec<Detection>, TrackError> {
    let mut detections = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        match parse_label_line(line) {
            Ok(Some(detection)) => detections.push(detection),
            Ok(None) => {}
            Err(reason) => {
                return Err(TrackError::MalformedLabel {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason,
                })
            }
        }
    }
    Ok(detections)
}

/// Read a label file belonging to `frame_id`.
pub fn read_label_file(path: &Path, frame_id: u64) -> Result<Vec<Detection>, TrackError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TrackError::MissingLabel {
                frame_id,
                path: path.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(TrackError::DetectorInvocation {
                frame_id,
                backend: "labels",
                reason: format!("failed to read {}: {}", path.display(), e),
            })
        }
    };
    parse_label_text(path, &text)
}

/// Render detections in label-record form.
pub fn format_label_text(detections: &[Detection]) -> String {
    let mut out = String::new();
    for d in detections {
        let _ = write!(
            out,
            "{} {} {} {} {}",
            d.class_id, d.x_center, d.y_center, d.width, d.height
        );
        if let Some(conf) = d.confidence {
            let _ = write!(out, " {}", conf);
        }
        out.push('\n');
    }
    out
}

/// Write a label file. An empty detection list still produces a file.
pub fn write_label_file(path: &Path, detections: &[Detection]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, format_label_text(detections))
        .with_context(|| format!("failed to write label file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lines_with_and_without_confidence() {
        let d = parse_label_line("0 0.2 0.5 0.1 0.1").unwrap().unwrap();
        assert_eq!(d, Detection::new(0, 0.2, 0.5, 0.1, 0.1));

        let d = parse_label_line("  1 0.25 0.75 0.05 0.3 0.91 ").unwrap().unwrap();
        assert_eq!(d.class_id, 1);
        assert_eq!(d.confidence, Some(0.91));

        let d = parse_label_line("0.0 0.1 0.1 0.1 0.1").unwrap().unwrap();
        assert_eq!(d.class_id, 0);

        assert_eq!(parse_label_line("   ").unwrap(), None);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_label_line("0 0.2 0.5 0.1").is_err());
        assert!(parse_label_line("0 0.2 0.5 0.1 0.1 0.9 7").is_err());
        assert!(parse_label_line("0 0.2 abc 0.1 0.1").is_err());
        assert!(parse_label_line("0 1.2 0.5 0.1 0.1").is_err());
        assert!(parse_label_line("-1 0.2 0.5 0.1 0.1").is_err());
        assert!(parse_label_line("0.5 0.2 0.5 0.1 0.1").is_err());
        assert!(parse_label_line("0 NaN 0.5 0.1 0.1").is_err());
    }

    #[test]
    fn malformed_text_reports_line_number() {
        let err = parse_label_text(Path::new("f.txt"), "0 0.1 0.1 0.1 0.1\n\n0 0.1\n")
            .unwrap_err();
        match err {
            TrackError::MalformedLabel { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_text_is_no_detections() {
        assert!(parse_label_text(Path::new("f.txt"), "").unwrap().is_empty());
    }

    #[test]
    fn written_files_read_back() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("labels").join("0000007.txt");
        let detections = vec![
            Detection::new(0, 0.2, 0.5, 0.1, 0.1).with_confidence(0.8),
            Detection::new(0, 0.15, 0.25, 0.12, 0.2),
        ];
        write_label_file(&path, &detections)?;
        assert_eq!(read_label_file(&path, 7)?, detections);

        let empty = dir.path().join("labels").join("0000008.txt");
        write_label_file(&empty, &[])?;
        assert!(empty.exists());
        assert!(read_label_file(&empty, 8)?.is_empty());
        Ok(())
    }

    #[test]
    fn missing_file_is_not_an_empty_result() {
        let err = read_label_file(Path::new("/nonexistent/0000009.txt"), 9).unwrap_err();
        assert!(matches!(err, TrackError::MissingLabel { frame_id: 9, .. }));
    }
}
