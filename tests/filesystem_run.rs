use std::path::Path;
use std::sync::atomic::AtomicBool;

use anyhow::Result;
use image::{Rgb, RgbImage};

use trunk_census::labels::write_label_file;
use trunk_census::{
    audit_label_pairs, CensusConfig, Detection, DirectorySource, FsImageSource, LabelDirBackend,
    RunOptions, StreamPipeline, TreeRecord,
};

/// Write a 640x480 frame that is textured only in columns `[x0, x1)`.
fn write_frame(dir: &Path, stem: &str, x0: u32, x1: u32) -> Result<()> {
    let mut rgb = RgbImage::new(640, 480);
    for y in 0..480 {
        for x in x0..x1 {
            rgb.put_pixel(x, y, Rgb([110, 85, 60]));
        }
    }
    rgb.save(dir.join(format!("{stem}.png")))?;
    Ok(())
}

fn trunk(y: f64) -> Detection {
    Detection::new(0, 0.2, y, 0.1, 0.1).with_confidence(0.9)
}

fn run_dir(frames: &Path, labels: &Path, flip: bool) -> Result<Vec<TreeRecord>> {
    let source = DirectorySource::open(frames)?;
    let mut pipeline = StreamPipeline::new(
        "fs",
        CensusConfig::default(),
        Box::new(LabelDirBackend::new(labels)),
        Box::new(FsImageSource::new().with_flip(flip)),
    );
    let cancel = AtomicBool::new(false);
    Ok(pipeline
        .run(source.frames(), &cancel, RunOptions::default())
        .records)
}

#[test]
fn tracks_a_tree_across_files_with_a_missing_label() -> Result<()> {
    let frames = tempfile::tempdir()?;
    let labels = tempfile::tempdir()?;

    let ys = [0.9, 0.8, 0.75, 0.7, 0.6, 0.5, 0.45];
    for (i, y) in ys.iter().enumerate() {
        let stem = format!("{:07}", i + 1);
        write_frame(frames.path(), &stem, 0, 640)?;
        // Frame 3 has no label file and becomes a gap.
        if i == 2 {
            continue;
        }
        let mut detections = vec![trunk(*y)];
        if i == 0 {
            // Branch off the driving path.
            detections.push(Detection::new(0, 0.6, 0.4, 0.1, 0.1));
        }
        write_label_file(&labels.path().join(format!("{stem}.txt")), &detections)?;
    }

    let audit = audit_label_pairs(frames.path(), labels.path())?;
    assert_eq!(audit.frames_without_labels, vec!["0000003".to_string()]);

    let records = run_dir(frames.path(), labels.path(), false)?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].frame_id, 6);
    assert!((records[0].pixel_x - 128.0).abs() < 1e-9);
    assert!((records[0].pixel_y - 240.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn empty_label_files_are_frames_without_trunks() -> Result<()> {
    let frames = tempfile::tempdir()?;
    let labels = tempfile::tempdir()?;
    for i in 1..=6 {
        let stem = format!("{:07}", i);
        write_frame(frames.path(), &stem, 0, 640)?;
        write_label_file(&labels.path().join(format!("{stem}.txt")), &[])?;
    }
    assert!(run_dir(frames.path(), labels.path(), false)?.is_empty());
    Ok(())
}

#[test]
fn flip_moves_texture_under_the_gate_crop() -> Result<()> {
    let frames = tempfile::tempdir()?;
    let labels = tempfile::tempdir()?;

    // Texture on the right-hand side only; the gate samples columns 92..269.
    for (i, y) in [0.9, 0.8, 0.7, 0.6, 0.5].iter().enumerate() {
        let stem = format!("{:07}", i + 1);
        write_frame(frames.path(), &stem, 320, 640)?;
        write_label_file(&labels.path().join(format!("{stem}.txt")), &[trunk(*y)])?;
    }

    assert!(run_dir(frames.path(), labels.path(), false)?.is_empty());

    let records = run_dir(frames.path(), labels.path(), true)?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].frame_id, 5);
    Ok(())
}
