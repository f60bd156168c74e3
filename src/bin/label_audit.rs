//! label_audit - check that every frame has a label file and vice versa
//!
//! Exits non-zero when any frame or label file is unpaired.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use trunk_census::audit_label_pairs;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Frame directory.
    #[arg(value_name = "FRAMES_DIR")]
    frames: PathBuf,
    /// Label directory holding one `<stem>.txt` per frame.
    #[arg(value_name = "LABELS_DIR")]
    labels: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let audit = audit_label_pairs(&args.frames, &args.labels)?;
    for stem in &audit.frames_without_labels {
        println!("missing label: {}", stem);
    }
    for stem in &audit.labels_without_frames {
        println!("orphan label: {}", stem);
    }

    if audit.is_clean() {
        log::info!("all frames in {} have labels", args.frames.display());
        Ok(())
    } else {
        Err(anyhow!(
            "{} frames without labels, {} labels without frames",
            audit.frames_without_labels.len(),
            audit.labels_without_frames.len()
        ))
    }
}
