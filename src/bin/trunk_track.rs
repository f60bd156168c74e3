//! trunk_track - one record per tree from per-frame trunk detections
//!
//! Each positional directory is one camera stream: numbered frame images,
//! with detector output materialised as label files in the matching
//! `--labels` directory. Streams are processed in parallel; records are
//! written as JSON lines in stream order, then path order.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use trunk_census::ui::Ui;
use trunk_census::{
    run_streams, CensusConfig, DirectorySource, FsImageSource, LabelDirBackend, RunOptions,
    StreamJob, StreamPipeline, TreeRecord,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Frame directories, one per camera stream.
    #[arg(required = true, value_name = "FRAMES_DIR")]
    streams: Vec<PathBuf>,
    /// Label directories, one per stream, in the same order.
    #[arg(long = "labels", required = true, value_name = "LABELS_DIR")]
    labels: Vec<PathBuf>,
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "TRUNK_CONFIG")]
    config: Option<PathBuf>,
    /// Output file for JSON-lines records (stdout when omitted).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Mirror frames horizontally before detection (right-hand cameras).
    #[arg(long)]
    flip: bool,
    /// On Ctrl-C, flush the open track instead of discarding it.
    #[arg(long)]
    flush_on_cancel: bool,
    /// Log the pixel trace of every completed track (debug level).
    #[arg(long)]
    trace: bool,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

#[derive(Serialize)]
struct OutputLine<'a> {
    stream: &'a str,
    #[serde(flatten)]
    record: &'a TreeRecord,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::from_flag(Some(&args.ui));

    if args.labels.len() != args.streams.len() {
        return Err(anyhow!(
            "got {} frame directories but {} label directories",
            args.streams.len(),
            args.labels.len()
        ));
    }

    let mut config = CensusConfig::load_from(args.config.as_deref())?;
    if args.flip {
        config.input.flip_horizontal = true;
    }

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            log::warn!("interrupt received; stopping at next frame boundary");
            cancel.store(true, Ordering::SeqCst);
        })
        .context("failed to install Ctrl-C handler")?;
    }

    let jobs = {
        let _stage = ui.stage("Scan frame directories");
        let mut jobs = Vec::with_capacity(args.streams.len());
        for (frames_dir, labels_dir) in args.streams.iter().zip(&args.labels) {
            let source = DirectorySource::open(frames_dir)?;
            let label = frames_dir.display().to_string();
            let pipeline = StreamPipeline::new(
                label,
                config,
                Box::new(LabelDirBackend::new(labels_dir)),
                Box::new(FsImageSource::new().with_flip(config.input.flip_horizontal)),
            );
            jobs.push(StreamJob {
                pipeline,
                frames: source.into_frames(),
            });
        }
        jobs
    };

    let options = RunOptions {
        flush_on_cancel: args.flush_on_cancel,
        trace_tracks: args.trace,
    };
    let outcomes = {
        let _stage = ui.stage("Track trunks");
        run_streams(jobs, &cancel, options)
    };

    let mut out: Box<dyn Write> = match &args.out {
        Some(path) => Box::new(BufWriter::new(
            std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };
    let mut total = 0usize;
    for outcome in &outcomes {
        for record in &outcome.records {
            let line = OutputLine {
                stream: &outcome.label,
                record,
            };
            serde_json::to_writer(&mut out, &line)?;
            out.write_all(b"\n")?;
            total += 1;
        }
    }
    out.flush()?;

    let cancelled = outcomes.iter().any(|o| o.cancelled);
    log::info!(
        "{} trees from {} streams{}",
        total,
        outcomes.len(),
        if cancelled { " (cancelled)" } else { "" }
    );
    Ok(())
}
