//! roi_ratio - per-frame non-black ratio of the fixed diagnostic crop
//!
//! Prints `filename,black_pixels,color_pixels,non_black_ratio` for every frame
//! in a directory, in sequence order. Unreadable frames are logged and skipped.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use trunk_census::gate::diagnostic_crop;
use trunk_census::ui::Ui;
use trunk_census::{CensusConfig, DirectorySource, FsImageSource, ImageSource};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Frame directory to scan.
    #[arg(value_name = "FRAMES_DIR")]
    frames: PathBuf,
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "TRUNK_CONFIG")]
    config: Option<PathBuf>,
    /// Output CSV file (stdout when omitted).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Mirror frames horizontally before sampling.
    #[arg(long)]
    flip: bool,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::from_flag(Some(&args.ui));

    let config = CensusConfig::load_from(args.config.as_deref())?;
    let crop = diagnostic_crop(&config.gate);
    let images = FsImageSource::new().with_flip(args.flip || config.input.flip_horizontal);

    let source = {
        let _stage = ui.stage("Scan frame directory");
        DirectorySource::open(&args.frames)?
    };

    let mut out: Box<dyn Write> = match &args.out {
        Some(path) => Box::new(BufWriter::new(
            std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };
    writeln!(out, "filename,black_pixels,color_pixels,non_black_ratio")?;

    let _stage = ui.stage("Sample diagnostic crop");
    let bar = ui.frame_bar(source.len() as u64, "roi");
    let mut skipped = 0usize;
    for frame in source.frames() {
        bar.inc(1);
        let image = match images.load(frame) {
            Ok(image) => image,
            Err(err) => {
                log::warn!("{}", err);
                skipped += 1;
                continue;
            }
        };
        let stats = image.roi_stats(crop);
        let filename = frame
            .path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| frame.name.clone());
        writeln!(
            out,
            "{},{},{},{:.6}",
            filename,
            stats.black_pixels,
            stats.color_pixels,
            stats.ratio()
        )?;
    }
    bar.finish_and_clear();
    out.flush()?;

    if skipped > 0 {
        log::warn!("{} of {} frames could not be read", skipped, source.len());
    }
    Ok(())
}
