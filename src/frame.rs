//! Frames and their pixel buffers.
//!
//! - `FrameRef`: identity of one frame in a stream (sequence number + name).
//! - `FrameImage`: decoded RGB buffer with the crop statistics the
//!   plausibility gate needs.
//! - `ImageSource`: how the pipeline obtains a frame's pixels. Missing and
//!   undecodable images are distinct failures; a valid image whose region is
//!   empty background is not a failure at all.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use image::{imageops, Rgb, RgbImage};

use crate::error::{ImageFailure, TrackError};

/// Identity of one frame in an ordered stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRef {
    /// Strictly increasing sequence number derived from the frame name.
    pub id: u64,
    /// File stem (e.g. `"0000142"`), used to locate the frame's label file.
    pub name: String,
    /// Image location for filesystem-backed streams.
    pub path: Option<PathBuf>,
}

impl FrameRef {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Axis-aligned pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Pixel counts inside a crop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoiStats {
    pub black_pixels: u64,
    pub color_pixels: u64,
}

impl RoiStats {
    pub fn total(&self) -> u64 {
        self.black_pixels + self.color_pixels
    }

    /// Fraction of non-black pixels; 0.0 for an empty crop.
    pub fn ratio(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.color_pixels as f64 / total as f64,
        }
    }
}

/// Decoded RGB frame.
#[derive(Clone, Debug)]
pub struct FrameImage {
    pixels: RgbImage,
}

impl FrameImage {
    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    /// Wrap a packed RGB24 buffer.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("RGB frame dimensions overflow"))? as usize;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        let pixels = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| anyhow!("RGB buffer rejected for {}x{}", width, height))?;
        Ok(Self { pixels })
    }

    /// All-black frame.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn as_rgb(&self) -> &RgbImage {
        &self.pixels
    }

    /// Paint a rectangle (clamped to the frame) with a solid colour.
    pub fn fill_rect(&mut self, rect: CropRect, rgb: [u8; 3]) {
        let (x0, y0, x1, y1) = self.clamp(rect);
        for y in y0..y1 {
            for x in x0..x1 {
                self.pixels.put_pixel(x, y, Rgb(rgb));
            }
        }
    }

    /// Mirror the frame left-to-right.
    pub fn flip_horizontal(&mut self) {
        imageops::flip_horizontal_in_place(&mut self.pixels);
    }

    /// Black/colour pixel counts inside `rect`, clamped to the frame.
    pub fn roi_stats(&self, rect: CropRect) -> RoiStats {
        let (x0, y0, x1, y1) = self.clamp(rect);
        let mut stats = RoiStats::default();
        for y in y0..y1 {
            for x in x0..x1 {
                if self.pixels.get_pixel(x, y).0 == [0, 0, 0] {
                    stats.black_pixels += 1;
                } else {
                    stats.color_pixels += 1;
                }
            }
        }
        stats
    }

    /// Fraction of non-black pixels inside `rect`.
    pub fn nonblack_ratio(&self, rect: CropRect) -> f64 {
        self.roi_stats(rect).ratio()
    }

    fn clamp(&self, rect: CropRect) -> (u32, u32, u32, u32) {
        let (w, h) = self.pixels.dimensions();
        let x0 = rect.x.min(w);
        let y0 = rect.y.min(h);
        let x1 = rect.x.saturating_add(rect.width).min(w);
        let y1 = rect.y.saturating_add(rect.height).min(h);
        (x0, y0, x1, y1)
    }
}

/// Image accessor collaborator.
pub trait ImageSource: Send {
    fn load(&self, frame: &FrameRef) -> Result<FrameImage, TrackError>;
}

/// Decodes frame images from disk.
#[derive(Clone, Debug, Default)]
pub struct FsImageSource {
    flip_horizontal: bool,
}

impl FsImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror every frame on load (right-hand cameras).
    pub fn with_flip(mut self, flip_horizontal: bool) -> Self {
        self.flip_horizontal = flip_horizontal;
        self
    }
}

impl ImageSource for FsImageSource {
    fn load(&self, frame: &FrameRef) -> Result<FrameImage, TrackError> {
        let Some(path) = frame.path.as_ref() else {
            return Err(TrackError::ImageRead {
                frame_id: frame.id,
                kind: ImageFailure::Missing,
                reason: format!("frame {} has no image path", frame.name),
            });
        };
        if !path.is_file() {
            return Err(TrackError::ImageRead {
                frame_id: frame.id,
                kind: ImageFailure::Missing,
                reason: format!("{} not found", path.display()),
            });
        }
        let decoded = image::open(path).map_err(|e| TrackError::ImageRead {
            frame_id: frame.id,
            kind: ImageFailure::Corrupt,
            reason: format!("decode {}: {}", path.display(), e),
        })?;
        let mut image = FrameImage::from_rgb(decoded.into_rgb8());
        if self.flip_horizontal {
            image.flip_horizontal();
        }
        Ok(image)
    }
}

/// Frame images held in memory, keyed by frame id.
#[derive(Clone, Debug, Default)]
pub struct InMemoryImageSource {
    images: HashMap<u64, FrameImage>,
    corrupt: HashSet<u64>,
}

impl InMemoryImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, frame_id: u64, image: FrameImage) {
        self.corrupt.remove(&frame_id);
        self.images.insert(frame_id, image);
    }

    /// Make `frame_id` fail to decode.
    pub fn mark_corrupt(&mut self, frame_id: u64) {
        self.images.remove(&frame_id);
        self.corrupt.insert(frame_id);
    }
}

impl ImageSource for InMemoryImageSource {
    fn load(&self, frame: &FrameRef) -> Result<FrameImage, TrackError> {
        if self.corrupt.contains(&frame.id) {
            return Err(TrackError::ImageRead {
                frame_id: frame.id,
                kind: ImageFailure::Corrupt,
                reason: "marked corrupt".to_string(),
            });
        }
        self.images
            .get(&frame.id)
            .cloned()
            .ok_or_else(|| TrackError::ImageRead {
                frame_id: frame.id,
                kind: ImageFailure::Missing,
                reason: "no image registered".to_string(),
            })
    }
}
