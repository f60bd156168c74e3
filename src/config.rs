use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_X_THRESHOLD: f64 = 0.30;
pub const DEFAULT_MIN_AREA: f64 = 0.005;
pub const DEFAULT_BAND_THRESHOLD: f64 = 0.15;
pub const DEFAULT_CROP_X: u32 = 92;
pub const DEFAULT_CROP_WIDTH: u32 = 177;
pub const DEFAULT_CROP_HEIGHT: u32 = 65;
pub const DEFAULT_RATIO_MIN: f64 = 0.2;
pub const DEFAULT_DIAGNOSTIC_Y: u32 = 197;
pub const DEFAULT_Y_GAP: f64 = 0.2;
pub const MIN_TRACK_LEN: usize = 5;
pub const DEFAULT_CENTER_Y: f64 = 0.5;
pub const DEFAULT_MATCH_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_FRAME_WIDTH: u32 = 640;
pub const DEFAULT_FRAME_HEIGHT: u32 = 480;

#[derive(Debug, Deserialize, Default)]
struct CensusConfigFile {
    filter: Option<FilterConfigFile>,
    gate: Option<GateConfigFile>,
    tracker: Option<TrackerConfigFile>,
    resolver: Option<ResolverConfigFile>,
    mapper: Option<MapperConfigFile>,
    input: Option<InputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct FilterConfigFile {
    x_threshold: Option<f64>,
    min_area: Option<f64>,
    band_threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct GateConfigFile {
    crop_x: Option<u32>,
    crop_width: Option<u32>,
    crop_height: Option<u32>,
    ratio_min: Option<f64>,
    diagnostic_y: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct TrackerConfigFile {
    y_gap: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct ResolverConfigFile {
    min_track_len: Option<usize>,
    center_y: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct MapperConfigFile {
    match_tolerance: Option<f64>,
    frame_width: Option<u32>,
    frame_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct InputConfigFile {
    flip_horizontal: Option<bool>,
}

/// Candidate filter thresholds (normalized units).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSettings {
    /// Boxes with `x_center >= x_threshold` are off-path (branches).
    pub x_threshold: f64,
    /// Minimum normalized `width * height`.
    pub min_area: f64,
    /// Boxes closer than this in `y_center` share a horizontal band.
    pub band_threshold: f64,
}

/// Plausibility gate crop geometry (pixels) and threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateSettings {
    pub crop_x: u32,
    pub crop_width: u32,
    pub crop_height: u32,
    pub ratio_min: f64,
    /// Top edge of the fixed diagnostic crop sampled on every frame.
    pub diagnostic_y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerSettings {
    /// Largest frame-to-frame `y` movement still counted as the same tree.
    pub y_gap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverSettings {
    pub min_track_len: usize,
    pub center_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapperSettings {
    pub match_tolerance: f64,
    /// Pixel size used when a frame's own dimensions are unknown.
    pub frame_width: u32,
    pub frame_height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputSettings {
    pub flip_horizontal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CensusConfig {
    pub filter: FilterSettings,
    pub gate: GateSettings,
    pub tracker: TrackerSettings,
    pub resolver: ResolverSettings,
    pub mapper: MapperSettings,
    pub input: InputSettings,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            x_threshold: DEFAULT_X_THRESHOLD,
            min_area: DEFAULT_MIN_AREA,
            band_threshold: DEFAULT_BAND_THRESHOLD,
        }
    }
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            crop_x: DEFAULT_CROP_X,
            crop_width: DEFAULT_CROP_WIDTH,
            crop_height: DEFAULT_CROP_HEIGHT,
            ratio_min: DEFAULT_RATIO_MIN,
            diagnostic_y: DEFAULT_DIAGNOSTIC_Y,
        }
    }
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            y_gap: DEFAULT_Y_GAP,
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            min_track_len: MIN_TRACK_LEN,
            center_y: DEFAULT_CENTER_Y,
        }
    }
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            match_tolerance: DEFAULT_MATCH_TOLERANCE,
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
        }
    }
}

impl CensusConfig {
    /// Defaults, then the file named by `TRUNK_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("TRUNK_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Like `load`, with an explicit config file taking the place of `TRUNK_CONFIG`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CensusConfigFile) -> Self {
        let defaults = Self::default();
        let filter = file.filter.unwrap_or_default();
        let gate = file.gate.unwrap_or_default();
        let tracker = file.tracker.unwrap_or_default();
        let resolver = file.resolver.unwrap_or_default();
        let mapper = file.mapper.unwrap_or_default();
        let input = file.input.unwrap_or_default();
        Self {
            filter: FilterSettings {
                x_threshold: filter.x_threshold.unwrap_or(defaults.filter.x_threshold),
                min_area: filter.min_area.unwrap_or(defaults.filter.min_area),
                band_threshold: filter
                    .band_threshold
                    .unwrap_or(defaults.filter.band_threshold),
            },
            gate: GateSettings {
                crop_x: gate.crop_x.unwrap_or(defaults.gate.crop_x),
                crop_width: gate.crop_width.unwrap_or(defaults.gate.crop_width),
                crop_height: gate.crop_height.unwrap_or(defaults.gate.crop_height),
                ratio_min: gate.ratio_min.unwrap_or(defaults.gate.ratio_min),
                diagnostic_y: gate.diagnostic_y.unwrap_or(defaults.gate.diagnostic_y),
            },
            tracker: TrackerSettings {
                y_gap: tracker.y_gap.unwrap_or(defaults.tracker.y_gap),
            },
            resolver: ResolverSettings {
                min_track_len: resolver
                    .min_track_len
                    .unwrap_or(defaults.resolver.min_track_len),
                center_y: resolver.center_y.unwrap_or(defaults.resolver.center_y),
            },
            mapper: MapperSettings {
                match_tolerance: mapper
                    .match_tolerance
                    .unwrap_or(defaults.mapper.match_tolerance),
                frame_width: mapper.frame_width.unwrap_or(defaults.mapper.frame_width),
                frame_height: mapper.frame_height.unwrap_or(defaults.mapper.frame_height),
            },
            input: InputSettings {
                flip_horizontal: input
                    .flip_horizontal
                    .unwrap_or(defaults.input.flip_horizontal),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_f64("TRUNK_X_THRESHOLD")? {
            self.filter.x_threshold = v;
        }
        if let Some(v) = env_f64("TRUNK_MIN_AREA")? {
            self.filter.min_area = v;
        }
        if let Some(v) = env_f64("TRUNK_RATIO_MIN")? {
            self.gate.ratio_min = v;
        }
        if let Some(v) = env_f64("TRUNK_Y_GAP")? {
            self.tracker.y_gap = v;
        }
        if let Ok(len) = std::env::var("TRUNK_MIN_TRACK_LEN") {
            if !len.trim().is_empty() {
                self.resolver.min_track_len = len
                    .trim()
                    .parse()
                    .map_err(|_| anyhow!("TRUNK_MIN_TRACK_LEN must be a positive integer"))?;
            }
        }
        if let Ok(flip) = std::env::var("TRUNK_FLIP_HORIZONTAL") {
            match flip.trim().to_ascii_lowercase().as_str() {
                "" => {}
                "1" | "true" | "yes" => self.input.flip_horizontal = true,
                "0" | "false" | "no" => self.input.flip_horizontal = false,
                other => {
                    return Err(anyhow!(
                        "TRUNK_FLIP_HORIZONTAL must be true or false, got '{}'",
                        other
                    ))
                }
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        unit_interval("filter.x_threshold", self.filter.x_threshold)?;
        unit_interval("filter.min_area", self.filter.min_area)?;
        unit_interval("filter.band_threshold", self.filter.band_threshold)?;
        unit_interval("gate.ratio_min", self.gate.ratio_min)?;
        unit_interval("resolver.center_y", self.resolver.center_y)?;
        if self.gate.crop_width == 0 || self.gate.crop_height == 0 {
            return Err(anyhow!("gate crop must have a non-zero size"));
        }
        if !(self.tracker.y_gap > 0.0) {
            return Err(anyhow!("tracker.y_gap must be greater than zero"));
        }
        if self.resolver.min_track_len == 0 {
            return Err(anyhow!("resolver.min_track_len must be at least 1"));
        }
        if !(self.mapper.match_tolerance > 0.0) {
            return Err(anyhow!("mapper.match_tolerance must be greater than zero"));
        }
        if self.mapper.frame_width == 0 || self.mapper.frame_height == 0 {
            return Err(anyhow!("mapper frame size must be non-zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<CensusConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_f64(key: &str) -> Result<Option<f64>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a number", key)),
        _ => Ok(None),
    }
}

fn unit_interval(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
    }
    Ok(())
}
