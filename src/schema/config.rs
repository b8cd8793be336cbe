//! Configuration types for particle flow engine parameters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    64
}

fn default_palette() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("females".to_string(), "plum".to_string()),
        ("males".to_string(), "mediumslateblue".to_string()),
    ])
}

fn flat_palette() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("females".to_string(), "plum".to_string()),
        ("males".to_string(), "powderblue".to_string()),
    ])
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of particles spawned per tick.
    pub density: u32,
    /// Minimum particle speed in arclength units per tick.
    pub speed: f64,
    /// Width of the speed interval above `speed`.
    pub speed_range: f64,
    /// Particle edge length in screen units.
    pub particle_size: f64,
    /// Lateral offset interval (min, max) across the route band.
    pub offset_range: (f64, f64),
    /// Keep arrived particles in the live set (true) or reclaim their slots.
    #[serde(default = "default_true")]
    pub retain_arrived: bool,
    /// Maximum live population. `None` uses the dataset's total count.
    #[serde(default)]
    pub population_cap: Option<usize>,
    /// Random seed for reproducible runs. `None` draws from entropy.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Widen and flatten particles as they approach the end of their route.
    #[serde(default = "default_true")]
    pub squeeze_on_arrival: bool,
    /// Maximum dataset nesting depth accepted by the flattener.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Group key to color mapping handed to the renderer.
    #[serde(default = "default_palette")]
    pub palette: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            density: 7,
            speed: 0.7,
            speed_range: 0.5,
            particle_size: 7.0,
            offset_range: (-38.5, 31.5),
            retain_arrived: true,
            population_cap: None,
            random_seed: None,
            squeeze_on_arrival: true,
            max_depth: default_max_depth(),
            palette: default_palette(),
        }
    }
}

impl EngineConfig {
    /// Defaults for flat datasets.
    pub fn flat() -> Self {
        Self {
            palette: flat_palette(),
            ..Default::default()
        }
    }

    /// Defaults for a dataset shape.
    pub fn for_shape(shape: &DatasetShape) -> Self {
        match shape {
            DatasetShape::Nested { .. } => Self::default(),
            DatasetShape::Flat { .. } => Self::flat(),
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(ConfigError::InvalidSpeed(self.speed));
        }
        if !(self.speed_range.is_finite() && self.speed_range >= 0.0) {
            return Err(ConfigError::InvalidSpeedRange(self.speed_range));
        }
        if !(self.particle_size.is_finite() && self.particle_size > 0.0) {
            return Err(ConfigError::InvalidParticleSize(self.particle_size));
        }
        let (lo, hi) = self.offset_range;
        if !(lo.is_finite() && hi.is_finite()) || lo > hi {
            return Err(ConfigError::InvalidOffsetRange { min: lo, max: hi });
        }
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth);
        }
        Ok(())
    }
}

/// Input dataset shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum DatasetShape {
    /// Nested category tree whose terminal entries hold per-group counts.
    Nested {
        /// Keys that mark an entry as terminal.
        group_keys: Vec<String>,
    },
    /// Single object of prefixed category counts plus a binary group split.
    Flat {
        /// Prefix shared by every category key (e.g. `"bit"`).
        category_prefix: String,
        /// The two aggregate group keys, in threshold order.
        group_keys: Vec<String>,
        /// Index of the category every link starts from.
        source_index: usize,
    },
}

impl Default for DatasetShape {
    fn default() -> Self {
        DatasetShape::Nested {
            group_keys: vec!["males".to_string(), "females".to_string()],
        }
    }
}

impl DatasetShape {
    /// Flat shape with the conventional `bit*` categories.
    pub fn flat() -> Self {
        DatasetShape::Flat {
            category_prefix: "bit".to_string(),
            group_keys: vec!["females".to_string(), "males".to_string()],
            source_index: 3,
        }
    }

    /// Group keys recognized by this shape.
    pub fn group_keys(&self) -> &[String] {
        match self {
            DatasetShape::Nested { group_keys } => group_keys,
            DatasetShape::Flat { group_keys, .. } => group_keys,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            DatasetShape::Nested { group_keys } => {
                if group_keys.is_empty() {
                    return Err(ConfigError::NoGroupKeys);
                }
            }
            DatasetShape::Flat {
                category_prefix,
                group_keys,
                ..
            } => {
                if category_prefix.is_empty() {
                    return Err(ConfigError::EmptyCategoryPrefix);
                }
                if group_keys.len() != 2 {
                    return Err(ConfigError::FlatGroupCount(group_keys.len()));
                }
            }
        }
        Ok(())
    }
}

/// Margins around the drawing area.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 10.0,
            right: 130.0,
            bottom: 10.0,
            left: 10.0,
        }
    }
}

/// Canvas and band geometry for the built-in layouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Canvas width in screen units.
    pub width: f64,
    /// Canvas height. Nested layouts derive it from the leaf count.
    pub height: f64,
    #[serde(default)]
    pub margin: Margin,
    /// Height of one route band (nested layout).
    pub band_height: f64,
    /// Minimum distance between nodes (nested layout).
    pub padding: f64,
    /// Share of a column occupied by the node's straight run, 0 smooth to 1 square.
    pub curve: f64,
    /// Inner padding of the band scale (flat layout).
    pub band_padding: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 300.0,
            margin: Margin::default(),
            band_height: 70.0,
            padding: 20.0,
            curve: 0.6,
            band_padding: 0.3,
        }
    }
}

impl LayoutConfig {
    /// Layout defaults for flat datasets.
    pub fn flat(width: f64) -> Self {
        Self {
            width: width.max(400.0),
            curve: 0.37,
            ..Default::default()
        }
    }

    /// Layout defaults for nested datasets.
    pub fn nested(width: f64) -> Self {
        Self {
            width: width.max(400.0),
            ..Default::default()
        }
    }

    /// Drawable width inside the margins.
    #[inline]
    pub fn inner_width(&self) -> f64 {
        self.width - self.margin.left - self.margin.right
    }

    /// Canvas height needed to stack `leaves` bands.
    pub fn nested_height(&self, leaves: usize) -> f64 {
        self.margin.top
            + self.margin.bottom
            + leaves as f64 * (self.band_height + self.padding / 2.0)
            + self.padding / 2.0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.width > 0.0 && self.height > 0.0) || self.inner_width() <= 0.0 {
            return Err(ConfigError::InvalidCanvas {
                width: self.width,
                height: self.height,
            });
        }
        if self.band_height <= 0.0 || self.padding < 0.0 {
            return Err(ConfigError::InvalidBand);
        }
        if !(0.0..=1.0).contains(&self.curve) || !(0.0..1.0).contains(&self.band_padding) {
            return Err(ConfigError::InvalidCurve);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Speed must be positive and finite, got {0}")]
    InvalidSpeed(f64),
    #[error("Speed range must be non-negative, got {0}")]
    InvalidSpeedRange(f64),
    #[error("Particle size must be positive, got {0}")]
    InvalidParticleSize(f64),
    #[error("Offset range min ({min}) > max ({max})")]
    InvalidOffsetRange { min: f64, max: f64 },
    #[error("Max dataset depth must be non-zero")]
    InvalidMaxDepth,
    #[error("Nested dataset shape needs at least one group key")]
    NoGroupKeys,
    #[error("Flat dataset shape needs a category prefix")]
    EmptyCategoryPrefix,
    #[error("Flat dataset shape needs exactly 2 group keys, got {0}")]
    FlatGroupCount(usize),
    #[error("Canvas {width}x{height} leaves no drawable area")]
    InvalidCanvas { width: f64, height: f64 },
    #[error("Band height must be positive and padding non-negative")]
    InvalidBand,
    #[error("Curve factor must be in [0, 1] and band padding in [0, 1)")]
    InvalidCurve,
}
