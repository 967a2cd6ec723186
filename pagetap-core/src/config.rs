use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::error::{Error, Result};

// Bound on hit-test rings, each of which costs `hit_angles` backend lookups.
const MAX_HIT_RINGS: f32 = 64.0;
const MAX_HIT_ANGLES: u32 = 360;

/// Tunables for gesture classification, hit-testing and zoom.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TouchConfig {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "long_press_ms")]
    pub long_press: Duration,
    pub touch_slop: f32,
    pub hit_step: f32,
    pub hit_max_radius: f32,
    pub hit_angles: u32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub fit_margin: f32,
    pub high_res_threshold: f32,
    pub base_dpi: f32,
    pub max_dpi: f32,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            long_press: Duration::from_millis(500),
            touch_slop: 8.0,
            hit_step: 6.0,
            hit_max_radius: 30.0,
            hit_angles: 12,
            min_scale: 1.0,
            max_scale: 8.0,
            fit_margin: 0.95,
            high_res_threshold: 2.0,
            base_dpi: 96.0,
            max_dpi: 600.0,
        }
    }
}

impl TouchConfig {
    pub fn from_toml(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("hit_step", self.hit_step),
            ("hit_max_radius", self.hit_max_radius),
            ("min_scale", self.min_scale),
            ("max_scale", self.max_scale),
            ("fit_margin", self.fit_margin),
            ("high_res_threshold", self.high_res_threshold),
            ("base_dpi", self.base_dpi),
            ("max_dpi", self.max_dpi),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::invariant(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        if !(self.touch_slop.is_finite() && self.touch_slop >= 0.0) {
            return Err(Error::invariant(format!(
                "touch_slop must be finite and non-negative, got {}",
                self.touch_slop
            )));
        }
        if self.min_scale > self.max_scale {
            return Err(Error::invariant(format!(
                "scale limits must satisfy min <= max, got [{}, {}]",
                self.min_scale, self.max_scale
            )));
        }
        if self.base_dpi > self.max_dpi {
            return Err(Error::invariant(format!(
                "base_dpi {} exceeds max_dpi {}",
                self.base_dpi, self.max_dpi
            )));
        }
        if self.hit_max_radius / self.hit_step > MAX_HIT_RINGS {
            return Err(Error::invariant(format!(
                "hit_max_radius {} over hit_step {} exceeds {MAX_HIT_RINGS} rings",
                self.hit_max_radius, self.hit_step
            )));
        }
        if !(1..=MAX_HIT_ANGLES).contains(&self.hit_angles) {
            return Err(Error::invariant(format!(
                "hit_angles must be within 1..={MAX_HIT_ANGLES}, got {}",
                self.hit_angles
            )));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        let config = Self::from_toml(&source)?;
        debug!(path = %path.display(), ?config, "loaded touch config");
        Ok(config)
    }

    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
