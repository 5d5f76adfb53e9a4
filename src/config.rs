// src/config.rs
use std::f32::consts::FRAC_PI_2;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::scene::member::MemberRecord;

/// Environment variable naming an optional JSON config file (native only).
pub const CONFIG_ENV_VAR: &str = "EVENTFX_CONFIG";

/// Tuning for the binary rain field. Defaults reproduce the page's look.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RainConfig {
    pub min_row_height: f32,
    pub max_row_height: f32,
    /// Height is divided by this to get the preferred row height.
    pub row_density: f32,
    pub min_rows: usize,
    pub font_size_range: [f32; 2],
    /// Absolute scroll speed range in px/sec.
    pub speed_range: [f32; 2],
    pub spacing_factor: f32,
    pub min_spacing: f32,
    /// Vertical reach of an impulse in px.
    pub impulse_reach: f32,
    pub impulse_gain: f32,
    pub max_boost: f32,
    /// Boost decay per second.
    pub boost_decay: f32,
    pub scroll_parallax: f32,
    /// Ring growth in px per millisecond.
    pub ring_growth: f32,
    /// Impulse life lost per second.
    pub life_decay: f32,
    pub band_half_width: f32,
    pub accent_every: usize,
    pub base_alpha: f32,
    pub accent_alpha: f32,
    pub max_size_bump: f32,
    pub ring_width: f32,
    pub ring_max_alpha: f32,
}

impl Default for RainConfig {
    fn default() -> Self {
        Self {
            min_row_height: 28.0,
            max_row_height: 48.0,
            row_density: 14.0,
            min_rows: 6,
            font_size_range: [22.0, 36.0],
            speed_range: [12.0, 28.0],
            spacing_factor: 0.85,
            min_spacing: 18.0,
            impulse_reach: 120.0,
            impulse_gain: 1.2,
            max_boost: 1.5,
            boost_decay: 0.8,
            scroll_parallax: 0.005,
            ring_growth: 0.6,
            life_decay: 0.9,
            band_half_width: 24.0,
            accent_every: 5,
            base_alpha: 0.6,
            accent_alpha: 1.0,
            max_size_bump: 6.0,
            ring_width: 2.0,
            ring_max_alpha: 0.5,
        }
    }
}

/// Tuning for the radial team network.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub min_width: f32,
    pub min_height: f32,
    pub orbit_ratio: f32,
    pub hub_ratio: f32,
    pub hub_radius_range: [f32; 2],
    pub node_radius: f32,
    /// Orbit speed in radians per second.
    pub rotation_speed: f32,
    pub initial_rotation: f32,
    pub hub_label: String,
    pub fine_pointer_slop: f32,
    pub coarse_pointer_slop: f32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            min_width: 320.0,
            min_height: 260.0,
            orbit_ratio: 0.33,
            hub_ratio: 0.04,
            hub_radius_range: [18.0, 24.0],
            node_radius: 18.0,
            rotation_speed: 0.15,
            initial_rotation: -FRAC_PI_2,
            hub_label: "TEAM".to_string(),
            fine_pointer_slop: 2.0,
            coarse_pointer_slop: 10.0,
        }
    }
}

/// Host preferences a native build cannot query from a browser.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HostSignals {
    pub reduced_motion: bool,
    pub coarse_pointer: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub rain: RainConfig,
    pub network: NetworkConfig,
    pub host: HostSignals,
    pub members: Vec<MemberRecord>,
}

impl Config {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid eventfx config JSON")
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// Reads `EVENTFX_CONFIG` if set, otherwise returns defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => {
                log::info!("Loading config from {}", Path::new(&path).display());
                Self::from_file(path)
            }
            None => Ok(Self::default()),
        }
    }
}
