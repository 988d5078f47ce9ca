use crate::error::EngineResult;

use serde::{Deserialize, Serialize};

use std::fs;
use std::path::Path;

/// Engine configuration, loaded once at startup and immutable for the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub frame: FrameConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

impl EngineConfig {
    pub fn load_toml(path: impl AsRef<Path>) -> EngineResult<Self> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_title() -> String {
    "kestrel".to_string()
}
fn default_width() -> u32 {
    1280
}
fn default_height() -> u32 {
    720
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            width: default_width(),
            height: default_height(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Fixed-step simulation rate. 50 Hz = the classic 0.02 s step.
    #[serde(default = "default_fixed_hz")]
    pub fixed_hz: u32,
    /// Upper bound on a single frame delta; longer stalls are truncated.
    #[serde(default = "default_max_dt_ms")]
    pub max_dt_ms: u32,
}

fn default_fixed_hz() -> u32 {
    50
}
fn default_max_dt_ms() -> u32 {
    250
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            fixed_hz: default_fixed_hz(),
            max_dt_ms: default_max_dt_ms(),
        }
    }
}

impl FrameConfig {
    #[inline]
    pub fn fixed_step(&self) -> f32 {
        1.0 / (self.fixed_hz.max(1) as f32)
    }

    #[inline]
    pub fn max_dt(&self) -> f32 {
        (self.max_dt_ms as f32 / 1000.0).max(0.001)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Render API selection. "vulkan" is the only backend in tree.
    #[serde(default = "default_api")]
    pub api: String,
    /// Frame slots (in-flight frames). 2 = double buffering.
    #[serde(default = "default_frames_in_flight")]
    pub frames_in_flight: u32,
}

fn default_api() -> String {
    "vulkan".to_string()
}
fn default_frames_in_flight() -> u32 {
    2
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            api: default_api(),
            frames_in_flight: default_frames_in_flight(),
        }
    }
}

impl RenderConfig {
    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight.clamp(1, 3) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_contract() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.frame.fixed_hz, 50);
        assert!((cfg.frame.fixed_step() - 0.02).abs() < 1e-6);
        assert_eq!(cfg.render.frames_in_flight(), 2);
        assert_eq!(cfg.render.api, "vulkan");
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: EngineConfig = toml::from_str(
            r#"
            [frame]
            fixed_hz = 60

            [render]
            frames_in_flight = 3
            "#,
        )
        .unwrap();

        assert_eq!(cfg.frame.fixed_hz, 60);
        assert_eq!(cfg.frame.max_dt_ms, 250);
        assert_eq!(cfg.render.frames_in_flight(), 3);
        assert_eq!(cfg.window.width, 1280);
    }

    #[test]
    fn frames_in_flight_is_clamped() {
        let cfg = RenderConfig {
            api: "vulkan".to_string(),
            frames_in_flight: 9,
        };
        assert_eq!(cfg.frames_in_flight(), 3);

        let cfg = RenderConfig {
            api: "vulkan".to_string(),
            frames_in_flight: 0,
        };
        assert_eq!(cfg.frames_in_flight(), 1);
    }
}
