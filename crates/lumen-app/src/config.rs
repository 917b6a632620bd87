// SPDX-License-Identifier: CEPL-1.0
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lumen_render::{RendererCreateInfo, DEFAULT_FRAMES_IN_FLIGHT, MAX_FRAMES_IN_FLIGHT_LIMIT};
use serde::Deserialize;
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_PATH: &str = "lumen.toml";

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct AppCfg {
    #[serde(default)]
    pub window: WindowCfg,
    #[serde(default)]
    pub render: RenderCfg,
    #[serde(default)]
    pub scene: SceneCfg,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WindowCfg {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowCfg {
    fn default() -> Self {
        Self {
            title: "lumen".into(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RenderCfg {
    pub clear_color: [f32; 4],
    pub enable_validation: bool,
    pub frames_in_flight: u32,
    pub shader_dir: Option<PathBuf>,
}

impl Default for RenderCfg {
    fn default() -> Self {
        Self {
            clear_color: default_clear(),
            enable_validation: cfg!(debug_assertions),
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT as u32,
            shader_dir: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SceneCfg {
    pub bodies: u32,
    pub active_color: [f32; 4],
    pub sleeping_color: [f32; 4],
}

impl Default for SceneCfg {
    fn default() -> Self {
        Self {
            bodies: 12,
            active_color: [0.95, 0.55, 0.25, 1.0],
            sleeping_color: [0.35, 0.5, 0.9, 1.0],
        }
    }
}

fn default_clear() -> [f32; 4] {
    [0.02, 0.05, 0.09, 1.0]
}

impl AppCfg {
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reads `path`. A missing file gives defaults; so does a malformed one, with a warning.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => match Self::parse(&text) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!("{}: {e}; using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} not found; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("reading {}: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn frames_in_flight(&self) -> usize {
        (self.render.frames_in_flight as usize).clamp(1, MAX_FRAMES_IN_FLIGHT_LIMIT)
    }

    pub fn create_info(&self, width: u32, height: u32) -> RendererCreateInfo {
        RendererCreateInfo {
            width,
            height,
            enable_validation: self.render.enable_validation,
            frames_in_flight: self.frames_in_flight(),
            clear_color: self.render.clear_color,
            shader_dir: self.render.shader_dir.clone(),
        }
    }
}
