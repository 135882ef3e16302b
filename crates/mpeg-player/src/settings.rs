use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Render list the video quad is submitted to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    #[default]
    Opaque,
    Translucent,
    PunchThrough,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    Nearest,
    #[default]
    Bilinear,
}

/// Options fixed at player creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerOptions {
    pub list_type: ListType,
    pub filter: FilterMode,
    /// Initial stream volume, 0-255.
    pub volume: u8,
    pub looping: bool,
    /// Size of the default full-screen quad.
    pub screen_size: [f32; 2],
    /// Hardware audio buffer handed to the stream allocator.
    pub audio_buffer_bytes: usize,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            list_type: ListType::Opaque,
            filter: FilterMode::Bilinear,
            volume: 255,
            looping: false,
            screen_size: [640.0, 480.0],
            audio_buffer_bytes: 64 * 1024,
        }
    }
}

impl PlayerOptions {
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("mpeg-player").join("options.json")
    }

    /// Read options from `path`. A missing or unreadable file yields the
    /// defaults; problems are logged, never returned.
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No options at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                log::warn!("Failed to read options {}: {e}", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str::<Self>(&contents) {
            Ok(options) => {
                log::info!("Loaded player options from {}", path.display());
                options
            }
            Err(e) => {
                log::warn!("Failed to parse options {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Saved player options to {}", path.display());
        Ok(())
    }
}
