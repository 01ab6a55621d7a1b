use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Patterns used to classify the external downloader's output. These live in
/// configuration because the exact phrasing drifts between downloader
/// versions; do not bake a particular release's wording into code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    pub error_line: String,
    pub success_line: String,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            error_line: r"^ERROR:".to_string(),
            success_line: r"^\[download\] Destination:|has already been downloaded"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_file: PathBuf,
    pub video_format: String,
    pub audio_format: String,
    pub heuristics: Heuristics,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("./logs/ytgrab.log"),
            video_format: "bestvideo+bestaudio/best".to_string(),
            audio_format: "bestaudio/best".to_string(),
            heuristics: Heuristics::default(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("ytgrab.toml"))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&raw)?)
        } else {
            Ok(Self::default())
        }
    }
}
