use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio_system::clip::SequenceMode;
use crate::audio_system::cue::PlaybackParams;
use crate::audio_system::voice::Position;
use crate::error::ConfigError;

fn default_pool_size() -> usize {
    8
}

fn default_tick_interval_ms() -> u64 {
    16
}

fn default_clip_length_ms() -> u64 {
    1000
}

fn default_one() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipEntry {
    pub name: String,

    /// Audio file, relative to the config file's directory
    #[serde(default)]
    pub path: Option<String>,

    /// Nominal clip length, used by the headless backend
    #[serde(default = "default_clip_length_ms")]
    pub length_ms: u64,
}

impl ClipEntry {
    pub fn new(name: impl Into<String>, length_ms: u64) -> Self {
        Self {
            name: name.into(),
            path: None,
            length_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipGroupEntry {
    #[serde(default)]
    pub sequence_mode: SequenceMode,

    /// Names of declared clips
    pub clips: Vec<String>,
}

/// Cue definition. Absent fields take the defaults of a plain looping-off,
/// scene-scoped, full-volume cue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueEntry {
    pub name: String,

    /// Stop when the current scene is unloaded
    #[serde(default = "default_true")]
    pub scene_scoped: bool,

    #[serde(default = "default_one")]
    pub volume: f32,

    #[serde(default = "default_one")]
    pub pitch: f32,

    #[serde(default = "default_one")]
    pub spatial_blend: f32,

    #[serde(default)]
    pub looping: bool,

    #[serde(default)]
    pub groups: Vec<ClipGroupEntry>,
}

impl Default for CueEntry {
    fn default() -> Self {
        Self {
            name: String::new(),
            scene_scoped: true,
            volume: 1.0,
            pitch: 1.0,
            spatial_blend: 1.0,
            looping: false,
            groups: Vec::new(),
        }
    }
}

impl CueEntry {
    /// Clamped playback parameters for this cue
    pub fn params(&self) -> PlaybackParams {
        PlaybackParams {
            volume: self.volume,
            pitch: self.pitch,
            spatial_blend: self.spatial_blend,
            looping: self.looping,
            scene_scoped: self.scene_scoped,
        }
        .clamped()
    }
}

/// Ear positions used by the spatial backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub left_ear: Position,
    pub right_ear: Position,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            left_ear: [-0.1, 0.0, 0.0],
            right_ear: [0.1, 0.0, 0.0],
        }
    }
}

impl ListenerConfig {
    /// Midpoint between the ears
    pub fn head(&self) -> Position {
        [
            (self.left_ear[0] + self.right_ear[0]) * 0.5,
            (self.left_ear[1] + self.right_ear[1]) * 0.5,
            (self.left_ear[2] + self.right_ear[2]) * 0.5,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Voices created up front
    #[serde(default = "default_pool_size")]
    pub initial_pool_size: usize,

    /// Scheduler period of the service thread
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default)]
    pub listener: ListenerConfig,

    #[serde(default)]
    pub clips: Vec<ClipEntry>,

    #[serde(default)]
    pub cues: Vec<CueEntry>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            initial_pool_size: default_pool_size(),
            tick_interval_ms: default_tick_interval_ms(),
            listener: ListenerConfig::default(),
            clips: Vec::new(),
            cues: Vec::new(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        let config = Self::from_json(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        tracing::info!("✓ Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |source: Box<dyn std::error::Error + Send + Sync>| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source,
        };

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| save_failed(Box::new(e)))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| save_failed(Box::new(e)))?;
        fs::write(path, json).map_err(|e| save_failed(Box::new(e)))?;

        Ok(())
    }

    /// Structural checks that do not need the clip data
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }

        let mut names: Vec<&str> = self.cues.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(ConfigError::Invalid(format!("duplicate cue name '{}'", pair[0])));
        }

        Ok(())
    }

    /// Resolve a clip's file relative to the directory of the config file
    pub fn clip_path(base_dir: &Path, clip: &ClipEntry) -> Option<PathBuf> {
        clip.path.as_ref().map(|p| {
            let path = Path::new(p);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base_dir.join(path)
            }
        })
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_cue_defaults() {
        let config = ServiceConfig::from_json(
            r#"{
                "clips": [{ "name": "hit" }],
                "cues": [{ "name": "hit", "groups": [{ "clips": ["hit"] }] }]
            }"#,
        )
        .unwrap();

        assert_eq!(config.initial_pool_size, 8);
        assert_eq!(config.tick_interval_ms, 16);
        assert_eq!(config.clips[0].length_ms, 1000);

        let cue = &config.cues[0];
        assert_eq!(cue.params(), PlaybackParams::default());
        assert_eq!(cue.groups[0].sequence_mode, SequenceMode::RandomNoImmediateRepeat);
    }

    #[test]
    fn test_params_are_clamped() {
        let cue = CueEntry {
            volume: 3.0,
            pitch: 9.0,
            spatial_blend: -1.0,
            ..CueEntry::default()
        };
        let params = cue.params();
        assert_eq!(params.volume, 1.0);
        assert_eq!(params.pitch, 3.0);
        assert_eq!(params.spatial_blend, 0.0);
    }

    #[test]
    fn test_duplicate_cue_names_rejected() {
        let result = ServiceConfig::from_json(
            r#"{ "cues": [{ "name": "a" }, { "name": "a" }] }"#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        let result = ServiceConfig::from_json(r#"{ "tick_interval_ms": 0 }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(ServiceConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join("audio_cue_service_config_test")
            .join("cues.json");

        let mut config = ServiceConfig::default();
        config.initial_pool_size = 3;
        config.clips.push(ClipEntry::new("ping", 120));
        config.save(&path).unwrap();

        let loaded = ServiceConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let result = ServiceConfig::load(Path::new("/nonexistent/cues.json"));
        assert!(matches!(result, Err(ConfigError::LoadFailed { .. })));
    }

    #[test]
    fn test_clip_path_resolution() {
        let mut clip = ClipEntry::new("ping", 100);
        assert_eq!(ServiceConfig::clip_path(Path::new("/cfg"), &clip), None);

        clip.path = Some("sfx/ping.wav".to_string());
        assert_eq!(
            ServiceConfig::clip_path(Path::new("/cfg"), &clip),
            Some(PathBuf::from("/cfg/sfx/ping.wav"))
        );
    }

    #[test]
    fn test_listener_head_is_midpoint() {
        let listener = ListenerConfig::default();
        assert_eq!(listener.head(), [0.0, 0.0, 0.0]);
    }
}
