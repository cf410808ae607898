//! Cues and cue resolution
//!
//! A cue is a named bundle of clip groups played together as one logical
//! sound event. Resolving a cue yields one [`PlayOrder`] per group, each with
//! its own copy of the cue's playback parameters.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::clip::{ClipGroup, ClipRef};
use super::order::PlayOrder;
use crate::config::{CueEntry, ServiceConfig};
use crate::error::CueError;

pub const VOLUME_MIN: f32 = 0.0;
pub const VOLUME_MAX: f32 = 1.0;
pub const PITCH_MIN: f32 = -3.0;
pub const PITCH_MAX: f32 = 3.0;

/// Playback parameters copied into every order of a cue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackParams {
    /// Volume (0.0-1.0)
    pub volume: f32,

    /// Playback rate multiplier (-3.0-3.0)
    pub pitch: f32,

    /// 0.0 = 2D, 1.0 = fully positional
    pub spatial_blend: f32,

    pub looping: bool,

    /// Stopped when the current scene is unloaded
    pub scene_scoped: bool,
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pitch: 1.0,
            spatial_blend: 1.0,
            looping: false,
            scene_scoped: true,
        }
    }
}

impl PlaybackParams {
    /// Clamp every numeric field into its valid range. NaN and infinite
    /// values fall back to the defaults.
    pub fn clamped(self) -> Self {
        let defaults = Self::default();
        Self {
            volume: finite_or(self.volume, defaults.volume).clamp(VOLUME_MIN, VOLUME_MAX),
            pitch: finite_or(self.pitch, defaults.pitch).clamp(PITCH_MIN, PITCH_MAX),
            spatial_blend: finite_or(self.spatial_blend, defaults.spatial_blend).clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn is_spatial(&self) -> bool {
        self.spatial_blend > 0.0
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[derive(Debug, Clone)]
pub struct AudioCue {
    name: Arc<str>,
    params: PlaybackParams,
    groups: Vec<ClipGroup>,
}

impl AudioCue {
    /// Build a cue, rejecting empty clip groups
    pub fn new(
        name: impl Into<Arc<str>>,
        params: PlaybackParams,
        groups: Vec<ClipGroup>,
    ) -> Result<Self, CueError> {
        let name = name.into();
        if let Some(group) = groups.iter().position(|g| g.is_empty()) {
            return Err(CueError::EmptyClipGroup {
                cue: name.to_string(),
                group,
            });
        }

        Ok(Self {
            name,
            params: params.clamped(),
            groups,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &PlaybackParams {
        &self.params
    }

    pub fn groups(&self) -> &[ClipGroup] {
        &self.groups
    }

    /// Resolve one fresh order per clip group.
    ///
    /// Advances every group's selection cursor.
    pub fn new_orders(&mut self, rng: &mut StdRng) -> Vec<PlayOrder> {
        let name = Arc::clone(&self.name);
        let params = self.params;
        self.groups
            .iter_mut()
            .map(|group| PlayOrder::new(Arc::clone(&name), group.next_clip(rng), params))
            .collect()
    }

    /// Pick the next clip of every group without creating orders
    pub fn clips(&mut self, rng: &mut StdRng) -> Vec<ClipRef> {
        self.groups
            .iter_mut()
            .map(|group| group.next_clip(rng))
            .collect()
    }
}

/// Preloaded, read-only cue definitions plus the selection RNG
pub struct CueLibrary {
    cues: HashMap<String, AudioCue>,
    rng: StdRng,
}

impl CueLibrary {
    pub fn new() -> Self {
        Self {
            cues: HashMap::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Library with a reproducible selection sequence
    pub fn with_seed(seed: u64) -> Self {
        Self {
            cues: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Build every cue declared in the configuration
    pub fn from_config(config: &ServiceConfig) -> Result<Self, CueError> {
        let mut library = Self::new();
        library.load_config(config)?;
        Ok(library)
    }

    /// Add the configuration's cues, replacing cues with the same name
    pub fn load_config(&mut self, config: &ServiceConfig) -> Result<(), CueError> {
        let clips: HashMap<&str, ClipRef> = config
            .clips
            .iter()
            .map(|c| {
                (
                    c.name.as_str(),
                    ClipRef::new(c.name.as_str(), Duration::from_millis(c.length_ms)),
                )
            })
            .collect();

        for entry in &config.cues {
            let cue = Self::build_cue(entry, &clips)?;
            self.insert(cue);
        }

        tracing::info!("Loaded {} cues ({} clips)", self.cues.len(), clips.len());
        Ok(())
    }

    fn build_cue(entry: &CueEntry, clips: &HashMap<&str, ClipRef>) -> Result<AudioCue, CueError> {
        let groups = entry
            .groups
            .iter()
            .map(|group| {
                let refs = group
                    .clips
                    .iter()
                    .map(|name| {
                        clips.get(name.as_str()).cloned().ok_or_else(|| CueError::UnknownClip {
                            cue: entry.name.clone(),
                            clip: name.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ClipGroup::new(group.sequence_mode, refs))
            })
            .collect::<Result<Vec<_>, CueError>>()?;

        AudioCue::new(entry.name.as_str(), entry.params(), groups)
    }

    pub fn insert(&mut self, cue: AudioCue) {
        self.cues.insert(cue.name().to_string(), cue);
    }

    pub fn get(&self, name: &str) -> Option<&AudioCue> {
        self.cues.get(name)
    }

    /// Resolve a cue into fresh orders (one per clip group)
    pub fn new_orders(&mut self, name: &str) -> Result<Vec<PlayOrder>, CueError> {
        let cue = self
            .cues
            .get_mut(name)
            .ok_or_else(|| CueError::UnknownCue(name.to_string()))?;
        Ok(cue.new_orders(&mut self.rng))
    }

    /// Next clip of every group of a cue
    pub fn clips(&mut self, name: &str) -> Result<Vec<ClipRef>, CueError> {
        let cue = self
            .cues
            .get_mut(name)
            .ok_or_else(|| CueError::UnknownCue(name.to_string()))?;
        Ok(cue.clips(&mut self.rng))
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cues.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

impl Default for CueLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::clip::SequenceMode;
    use crate::audio_system::order::PlayState;
    use crate::config::{ClipEntry, ClipGroupEntry};

    fn clip(name: &str) -> ClipRef {
        ClipRef::new(name, Duration::from_millis(250))
    }

    fn two_group_cue() -> AudioCue {
        AudioCue::new(
            "impact",
            PlaybackParams {
                volume: 0.5,
                pitch: 1.2,
                spatial_blend: 0.0,
                looping: true,
                scene_scoped: false,
            },
            vec![
                ClipGroup::new(SequenceMode::Sequential, vec![clip("a"), clip("b")]),
                ClipGroup::new(SequenceMode::Random, vec![clip("thud")]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_new_orders_one_per_group() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut cue = two_group_cue();

        let orders = cue.new_orders(&mut rng);
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].clip().name(), "a");
        assert_eq!(orders[1].clip().name(), "thud");

        for order in &orders {
            assert_eq!(order.state(), PlayState::Ordered);
            assert_eq!(order.cue(), "impact");
            assert_eq!(order.params(), cue.params());
        }
    }

    #[test]
    fn test_new_orders_advance_selection() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut cue = two_group_cue();

        let first = cue.new_orders(&mut rng);
        let second = cue.new_orders(&mut rng);
        let third = cue.new_orders(&mut rng);

        assert_eq!(first[0].clip().name(), "a");
        assert_eq!(second[0].clip().name(), "b");
        assert_eq!(third[0].clip().name(), "a");
    }

    #[test]
    fn test_clips_follow_same_cursor() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut cue = two_group_cue();

        let clips = cue.clips(&mut rng);
        assert_eq!(clips, vec![clip("a"), clip("thud")]);
        let orders = cue.new_orders(&mut rng);
        assert_eq!(orders[0].clip().name(), "b");
    }

    #[test]
    fn test_empty_group_rejected() {
        let result = AudioCue::new(
            "broken",
            PlaybackParams::default(),
            vec![
                ClipGroup::new(SequenceMode::Random, vec![clip("a")]),
                ClipGroup::new(SequenceMode::Random, Vec::new()),
            ],
        );

        assert!(matches!(
            result,
            Err(CueError::EmptyClipGroup { group: 1, .. })
        ));
    }

    #[test]
    fn test_params_clamped() {
        let params = PlaybackParams {
            volume: 1.5,
            pitch: -7.0,
            spatial_blend: 2.0,
            ..PlaybackParams::default()
        }
        .clamped();

        assert_eq!(params.volume, 1.0);
        assert_eq!(params.pitch, -3.0);
        assert_eq!(params.spatial_blend, 1.0);
    }

    #[test]
    fn test_library_unknown_cue() {
        let mut library = CueLibrary::with_seed(1);
        assert!(matches!(
            library.new_orders("missing"),
            Err(CueError::UnknownCue(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_library_from_config() {
        let config = ServiceConfig {
            clips: vec![
                ClipEntry::new("step_1", 300),
                ClipEntry::new("step_2", 320),
            ],
            cues: vec![CueEntry {
                name: "footsteps".to_string(),
                groups: vec![ClipGroupEntry {
                    sequence_mode: SequenceMode::Sequential,
                    clips: vec!["step_1".to_string(), "step_2".to_string()],
                }],
                ..CueEntry::default()
            }],
            ..ServiceConfig::default()
        };

        let mut library = CueLibrary::from_config(&config).unwrap();
        assert_eq!(library.len(), 1);

        let orders = library.new_orders("footsteps").unwrap();
        assert_eq!(orders[0].clip().name(), "step_1");
        assert_eq!(orders[0].clip().length(), Duration::from_millis(300));
    }

    #[test]
    fn test_library_rejects_undeclared_clip() {
        let config = ServiceConfig {
            cues: vec![CueEntry {
                name: "ghost".to_string(),
                groups: vec![ClipGroupEntry {
                    sequence_mode: SequenceMode::Random,
                    clips: vec!["nowhere".to_string()],
                }],
                ..CueEntry::default()
            }],
            ..ServiceConfig::default()
        };

        assert!(matches!(
            CueLibrary::from_config(&config),
            Err(CueError::UnknownClip { .. })
        ));
    }

    #[test]
    fn test_non_finite_params_take_defaults() {
        let params = PlaybackParams {
            volume: f32::NAN,
            pitch: f32::NAN,
            spatial_blend: f32::INFINITY,
            looping: true,
            scene_scoped: false,
        }
        .clamped();

        assert_eq!(params.volume, 1.0);
        assert_eq!(params.pitch, 1.0);
        assert_eq!(params.spatial_blend, 1.0);
        assert!(params.looping);
        assert!(!params.scene_scoped);
    }
}
