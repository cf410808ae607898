//! Headless voice backend
//!
//! Software voice with no audio output. Its playhead advances only through
//! [`Voice::update`], which makes playback fully deterministic under a
//! driven tick sequence.

use std::time::Duration;

use super::clip::ClipRef;
use super::voice::{Position, Voice, VoiceFactory};
use crate::error::CueError;

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessVoice {
    clip: Option<ClipRef>,
    looping: bool,
    volume: f32,
    pitch: f32,
    spatial_blend: f32,
    position: Position,
    playhead: Duration,
    playing: bool,
    paused: bool,
}

impl Default for HeadlessVoice {
    fn default() -> Self {
        Self {
            clip: None,
            looping: false,
            volume: 1.0,
            pitch: 1.0,
            spatial_blend: 0.0,
            position: [0.0; 3],
            playhead: Duration::ZERO,
            playing: false,
            paused: false,
        }
    }
}

impl HeadlessVoice {
    pub fn clip(&self) -> Option<&ClipRef> {
        self.clip.as_ref()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn spatial_blend(&self) -> f32 {
        self.spatial_blend
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn playhead(&self) -> Duration {
        self.playhead
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl Voice for HeadlessVoice {
    fn set_clip(&mut self, clip: &ClipRef) {
        self.clip = Some(clip.clone());
        self.playhead = Duration::ZERO;
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
    }

    fn set_spatial_blend(&mut self, blend: f32) {
        self.spatial_blend = blend.clamp(0.0, 1.0);
    }

    fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    fn play(&mut self) {
        // Without a clip there is nothing to produce
        self.playing = self.clip.is_some();
        self.paused = false;
        self.playhead = Duration::ZERO;
    }

    fn pause(&mut self) {
        if self.playing {
            self.paused = true;
        }
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn stop(&mut self) {
        self.playing = false;
        self.paused = false;
    }

    fn is_playing(&self) -> bool {
        self.playing && !self.paused
    }

    fn update(&mut self, delta: Duration) {
        if !self.playing || self.paused {
            return;
        }
        let Some(clip) = &self.clip else {
            self.playing = false;
            return;
        };

        let advance = Duration::try_from_secs_f32(delta.as_secs_f32() * self.pitch.abs())
            .unwrap_or(Duration::ZERO);
        self.playhead += advance;

        if self.playhead >= clip.length() {
            if !self.looping {
                self.playing = false;
            } else if clip.length().is_zero() {
                self.playhead = Duration::ZERO;
            } else {
                let length = clip.length().as_nanos();
                self.playhead = Duration::from_nanos((self.playhead.as_nanos() % length) as u64);
            }
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessVoiceFactory {
    created: usize,
}

impl HeadlessVoiceFactory {
    pub fn created(&self) -> usize {
        self.created
    }
}

impl VoiceFactory for HeadlessVoiceFactory {
    type Voice = HeadlessVoice;

    fn create_voice(&mut self) -> Result<HeadlessVoice, CueError> {
        self.created += 1;
        Ok(HeadlessVoice::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice_with_clip(ms: u64) -> HeadlessVoice {
        let mut voice = HeadlessVoice::default();
        voice.set_clip(&ClipRef::new("clip", Duration::from_millis(ms)));
        voice
    }

    #[test]
    fn test_plays_until_clip_end() {
        let mut voice = voice_with_clip(100);
        voice.play();
        assert!(voice.is_playing());

        voice.update(Duration::from_millis(60));
        assert!(voice.is_playing());

        voice.update(Duration::from_millis(60));
        assert!(!voice.is_playing());
    }

    #[test]
    fn test_pitch_scales_playhead() {
        let mut voice = voice_with_clip(100);
        voice.set_pitch(2.0);
        voice.play();

        voice.update(Duration::from_millis(60));
        assert!(!voice.is_playing());
    }

    #[test]
    fn test_looping_never_ends() {
        let mut voice = voice_with_clip(100);
        voice.set_looping(true);
        voice.play();

        for _ in 0..10 {
            voice.update(Duration::from_millis(70));
        }
        assert!(voice.is_playing());
        assert!(voice.playhead() < Duration::from_millis(100));
    }

    #[test]
    fn test_pause_holds_playhead() {
        let mut voice = voice_with_clip(100);
        voice.play();
        voice.update(Duration::from_millis(40));
        let held = voice.playhead();
        voice.pause();
        assert!(!voice.is_playing());

        voice.update(Duration::from_millis(500));
        assert_eq!(voice.playhead(), held);

        voice.resume();
        assert!(voice.is_playing());
    }

    #[test]
    fn test_play_without_clip_is_silent() {
        let mut voice = HeadlessVoice::default();
        voice.play();
        assert!(!voice.is_playing());
    }

    #[test]
    fn test_factory_counts_voices() {
        let mut factory = HeadlessVoiceFactory::default();
        factory.create_voice().unwrap();
        factory.create_voice().unwrap();
        assert_eq!(factory.created(), 2);
    }

    #[test]
    fn test_zero_length_loop_stays_playing() {
        let mut voice = voice_with_clip(0);
        voice.set_looping(true);
        voice.play();

        voice.update(Duration::from_millis(10));
        assert!(voice.is_playing());
        assert_eq!(voice.playhead(), Duration::ZERO);
    }

    #[test]
    fn test_zero_length_clip_ends_without_loop() {
        let mut voice = voice_with_clip(0);
        voice.play();
        voice.update(Duration::from_millis(10));
        assert!(!voice.is_playing());
    }

    #[test]
    fn test_non_finite_pitch_does_not_advance() {
        let mut voice = voice_with_clip(100);
        voice.set_pitch(f32::NAN);
        voice.play();

        voice.update(Duration::from_millis(10));
        assert!(voice.is_playing());
        assert_eq!(voice.playhead(), Duration::ZERO);
    }
}
