//! Playback voice abstraction
//!
//! A voice is the rendering engine's unit of playback: one clip at a time,
//! with its own volume, pitch, loop flag and spatial parameters. The pool
//! owns every voice for the lifetime of the service; play orders only borrow
//! one through a [`VoiceId`](super::pool::VoiceId).

use std::time::Duration;

use super::clip::ClipRef;
use crate::error::CueError;

/// World-space position `[x, y, z]`.
pub type Position = [f32; 3];

/// A single playback resource.
pub trait Voice {
    /// Assign the clip to play on the next `play`
    fn set_clip(&mut self, clip: &ClipRef);

    fn set_looping(&mut self, looping: bool);

    /// Set volume (0.0-1.0)
    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;

    fn set_pitch(&mut self, pitch: f32);

    /// 0.0 is fully 2D, 1.0 is fully positional
    fn set_spatial_blend(&mut self, blend: f32);

    fn set_position(&mut self, position: Position);

    fn play(&mut self);

    fn pause(&mut self);

    fn resume(&mut self);

    fn stop(&mut self);

    /// Whether the voice is still producing sound.
    ///
    /// A paused voice reports `false`.
    fn is_playing(&self) -> bool;

    /// Advance by one scheduler tick. Backends driven by their own clock can
    /// ignore this.
    fn update(&mut self, _delta: Duration) {}

    /// Return to the idle state a freshly created voice has.
    fn reset(&mut self);
}

/// Creates voices for the pool (the "voice template").
pub trait VoiceFactory {
    type Voice: Voice;

    fn create_voice(&mut self) -> Result<Self::Voice, CueError>;
}
