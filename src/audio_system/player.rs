//! Rodio voice backend
//!
//! Each pooled voice owns one `rodio::SpatialSink` on a shared output
//! stream. Clip bytes are preloaded into a [`ClipBank`] and decoded fresh on
//! every `play`.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Source, SpatialSink};

use super::clip::ClipRef;
use super::voice::{Position, Voice, VoiceFactory};
use crate::config::{ListenerConfig, ServiceConfig};
use crate::error::CueError;

/// Open the default output device.
///
/// The returned `OutputStream` must outlive every voice created from the
/// handle.
pub fn open_output() -> Result<(OutputStream, OutputStreamHandle), CueError> {
    OutputStream::try_default().map_err(|e| CueError::VoiceTemplate(e.to_string()))
}

/// Encoded clip data, keyed by clip name
#[derive(Debug, Clone, Default)]
pub struct ClipBank {
    clips: HashMap<String, Arc<Vec<u8>>>,
}

impl ClipBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every clip of the configuration that declares a file path.
    ///
    /// Relative paths resolve against `base_dir`.
    pub fn from_config(config: &ServiceConfig, base_dir: &Path) -> Result<Self, CueError> {
        let mut bank = Self::new();
        for entry in &config.clips {
            match ServiceConfig::clip_path(base_dir, entry) {
                Some(path) => bank.load_file(&entry.name, &path)?,
                None => tracing::debug!("Clip '{}' has no file, skipping", entry.name),
            }
        }
        Ok(bank)
    }

    /// Read a clip file into memory and check that it decodes
    pub fn load_file(&mut self, name: &str, path: &Path) -> Result<(), CueError> {
        let data = std::fs::read(path).map_err(|e| CueError::ClipLoad {
            clip: name.to_string(),
            source: Box::new(e),
        })?;

        Decoder::new(Cursor::new(data.clone())).map_err(|e| CueError::ClipLoad {
            clip: name.to_string(),
            source: Box::new(e),
        })?;

        tracing::info!(
            "Loaded clip '{}': {} ({} bytes)",
            name,
            path.display(),
            data.len()
        );
        self.insert(name, data);
        Ok(())
    }

    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.clips.insert(name.into(), Arc::new(data));
    }

    pub fn get(&self, name: &str) -> Option<Arc<Vec<u8>>> {
        self.clips.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

/// Interpolate between the listener's head (fully 2D) and the emitter
/// (fully positional)
pub fn blend_position(head: Position, emitter: Position, blend: f32) -> Position {
    let blend = blend.clamp(0.0, 1.0);
    [
        head[0] + (emitter[0] - head[0]) * blend,
        head[1] + (emitter[1] - head[1]) * blend,
        head[2] + (emitter[2] - head[2]) * blend,
    ]
}

/// Voice backed by a rodio spatial sink
pub struct RodioVoice {
    handle: OutputStreamHandle,
    listener: ListenerConfig,
    bank: Arc<ClipBank>,
    sink: SpatialSink,
    clip: Option<ClipRef>,
    looping: bool,
    volume: f32,
    pitch: f32,
    spatial_blend: f32,
    emitter_position: Position,
}

impl RodioVoice {
    fn new(
        handle: OutputStreamHandle,
        listener: ListenerConfig,
        bank: Arc<ClipBank>,
    ) -> Result<Self, CueError> {
        let sink = Self::create_sink(&handle, &listener)?;
        Ok(Self {
            handle,
            listener,
            bank,
            sink,
            clip: None,
            looping: false,
            volume: 1.0,
            pitch: 1.0,
            spatial_blend: 0.0,
            emitter_position: [0.0; 3],
        })
    }

    fn create_sink(
        handle: &OutputStreamHandle,
        listener: &ListenerConfig,
    ) -> Result<SpatialSink, CueError> {
        SpatialSink::try_new(
            handle,
            listener.head(),
            listener.left_ear,
            listener.right_ear,
        )
        .map_err(|e| CueError::VoiceTemplate(e.to_string()))
    }

    /// Swap in a fresh sink; a stopped sink can block on reuse
    fn renew_sink(&mut self) {
        match Self::create_sink(&self.handle, &self.listener) {
            Ok(sink) => self.sink = sink,
            Err(e) => tracing::warn!("Failed to renew voice sink: {}", e),
        }
    }

    fn apply_position(&self) {
        let position = blend_position(
            self.listener.head(),
            self.emitter_position,
            self.spatial_blend,
        );
        self.sink.set_emitter_position(position);
    }

    fn build_source(&self, clip: &ClipRef) -> Option<Box<dyn Source<Item = i16> + Send>> {
        let Some(data) = self.bank.get(clip.name()) else {
            tracing::warn!("No audio data for clip '{}', playing silence", clip);
            return None;
        };

        let decoder = match Decoder::new(Cursor::new((*data).clone())) {
            Ok(decoder) => decoder,
            Err(e) => {
                tracing::warn!("Failed to decode clip '{}': {}", clip, e);
                return None;
            }
        };

        let mut source: Box<dyn Source<Item = i16> + Send> = Box::new(decoder);
        if self.looping {
            source = Box::new(source.repeat_infinite());
        }
        Some(source)
    }
}

impl Voice for RodioVoice {
    fn set_clip(&mut self, clip: &ClipRef) {
        self.clip = Some(clip.clone());
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.sink.set_volume(self.volume);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn set_pitch(&mut self, pitch: f32) {
        // Reverse playback is not available on a sink
        self.pitch = pitch;
        self.sink.set_speed(pitch.abs().max(0.01));
    }

    fn set_spatial_blend(&mut self, blend: f32) {
        self.spatial_blend = blend.clamp(0.0, 1.0);
        self.apply_position();
    }

    fn set_position(&mut self, position: Position) {
        self.emitter_position = position;
        self.apply_position();
    }

    fn play(&mut self) {
        if !self.sink.empty() {
            self.renew_sink();
            self.sink.set_volume(self.volume);
            self.sink.set_speed(self.pitch.abs().max(0.01));
            self.apply_position();
        }

        let Some(clip) = self.clip.clone() else {
            return;
        };
        if let Some(source) = self.build_source(&clip) {
            self.sink.append(source);
            self.sink.play();
        }
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn resume(&mut self) {
        self.sink.play();
    }

    fn stop(&mut self) {
        self.sink.stop();
    }

    fn is_playing(&self) -> bool {
        !self.sink.empty() && !self.sink.is_paused()
    }

    fn reset(&mut self) {
        self.renew_sink();
        self.clip = None;
        self.looping = false;
        self.volume = 1.0;
        self.pitch = 1.0;
        self.spatial_blend = 0.0;
        self.emitter_position = [0.0; 3];
    }
}

/// Creates rodio voices on one output stream
pub struct RodioVoiceFactory {
    handle: OutputStreamHandle,
    listener: ListenerConfig,
    bank: Arc<ClipBank>,
}

impl RodioVoiceFactory {
    pub fn new(handle: OutputStreamHandle, listener: ListenerConfig, bank: ClipBank) -> Self {
        Self {
            handle,
            listener,
            bank: Arc::new(bank),
        }
    }

    pub fn bank(&self) -> &ClipBank {
        &self.bank
    }
}

impl VoiceFactory for RodioVoiceFactory {
    type Voice = RodioVoice;

    fn create_voice(&mut self) -> Result<RodioVoice, CueError> {
        RodioVoice::new(
            self.handle.clone(),
            self.listener,
            Arc::clone(&self.bank),
        )
    }
}
