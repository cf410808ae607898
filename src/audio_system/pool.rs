//! Voice pool
//!
//! Fixed-growable pool of reusable voices. Requests never fail for lack of
//! capacity: when no voice is free a new one is created from the factory, and
//! the pool never shrinks.

use std::fmt;

use super::voice::{Voice, VoiceFactory};
use crate::error::CueError;

/// Handle to a voice owned by a [`VoicePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(usize);

impl VoiceId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

pub struct VoicePool<F: VoiceFactory> {
    factory: F,
    voices: Vec<F::Voice>,
    in_use: Vec<bool>,
    free: Vec<VoiceId>,
}

impl<F: VoiceFactory> VoicePool<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            voices: Vec::new(),
            in_use: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Create and park `count` free voices
    pub fn prewarm(&mut self, count: usize) -> Result<(), CueError> {
        for _ in 0..count {
            let id = self.create()?;
            self.free.push(id);
        }
        tracing::debug!("Prewarmed voice pool with {} voices", count);
        Ok(())
    }

    /// Take a free voice, growing the pool when none is available.
    ///
    /// The only failure is the factory being unable to build a voice.
    pub fn request(&mut self) -> Result<VoiceId, CueError> {
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                let id = self.create()?;
                tracing::debug!("Voice pool grew to {} voices", self.voices.len());
                id
            }
        };
        self.in_use[id.0] = true;
        Ok(id)
    }

    /// Reset a held voice and put it back in the free set.
    ///
    /// Returns `false` (and does nothing) when the voice is not currently
    /// held, so racing teardown paths may release twice.
    pub fn release(&mut self, id: VoiceId) -> bool {
        match self.in_use.get(id.0) {
            Some(true) => {}
            _ => {
                tracing::trace!("Ignoring release of {} which is not held", id);
                return false;
            }
        }

        self.voices[id.0].reset();
        self.in_use[id.0] = false;
        self.free.push(id);
        true
    }

    pub fn get(&self, id: VoiceId) -> Option<&F::Voice> {
        self.voices.get(id.0)
    }

    pub fn get_mut(&mut self, id: VoiceId) -> Option<&mut F::Voice> {
        self.voices.get_mut(id.0)
    }

    pub fn is_held(&self, id: VoiceId) -> bool {
        self.in_use.get(id.0).copied().unwrap_or(false)
    }

    /// Number of voices ever created
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn held_count(&self) -> usize {
        self.voices.len() - self.free.len()
    }

    fn create(&mut self) -> Result<VoiceId, CueError> {
        let voice = self.factory.create_voice()?;
        let id = VoiceId(self.voices.len());
        self.voices.push(voice);
        self.in_use.push(false);
        Ok(id)
    }
}
