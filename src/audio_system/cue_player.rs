//! Emitter-side cue player
//!
//! Plays one cue on behalf of an emitter and keeps track of the orders it
//! started, so the owner can stop "whatever this object is playing" without
//! holding on to individual orders.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use super::coordinator::PlaybackCoordinator;
use super::cue::CueLibrary;
use super::emitter::EmitterId;
use super::order::PlayOrder;
use super::voice::VoiceFactory;
use crate::error::CueError;

/// Callback invoked for each order of the cue that finishes naturally
pub type CueFinished = Arc<dyn Fn(&PlayOrder) + Send + Sync>;

pub struct CuePlayer {
    cue: String,
    emitter: Option<EmitterId>,
    ongoing: Arc<Mutex<Vec<PlayOrder>>>,
    on_cue_finished: Option<CueFinished>,
}

impl CuePlayer {
    pub fn new(cue: impl Into<String>) -> Self {
        Self {
            cue: cue.into(),
            emitter: None,
            ongoing: Arc::new(Mutex::new(Vec::new())),
            on_cue_finished: None,
        }
    }

    pub fn with_emitter(mut self, emitter: EmitterId) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn on_cue_finished<F>(mut self, callback: F) -> Self
    where
        F: Fn(&PlayOrder) + Send + Sync + 'static,
    {
        self.on_cue_finished = Some(Arc::new(callback));
        self
    }

    pub fn cue(&self) -> &str {
        &self.cue
    }

    pub fn emitter(&self) -> Option<EmitterId> {
        self.emitter
    }

    /// Resolve the cue and play every resulting order.
    ///
    /// Orders already bound before a failing one keep playing and stay
    /// tracked.
    pub fn play<F: VoiceFactory>(
        &self,
        library: &mut CueLibrary,
        coordinator: &mut PlaybackCoordinator<F>,
    ) -> Result<Vec<PlayOrder>, CueError> {
        self.prune();
        let orders = library.new_orders(&self.cue)?;

        for order in &orders {
            order.set_emitter(self.emitter);
            order.on_finish(finish_listener(
                Arc::downgrade(&self.ongoing),
                self.on_cue_finished.clone(),
            ));

            coordinator.play(order)?;
            self.ongoing.lock().push(order.clone());
        }

        tracing::debug!("Cue '{}' started {} orders", self.cue, orders.len());
        Ok(orders)
    }

    /// Stop every ongoing order of this player
    pub fn stop<F: VoiceFactory>(&self, coordinator: &mut PlaybackCoordinator<F>) -> usize {
        let orders: Vec<PlayOrder> = std::mem::take(&mut *self.ongoing.lock());
        orders.iter().filter(|order| coordinator.stop(order)).count()
    }

    /// Fade out every ongoing order. Orders stay tracked until the fade ends.
    pub fn fade_stop<F: VoiceFactory>(
        &self,
        coordinator: &mut PlaybackCoordinator<F>,
        duration: Duration,
    ) -> usize {
        self.ongoing()
            .iter()
            .filter(|order| coordinator.fade_stop(order, duration))
            .count()
    }

    /// Whether any order started by this player is still Playing or Paused
    pub fn is_playing(&self) -> bool {
        self.ongoing
            .lock()
            .iter()
            .any(|order| order.state().is_active())
    }

    pub fn ongoing(&self) -> Vec<PlayOrder> {
        self.prune();
        self.ongoing.lock().clone()
    }

    // Orders stopped from elsewhere (scene teardown, stop_all) never notify
    fn prune(&self) {
        self.ongoing
            .lock()
            .retain(|order| !order.state().is_terminal());
    }
}

fn finish_listener(
    ongoing: Weak<Mutex<Vec<PlayOrder>>>,
    callback: Option<CueFinished>,
) -> impl FnMut(&PlayOrder) + Send + 'static {
    move |finished: &PlayOrder| {
        if let Some(ongoing) = ongoing.upgrade() {
            ongoing.lock().retain(|order| order != finished);
        }
        if let Some(callback) = &callback {
            callback(finished);
        }
    }
}
