//! Playback coordinator
//!
//! Owns the registry of active play orders, binds each to a pooled voice and
//! advances every order once per [`tick`](PlaybackCoordinator::tick):
//! emitter tracking, fade ramps and completion detection.
//!
//! All state changes happen on the caller's tick sequence. Within one tick
//! the order of work is fixed:
//!
//! 1. host events (scene teardown, shutdown)
//! 2. per-order voice update, emitter tracking and fade ramps
//! 3. explicit stops (fade completions)
//! 4. natural completions
//!
//! so an explicit stop always wins over a pending finish for the same order.
//!
//! Finish listeners are not run inside the state pass. [`tick`] delivers
//! them at its end; callers that share the coordinator behind a lock use
//! [`advance`] and deliver [`take_finished`] after unlocking, so listeners
//! may call back into the owner.
//!
//! [`tick`]: PlaybackCoordinator::tick
//! [`advance`]: PlaybackCoordinator::advance
//! [`take_finished`]: PlaybackCoordinator::take_finished

use std::time::Duration;

use crossbeam_channel::Receiver;

use super::emitter::EmitterRegistry;
use super::fade::FadeRamp;
use super::order::{FinishNotice, PlayOrder, PlayState};
use super::pool::{VoiceId, VoicePool};
use super::voice::{Voice, VoiceFactory};
use crate::error::CueError;
use crate::messaging::{Event, EventBus, SubscriberId};

/// Registry entry for an order holding a voice
struct ActiveOrder {
    order: PlayOrder,
    voice: VoiceId,
    fade: Option<FadeRamp>,
}

struct EventSubscription {
    receiver: Receiver<Event>,
    id: SubscriberId,
}

pub struct PlaybackCoordinator<F: VoiceFactory> {
    pool: VoicePool<F>,
    active: Vec<ActiveOrder>,
    emitters: EmitterRegistry,
    events: Option<EventSubscription>,
    finished: Vec<FinishNotice>,
}

impl<F: VoiceFactory> PlaybackCoordinator<F> {
    pub fn new(factory: F) -> Self {
        Self::with_emitters(factory, EmitterRegistry::new())
    }

    /// Coordinator sharing an existing emitter registry with the host
    pub fn with_emitters(factory: F, emitters: EmitterRegistry) -> Self {
        Self {
            pool: VoicePool::new(factory),
            active: Vec::new(),
            emitters,
            events: None,
            finished: Vec::new(),
        }
    }

    pub fn prewarm(&mut self, count: usize) -> Result<(), CueError> {
        self.pool.prewarm(count)
    }

    pub fn emitters(&self) -> &EmitterRegistry {
        &self.emitters
    }

    pub fn pool(&self) -> &VoicePool<F> {
        &self.pool
    }

    /// Voice currently bound to an order
    pub fn voice(&self, order: &PlayOrder) -> Option<&F::Voice> {
        let index = self.index_of(order)?;
        self.pool.get(self.active[index].voice)
    }

    /// Bind an `Ordered` order to a voice and start it.
    ///
    /// Orders in any other state are ignored. Fails only when the pool must
    /// grow and the voice factory cannot create a voice.
    pub fn play(&mut self, order: &PlayOrder) -> Result<(), CueError> {
        if order.state() != PlayState::Ordered {
            tracing::debug!(
                "Ignoring play of {} in state {}",
                order.id(),
                order.state().description()
            );
            return Ok(());
        }

        let voice_id = self.pool.request()?;
        let params = *order.params();
        let position = order.emitter().and_then(|e| self.emitters.position(e));

        if let Some(voice) = self.pool.get_mut(voice_id) {
            voice.set_clip(order.clip());
            voice.set_looping(params.looping);
            voice.set_volume(params.volume);
            voice.set_pitch(params.pitch);
            voice.set_spatial_blend(params.spatial_blend);
            if let Some(position) = position {
                voice.set_position(position);
            }
            voice.play();
        }

        order.bind_voice(voice_id);
        order.update_state(PlayState::Playing);
        self.active.push(ActiveOrder {
            order: order.clone(),
            voice: voice_id,
            fade: None,
        });

        tracing::debug!(
            "{} playing '{}' (cue '{}') on {}",
            order.id(),
            order.clip(),
            order.cue(),
            voice_id
        );
        Ok(())
    }

    /// Halt an order and return its voice to the pool.
    ///
    /// No-op (returns `false`) unless the order is Playing or Paused and
    /// registered here.
    pub fn stop(&mut self, order: &PlayOrder) -> bool {
        if !order.state().is_active() {
            return false;
        }
        let Some(index) = self.index_of(order) else {
            return false;
        };

        let entry = self.active.remove(index);
        if let Some(voice) = self.pool.get_mut(entry.voice) {
            voice.stop();
        }
        self.pool.release(entry.voice);
        order.update_state(PlayState::Stopped);

        tracing::debug!("{} stopped, {} returned to pool", order.id(), entry.voice);
        true
    }

    /// Ramp the order's volume to silence over `duration`, then stop it.
    ///
    /// A zero duration stops immediately, as does fading a paused order.
    /// Requesting a fade on an order that is already fading restarts the
    /// ramp from the current volume.
    pub fn fade_stop(&mut self, order: &PlayOrder, duration: Duration) -> bool {
        if duration.is_zero() {
            return self.stop(order);
        }

        match order.state() {
            PlayState::Playing => {}
            PlayState::Paused => return self.stop(order),
            _ => return false,
        }
        let Some(index) = self.index_of(order) else {
            return false;
        };

        let entry = &mut self.active[index];
        let from_volume = self.pool.get(entry.voice).map_or(0.0, |v| v.volume());
        entry.fade = Some(FadeRamp::new(from_volume, duration));

        tracing::debug!(
            "{} fading out from {:.2} over {:?}",
            order.id(),
            from_volume,
            duration
        );
        true
    }

    /// Pause a playing order. Aborts any fade in progress.
    pub fn pause(&mut self, order: &PlayOrder) -> bool {
        if order.state() != PlayState::Playing {
            return false;
        }
        let Some(index) = self.index_of(order) else {
            return false;
        };

        let entry = &mut self.active[index];
        if let Some(voice) = self.pool.get_mut(entry.voice) {
            voice.pause();
        }
        if entry.fade.take().is_some() {
            tracing::debug!("{} paused, fade aborted", order.id());
        }
        order.update_state(PlayState::Paused)
    }

    pub fn resume(&mut self, order: &PlayOrder) -> bool {
        if order.state() != PlayState::Paused {
            return false;
        }
        let Some(index) = self.index_of(order) else {
            return false;
        };

        if let Some(voice) = self.pool.get_mut(self.active[index].voice) {
            voice.resume();
        }
        order.update_state(PlayState::Playing)
    }

    /// Stop every active scene-scoped order. Returns how many were stopped.
    pub fn stop_scene_scoped(&mut self) -> usize {
        let scoped: Vec<PlayOrder> = self
            .active
            .iter()
            .filter(|entry| entry.order.params().scene_scoped)
            .map(|entry| entry.order.clone())
            .collect();

        scoped.iter().filter(|order| self.stop(order)).count()
    }

    /// Stop every active order
    pub fn stop_all(&mut self) -> usize {
        let all: Vec<PlayOrder> = self.active.iter().map(|e| e.order.clone()).collect();
        let stopped = all.iter().filter(|order| self.stop(order)).count();
        tracing::debug!("Stopped all orders ({})", stopped);
        stopped
    }

    /// Subscribe to host events. Replaces any previous subscription.
    pub fn attach_events(&mut self, bus: &EventBus) -> SubscriberId {
        let (receiver, id) = bus.subscribe();
        self.events = Some(EventSubscription { receiver, id });
        id
    }

    pub fn detach_events(&mut self, bus: &EventBus) {
        if let Some(subscription) = self.events.take() {
            bus.unsubscribe(subscription.id);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.events.is_some()
    }

    /// Advance every active order by `delta` of wall-clock time and run the
    /// finish listeners of orders that completed
    pub fn tick(&mut self, delta: Duration) {
        self.advance(delta);
        for notice in self.take_finished() {
            notice.notify();
        }
    }

    /// State pass of [`tick`](Self::tick). Finish notices queue up until
    /// [`take_finished`](Self::take_finished).
    pub fn advance(&mut self, delta: Duration) {
        self.process_events();

        let mut to_stop = Vec::new();
        let mut to_finish = Vec::new();

        for entry in &mut self.active {
            let Some(voice) = self.pool.get_mut(entry.voice) else {
                continue;
            };
            voice.update(delta);

            if entry.order.params().is_spatial() {
                if let Some(emitter) = entry.order.emitter() {
                    match self.emitters.position(emitter) {
                        Some(position) => voice.set_position(position),
                        None => tracing::trace!("Emitter of {} is gone", entry.order.id()),
                    }
                }
            }

            if entry.order.state() != PlayState::Playing {
                if entry.fade.take().is_some() {
                    tracing::debug!("{} left Playing, fade aborted", entry.order.id());
                }
                continue;
            }

            if let Some(fade) = entry.fade.as_mut() {
                voice.set_volume(fade.advance(delta));
                // A voice that ends mid-fade was still explicitly stopped
                if fade.is_complete() || !voice.is_playing() {
                    to_stop.push(entry.order.clone());
                }
                continue;
            }

            if !voice.is_playing() {
                to_finish.push(entry.order.clone());
            }
        }

        for order in &to_stop {
            self.stop(order);
        }
        for order in &to_finish {
            self.finish(order);
        }
    }

    /// Drain the finish notices queued by [`advance`](Self::advance)
    pub fn take_finished(&mut self) -> Vec<FinishNotice> {
        std::mem::take(&mut self.finished)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, order: &PlayOrder) -> bool {
        self.index_of(order).is_some()
    }

    pub fn is_fading(&self, order: &PlayOrder) -> bool {
        self.index_of(order)
            .map(|index| self.active[index].fade.is_some())
            .unwrap_or(false)
    }

    /// Snapshot of the active orders, in play order
    pub fn active_orders(&self) -> Vec<PlayOrder> {
        self.active.iter().map(|e| e.order.clone()).collect()
    }

    fn process_events(&mut self) {
        let events: Vec<Event> = match &self.events {
            Some(subscription) => subscription.receiver.try_iter().collect(),
            None => return,
        };

        for event in events {
            match event {
                Event::SceneUnloaded { scene, .. } => {
                    let stopped = self.stop_scene_scoped();
                    tracing::debug!("Scene '{}' unloaded, stopped {} orders", scene, stopped);
                }
                Event::Shutdown => {
                    self.stop_all();
                }
            }
        }
    }

    /// Playing -> Finished: the voice ended on its own
    fn finish(&mut self, order: &PlayOrder) {
        if order.state() != PlayState::Playing {
            return;
        }
        let Some(index) = self.index_of(order) else {
            return;
        };

        let entry = self.active.remove(index);
        self.pool.release(entry.voice);
        if let Some(notice) = order.finish_deferred() {
            self.finished.push(notice);
        }

        tracing::debug!("{} finished, {} returned to pool", order.id(), entry.voice);
    }

    fn index_of(&self, order: &PlayOrder) -> Option<usize> {
        self.active.iter().position(|e| e.order.id() == order.id())
    }
}
