//! Audio service facade
//!
//! Bundles the cue library, the playback coordinator and the host event bus
//! behind one thread-safe handle. Every mutation goes through the
//! coordinator mutex, whether it comes from the host or the ticker thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::audio_system::{
    CueLibrary, CuePlayer, EmitterId, EmitterRegistry, PlayOrder, PlaybackCoordinator,
    VoiceFactory,
};
use crate::config::ServiceConfig;
use crate::error::CueError;
use crate::messaging::{Event, EventBus};

pub struct AudioService<F: VoiceFactory> {
    coordinator: Arc<Mutex<PlaybackCoordinator<F>>>,
    library: Mutex<CueLibrary>,
    events: EventBus,
    tick_interval: Duration,
    shutdown_tx: Mutex<Option<Sender<()>>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl<F: VoiceFactory> AudioService<F> {
    /// Build the cue library from `config` and prewarm the voice pool
    pub fn new(config: &ServiceConfig, factory: F) -> Result<Self, CueError> {
        let library = CueLibrary::from_config(config)?;
        Self::with_library(config, library, factory)
    }

    /// Use an already populated library (e.g. a seeded one)
    pub fn with_library(
        config: &ServiceConfig,
        library: CueLibrary,
        factory: F,
    ) -> Result<Self, CueError> {
        let events = EventBus::new();
        let mut coordinator = PlaybackCoordinator::new(factory);
        coordinator.prewarm(config.initial_pool_size)?;
        coordinator.attach_events(&events);

        tracing::info!(
            "Audio service ready: {} cues, {} voices",
            library.len(),
            config.initial_pool_size
        );

        Ok(Self {
            coordinator: Arc::new(Mutex::new(coordinator)),
            library: Mutex::new(library),
            events,
            tick_interval: config.tick_interval(),
            shutdown_tx: Mutex::new(None),
            ticker: Mutex::new(None),
        })
    }

    /// Bus on which the host publishes scene boundaries
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn emitters(&self) -> EmitterRegistry {
        self.coordinator.lock().emitters().clone()
    }

    /// Signal that the current scene was unloaded.
    ///
    /// Scene-scoped orders stop at the start of the next tick.
    pub fn unload_scene(&self, scene: &str) {
        self.events.publish(Event::scene_unloaded(scene));
    }

    /// Resolve a cue and play all of its orders
    pub fn play_cue(&self, name: &str) -> Result<Vec<PlayOrder>, CueError> {
        let orders = self.library.lock().new_orders(name)?;
        self.play_all(&orders)?;
        Ok(orders)
    }

    /// Resolve a cue and play it following an emitter
    pub fn play_cue_at(&self, name: &str, emitter: EmitterId) -> Result<Vec<PlayOrder>, CueError> {
        let orders = self.library.lock().new_orders(name)?;
        for order in &orders {
            order.set_emitter(Some(emitter));
        }
        self.play_all(&orders)?;
        Ok(orders)
    }

    pub fn play(&self, order: &PlayOrder) -> Result<(), CueError> {
        self.coordinator.lock().play(order)
    }

    pub fn stop(&self, order: &PlayOrder) -> bool {
        self.coordinator.lock().stop(order)
    }

    pub fn fade_stop(&self, order: &PlayOrder, duration: Duration) -> bool {
        self.coordinator.lock().fade_stop(order, duration)
    }

    pub fn pause(&self, order: &PlayOrder) -> bool {
        self.coordinator.lock().pause(order)
    }

    pub fn resume(&self, order: &PlayOrder) -> bool {
        self.coordinator.lock().resume(order)
    }

    pub fn stop_all(&self) -> usize {
        self.coordinator.lock().stop_all()
    }

    /// Play a cue player's cue through this service
    pub fn play_player(&self, player: &CuePlayer) -> Result<Vec<PlayOrder>, CueError> {
        let mut library = self.library.lock();
        let mut coordinator = self.coordinator.lock();
        player.play(&mut *library, &mut *coordinator)
    }

    pub fn stop_player(&self, player: &CuePlayer) -> usize {
        player.stop(&mut *self.coordinator.lock())
    }

    /// Advance playback manually. Not needed once [`start`](Self::start)ed.
    ///
    /// Finish listeners run after the coordinator is unlocked and may call
    /// back into the service.
    pub fn tick(&self, delta: Duration) {
        tick_shared(&self.coordinator, delta);
    }

    pub fn active_count(&self) -> usize {
        self.coordinator.lock().active_count()
    }

    pub fn is_running(&self) -> bool {
        self.ticker.lock().is_some()
    }

    /// Stop the ticker, stop every order and detach from the event bus
    pub fn shutdown(&self) {
        self.stop_ticker();
        self.events.publish(Event::Shutdown);

        let mut coordinator = self.coordinator.lock();
        let stopped = coordinator.stop_all();
        coordinator.detach_events(&self.events);

        tracing::info!("Audio service shut down ({} orders stopped)", stopped);
    }

    fn play_all(&self, orders: &[PlayOrder]) -> Result<(), CueError> {
        let mut coordinator = self.coordinator.lock();
        for order in orders {
            coordinator.play(order)?;
        }
        Ok(())
    }

    fn stop_ticker(&self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.ticker.lock().take() {
            if handle.join().is_err() {
                tracing::error!("Ticker thread panicked");
            }
        }
    }
}

impl<F> AudioService<F>
where
    F: VoiceFactory + Send + 'static,
    F::Voice: Send,
{
    /// Spawn the ticker thread. It ticks every `tick_interval_ms` with the
    /// measured elapsed time until [`shutdown`](Self::shutdown).
    pub fn start(&self) {
        let mut ticker = self.ticker.lock();
        if ticker.is_some() {
            tracing::debug!("Audio service already running");
            return;
        }

        let (tx, rx) = bounded::<()>(1);
        let coordinator = Arc::clone(&self.coordinator);
        let interval = self.tick_interval;

        let handle = thread::spawn(move || {
            tracing::info!("Ticker thread started ({:?} interval)", interval);
            let mut last = Instant::now();

            loop {
                match rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let now = Instant::now();
                        tick_shared(&coordinator, now - last);
                        last = now;
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            tracing::info!("Ticker thread stopped");
        });

        *self.shutdown_tx.lock() = Some(tx);
        *ticker = Some(handle);
    }
}

fn tick_shared<F: VoiceFactory>(coordinator: &Mutex<PlaybackCoordinator<F>>, delta: Duration) {
    let finished = {
        let mut coordinator = coordinator.lock();
        coordinator.advance(delta);
        coordinator.take_finished()
    };
    for notice in finished {
        notice.notify();
    }
}

impl<F: VoiceFactory> Drop for AudioService<F> {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::{HeadlessVoiceFactory, PlayState};
    use crate::config::{ClipEntry, ClipGroupEntry, CueEntry};

    fn config() -> ServiceConfig {
        ServiceConfig {
            initial_pool_size: 2,
            tick_interval_ms: 5,
            clips: vec![
                ClipEntry::new("blip", 30),
                ClipEntry::new("hum", 10_000),
            ],
            cues: vec![
                CueEntry {
                    name: "blip".to_string(),
                    groups: vec![ClipGroupEntry {
                        sequence_mode: Default::default(),
                        clips: vec!["blip".to_string()],
                    }],
                    ..CueEntry::default()
                },
                CueEntry {
                    name: "hum".to_string(),
                    scene_scoped: false,
                    groups: vec![ClipGroupEntry {
                        sequence_mode: Default::default(),
                        clips: vec!["hum".to_string()],
                    }],
                    ..CueEntry::default()
                },
            ],
            ..ServiceConfig::default()
        }
    }

    fn service() -> AudioService<HeadlessVoiceFactory> {
        AudioService::new(&config(), HeadlessVoiceFactory::default()).unwrap()
    }

    fn wait_for(order: &PlayOrder, state: PlayState) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if order.state() == state {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_play_cue_manual_tick() {
        let service = service();
        let orders = service.play_cue("blip").unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(service.active_count(), 1);

        for _ in 0..4 {
            service.tick(Duration::from_millis(10));
        }
        assert_eq!(orders[0].state(), PlayState::Finished);
        assert_eq!(service.active_count(), 0);
    }

    #[test]
    fn test_unknown_cue() {
        let service = service();
        assert!(matches!(
            service.play_cue("nope"),
            Err(CueError::UnknownCue(_))
        ));
    }

    #[test]
    fn test_ticker_finishes_orders() {
        let service = service();
        service.start();
        assert!(service.is_running());

        let orders = service.play_cue("blip").unwrap();
        assert!(wait_for(&orders[0], PlayState::Finished));

        service.shutdown();
        assert!(!service.is_running());
    }

    #[test]
    fn test_unload_scene_spares_persistent_cues() {
        let service = service();
        let blip = service.play_cue("blip").unwrap();
        let hum = service.play_cue("hum").unwrap();

        service.unload_scene("level_1");
        service.tick(Duration::ZERO);

        assert_eq!(blip[0].state(), PlayState::Stopped);
        assert_eq!(hum[0].state(), PlayState::Playing);
    }

    #[test]
    fn test_shutdown_stops_everything() {
        let service = service();
        service.start();
        let hum = service.play_cue("hum").unwrap();

        service.shutdown();

        assert_eq!(hum[0].state(), PlayState::Stopped);
        assert_eq!(service.active_count(), 0);
        assert_eq!(service.events().subscriber_count(), 0);
    }

    #[test]
    fn test_play_cue_at_emitter() {
        let service = service();
        let emitter = service.emitters().register([5.0, 0.0, 0.0]);

        let orders = service.play_cue_at("hum", emitter).unwrap();
        assert_eq!(orders[0].emitter(), Some(emitter));
    }

    #[test]
    fn test_player_through_service() {
        let service = service();
        let player = CuePlayer::new("hum");

        service.play_player(&player).unwrap();
        assert!(player.is_playing());

        assert_eq!(service.stop_player(&player), 1);
        assert!(!player.is_playing());
    }

    #[test]
    fn test_finish_listener_can_chain_next_cue() {
        let service = Arc::new(service());
        let first = service.play_cue("blip").unwrap();

        let chained = Arc::new(Mutex::new(Vec::new()));
        let owner = Arc::clone(&service);
        let slot = Arc::clone(&chained);
        first[0].on_finish(move |_| {
            let orders = owner.play_cue("blip").unwrap();
            assert_eq!(owner.active_count(), 1);
            slot.lock().extend(orders);
        });

        service.tick(Duration::from_millis(50));

        assert_eq!(first[0].state(), PlayState::Finished);
        let chained = chained.lock();
        assert_eq!(chained.len(), 1);
        assert_eq!(chained[0].state(), PlayState::Playing);
        assert_eq!(service.active_count(), 1);
    }

    #[test]
    fn test_ticker_listener_can_stop_other_orders() {
        let service = Arc::new(service());
        service.start();

        let hum = service.play_cue("hum").unwrap();
        let blip = service.play_cue("blip").unwrap();

        let owner = Arc::clone(&service);
        let target = hum[0].clone();
        blip[0].on_finish(move |_| {
            owner.stop(&target);
        });

        assert!(wait_for(&hum[0], PlayState::Stopped));
        service.shutdown();
    }
}
