//! Messaging module for host signals
//!
//! The host publishes lifecycle events (scene boundaries, shutdown) on an
//! [`EventBus`]. The playback coordinator subscribes at start, drains its
//! receiver at the top of every tick and unsubscribes at shutdown.
//!
//! ```text
//! ┌──────────┐    Event     ┌─────────────┐   drained per tick   ┌─────────────┐
//! │   Host   │ ───────────> │  Event Bus  │ ───────────────────> │ Coordinator │
//! └──────────┘              └─────────────┘                      └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let bus = EventBus::new();
//! coordinator.attach_events(&bus);
//!
//! bus.publish(Event::scene_unloaded("level_1"));
//! coordinator.tick(Duration::from_millis(16)); // scene-scoped orders stop here
//!
//! coordinator.detach_events(&bus);
//! ```

pub mod events;
pub mod bus;

// Re-export commonly used types
pub use events::Event;
pub use bus::{EventBus, SubscriberId};
