//! Audio cue playback
//!
//! Turns named cues into play orders, binds them to pooled voices and drives
//! them to completion:
//!
//! ## Architecture
//!
//! ```text
//! CueLibrary ── new_orders("cue") ──> PlayOrder (one per clip group)
//!                                        │
//!                                        ▼
//! PlaybackCoordinator ── tick(delta) ──> VoicePool<VoiceFactory>
//!   ├── emitter tracking (EmitterRegistry)   ├── HeadlessVoice
//!   ├── fade ramps (FadeRamp)                └── RodioVoice (SpatialSink)
//!   └── completion -> Finished listeners
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use audio_system::{CueLibrary, HeadlessVoiceFactory, PlaybackCoordinator};
//!
//! let mut library = CueLibrary::from_config(&config)?;
//! let mut coordinator = PlaybackCoordinator::new(HeadlessVoiceFactory::default());
//!
//! for order in library.new_orders("footstep")? {
//!     order.on_finish(|o| tracing::info!("{} done", o.id()));
//!     coordinator.play(&order)?;
//! }
//!
//! coordinator.tick(Duration::from_millis(16));
//! ```

pub mod clip;
pub mod coordinator;
pub mod cue;
pub mod cue_player;
pub mod emitter;
pub mod fade;
pub mod headless;
pub mod order;
pub mod player;
pub mod pool;
pub mod voice;

// Re-export commonly used types
pub use clip::{ClipGroup, ClipRef, SequenceMode};
pub use coordinator::PlaybackCoordinator;
pub use cue::{AudioCue, CueLibrary, PlaybackParams};
pub use cue_player::CuePlayer;
pub use emitter::{EmitterId, EmitterRegistry};
pub use fade::FadeRamp;
pub use headless::{HeadlessVoice, HeadlessVoiceFactory};
pub use order::{FinishNotice, ListenerId, OrderId, PlayOrder, PlayState};
pub use player::{ClipBank, RodioVoice, RodioVoiceFactory};
pub use pool::{VoiceId, VoicePool};
pub use voice::{Position, Voice, VoiceFactory};
