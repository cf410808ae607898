//! Audio cue playback service
//!
//! Resolves named sound cues into play orders, runs them on a pool of
//! reusable voices and reports natural completion to listeners.

pub mod audio_system;
pub mod config;
pub mod error;
pub mod messaging;
pub mod service;

pub use audio_system::{
    CueLibrary, CuePlayer, PlayOrder, PlayState, PlaybackCoordinator, PlaybackParams,
};
pub use config::ServiceConfig;
pub use error::{AppResult, ConfigError, CueError};
pub use service::AudioService;
