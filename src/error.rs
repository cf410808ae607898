use thiserror::Error;

/// Library errors raised while resolving cues or acquiring voices.
///
/// Illegal state transitions and vanished emitters are not errors: the
/// playback layer treats them as no-ops because teardown paths race with
/// natural completion.
#[derive(Error, Debug)]
pub enum CueError {
    #[error("Cue '{cue}' has an empty clip group at index {group}")]
    EmptyClipGroup { cue: String, group: usize },

    #[error("Cue '{cue}' refers to undeclared clip '{clip}'")]
    UnknownClip { cue: String, clip: String },

    #[error("No cue named '{0}'")]
    UnknownCue(String),

    #[error("Voice template unavailable: {0}")]
    VoiceTemplate(String),

    #[error("Failed to load clip '{clip}'")]
    ClipLoad {
        clip: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
