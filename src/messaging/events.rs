//! Event types for the playback layer
//!
//! Events represent things that have happened (past tense).
//! They are broadcast to all subscribers.

use std::time::Instant;

/// Host events
#[derive(Debug, Clone)]
pub enum Event {
    /// The current scene was unloaded; scene-scoped playback must end
    SceneUnloaded { scene: String, timestamp: Instant },

    /// Application is shutting down
    Shutdown,
}

impl Event {
    pub fn scene_unloaded(scene: impl Into<String>) -> Self {
        Event::SceneUnloaded {
            scene: scene.into(),
            timestamp: Instant::now(),
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            Event::SceneUnloaded { scene, .. } => format!("Scene unloaded: {}", scene),
            Event::Shutdown => "Shutting down".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_description() {
        let event = Event::scene_unloaded("forest");
        assert_eq!(event.description(), "Scene unloaded: forest");

        assert_eq!(Event::Shutdown.description(), "Shutting down");
    }
}
