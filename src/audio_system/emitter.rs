//! Emitter registry
//!
//! Orders follow their emitter by id, never by owning it. When an emitter is
//! removed the lookup simply fails and the order keeps its last position.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::voice::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmitterId(u64);

/// Live positions of sound emitters, shared between the host and the
/// coordinator
#[derive(Clone, Default)]
pub struct EmitterRegistry {
    positions: Arc<RwLock<HashMap<EmitterId, Position>>>,
    next_id: Arc<AtomicU64>,
}

impl EmitterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, position: Position) -> EmitterId {
        let id = EmitterId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.positions.write().insert(id, position);
        id
    }

    /// Move an emitter. Returns `false` if it no longer exists.
    pub fn set_position(&self, id: EmitterId, position: Position) -> bool {
        match self.positions.write().get_mut(&id) {
            Some(slot) => {
                *slot = position;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: EmitterId) -> bool {
        self.positions.write().remove(&id).is_some()
    }

    pub fn position(&self, id: EmitterId) -> Option<Position> {
        self.positions.read().get(&id).copied()
    }

    pub fn contains(&self, id: EmitterId) -> bool {
        self.positions.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.positions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.read().is_empty()
    }
}
