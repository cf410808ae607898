//! Play order state machine
//!
//! A [`PlayOrder`] is one request to play one clip group's selected clip.
//! Orders are shared handles: the caller keeps a clone to observe the state
//! while the coordinator drives it.
//!
//! ```text
//! Ordered ──> Playing <──> Paused
//!               │  │          │
//!               │  └──────────┴──> Stopped
//!               └──> Finished
//! ```
//!
//! Only the Playing -> Finished edge notifies finish listeners.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::clip::ClipRef;
use super::cue::PlaybackParams;
use super::emitter::EmitterId;
use super::pool::VoiceId;

static NEXT_ORDER_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of a play order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlayState {
    /// Created, not yet bound to a voice
    #[default]
    Ordered,

    /// Bound to a voice that is producing sound
    Playing,

    /// Bound to a paused voice
    Paused,

    /// Cancelled before natural completion
    Stopped,

    /// Clip reached its end
    Finished,
}

impl PlayState {
    /// Check if the order currently holds a voice
    pub fn is_active(&self) -> bool {
        matches!(self, PlayState::Playing | PlayState::Paused)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PlayState::Stopped | PlayState::Finished)
    }

    pub fn can_transition_to(&self, next: PlayState) -> bool {
        use PlayState::*;
        matches!(
            (self, next),
            (Ordered, Playing)
                | (Playing, Paused)
                | (Paused, Playing)
                | (Playing, Stopped)
                | (Paused, Stopped)
                | (Playing, Finished)
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            PlayState::Ordered => "Ordered",
            PlayState::Playing => "Playing",
            PlayState::Paused => "Paused",
            PlayState::Stopped => "Stopped",
            PlayState::Finished => "Finished",
        }
    }
}

/// Unique identity of a play order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId(u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order#{}", self.0)
    }
}

/// Finish listener registration, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

type FinishListener = Box<dyn FnMut(&PlayOrder) + Send>;

struct OrderInner {
    state: PlayState,
    voice: Option<VoiceId>,
    emitter: Option<EmitterId>,
    listeners: Vec<(ListenerId, FinishListener)>,
    next_listener: usize,
}

/// Shared handle to one in-flight playback request.
///
/// Clones refer to the same order.
#[derive(Clone)]
pub struct PlayOrder {
    id: OrderId,
    cue: Arc<str>,
    clip: ClipRef,
    params: PlaybackParams,
    inner: Arc<Mutex<OrderInner>>,
}

impl PlayOrder {
    /// Create an order in the `Ordered` state
    pub fn new(cue: impl Into<Arc<str>>, clip: ClipRef, params: PlaybackParams) -> Self {
        Self {
            id: OrderId(NEXT_ORDER_ID.fetch_add(1, Ordering::Relaxed)),
            cue: cue.into(),
            clip,
            params,
            inner: Arc::new(Mutex::new(OrderInner {
                state: PlayState::Ordered,
                voice: None,
                emitter: None,
                listeners: Vec::new(),
                next_listener: 0,
            })),
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Name of the cue this order was resolved from
    pub fn cue(&self) -> &str {
        &self.cue
    }

    pub fn clip(&self) -> &ClipRef {
        &self.clip
    }

    pub fn params(&self) -> &PlaybackParams {
        &self.params
    }

    pub fn state(&self) -> PlayState {
        self.inner.lock().state
    }

    /// Voice held while Playing or Paused
    pub fn voice(&self) -> Option<VoiceId> {
        self.inner.lock().voice
    }

    pub fn emitter(&self) -> Option<EmitterId> {
        self.inner.lock().emitter
    }

    /// Attach the order to an emitter whose position it follows
    pub fn set_emitter(&self, emitter: Option<EmitterId>) {
        self.inner.lock().emitter = emitter;
    }

    /// Builder form of [`set_emitter`](Self::set_emitter)
    pub fn with_emitter(self, emitter: EmitterId) -> Self {
        self.set_emitter(Some(emitter));
        self
    }

    /// Subscribe to the Playing -> Finished edge.
    ///
    /// Listeners run on the tick that detects completion, after the
    /// coordinator's state pass.
    pub fn on_finish<F>(&self, listener: F) -> ListenerId
    where
        F: FnMut(&PlayOrder) + Send + 'static,
    {
        let mut inner = self.inner.lock();
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        self.inner.lock().listeners.retain(|(l, _)| *l != id);
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Apply a transition.
    ///
    /// Illegal transitions are ignored and return `false`. On the Playing ->
    /// Finished edge the listeners are drained and invoked after the lock is
    /// released, so each fires at most once.
    pub(crate) fn update_state(&self, next: PlayState) -> bool {
        match self.transition(next) {
            Some(fired) => {
                FinishNotice::new(self.clone(), fired).notify();
                true
            }
            None => false,
        }
    }

    /// Playing -> Finished without running the listeners yet.
    ///
    /// The caller delivers the returned notice once it holds no locks the
    /// listeners might need.
    pub(crate) fn finish_deferred(&self) -> Option<FinishNotice> {
        self.transition(PlayState::Finished)
            .map(|fired| FinishNotice::new(self.clone(), fired))
    }

    /// Returns the drained finish listeners, or `None` for an illegal move
    fn transition(&self, next: PlayState) -> Option<Vec<(ListenerId, FinishListener)>> {
        let mut inner = self.inner.lock();
        if !inner.state.can_transition_to(next) {
            tracing::debug!(
                "Ignoring {} transition {} -> {}",
                self.id,
                inner.state.description(),
                next.description()
            );
            return None;
        }

        let previous = inner.state;
        inner.state = next;
        if next.is_terminal() {
            inner.voice = None;
        }

        if previous == PlayState::Playing && next == PlayState::Finished {
            Some(std::mem::take(&mut inner.listeners))
        } else {
            Some(Vec::new())
        }
    }

    pub(crate) fn bind_voice(&self, voice: VoiceId) {
        self.inner.lock().voice = Some(voice);
    }
}

impl PartialEq for PlayOrder {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PlayOrder {}

/// Finish listeners taken off an order that has reached `Finished`
#[must_use = "listeners only run when the notice is delivered"]
pub struct FinishNotice {
    order: PlayOrder,
    listeners: Vec<(ListenerId, FinishListener)>,
}

impl FinishNotice {
    fn new(order: PlayOrder, listeners: Vec<(ListenerId, FinishListener)>) -> Self {
        Self { order, listeners }
    }

    pub fn order(&self) -> &PlayOrder {
        &self.order
    }

    /// Run every listener with the finished order
    pub fn notify(self) {
        let FinishNotice { order, listeners } = self;
        for (_, mut listener) in listeners {
            listener(&order);
        }
    }
}

impl fmt::Debug for PlayOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("PlayOrder")
            .field("id", &self.id)
            .field("cue", &self.cue)
            .field("clip", &self.clip)
            .field("state", &inner.state)
            .field("voice", &inner.voice)
            .field("emitter", &inner.emitter)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}
