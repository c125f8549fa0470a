//! Per-session event fan-out.
//!
//! The rpc reader task calls [`SessionRegistry::route`] once per decoded
//! event. Each subscriber owns an unbounded channel, so delivery never blocks
//! the reader and order is preserved per subscriber. Subscribers are served in
//! registration order.
//!
//! The runtime may emit events for a session before `session.create` has
//! returned to the caller, and before anyone subscribed. Those events are
//! held (up to [`MAX_HELD_EVENTS`] per session) and handed to the first
//! subscriber.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::rpc::lock_unpoisoned;

use super::events::SessionEvent;
use super::permission::{PermissionDecision, PermissionPolicy, PermissionRequest};
use super::{EventSubscription, SubscriptionId};

/// Events kept per session while nobody can receive them yet.
pub(crate) const MAX_HELD_EVENTS: usize = 256;
/// Unknown session ids whose events are held at once.
const MAX_HELD_SESSIONS: usize = 8;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<(u64, mpsc::UnboundedSender<SessionEvent>)>,
    /// Events dispatched before the first subscriber arrived.
    held: Vec<SessionEvent>,
    closed: bool,
}

fn hold(held: &mut Vec<SessionEvent>, event: SessionEvent, session: &str) {
    if held.len() < MAX_HELD_EVENTS {
        held.push(event);
    } else {
        tracing::debug!(session, kind = event.kind(), "held event limit reached; dropping");
    }
}

/// State shared between a [`Session`](super::Session) and the client's
/// inbound handler.
pub(crate) struct SessionShared {
    id: String,
    subscribers: Mutex<Subscribers>,
    policy: Arc<dyn PermissionPolicy>,
}

impl SessionShared {
    pub(crate) fn new(id: String, policy: Arc<dyn PermissionPolicy>) -> Self {
        Self {
            id,
            subscribers: Mutex::new(Subscribers::default()),
            policy,
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    /// Register a new subscriber. The first one also receives every event
    /// held so far. After [`close`](Self::close) the returned receiver is
    /// already finished.
    pub(crate) fn subscribe(&self) -> EventSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subs = lock_unpoisoned(&self.subscribers);
        subs.next_id += 1;
        let id = subs.next_id;
        if !subs.closed {
            for event in subs.held.drain(..) {
                let _ = tx.send(event);
            }
            subs.entries.push((id, tx));
        }
        EventSubscription {
            id: SubscriptionId(id),
            receiver: rx,
        }
    }

    /// Returns false when `id` was not subscribed.
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = lock_unpoisoned(&self.subscribers);
        let before = subs.entries.len();
        subs.entries.retain(|(entry, _)| *entry != id.0);
        subs.entries.len() != before
    }

    /// Deliver one event to every live subscriber, dropping those whose
    /// receiver is gone. Held until the first subscribe when nobody has
    /// subscribed yet.
    pub(crate) fn dispatch(&self, event: SessionEvent) {
        let mut subs = lock_unpoisoned(&self.subscribers);
        if subs.closed {
            return;
        }
        if subs.next_id == 0 {
            hold(&mut subs.held, event, &self.id);
            return;
        }
        subs.entries
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    /// Finish every subscription. Idempotent.
    pub(crate) fn close(&self) {
        let mut subs = lock_unpoisoned(&self.subscribers);
        subs.closed = true;
        subs.entries.clear();
        subs.held.clear();
    }

    pub(crate) fn is_closed(&self) -> bool {
        lock_unpoisoned(&self.subscribers).closed
    }

    pub(crate) fn decide(&self, request: &PermissionRequest) -> PermissionDecision {
        self.policy.decide(request)
    }
}

#[derive(Default)]
struct RegistryState {
    live: HashMap<String, Arc<SessionShared>>,
    /// Events for ids not registered yet, oldest session first.
    unclaimed: VecDeque<(String, Vec<SessionEvent>)>,
}

/// Live sessions keyed by id, shared by the client and its inbound handler.
#[derive(Clone, Default)]
pub(crate) struct SessionRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

impl SessionRegistry {
    /// Register a session, first replaying events that arrived for its id.
    pub(crate) fn insert(&self, shared: Arc<SessionShared>) {
        let mut state = lock_unpoisoned(&self.inner);
        if let Some(pos) = state.unclaimed.iter().position(|(id, _)| id.as_str() == shared.id()) {
            if let Some((_, events)) = state.unclaimed.remove(pos) {
                tracing::debug!(session = %shared.id(), count = events.len(), "replaying early events");
                for event in events {
                    shared.dispatch(event);
                }
            }
        }
        state.live.insert(shared.id().to_string(), shared);
    }

    /// Deliver `event` to session `id`, or hold it until that id registers.
    /// Runs under the registry lock so replay in [`insert`](Self::insert)
    /// keeps delivery order.
    pub(crate) fn route(&self, id: &str, event: SessionEvent) {
        let mut state = lock_unpoisoned(&self.inner);
        if let Some(shared) = state.live.get(id) {
            shared.dispatch(event);
            return;
        }
        if let Some((_, events)) = state.unclaimed.iter_mut().find(|(held, _)| held.as_str() == id) {
            hold(events, event, id);
            return;
        }
        if state.unclaimed.len() == MAX_HELD_SESSIONS {
            if let Some((dropped, _)) = state.unclaimed.pop_front() {
                tracing::debug!(session = %dropped, "dropping events for unknown session");
            }
        }
        tracing::debug!(session = id, "holding event for unknown session");
        state.unclaimed.push_back((id.to_string(), vec![event]));
    }

    pub(crate) fn get(&self, id: &str) -> Option<Arc<SessionShared>> {
        lock_unpoisoned(&self.inner).live.get(id).cloned()
    }

    pub(crate) fn remove(&self, id: &str) -> Option<Arc<SessionShared>> {
        lock_unpoisoned(&self.inner).live.remove(id)
    }

    pub(crate) fn drain(&self) -> Vec<Arc<SessionShared>> {
        let mut state = lock_unpoisoned(&self.inner);
        state.unclaimed.clear();
        state.live.drain().map(|(_, s)| s).collect()
    }

    /// Close every session's subscriptions without unregistering them.
    pub(crate) fn close_all(&self) {
        let sessions: Vec<_> = lock_unpoisoned(&self.inner).live.values().cloned().collect();
        for session in sessions {
            session.close();
        }
    }
}
