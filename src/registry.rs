//! Handler registry for inbound realtime event families.
//!
//! Registrations live client-side, independent of any transport session:
//! they survive disconnects and reconnects, so callers never re-subscribe.
//! Each registration is keyed by a monotonically increasing id; the returned
//! [`Subscription`] disposes exactly its own `(family, handler)` pair.

use crate::models::{Message, PresenceSnapshot, PresenceState, TypingSignal};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

pub(crate) type NewMessageHandler = Arc<dyn Fn(Message) + Send + Sync>;
pub(crate) type TypingHandler = Arc<dyn Fn(TypingSignal) + Send + Sync>;
pub(crate) type PresenceSnapshotHandler = Arc<dyn Fn(PresenceSnapshot) + Send + Sync>;
pub(crate) type PresenceUpdateHandler = Arc<dyn Fn(PresenceState) + Send + Sync>;

/// The four inbound event families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFamily {
    /// `messages:new`
    NewMessage,
    /// `messages:typing`
    Typing,
    /// `presence:snapshot`
    PresenceSnapshot,
    /// `presence:update`
    PresenceUpdate,
}

#[derive(Default)]
pub(crate) struct HandlerRegistry {
    next_id: u64,
    new_message: BTreeMap<u64, NewMessageHandler>,
    typing: BTreeMap<u64, TypingHandler>,
    presence_snapshot: BTreeMap<u64, PresenceSnapshotHandler>,
    presence_update: BTreeMap<u64, PresenceUpdateHandler>,
}

impl HandlerRegistry {
    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn remove(&mut self, family: EventFamily, id: u64) {
        match family {
            EventFamily::NewMessage => {
                self.new_message.remove(&id);
            }
            EventFamily::Typing => {
                self.typing.remove(&id);
            }
            EventFamily::PresenceSnapshot => {
                self.presence_snapshot.remove(&id);
            }
            EventFamily::PresenceUpdate => {
                self.presence_update.remove(&id);
            }
        }
    }

    fn count(&self, family: EventFamily) -> usize {
        match family {
            EventFamily::NewMessage => self.new_message.len(),
            EventFamily::Typing => self.typing.len(),
            EventFamily::PresenceSnapshot => self.presence_snapshot.len(),
            EventFamily::PresenceUpdate => self.presence_update.len(),
        }
    }
}

/// Shared, mutex-guarded handler registry.
#[derive(Clone, Default)]
pub(crate) struct SharedRegistry {
    inner: Arc<Mutex<HandlerRegistry>>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_new_message(&self, handler: NewMessageHandler) -> Subscription {
        let mut reg = self.inner.lock().unwrap();
        let id = reg.next_id();
        reg.new_message.insert(id, handler);
        Subscription::active(&self.inner, EventFamily::NewMessage, id)
    }

    pub fn add_typing(&self, handler: TypingHandler) -> Subscription {
        let mut reg = self.inner.lock().unwrap();
        let id = reg.next_id();
        reg.typing.insert(id, handler);
        Subscription::active(&self.inner, EventFamily::Typing, id)
    }

    pub fn add_presence_snapshot(&self, handler: PresenceSnapshotHandler) -> Subscription {
        let mut reg = self.inner.lock().unwrap();
        let id = reg.next_id();
        reg.presence_snapshot.insert(id, handler);
        Subscription::active(&self.inner, EventFamily::PresenceSnapshot, id)
    }

    pub fn add_presence_update(&self, handler: PresenceUpdateHandler) -> Subscription {
        let mut reg = self.inner.lock().unwrap();
        let id = reg.next_id();
        reg.presence_update.insert(id, handler);
        Subscription::active(&self.inner, EventFamily::PresenceUpdate, id)
    }

    pub fn count(&self, family: EventFamily) -> usize {
        self.inner.lock().unwrap().count(family)
    }

    // Handlers are snapshotted under the lock and invoked after releasing it,
    // so a handler may register or dispose subscriptions without deadlocking.
    // Within one family, handlers run in registration order.

    pub fn dispatch_new_message(&self, message: Message) {
        let handlers: Vec<NewMessageHandler> = {
            let reg = self.inner.lock().unwrap();
            reg.new_message.values().cloned().collect()
        };
        for handler in handlers {
            handler(message.clone());
        }
    }

    pub fn dispatch_typing(&self, signal: TypingSignal) {
        let handlers: Vec<TypingHandler> = {
            let reg = self.inner.lock().unwrap();
            reg.typing.values().cloned().collect()
        };
        for handler in handlers {
            handler(signal.clone());
        }
    }

    pub fn dispatch_presence_snapshot(&self, snapshot: PresenceSnapshot) {
        let handlers: Vec<PresenceSnapshotHandler> = {
            let reg = self.inner.lock().unwrap();
            reg.presence_snapshot.values().cloned().collect()
        };
        for handler in handlers {
            handler(snapshot.clone());
        }
    }

    pub fn dispatch_presence_update(&self, state: PresenceState) {
        let handlers: Vec<PresenceUpdateHandler> = {
            let reg = self.inner.lock().unwrap();
            reg.presence_update.values().cloned().collect()
        };
        for handler in handlers {
            handler(state.clone());
        }
    }
}

/// Disposer for one registered `(event family, handler)` pair.
///
/// Dropping a `Subscription` does NOT unsubscribe — the handler stays
/// registered until [`unsubscribe`](Subscription::unsubscribe) is called.
/// Calling it more than once is safe; the second call is a no-op. Other
/// registrations on the same family are left intact.
///
/// Subscribe methods called without a stored credential return an inert
/// `Subscription` that registered nothing; disposing it is also a no-op.
#[derive(Debug)]
pub struct Subscription {
    inner: Option<(Weak<Mutex<HandlerRegistry>>, EventFamily, u64)>,
}

impl Subscription {
    fn active(registry: &Arc<Mutex<HandlerRegistry>>, family: EventFamily, id: u64) -> Self {
        Self {
            inner: Some((Arc::downgrade(registry), family, id)),
        }
    }

    /// A disposer that performs no registration and no removal.
    pub(crate) fn inert() -> Self {
        Self { inner: None }
    }

    /// `true` while this subscription still holds a live registration.
    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }

    /// Remove exactly this subscription's handler. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some((registry, family, id)) = self.inner.take() {
            if let Some(registry) = registry.upgrade() {
                registry.lock().unwrap().remove(family, id);
            }
        }
    }
}
