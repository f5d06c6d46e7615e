//! Process-wide session state.
//!
//! `SessionManager` owns the single answer to "is this client authenticated".
//! It never sees the session credential itself; it only learns the answer
//! from backend responses. Any number of UI fragments can read the state,
//! subscribe to transitions or await them through a `watch` channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::api::{paths, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Nothing is known yet (client start-up)
    Unknown,
    /// A verification round trip is in flight
    Checking,
    Authenticated,
    Anonymous,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }

    /// Authenticated or Anonymous: the backend has given an answer.
    pub fn is_settled(&self) -> bool {
        matches!(self, SessionState::Authenticated | SessionState::Anonymous)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Unknown => "unknown",
            SessionState::Checking => "checking",
            SessionState::Authenticated => "authenticated",
            SessionState::Anonymous => "anonymous",
        }
    }
}

type Listener = Arc<dyn Fn(SessionState) + Send + Sync>;
type VerifyFuture = Shared<BoxFuture<'static, SessionState>>;

struct StateCell {
    state: SessionState,
    /// Bumped by every explicit transition; a verification started under an
    /// older epoch must not overwrite the newer state.
    epoch: u64,
    /// Bumped by every applied transition. Orders announcements.
    seq: u64,
    in_flight: Option<VerifyFuture>,
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: u64,
    listeners: HashMap<u64, Listener>,
    /// Applied transitions waiting to be delivered.
    pending: Vec<Transition>,
    /// Set while one thread is draining `pending`.
    delivering: bool,
    last_announced: u64,
}

impl ListenerRegistry {
    /// Next transition to deliver, in sequence order. Transitions older than
    /// the last one announced are dropped.
    fn take_next(&mut self) -> Option<Transition> {
        loop {
            let index = self
                .pending
                .iter()
                .enumerate()
                .min_by_key(|(_, t)| t.seq)
                .map(|(i, _)| i)?;
            let transition = self.pending.swap_remove(index);
            if transition.seq > self.last_announced {
                self.last_announced = transition.seq;
                return Some(transition);
            }
            debug!(
                seq = transition.seq,
                to = transition.to.label(),
                "Dropping superseded state notification"
            );
        }
    }
}

struct SessionCore {
    cell: Mutex<StateCell>,
    registry: Mutex<ListenerRegistry>,
    watch_tx: watch::Sender<SessionState>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A state change that has been applied but not yet announced.
struct Transition {
    seq: u64,
    to: SessionState,
}

/// Releases the delivery slot if a listener panics mid-delivery.
struct DeliverySlot<'a>(&'a Mutex<ListenerRegistry>);

impl Drop for DeliverySlot<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            lock(self.0).delivering = false;
        }
    }
}

impl SessionCore {
    /// Apply `next` to the cell. Returns the transition when the value changed.
    fn apply(&self, cell: &mut StateCell, next: SessionState) -> Option<Transition> {
        if cell.state == next {
            return None;
        }
        info!(from = cell.state.label(), to = next.label(), "Session state changed");
        cell.state = next;
        cell.seq += 1;
        self.watch_tx.send_replace(next);
        Some(Transition { seq: cell.seq, to: next })
    }

    /// Announce a transition to subscribers. Must be called without the cell lock held.
    ///
    /// Only one thread delivers at a time and it delivers in sequence order, so
    /// every subscriber's last notification is the current state. A transition
    /// raised while another thread (or a listener on this one) is delivering is
    /// queued for that delivery loop.
    fn announce(&self, transition: Option<Transition>) {
        let Some(transition) = transition else {
            return;
        };
        {
            let mut registry = lock(&self.registry);
            registry.pending.push(transition);
            if registry.delivering {
                return;
            }
            registry.delivering = true;
        }

        let _slot = DeliverySlot(&self.registry);
        loop {
            let next = {
                let mut registry = lock(&self.registry);
                match registry.take_next() {
                    Some(transition) => {
                        let listeners: Vec<Listener> = registry.listeners.values().cloned().collect();
                        Some((transition.to, listeners))
                    }
                    None => {
                        registry.delivering = false;
                        None
                    }
                }
            };
            let Some((state, listeners)) = next else {
                return;
            };
            for listener in listeners {
                listener(state);
            }
        }
    }

    fn set_explicit(&self, next: SessionState) {
        let transition = {
            let mut cell = lock(&self.cell);
            cell.epoch += 1;
            self.apply(&mut cell, next)
        };
        self.announce(transition);
    }

    fn finish_verification(&self, epoch: u64, verified: SessionState) -> SessionState {
        let (transition, state) = {
            let mut cell = lock(&self.cell);
            cell.in_flight = None;
            if cell.epoch != epoch {
                debug!(
                    verified = verified.label(),
                    current = cell.state.label(),
                    "Discarding stale verification result"
                );
                (None, cell.state)
            } else {
                (self.apply(&mut cell, verified), verified)
            }
        };
        self.announce(transition);
        state
    }
}

/// Handle returned by [`SessionManager::subscribe`]. Dropping it removes the listener.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    id: u64,
    core: Weak<SessionCore>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(core) = self.core.upgrade() {
            lock(&core.registry).listeners.remove(&self.id);
        }
    }
}

/// Shared session state machine.
/// Clone is cheap - all clones observe and mutate the same state.
#[derive(Clone)]
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    core: Arc<SessionCore>,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (watch_tx, _) = watch::channel(SessionState::Unknown);
        Self {
            transport,
            core: Arc::new(SessionCore {
                cell: Mutex::new(StateCell {
                    state: SessionState::Unknown,
                    epoch: 0,
                    seq: 0,
                    in_flight: None,
                }),
                registry: Mutex::new(ListenerRegistry::default()),
                watch_tx,
            }),
        }
    }

    /// Current cached state. Never touches the network.
    pub fn state(&self) -> SessionState {
        lock(&self.core.cell).state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// Register a listener invoked with the new state on every transition.
    ///
    /// Listeners run after the state has been updated, usually on the task
    /// that caused the transition. Notifications arrive in transition order; a
    /// notification already superseded by a newer one may be skipped. There is
    /// no ordering between listeners.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(SessionState) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.core.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.insert(id, Arc::new(listener));
        Subscription {
            id,
            core: Arc::downgrade(&self.core),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.core.registry).listeners.len()
    }

    /// Receiver that always holds the latest state.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.core.watch_tx.subscribe()
    }

    /// Ask the backend whether the current credential is valid.
    ///
    /// At most one verification is in flight at a time: callers arriving while
    /// one is pending await the same round trip and see the same result.
    /// Inside a tokio runtime the round trip is driven by its own task, so
    /// cancelling the caller (a timeout, a losing `select!` branch) still lets
    /// the state settle.
    pub async fn verify(&self) -> SessionState {
        let (pending, transition) = {
            let mut cell = lock(&self.core.cell);
            if let Some(pending) = cell.in_flight.clone() {
                debug!("Joining in-flight verification");
                (pending, None)
            } else {
                let pending = Self::verification(
                    Arc::clone(&self.transport),
                    Arc::downgrade(&self.core),
                    cell.epoch,
                )
                .boxed()
                .shared();
                cell.in_flight = Some(pending.clone());
                // Runs the round trip to completion even if every caller is dropped.
                if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                    runtime.spawn(pending.clone());
                }
                let transition = if cell.state.is_settled() {
                    None
                } else {
                    self.core.apply(&mut cell, SessionState::Checking)
                };
                (pending, transition)
            }
        };
        self.core.announce(transition);
        pending.await
    }

    async fn verification(
        transport: Arc<dyn Transport>,
        core: Weak<SessionCore>,
        epoch: u64,
    ) -> SessionState {
        let verified = match transport.request(Method::POST, paths::CHECK_USER, None).await {
            Ok(_) => SessionState::Authenticated,
            Err(e) => {
                debug!(error = %e, kind = ?e.kind(), "Session not verified");
                SessionState::Anonymous
            }
        };
        match core.upgrade() {
            Some(core) => core.finish_verification(epoch, verified),
            None => verified,
        }
    }

    /// Unconditional transition to `Anonymous` (logout, or a protected call was refused).
    pub(crate) fn force_anonymous(&self) {
        self.core.set_explicit(SessionState::Anonymous);
    }

    /// Transition to `Authenticated` after the backend accepted a login.
    pub(crate) fn mark_authenticated(&self) {
        self.core.set_explicit(SessionState::Authenticated);
    }
}
