//! In-process session slot with an ordered listener registry.
//!
//! Holds the signed-in user (if any) and fans state changes out to every
//! registered listener.
//!
//! # Delivery
//!
//! - **Synchronous rounds**: `sign_in` / `sign_out` notify all listeners inline,
//!   after the slot has been updated, in registration order.
//! - **Deferred replay**: a new subscription receives the current slot once, on
//!   a later scheduler turn. The replay is skipped if a synchronous round
//!   reached the subscription first, so the initial state is observed exactly
//!   once.
//! - **Isolation**: a listener that returns `Err` or panics is logged and the
//!   round continues with the next listener.
//! - **Per-listener ordering**: deliveries to one listener never overlap
//!   across threads, so on a multi-thread runtime a replay cannot land after
//!   a newer round. A listener may call back into the session from its own
//!   callback; the nested round is delivered inline on the same thread.
//!   Concurrent `sign_in` / `sign_out` calls from different threads are not
//!   ordered against each other.
//!
//! Async consumers that prefer a stream can use [`SessionState::events`].

use std::cell::RefCell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use anyhow::Result;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::domains::auth::events::AuthEvent;
use crate::domains::auth::models::UserRecord;

/// Buffered auth events before slow receivers start lagging.
const EVENT_CAPACITY: usize = 64;

/// Callback invoked with the new session state.
pub type AuthListener = Arc<dyn Fn(Option<&UserRecord>) -> Result<()> + Send + Sync>;

/// Wrap a closure as an [`AuthListener`].
pub fn listener<F>(f: F) -> AuthListener
where
    F: Fn(Option<&UserRecord>) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Registration {
    id: SubscriptionId,
    listener: AuthListener,
    /// Set once any delivery (round or replay) has been scheduled for it.
    notified: bool,
    delivery: Arc<Mutex<()>>,
}

/// A listener as captured for one round.
struct Target {
    id: SubscriptionId,
    listener: AuthListener,
    delivery: Arc<Mutex<()>>,
}

thread_local! {
    /// Delivery locks held by the current thread, innermost last.
    static HELD_DELIVERIES: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Exclusive right to call one listener. Re-entrant on the owning thread.
struct DeliveryGuard<'a> {
    key: usize,
    lock: Option<MutexGuard<'a, ()>>,
}

impl<'a> DeliveryGuard<'a> {
    fn acquire(delivery: &'a Arc<Mutex<()>>) -> Self {
        let key = Arc::as_ptr(delivery) as usize;
        if HELD_DELIVERIES.with(|held| held.borrow().contains(&key)) {
            return Self { key, lock: None };
        }
        let lock = delivery.lock().unwrap_or_else(PoisonError::into_inner);
        HELD_DELIVERIES.with(|held| held.borrow_mut().push(key));
        Self {
            key,
            lock: Some(lock),
        }
    }
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        if self.lock.is_some() {
            HELD_DELIVERIES.with(|held| {
                let mut held = held.borrow_mut();
                if let Some(pos) = held.iter().rposition(|k| *k == self.key) {
                    held.remove(pos);
                }
            });
        }
    }
}

#[derive(Default)]
struct Slot {
    current_user: Option<UserRecord>,
    listeners: Vec<Registration>,
}

struct Shared {
    slot: Mutex<Slot>,
    next_id: AtomicU64,
    events: broadcast::Sender<AuthEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replay(&self, id: SubscriptionId) {
        let Some(delivery) = self
            .lock()
            .listeners
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.delivery.clone())
        else {
            return;
        };
        // Held through the call so a concurrent round waits for this replay.
        let _guard = DeliveryGuard::acquire(&delivery);

        let pending = {
            let mut slot = self.lock();
            let current = slot.current_user.clone();
            slot.listeners
                .iter_mut()
                .find(|r| r.id == id && !r.notified)
                .map(|r| {
                    r.notified = true;
                    (r.listener.clone(), current)
                })
        };

        if let Some((listener, user)) = pending {
            invoke(id, &listener, user.as_ref());
        }
    }
}

/// Current-user slot plus listener registry. Clones share the same state.
#[derive(Clone)]
pub struct SessionState {
    shared: Arc<Shared>,
}

impl SessionState {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::default()),
                next_id: AtomicU64::new(1),
                events,
            }),
        }
    }

    pub fn current_user(&self) -> Option<UserRecord> {
        self.shared.lock().current_user.clone()
    }

    /// Store `user` and notify every listener in the same turn.
    pub fn sign_in(&self, user: UserRecord) {
        let targets = {
            let mut slot = self.shared.lock();
            slot.current_user = Some(user.clone());
            mark_all_notified(&mut slot)
        };

        self.emit(AuthEvent::SignedIn {
            uid: user.uid.clone(),
            phone_number: user.phone_number.clone(),
        });
        deliver(&targets, Some(&user));
    }

    /// Clear the slot. Returns whether a user was signed in.
    ///
    /// Listeners are only notified on an actual signed-in to signed-out
    /// transition.
    pub fn sign_out(&self) -> bool {
        let (previous, targets) = {
            let mut slot = self.shared.lock();
            match slot.current_user.take() {
                Some(previous) => (previous, mark_all_notified(&mut slot)),
                None => return false,
            }
        };

        self.emit(AuthEvent::SignedOut { uid: previous.uid });
        deliver(&targets, None);
        true
    }

    /// Register `listener` and schedule the replay of the current state.
    ///
    /// The replay runs on the ambient tokio runtime. Without one it is
    /// delivered inline.
    ///
    /// Deliveries to one listener are serialized. Two listeners that each
    /// trigger a round on this session from inside their callbacks, on two
    /// threads at once, can deadlock.
    pub fn subscribe(&self, listener: AuthListener) -> Subscription {
        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        self.shared.lock().listeners.push(Registration {
            id,
            listener,
            notified: false,
            delivery: Arc::new(Mutex::new(())),
        });
        debug!(subscription = %id, "auth state listener added");

        match Handle::try_current() {
            Ok(handle) => {
                let shared = Arc::downgrade(&self.shared);
                handle.spawn(async move {
                    if let Some(shared) = shared.upgrade() {
                        shared.replay(id);
                    }
                });
            }
            Err(_) => {
                warn!(subscription = %id, "no async runtime, replaying auth state inline");
                self.shared.replay(id);
            }
        }

        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Stream of auth facts for async consumers.
    pub fn events(&self) -> broadcast::Receiver<AuthEvent> {
        self.shared.events.subscribe()
    }

    pub fn emit(&self, event: AuthEvent) {
        // No receivers is fine.
        let _ = self.shared.events.send(event);
    }

    pub fn listener_count(&self) -> usize {
        self.shared.lock().listeners.len()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.shared.lock();
        f.debug_struct("SessionState")
            .field("signed_in", &slot.current_user.is_some())
            .field("listener_count", &slot.listeners.len())
            .finish()
    }
}

/// Handle for one registration. Dropping it leaves the listener registered.
#[must_use = "keep the subscription to be able to unsubscribe"]
#[derive(Debug, Clone)]
pub struct Subscription {
    id: SubscriptionId,
    shared: Weak<Shared>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove exactly this registration. Further calls do nothing.
    pub fn unsubscribe(&self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let mut slot = shared.lock();
        if let Some(pos) = slot.listeners.iter().position(|r| r.id == self.id) {
            slot.listeners.remove(pos);
            debug!(subscription = %self.id, "auth state listener removed");
        }
    }
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared").finish_non_exhaustive()
    }
}

fn mark_all_notified(slot: &mut Slot) -> Vec<Target> {
    slot.listeners
        .iter_mut()
        .map(|r| {
            r.notified = true;
            Target {
                id: r.id,
                listener: r.listener.clone(),
                delivery: r.delivery.clone(),
            }
        })
        .collect()
}

fn deliver(targets: &[Target], user: Option<&UserRecord>) {
    debug!(
        listeners = targets.len(),
        signed_in = user.is_some(),
        "notifying auth state listeners"
    );
    for target in targets {
        let _guard = DeliveryGuard::acquire(&target.delivery);
        invoke(target.id, &target.listener, user);
    }
}

fn invoke(id: SubscriptionId, listener: &AuthListener, user: Option<&UserRecord>) {
    match catch_unwind(AssertUnwindSafe(|| listener(user))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(subscription = %id, error = %e, "auth state listener failed");
        }
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            error!(subscription = %id, panic = %panic_msg, "auth state listener panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    type Seen = Arc<StdMutex<Vec<Option<String>>>>;

    fn recording_listener() -> (AuthListener, Seen) {
        let seen: Seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        let l = listener(move |user| {
            sink.lock().unwrap().push(user.map(|u| u.uid.clone()));
            Ok(())
        });
        (l, seen)
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn user(uid: &str) -> UserRecord {
        UserRecord::new(uid, "9876543210", "New User")
    }

    #[tokio::test]
    async fn test_replay_is_deferred() {
        let state = SessionState::new();
        let (l, seen) = recording_listener();

        let _sub = state.subscribe(l);
        assert!(seen.lock().unwrap().is_empty());

        settle().await;
        assert_eq!(*seen.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn test_round_before_replay_suppresses_replay() {
        let state = SessionState::new();
        let (l, seen) = recording_listener();

        let _sub = state.subscribe(l);
        state.sign_in(user("u1"));
        settle().await;

        assert_eq!(*seen.lock().unwrap(), vec![Some("u1".to_string())]);
    }

    #[tokio::test]
    async fn test_sign_out_without_user_is_silent() {
        let state = SessionState::new();
        let (l, seen) = recording_listener();
        let _sub = state.subscribe(l);
        settle().await;

        assert!(!state.sign_out());
        assert_eq!(*seen.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn test_same_listener_twice_unsubscribes_one() {
        let state = SessionState::new();
        let (l, seen) = recording_listener();

        let first = state.subscribe(l.clone());
        let _second = state.subscribe(l);
        settle().await;
        seen.lock().unwrap().clear();

        first.unsubscribe();
        first.unsubscribe();
        assert_eq!(state.listener_count(), 1);

        state.sign_in(user("u1"));
        assert_eq!(*seen.lock().unwrap(), vec![Some("u1".to_string())]);
    }

    #[tokio::test]
    async fn test_unsubscribe_before_replay_skips_it() {
        let state = SessionState::new();
        let (l, seen) = recording_listener();

        let sub = state.subscribe(l);
        sub.unsubscribe();
        settle().await;

        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_and_panicking_listeners_are_isolated() {
        let state = SessionState::new();
        let _failing = state.subscribe(listener(|_| Err(anyhow::anyhow!("boom"))));
        let _panicking = state.subscribe(listener(|user| {
            if user.is_some() {
                panic!("listener bug");
            }
            Ok(())
        }));
        let (l, seen) = recording_listener();
        let _ok = state.subscribe(l);
        settle().await;

        state.sign_in(user("u1"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("u1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_events_stream() {
        let state = SessionState::new();
        let mut rx = state.events();

        state.sign_in(user("u1"));
        state.sign_out();

        assert!(matches!(rx.recv().await.unwrap(), AuthEvent::SignedIn { uid, .. } if uid == "u1"));
        assert!(matches!(rx.recv().await.unwrap(), AuthEvent::SignedOut { uid } if uid == "u1"));
    }

    #[test]
    fn test_replay_without_runtime_is_inline() {
        let state = SessionState::new();
        let (l, seen) = recording_listener();

        let _sub = state.subscribe(l);
        assert_eq!(*seen.lock().unwrap(), vec![None]);
    }

    #[test]
    fn test_listener_may_read_state_during_round() {
        let state = SessionState::new();
        let reader = state.clone();
        let observed = Arc::new(StdMutex::new(None));
        let sink = observed.clone();
        let _sub = state.subscribe(listener(move |_| {
            *sink.lock().unwrap() = reader.current_user().map(|u| u.uid);
            Ok(())
        }));

        state.sign_in(user("u7"));
        assert_eq!(observed.lock().unwrap().as_deref(), Some("u7"));
    }

    #[test]
    fn test_listener_may_sign_out_from_its_own_callback() {
        let state = SessionState::new();
        let inner = state.clone();
        let (l, seen) = recording_listener();
        let _recorder = state.subscribe(l);
        let _kicker = state.subscribe(listener(move |user| {
            if user.is_some() {
                inner.sign_out();
            }
            Ok(())
        }));

        state.sign_in(user("u1"));

        assert!(state.current_user().is_none());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("u1".to_string()), None]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_replay_never_lands_after_newer_round() {
        for i in 0..200 {
            let state = SessionState::new();
            let (l, seen) = recording_listener();
            let _sub = state.subscribe(l);

            let uid = format!("u{}", i);
            state.sign_in(user(&uid));

            // Once the round returns, any replay either already ran or is skipped.
            assert_eq!(seen.lock().unwrap().last(), Some(&Some(uid.clone())));
            settle().await;
            let seen = seen.lock().unwrap();
            assert_eq!(seen.last(), Some(&Some(uid)));
            assert!(seen.len() <= 2);
        }
    }
}
