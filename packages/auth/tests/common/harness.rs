//! Test harness for session tests.
//!
//! Each harness owns an isolated `DummyAuthSession`, so tests run in parallel
//! without sharing session state.

use std::sync::{Arc, Mutex};

use auth_core::domains::auth::{DummyAuthSession, UserRecord};
use auth_core::kernel::{listener, AuthListener};

pub struct TestHarness {
    pub session: Arc<DummyAuthSession>,
}

impl TestHarness {
    pub fn new() -> Self {
        // Initialize tracing subscriber to respect RUST_LOG environment variable.
        // Uses try_init() to avoid panicking if already initialized.
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        Self {
            session: Arc::new(DummyAuthSession::new()),
        }
    }
}

/// Listener that records every state it is handed.
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<Option<UserRecord>>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener(&self) -> AuthListener {
        let seen = self.seen.clone();
        listener(move |user| {
            seen.lock().unwrap().push(user.cloned());
            Ok(())
        })
    }

    pub fn seen(&self) -> Vec<Option<UserRecord>> {
        self.seen.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.seen.lock().unwrap().clear();
    }
}

/// Let spawned replay tasks run.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
