// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into providers for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::{BaseTwilioService, OtpCheck};

// =============================================================================
// Mock Twilio Service
// =============================================================================

/// Twilio stand-in that approves one configured code.
pub struct MockTwilioService {
    sid: String,
    /// Some(counter) when every send gets a fresh SID
    unique_sids: Option<AtomicU64>,
    approved_code: String,
    expired: bool,
    fail: bool,
    sent_to: Arc<Mutex<Vec<String>>>,
    verified: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockTwilioService {
    pub fn new() -> Self {
        Self {
            sid: "VE00000000000000000000000000000000".to_string(),
            unique_sids: None,
            approved_code: "123456".to_string(),
            expired: false,
            fail: false,
            sent_to: Arc::new(Mutex::new(Vec::new())),
            verified: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Verification SID returned by `send_otp`
    pub fn with_sid(mut self, sid: &str) -> Self {
        self.sid = sid.to_string();
        self
    }

    /// Hand out VE0, VE1, ... like real Twilio, one SID per send
    pub fn with_unique_sids(mut self) -> Self {
        self.unique_sids = Some(AtomicU64::new(0));
        self
    }

    /// Answer every check as if the verification had expired
    pub fn with_expired(mut self) -> Self {
        self.expired = true;
        self
    }

    pub fn with_approved_code(mut self, code: &str) -> Self {
        self.approved_code = code.to_string();
        self
    }

    /// Make every call fail as if Twilio were unreachable
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Phone numbers OTPs were sent to
    pub fn sent_to(&self) -> Vec<String> {
        self.sent_to.lock().unwrap().clone()
    }

    /// (phone, code) pairs that were checked
    pub fn verified(&self) -> Vec<(String, String)> {
        self.verified.lock().unwrap().clone()
    }
}

impl Default for MockTwilioService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseTwilioService for MockTwilioService {
    async fn send_otp(&self, phone_number: &str) -> Result<String> {
        if self.fail {
            return Err(anyhow!("Twilio unreachable"));
        }
        self.sent_to.lock().unwrap().push(phone_number.to_string());
        match &self.unique_sids {
            Some(counter) => Ok(format!("VE{}", counter.fetch_add(1, Ordering::Relaxed))),
            None => Ok(self.sid.clone()),
        }
    }

    async fn verify_otp(&self, phone_number: &str, code: &str) -> Result<OtpCheck> {
        if self.fail {
            return Err(anyhow!("Twilio unreachable"));
        }
        self.verified
            .lock()
            .unwrap()
            .push((phone_number.to_string(), code.to_string()));
        if self.expired {
            Ok(OtpCheck::Expired)
        } else if code == self.approved_code {
            Ok(OtpCheck::Approved)
        } else {
            Ok(OtpCheck::Rejected)
        }
    }
}
