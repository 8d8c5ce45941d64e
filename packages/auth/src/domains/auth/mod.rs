//! Auth domain - phone number OTP authentication
//!
//! Responsibilities:
//! - Simulated provider for local development (`DummyAuthSession`)
//! - Twilio Verify backed provider (`TwilioAuthProvider`)
//! - Login flow driving either provider through `BaseAuthProvider`

pub mod dummy;
pub mod events;
pub mod flow;
pub mod models;
pub mod twilio_provider;

pub use dummy::{DummyAuthSession, DUMMY_OTP};
pub use events::AuthEvent;
pub use flow::{FlowError, LoginFlow, LoginStep};
pub use models::{Challenge, UserRecord};
pub use twilio_provider::TwilioAuthProvider;
