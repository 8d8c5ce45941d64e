// FinUPI - phone authentication core
//
// Provides the phone-OTP identity provider used by the lending app: an
// in-memory simulation for local development and a Twilio Verify backed
// provider, behind one capability trait chosen at startup.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
