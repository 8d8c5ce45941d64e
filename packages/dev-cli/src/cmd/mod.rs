//! Command implementations

pub mod login;
pub mod mode;
pub mod status;
