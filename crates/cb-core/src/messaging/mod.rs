//! Messaging-platform abstractions (Reddit today).

pub mod port;
pub mod throttled;
