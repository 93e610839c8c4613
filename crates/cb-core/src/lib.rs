//! Core domain + application logic for ChannelBot.
//!
//! This crate is intentionally platform-agnostic. Reddit / YouTube / on-disk
//! storage live behind ports (traits) implemented in adapter crates or in
//! [`registry`].

pub mod command;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod inbox;
pub mod logging;
pub mod messaging;
pub mod monitor;
pub mod ports;
pub mod registry;
pub mod scheduler;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::{Error, Result};
