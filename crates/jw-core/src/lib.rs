//! Core domain + application logic for the job-listing watcher.
//!
//! Polls a partitioned listings feed, detects items newer than each partition's
//! watermark and fans them out to subscribers over a chat bot. The crate is
//! framework-agnostic: the feed source and the chat transport live behind ports
//! (traits) implemented in adapter crates.

pub mod catalog;
pub mod config;
pub mod context;
pub mod detector;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod events;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod poller;
pub mod ports;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use errors::{Error, Result};
