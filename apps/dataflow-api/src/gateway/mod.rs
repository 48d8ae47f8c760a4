//! Real-time connection hub.
//!
//! Clients connect to `/ws`, optionally bind a company key with a `register`
//! message, and push `data` messages that are relayed to the workflow
//! engine's webhook. Administrative callers reach clients through
//! [`fanout::MessageRouter`] and inspect them through [`stats::StatsReporter`].

pub mod audit;
pub mod events;
pub mod fanout;
pub mod forwarder;
pub mod handler;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;
