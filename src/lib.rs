//! Hostname blacklisting for a distributed crawler.
//!
//! Timeout reports for crawled URLs arrive on an event topic. Each report is
//! confirmed with a live probe; hostnames that keep timing out are appended
//! to the shared forbidden-hostname list once their failure count reaches the
//! configured threshold.

pub mod blacklister;
pub mod cache;
pub mod config;
pub mod configapi;
pub mod event;
pub mod lifecycle;
pub mod observability;
mod persistence;
pub mod prober;

#[cfg(test)]
mod test_utils;

pub use blacklister::{Blacklister, Capabilities, Decision};
pub use config::BlacklisterConfig;
pub use lifecycle::Shutdown;
