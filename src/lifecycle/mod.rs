//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → open store → start config service → seed defaults
//!     → build capabilities → subscribe engine → start ingestion
//!
//! Shutdown (shutdown.rs):
//!     Signal received → dispatchers stop → ingestion stops → config service drains
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
