//! Hostname blacklisting.
//!
//! # Data Flow
//! ```text
//! event source ("timeout-url")
//!     → handler.rs (EventHandler impl, redelivery disposition)
//!     → engine.rs (decision per report)
//!         → ConfigClient     (forbidden list, threshold, list write)
//!         → FailureCounterStore (per-hostname counter)
//!         → LivenessProber   (confirmation probe)
//! ```

pub mod engine;
pub mod error;
mod handler;

use std::sync::Arc;

use crate::cache::FailureCounterStore;
use crate::configapi::ConfigClient;
use crate::prober::LivenessProber;

pub use engine::{Blacklister, Decision, Target};
pub use error::{BlacklistError, BlacklistResult};

/// Collaborators the engine is built from.
#[derive(Clone)]
pub struct Capabilities {
    pub config_client: Arc<dyn ConfigClient>,
    pub counters: Arc<dyn FailureCounterStore>,
    pub prober: Arc<dyn LivenessProber>,
}
