//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BlacklisterConfig (validated, immutable)
//!     → handed to startup.rs to build capabilities
//! ```
//!
//! This is the process configuration. The forbidden-hostname list and the
//! blacklist threshold are runtime values owned by the config store (see
//! `configapi`), not by this file.
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::BlacklisterConfig;
pub use schema::{
    CacheConfig, ConfigApiConfig, DefaultsConfig, EngineConfig, EventsConfig, LogFormat,
    ObservabilityConfig, PromotionGuard, ProberConfig,
};
