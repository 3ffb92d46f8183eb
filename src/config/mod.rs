//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MuxConfig (validated, immutable)
//!     → read once at startup by lifecycle::startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; handlers are built once per process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{ListenerConfig, MuxConfig, ObservabilityConfig, RpcConfig, UsageConfig};
pub use validation::{validate_config, ValidationError};
