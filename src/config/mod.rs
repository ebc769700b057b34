//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, or defaults)
//!     → loader.rs (SERVICE_NAME, OTEL_EXPORTER_OTLP_ENDPOINT,
//!                  INSECURE_MODE, SERVER_PORT overrides)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed to each subsystem at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ExporterConfig, ExporterKind, ListenerConfig, LogFormat, ObservabilityConfig, ServiceConfig,
    ServiceIdentity, SimulationConfig, TimeoutConfig,
};
pub use validation::ValidationError;
