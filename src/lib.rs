//! Cart service with request instrumentation and periodic telemetry export.

pub mod cart;
pub mod config;
pub mod export;
pub mod http;
pub mod instruments;
pub mod lifecycle;
pub mod observability;

mod sync;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::{Services, Shutdown};
