//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, outer layers: trace, request ID)
//!     → middleware/instrumentation.rs (span open, timer start)
//!     → request timeout (408 when exceeded)
//!     → handlers.rs (cart operations, /health, /error)
//!         → response.rs (CartError → 4xx)
//!         → simulation.rs (/error outcome draw)
//!     → middleware/instrumentation.rs (status, latency, error count, span close)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod response;
pub mod server;
pub mod simulation;

pub use handlers::{AppState, CartView};
pub use response::ApiError;
pub use server::{build_router, instrument_routes, HttpServer, ENDPOINTS};
pub use simulation::{ErrorSimulator, FastRandSource, RandomSource, SimulatedOutcome};
