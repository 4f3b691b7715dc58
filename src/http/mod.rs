//! HTTP front controller subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing and timeout layers)
//!     → Accept header picks the route table variant
//!     → routing: request path → action parameters
//!     → dispatch: action parameters → ActionOutput
//!     → JSON response (404 when no route matched)
//! ```

pub mod server;

pub use server::{AppState, HttpServer};
