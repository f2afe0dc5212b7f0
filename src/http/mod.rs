//! HTTP boundary subsystem.
//!
//! # Data Flow
//! ```text
//! Request
//!     → server.rs (Axum setup, middleware: request ID, timeout, trace)
//!     → handlers.rs (deserialize body, pick the guarded operation)
//!     → resilience wrapper → payment generator
//!     → handlers.rs (map Outcome to status code + JSON body)
//!     → Response
//! ```

pub mod handlers;
pub mod server;

pub use server::HttpServer;
