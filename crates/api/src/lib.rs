//! # Chronarc API
//!
//! The axum HTTP surface over the calendar sync, classification, and
//! time-entry engines in `chronarc-core`. See `server` for the route table.

#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use server::{build_app, start};
pub use state::AppState;
