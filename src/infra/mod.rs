//! Infrastructure adapters and runtime bootstrap.

pub mod api;
pub mod documents;
pub mod error;
pub mod http;
pub mod telemetry;
