//! Error handling module for authtunnel

mod error;

// Re-export the main error types and utilities
pub use error::{ProxyError, Result};
