//! Core types, errors, and content detection for the fsev event server.
//!
//! This crate provides the foundational pieces used across the workspace:
//!
//! - [`ServeError`] - the unified error taxonomy
//! - [`Request`] and [`Action`] - the unit of work delivered to handlers
//! - [`MimeDescriptor`] and content-based detection
//! - [`ServerConfig`] and [`WatchConfig`] - configuration structures
//! - Path utilities (tilde expansion, working-directory resolution)
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod mime;
pub mod path;
pub mod request;

pub use config::{ConfigError, ServerConfig, WatchConfig};
pub use error::{BoxError, ServeError};
pub use hash::{FxHashMap, FxHashSet};
pub use mime::MimeDescriptor;
pub use path::PathError;
pub use request::{Action, Request, RequestBuilder};
