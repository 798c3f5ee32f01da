//! Glob-routed handler multiplexer for the fsev event server.
//!
//! This crate provides the dispatch surface of the server:
//!
//! - The [`Handler`] contract and [`RequestContext`]
//! - [`ServeMux`], a first-match router over glob patterns
//! - The process-wide default mux with [`handle`]/[`handle_fn`] registration
//! - [`Middleware`] composition via [`apply`]
//!
//! # Usage
//!
//! ```
//! use fsev_router::{handler_fn, ServeMux};
//! use std::sync::Arc;
//!
//! let mux = ServeMux::new();
//! mux.register(
//!     "/srv/incoming/**/*.md",
//!     Arc::new(handler_fn(|ctx| async move {
//!         println!("markdown changed: {}", ctx.request().path);
//!         Ok(())
//!     })),
//! )?;
//! # Ok::<(), fsev_core::ServeError>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod handler;
pub mod middleware;
pub mod mux;

pub use handler::{handler_fn, Handler, HandlerFn, RequestContext};
pub use middleware::{apply, LoggingMiddleware, Middleware};
pub use mux::{default_mux, handle, handle_fn, ServeMux};
