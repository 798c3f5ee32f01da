//! Directory watching and event dispatch for the fsev event server.
//!
//! This crate turns OS file-change notifications into routed handler
//! invocations:
//!
//! - [`DirectoryWalker`] enumerates the directories to subscribe, honoring
//!   an [`IgnoreFilter`] and a depth clamp
//! - [`Notifier`] bridges the native notification backend into bounded
//!   async streams
//! - [`Server`] owns the serve loop: build a request per event, dispatch it
//!   on its own task, funnel failures to the [`ErrorHandler`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Backend Thread (notify)                   │
//! │   raw events ──► Action mapping ──► blocking_send           │
//! └───────────────────────────│─────────────────────────────────┘
//!                             ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Serve Loop (tokio)                       │
//! │   select! ──► suppress write echoes ──► build Request       │
//! │        │                                    │               │
//! │        │ errors ◄── handler workers ◄── spawn per event     │
//! │        ▼                                                    │
//! │   ErrorHandler                                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use fsev_router::handle_fn;
//! use fsev_server::listen_and_serve;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fsev_core::ServeError> {
//!     handle_fn("~/Downloads/**/*.mp4", |ctx| async move {
//!         println!("new clip: {}", ctx.request().path);
//!         Ok(())
//!     });
//!
//!     listen_and_serve("~/Downloads", None).await
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod builder;
pub mod error_handler;
pub mod ignore;
pub mod notifier;
pub mod server;
pub mod walker;

pub use error_handler::{ErrorHandler, LoggingErrorHandler};
pub use ignore::IgnoreFilter;
pub use notifier::{Notifier, RawEvent};
pub use server::{listen_and_serve, Server, ServerBuilder};
pub use walker::{compute_depth, DirectoryWalker};
