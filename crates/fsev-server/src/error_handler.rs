//! Delivery of runtime failures.
//!
//! Everything the serve loop cannot recover from locally flows through one
//! [`ErrorHandler`]: backend errors, request-construction failures, and
//! handler errors. Deployments decide what to do with them; the default
//! logs through `tracing`.

use fsev_core::ServeError;

/// Consumes the failures published on the server's error stream.
///
/// Implementations must not block for long: the serve loop delivers errors
/// inline between dispatches.
pub trait ErrorHandler: Send + Sync {
    /// Handles one failure.
    fn handle_error(&self, error: &ServeError);
}

impl<F> ErrorHandler for F
where
    F: Fn(&ServeError) + Send + Sync,
{
    fn handle_error(&self, error: &ServeError) {
        self(error);
    }
}

/// The default error handler: structured logging by severity.
///
/// Recoverable failures (a handler rejecting a request, a stat racing a
/// deletion) log as warnings; anything fatal logs as an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingErrorHandler;

impl ErrorHandler for LoggingErrorHandler {
    fn handle_error(&self, error: &ServeError) {
        match error {
            ServeError::WatchingPath { path, source } => {
                tracing::error!(path = %path, source = %source, "notification backend error");
            }
            _ if error.is_recoverable() => {
                tracing::warn!(error = %error, "request failed");
            }
            _ => {
                tracing::error!(error = %error, "server error");
            }
        }
    }
}
