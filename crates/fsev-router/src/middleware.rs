//! Middleware chaining for handlers.
//!
//! A middleware wraps a handler and produces another handler with the same
//! contract, layering cross-cutting concerns around the inner invocation.
//! [`apply`] composes a chain: the leftmost middleware ends up innermost,
//! closest to the handler, so the rightmost one observes the invocation
//! first.

use std::sync::Arc;

use async_trait::async_trait;

use fsev_core::ServeError;

use crate::handler::{Handler, RequestContext};

/// A handler decorator.
///
/// # Examples
///
/// ```
/// use fsev_router::{apply, handler_fn, Handler, LoggingMiddleware};
/// use std::sync::Arc;
///
/// let handler: Arc<dyn Handler> = Arc::new(handler_fn(|_ctx| async { Ok(()) }));
/// let wrapped = apply(handler, &[&LoggingMiddleware]);
/// # let _ = wrapped;
/// ```
pub trait Middleware: Send + Sync {
    /// Wraps `inner`, returning the decorated handler.
    fn wrap(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler>;
}

impl<F> Middleware for F
where
    F: Fn(Arc<dyn Handler>) -> Arc<dyn Handler> + Send + Sync,
{
    fn wrap(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        self(inner)
    }
}

/// Composes `middleware` around `handler`.
///
/// Application order follows the argument order: the first middleware wraps
/// the handler directly and each following one wraps the result. An empty
/// chain returns the handler unchanged.
#[must_use]
pub fn apply(handler: Arc<dyn Handler>, middleware: &[&dyn Middleware]) -> Arc<dyn Handler> {
    middleware
        .iter()
        .fold(handler, |inner, layer| layer.wrap(inner))
}

/// Middleware that logs every request at info level before delegating.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn wrap(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(LoggedHandler { inner })
    }
}

struct LoggedHandler {
    inner: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for LoggedHandler {
    async fn serve(&self, ctx: &RequestContext) -> Result<(), ServeError> {
        let request = ctx.request();
        tracing::info!(
            path = %request.path,
            action = %request.action,
            size = request.size,
            is_dir = request.is_dir,
            mimetype = %request.mimetype,
            hostname = %request.hostname,
            "serving request"
        );
        self.inner.serve(ctx).await
    }
}
