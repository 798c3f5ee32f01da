//! The handler contract and the request context.
//!
//! A handler exposes one operation: serve a [`RequestContext`] and report
//! success or failure. Plain async functions adapt through [`handler_fn`],
//! and the multiplexer itself implements [`Handler`], so muxes nest inside
//! muxes and middleware wraps either.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use fsev_core::{Request, ServeError};

/// The per-invocation context handed to a handler.
///
/// Carries the [`Request`] as a typed field. The context is cheap to clone;
/// all clones share the same immutable request.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use fsev_core::{Action, Request};
/// use fsev_router::RequestContext;
///
/// let request = Request::builder(Utf8PathBuf::from("/tmp/a.txt"), Action::CREATE).build();
/// let ctx = RequestContext::new(request);
/// assert_eq!(ctx.request().path.as_str(), "/tmp/a.txt");
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request: Arc<Request>,
}

impl RequestContext {
    /// Creates a context owning the given request.
    #[must_use]
    pub fn new(request: Request) -> Self {
        Self {
            request: Arc::new(request),
        }
    }

    /// Creates a context from an already-shared request.
    #[must_use]
    pub const fn from_arc(request: Arc<Request>) -> Self {
        Self { request }
    }

    /// Returns the request carried by this context.
    #[inline]
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns a shared handle to the request.
    #[inline]
    #[must_use]
    pub fn request_arc(&self) -> Arc<Request> {
        Arc::clone(&self.request)
    }
}

/// A filesystem-event handler.
///
/// Implementations must be shareable across dispatch workers; every event
/// spawns an independent invocation and invocations for different events
/// may run concurrently.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Serves one request.
    ///
    /// # Errors
    ///
    /// Any error returned here is published to the server's error stream
    /// and delivered to the configured error handler.
    async fn serve(&self, ctx: &RequestContext) -> Result<(), ServeError>;
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn serve(&self, ctx: &RequestContext) -> Result<(), ServeError> {
        (**self).serve(ctx).await
    }
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Box<H> {
    async fn serve(&self, ctx: &RequestContext) -> Result<(), ServeError> {
        (**self).serve(ctx).await
    }
}

/// Adapts a plain async function into a [`Handler`].
///
/// Constructed by [`handler_fn`].
pub struct HandlerFn<F> {
    f: F,
}

/// Wraps an async function as a [`Handler`].
///
/// # Examples
///
/// ```
/// use fsev_router::{handler_fn, RequestContext};
///
/// let echo = handler_fn(|ctx: RequestContext| async move {
///     println!("changed: {}", ctx.request().path);
///     Ok(())
/// });
/// # let _ = echo;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ServeError>> + Send + 'static,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ServeError>> + Send + 'static,
{
    async fn serve(&self, ctx: &RequestContext) -> Result<(), ServeError> {
        (self.f)(ctx.clone()).await
    }
}
