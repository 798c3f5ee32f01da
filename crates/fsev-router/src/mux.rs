//! The routing multiplexer.
//!
//! [`ServeMux`] keeps an ordered table of `(pattern, handler)` routes and
//! serves each request with the first route whose glob matches the request
//! path. Compiled globs are not hashable across implementations, so the
//! table is a sequence rather than a map; registration order is the match
//! precedence, there is no wildcard ranking.
//!
//! A process-wide default mux exists so that [`handle`] and [`handle_fn`]
//! compose without explicit wiring; servers started without a handler fall
//! back to it.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use async_trait::async_trait;
use globset::{Glob, GlobMatcher};

use fsev_core::path::expand_user;
use fsev_core::{Request, ServeError};

use crate::handler::{handler_fn, Handler, RequestContext};

/// One registered route.
///
/// Keeps the compiled glob for structural duplicate detection alongside the
/// matcher that answers lookups.
struct Route {
    pattern: Glob,
    matcher: GlobMatcher,
    handler: Arc<dyn Handler>,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.glob())
            .finish_non_exhaustive()
    }
}

/// A first-match routing multiplexer over request paths.
///
/// Routes are consulted in registration order and the first glob that
/// matches the request path wins. The mux itself implements [`Handler`],
/// so muxes can be nested and wrapped in middleware.
///
/// # Examples
///
/// ```
/// use fsev_router::{handler_fn, ServeMux};
/// use std::sync::Arc;
///
/// let mux = ServeMux::new();
/// mux.register(
///     "/srv/media/**/*.mp4",
///     Arc::new(handler_fn(|_ctx| async { Ok(()) })),
/// )?;
/// assert_eq!(mux.len(), 1);
/// # Ok::<(), fsev_core::ServeError>(())
/// ```
#[derive(Debug, Default)]
pub struct ServeMux {
    routes: RwLock<Vec<Route>>,
}

impl ServeMux {
    /// Creates an empty multiplexer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under the glob `pattern`.
    ///
    /// The pattern accepts a leading `~`, expanded against the user's home
    /// directory before compilation.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::RegisteringPath`] when the pattern is empty,
    /// stays relative after tilde expansion, fails to compile, or is a
    /// structural duplicate of an already-registered pattern.
    pub fn register(&self, pattern: &str, handler: Arc<dyn Handler>) -> Result<(), ServeError> {
        if pattern.is_empty() {
            return Err(ServeError::registering_path(pattern, "pattern is empty"));
        }

        let expanded = expand_user(pattern)
            .map_err(|e| ServeError::registering_path(pattern, e.to_string()))?;
        if !expanded.is_absolute() {
            return Err(ServeError::registering_path(
                pattern,
                "pattern is not absolute",
            ));
        }

        let glob = Glob::new(expanded.as_str())
            .map_err(|e| ServeError::registering_path(pattern, e.to_string()))?;

        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        if routes.iter().any(|route| route.pattern == glob) {
            return Err(ServeError::registering_path(
                pattern,
                "pattern is already registered",
            ));
        }

        routes.push(Route {
            matcher: glob.compile_matcher(),
            pattern: glob,
            handler,
        });
        Ok(())
    }

    /// Returns the handler of the first route matching the request path.
    #[must_use]
    pub fn find_handler(&self, request: &Request) -> Option<Arc<dyn Handler>> {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        routes
            .iter()
            .find(|route| route.matcher.is_match(request.path.as_std_path()))
            .map(|route| Arc::clone(&route.handler))
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Handler for ServeMux {
    /// Looks up and invokes the first matching route.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::HandlingRequest`] when no route matches.
    async fn serve(&self, ctx: &RequestContext) -> Result<(), ServeError> {
        let Some(handler) = self.find_handler(ctx.request()) else {
            return Err(ServeError::handling_request(
                ctx.request().path.clone(),
                "no handler registered for path",
            ));
        };
        handler.serve(ctx).await
    }
}

static DEFAULT_MUX: OnceLock<Arc<ServeMux>> = OnceLock::new();

/// Returns the process-wide default multiplexer.
///
/// Servers constructed without an explicit handler dispatch through it.
/// Prefer explicit muxes in library code and tests; the default exists so
/// small programs can register routes with [`handle`] and start serving.
#[must_use]
pub fn default_mux() -> Arc<ServeMux> {
    Arc::clone(DEFAULT_MUX.get_or_init(|| Arc::new(ServeMux::new())))
}

/// Registers `handler` on the default multiplexer.
///
/// # Panics
///
/// Panics when registration fails. Route registration happens at program
/// configuration time, so a rejected pattern is a programming error.
pub fn handle(pattern: &str, handler: Arc<dyn Handler>) {
    if let Err(err) = default_mux().register(pattern, handler) {
        panic!("cannot register pattern {pattern:?}: {err}");
    }
}

/// Registers an async function on the default multiplexer.
///
/// # Panics
///
/// Panics when registration fails, like [`handle`].
pub fn handle_fn<F, Fut>(pattern: &str, f: F)
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<(), ServeError>> + Send + 'static,
{
    handle(pattern, Arc::new(handler_fn(f)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use fsev_core::Action;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeHandler {
        calls: AtomicUsize,
    }

    impl FakeHandler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Handler for FakeHandler {
        async fn serve(&self, _ctx: &RequestContext) -> Result<(), ServeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn request(path: &str) -> Request {
        Request::builder(Utf8PathBuf::from(path), Action::CREATE).build()
    }

    #[test]
    fn test_register_stores_route() {
        let mux = ServeMux::new();
        mux.register("/tmp", FakeHandler::new()).unwrap();
        assert_eq!(mux.len(), 1);
        assert!(!mux.is_empty());
    }

    #[test]
    fn test_register_rejects_empty_pattern() {
        let mux = ServeMux::new();
        let err = mux.register("", FakeHandler::new()).unwrap_err();
        assert!(matches!(err, ServeError::RegisteringPath { .. }));
    }

    #[test]
    fn test_register_rejects_relative_pattern() {
        let mux = ServeMux::new();
        let err = mux.register("videos/*.mp4", FakeHandler::new()).unwrap_err();
        assert!(matches!(err, ServeError::RegisteringPath { .. }));
        assert!(err.to_string().contains("not absolute"));
    }

    #[test]
    fn test_register_rejects_malformed_glob() {
        let mux = ServeMux::new();
        let err = mux.register("/tmp/[", FakeHandler::new()).unwrap_err();
        assert!(matches!(err, ServeError::RegisteringPath { .. }));
    }

    #[test]
    fn test_register_rejects_duplicate_pattern() {
        let mux = ServeMux::new();
        mux.register("/tmp", FakeHandler::new()).unwrap();
        let err = mux.register("/tmp", FakeHandler::new()).unwrap_err();
        assert!(matches!(err, ServeError::RegisteringPath { .. }));
        assert_eq!(mux.len(), 1);
    }

    #[test]
    fn test_register_expands_tilde() {
        let mux = ServeMux::new();
        mux.register("~/Downloads/*.mp4", FakeHandler::new())
            .unwrap();
        assert_eq!(mux.len(), 1);
    }

    #[test]
    fn test_find_handler_first_match_wins() {
        let mux = ServeMux::new();
        let mnt_handler = FakeHandler::new();
        let tmp_handler = FakeHandler::new();
        mux.register("/mnt/**", Arc::clone(&mnt_handler) as Arc<dyn Handler>)
            .unwrap();
        mux.register("/tmp/**", Arc::clone(&tmp_handler) as Arc<dyn Handler>)
            .unwrap();
        assert_eq!(mux.len(), 2);

        let found = mux.find_handler(&request("/tmp/Videos")).unwrap();
        assert!(Arc::ptr_eq(
            &found,
            &(Arc::clone(&tmp_handler) as Arc<dyn Handler>)
        ));
    }

    #[test]
    fn test_find_handler_registration_order_precedence() {
        let mux = ServeMux::new();
        let broad = FakeHandler::new();
        let narrow = FakeHandler::new();
        mux.register("/tmp/**", Arc::clone(&broad) as Arc<dyn Handler>)
            .unwrap();
        mux.register("/tmp/**/*.mp4", Arc::clone(&narrow) as Arc<dyn Handler>)
            .unwrap();

        // The broad pattern registered first shadows the narrow one.
        let found = mux.find_handler(&request("/tmp/clip.mp4")).unwrap();
        assert!(Arc::ptr_eq(
            &found,
            &(Arc::clone(&broad) as Arc<dyn Handler>)
        ));
    }

    #[test]
    fn test_find_handler_no_match() {
        let mux = ServeMux::new();
        mux.register("/mnt/**", FakeHandler::new()).unwrap();
        assert!(mux.find_handler(&request("/tmp/Videos")).is_none());
    }

    #[tokio::test]
    async fn test_serve_dispatches_to_matching_handler() {
        let mux = ServeMux::new();
        let handler = FakeHandler::new();
        mux.register("/tmp/**", Arc::clone(&handler) as Arc<dyn Handler>)
            .unwrap();

        let ctx = RequestContext::new(request("/tmp/a.txt"));
        mux.serve(&ctx).await.unwrap();
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_serve_without_match_fails() {
        let mux = ServeMux::new();
        let ctx = RequestContext::new(request("/tmp/a.txt"));
        let err = mux.serve(&ctx).await.unwrap_err();
        assert!(matches!(err, ServeError::HandlingRequest { .. }));
    }

    #[tokio::test]
    async fn test_nested_mux_composition() {
        let inner = Arc::new(ServeMux::new());
        let handler = FakeHandler::new();
        inner
            .register("/tmp/**", Arc::clone(&handler) as Arc<dyn Handler>)
            .unwrap();

        let outer = ServeMux::new();
        outer.register("/**", inner as Arc<dyn Handler>).unwrap();

        let ctx = RequestContext::new(request("/tmp/nested.txt"));
        outer.serve(&ctx).await.unwrap();
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }
}
