//! Glob-based path exclusion for the watch set.
//!
//! The ignore list comes from configuration as plain glob strings and is
//! compiled once, on first use. `.git` directories are always excluded in
//! addition to the user-supplied patterns.

use std::sync::OnceLock;

use camino::Utf8Path;
use globset::{Glob, GlobMatcher};
use smallvec::SmallVec;

use fsev_core::ServeError;

/// Globs appended to every ignore list so `.git` trees are never watched.
const GIT_IGNORE_GLOBS: &[&str] = &["**/.git", "**/.git/**"];

type CompiledGlobs = Result<SmallVec<[GlobMatcher; 8]>, globset::Error>;

/// A compiled, memoized ignore list.
///
/// Patterns are tested in order and the first match wins. Compilation is
/// deferred to the first [`matches`](IgnoreFilter::matches) call and cached
/// for the lifetime of the filter, so repeated calls never recompile.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use fsev_server::IgnoreFilter;
///
/// let filter = IgnoreFilter::new(vec!["**/node_modules/**".to_owned()]);
/// assert!(filter.matches(Utf8Path::new("/srv/app/node_modules/x")).unwrap());
/// assert!(filter.matches(Utf8Path::new("/srv/app/.git")).unwrap());
/// assert!(!filter.matches(Utf8Path::new("/srv/app/src")).unwrap());
/// ```
#[derive(Debug, Default)]
pub struct IgnoreFilter {
    patterns: Vec<String>,
    compiled: OnceLock<CompiledGlobs>,
}

impl IgnoreFilter {
    /// Creates a filter over the user-supplied patterns plus the implicit
    /// `.git` exclusions.
    #[must_use]
    pub fn new(user_patterns: Vec<String>) -> Self {
        let mut patterns = user_patterns;
        patterns.extend(GIT_IGNORE_GLOBS.iter().map(|s| (*s).to_owned()));
        Self {
            patterns,
            compiled: OnceLock::new(),
        }
    }

    /// Returns `true` if `path` matches any ignore pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::ListeningDirectory`] if one of the configured
    /// patterns does not compile. The failure is sticky: it is reported for
    /// every subsequent call without recompiling.
    pub fn matches(&self, path: &Utf8Path) -> Result<bool, ServeError> {
        let compiled = self
            .compiled
            .get_or_init(|| {
                self.patterns
                    .iter()
                    .map(|pattern| Glob::new(pattern).map(|glob| glob.compile_matcher()))
                    .collect()
            })
            .as_ref()
            .map_err(|e| ServeError::listening_directory(path, e.clone()))?;

        Ok(compiled
            .iter()
            .any(|matcher| matcher.is_match(path.as_std_path())))
    }

    /// Returns the raw patterns, implicit entries included.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
