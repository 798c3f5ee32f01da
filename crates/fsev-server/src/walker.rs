//! Discovery of the directory set to subscribe.
//!
//! Subscriptions are directory-level: the walker enumerates every directory
//! under the root in depth-first order, drops the ones matching the ignore
//! list, and clamps the tree at a configurable depth. Files are never
//! emitted.

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;

use fsev_core::ServeError;

use crate::ignore::IgnoreFilter;

/// Walks a root and collects the directories to watch.
///
/// # Design
///
/// The walk happens once at startup and its output is the subscription
/// list, so the walker favors determinism over parallelism: entries are
/// visited single-threaded in lexicographic depth-first order, parents
/// before children.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use fsev_server::{DirectoryWalker, IgnoreFilter};
///
/// let ignore = IgnoreFilter::new(vec!["**/node_modules/**".to_owned()]);
/// let walker = DirectoryWalker::new(Utf8Path::new("/srv/media"), &ignore).with_max_depth(Some(2));
/// let directories = walker.collect_dirs()?;
/// # let _ = directories;
/// # Ok::<(), fsev_core::ServeError>(())
/// ```
#[derive(Debug)]
pub struct DirectoryWalker<'a> {
    root: &'a Utf8Path,
    ignore: &'a IgnoreFilter,
    max_depth: Option<usize>,
}

impl<'a> DirectoryWalker<'a> {
    /// Creates a walker for `root` with the given ignore list.
    #[must_use]
    pub const fn new(root: &'a Utf8Path, ignore: &'a IgnoreFilter) -> Self {
        Self {
            root,
            ignore,
            max_depth: None,
        }
    }

    /// Clamps the walk at `max_depth` parent-steps below the root.
    ///
    /// The root itself sits at depth `0`. `None` leaves the walk unbounded.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Collects the surviving directories in traversal order.
    ///
    /// # Errors
    ///
    /// Any traversal I/O error is fatal to the walk and returned as
    /// [`ServeError::ListeningDirectory`]; so is a malformed ignore glob.
    /// Non-UTF-8 entries fail with [`ServeError::NonUtf8Path`].
    pub fn collect_dirs(&self) -> Result<Vec<Utf8PathBuf>, ServeError> {
        let mut directories = Vec::new();

        let walker = WalkBuilder::new(self.root.as_std_path())
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry =
                entry.map_err(|e| ServeError::listening_directory(self.root.to_owned(), e))?;

            if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                continue;
            }

            let path = Utf8Path::from_path(entry.path())
                .ok_or_else(|| ServeError::NonUtf8Path(entry.path().to_owned()))?;

            if self.ignore.matches(path)? {
                continue;
            }

            if let Some(max_depth) = self.max_depth {
                match compute_depth(path, self.root) {
                    Some(depth) if depth <= max_depth => {}
                    _ => continue,
                }
            }

            directories.push(path.to_owned());
        }

        Ok(directories)
    }
}

/// Counts the parent-steps from `path` up to `root`.
///
/// Returns `Some(0)` when the two are equal and `None` when `path` is not
/// under `root`.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use fsev_server::walker::compute_depth;
///
/// assert_eq!(compute_depth(Utf8Path::new("/a/b"), Utf8Path::new("/a")), Some(1));
/// assert_eq!(compute_depth(Utf8Path::new("/b/c"), Utf8Path::new("/a")), None);
/// ```
#[must_use]
pub fn compute_depth(path: &Utf8Path, root: &Utf8Path) -> Option<usize> {
    let mut depth = 0;
    let mut current = path;

    loop {
        if current == root {
            return Some(depth);
        }
        match current.parent() {
            Some(parent) => {
                current = parent;
                depth += 1;
            }
            None => return None,
        }
    }
}
