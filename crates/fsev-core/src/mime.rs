//! Media-type descriptors and content-based detection.
//!
//! Requests carry a [`MimeDescriptor`], a normalized pair of media type and
//! canonical file extension. Detection is content-first: the file header is
//! sniffed for magic numbers, and the path extension is consulted as a
//! fallback. A `text/plain` sniff on a path that carries an extension is
//! replaced by the extension mapping, because most structured text formats
//! (markdown, JSON, source code) have no magic numbers and would otherwise
//! all collapse into `text/plain`.

use std::fs::File;
use std::io::Read;

use camino::Utf8Path;

/// How many header bytes are read for magic-number sniffing.
const SNIFF_LEN: usize = 8192;

/// A normalized media-type descriptor.
///
/// Holds the detected media type together with its canonical extension
/// (leading dot included). The empty descriptor marks directories and
/// requests for entries that no longer exist.
///
/// # Equality
///
/// [`MimeDescriptor::is`] compares media types by their essence only:
/// parameters such as `; charset=utf-8` are stripped before comparison.
/// The empty descriptor compares unequal to everything, including itself.
///
/// # Examples
///
/// ```
/// use fsev_core::MimeDescriptor;
///
/// let descriptor = MimeDescriptor::new("text/plain; charset=utf-8", ".txt");
/// assert!(descriptor.is("text/plain"));
/// assert!(!descriptor.is("text/html"));
/// assert_eq!(descriptor.extension(), ".txt");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeDescriptor {
    mime: String,
    extension: String,
}

impl MimeDescriptor {
    /// Creates a descriptor from a media type and an extension.
    ///
    /// The extension is expected with its leading dot (`".md"`).
    #[inline]
    pub fn new(mime: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            mime: mime.into(),
            extension: extension.into(),
        }
    }

    /// The empty descriptor.
    ///
    /// Used for directories and for requests whose entry is already gone.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            mime: String::new(),
            extension: String::new(),
        }
    }

    /// Returns `true` if this descriptor carries no media type.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mime.is_empty()
    }

    /// Returns the media type, parameters included, as detected.
    #[inline]
    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Returns the canonical extension with its leading dot, or `""`.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Compares this descriptor against a media-type string.
    ///
    /// Both sides are parsed as media types and compared by essence, so
    /// parameters are ignored. Malformed or empty input never matches.
    ///
    /// # Examples
    ///
    /// ```
    /// use fsev_core::MimeDescriptor;
    ///
    /// let json = MimeDescriptor::new("application/json", ".json");
    /// assert!(json.is("application/json; charset=utf-8"));
    /// assert!(!MimeDescriptor::empty().is("application/json"));
    /// ```
    #[must_use]
    pub fn is(&self, expected: &str) -> bool {
        match (essence(&self.mime), essence(expected)) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => false,
        }
    }
}

impl std::fmt::Display for MimeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.mime)
    }
}

/// Parses a media type and returns its lowercased essence, parameters stripped.
fn essence(raw: &str) -> Option<String> {
    raw.trim()
        .parse::<mime::Mime>()
        .ok()
        .map(|m| m.essence_str().to_ascii_lowercase())
}

/// Detects the media type of the file at `path`.
///
/// Detection order:
///
/// 1. Magic-number sniffing over the first [`SNIFF_LEN`] bytes. A header
///    with no known signature that decodes as UTF-8 sniffs as `text/plain`.
/// 2. Extension mapping from the path suffix when sniffing yields nothing.
/// 3. A `text/plain` sniff on a path with a non-empty extension is replaced
///    by the extension mapping.
///
/// Returns the empty descriptor when neither source knows the file.
///
/// # Errors
///
/// Returns an I/O error if the file header cannot be read.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use fsev_core::mime::detect_path;
///
/// let descriptor = detect_path(Utf8Path::new("/tmp/notes.md"))?;
/// assert_eq!(descriptor.extension(), ".md");
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn detect_path(path: &Utf8Path) -> Result<MimeDescriptor, std::io::Error> {
    let header = read_header(path)?;
    Ok(detect(path, &header))
}

/// Detection over an already-read header, split out for testability.
fn detect(path: &Utf8Path, header: &[u8]) -> MimeDescriptor {
    let from_extension = extension_descriptor(path);

    let sniffed = sniff(header, path);
    let detected = match sniffed {
        Some(descriptor) => descriptor,
        None => return from_extension.unwrap_or_else(MimeDescriptor::empty),
    };

    // Structured text formats sniff as plain text; the extension knows more.
    if detected.is("text/plain") && has_extension(path) {
        if let Some(better) = from_extension {
            return better;
        }
    }

    detected
}

/// Magic-number sniffing with a plain-text fallback for UTF-8 headers.
fn sniff(header: &[u8], path: &Utf8Path) -> Option<MimeDescriptor> {
    if let Some(kind) = infer::get(header) {
        return Some(MimeDescriptor::new(
            kind.mime_type(),
            format!(".{}", kind.extension()),
        ));
    }

    if is_utf8_text(header) {
        let extension = path
            .extension()
            .map_or_else(|| ".txt".to_owned(), |ext| format!(".{ext}"));
        return Some(MimeDescriptor::new("text/plain", extension));
    }

    None
}

/// Maps the path suffix through the shared extension database.
fn extension_descriptor(path: &Utf8Path) -> Option<MimeDescriptor> {
    let extension = path.extension()?;
    let guessed = mime_guess::from_path(path.as_std_path()).first()?;
    Some(MimeDescriptor::new(
        guessed.essence_str(),
        format!(".{extension}"),
    ))
}

fn has_extension(path: &Utf8Path) -> bool {
    path.extension().is_some_and(|ext| !ext.is_empty())
}

/// Returns `true` if the header decodes as UTF-8.
///
/// A decode error at the very end of the buffer means the read window split
/// a multi-byte sequence, which still counts as text.
fn is_utf8_text(header: &[u8]) -> bool {
    match std::str::from_utf8(header) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

fn read_header(path: &Utf8Path) -> Result<Vec<u8>, std::io::Error> {
    let file = File::open(path.as_std_path())?;
    let mut header = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut header)?;
    Ok(header)
}
