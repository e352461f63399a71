//! URL resolution, relativisation and file-URL conversion.
//!
//! All urls handled by the graph are absolute strings (`file:///...`,
//! `http://...`, `data:...`). These helpers are pure and never touch the
//! filesystem except for `fs_path_to_file_url`, which absolutises relative
//! paths against the current directory.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use regex::Regex;
use url::Url;

/// Characters escaped when turning a filesystem path into a file url.
///
/// Mirrors what `encodeURI` leaves alone, plus `#` and `?` which would
/// otherwise start a fragment or query.
const PATH_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b']')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

static SCHEME_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*:").expect("valid regex"));

static SHARED_ROOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(file://|[^:]+://[^/]+/)").expect("valid regex"));

// ============================================================================
// Resolution
// ============================================================================

/// Whether `url` starts with an explicit `scheme:`.
#[inline]
pub fn has_scheme(url: &str) -> bool {
    SCHEME_PREFIX.is_match(url)
}

/// Resolve `reference` against `base`.
///
/// A reference carrying its own scheme is returned verbatim (no
/// normalisation), as is any reference the base cannot be joined with.
pub fn resolve_url(base: &str, reference: &str) -> String {
    if has_scheme(reference) {
        return reference.to_owned();
    }
    Url::parse(base)
        .and_then(|base| base.join(reference))
        .map(String::from)
        .unwrap_or_else(|_| reference.to_owned())
}

/// Compute the shortest relative url leading from `from` to `to`.
///
/// Both urls must share a `file://` or `scheme://authority/` prefix;
/// otherwise `to` is returned unchanged.
///
/// ```ignore
/// build_relative_url("file:///a/b/c.html", "file:///a/d/e.css") // "../d/e.css"
/// ```
pub fn build_relative_url(from: &str, to: &str) -> String {
    let mut common = from
        .bytes()
        .zip(to.bytes())
        .take_while(|(a, b)| a == b)
        .count();
    while !from.is_char_boundary(common) {
        common -= 1;
    }

    let Some(root) = SHARED_ROOT.find(&from[..common]) else {
        return to.to_owned();
    };
    let root_len = root.end();

    // Directory segments of `from` (filename dropped) and all segments of `to`.
    let from_rest = from[root_len..].trim_start_matches('/');
    let from_segments: Vec<&str> = match from_rest.rfind('/') {
        Some(idx) => from_rest[..idx].split('/').collect(),
        None => Vec::new(),
    };
    let to_segments: Vec<&str> = to[root_len..].trim_start_matches('/').split('/').collect();

    let shared = from_segments
        .iter()
        .zip(&to_segments)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = "../".repeat(from_segments.len() - shared);
    relative.push_str(&to_segments[shared..].join("/"));
    relative
}

/// Whether two urls share scheme, host and port.
pub fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => {
            a.scheme() == b.scheme()
                && a.host_str() == b.host_str()
                && a.port_or_known_default() == b.port_or_known_default()
        }
        _ => false,
    }
}

/// Append `/` unless already present.
pub fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_owned()
    } else {
        format!("{url}/")
    }
}

/// Drop `?query` and `#fragment`.
#[inline]
pub fn strip_query_fragment(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

// ============================================================================
// File urls
// ============================================================================

/// Convert a `file:` url into a filesystem path.
///
/// Query and fragment are stripped first. Returns `None` for other schemes.
pub fn file_url_to_fs_path(file_url: &str) -> Option<PathBuf> {
    let url = strip_query_fragment(file_url);
    let rest = url.strip_prefix("file://")?;
    #[cfg(windows)]
    let rest = rest.strip_prefix('/').unwrap_or(rest);

    let decoded = percent_decode_str(rest).decode_utf8_lossy().into_owned();
    #[cfg(windows)]
    let decoded = decoded.replace('/', "\\");

    Some(PathBuf::from(decoded))
}

/// Convert a filesystem path into a `file:` url.
///
/// Relative paths are anchored at the current directory.
pub fn fs_path_to_file_url(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let raw = absolute.to_string_lossy();

    #[cfg(windows)]
    let raw = format!("/{}", raw.replace('\\', "/"));

    format!("file://{}", utf8_percent_encode(&raw, PATH_SET))
}

/// Like [`fs_path_to_file_url`] but guarantees a trailing slash.
pub fn fs_dir_to_file_url(dir: &Path) -> String {
    ensure_trailing_slash(&fs_path_to_file_url(dir))
}

/// Last path segment of `url`, without query and fragment.
pub fn file_name(url: &str) -> &str {
    let path = strip_query_fragment(url);
    path.rsplit('/').next().unwrap_or(path)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_relative_url_sibling_dir() {
        assert_eq!(
            build_relative_url("file:///a/b/c.html", "file:///a/d/e.css"),
            "../d/e.css"
        );
    }

    #[test]
    fn test_build_relative_url_cross_origin() {
        assert_eq!(
            build_relative_url("http://x/a/", "http://y/a/b"),
            "http://y/a/b"
        );
    }

    #[test]
    fn test_build_relative_url_same_dir() {
        assert_eq!(
            build_relative_url("file:///site/index.html", "file:///site/style.css"),
            "style.css"
        );
        assert_eq!(
            build_relative_url("http://example.com/a/b.html", "http://example.com/a/c/d.png"),
            "c/d.png"
        );
    }

    #[test]
    fn test_build_relative_url_deeper_from() {
        assert_eq!(
            build_relative_url("file:///a/b/c/d.html", "file:///a/x.css"),
            "../../x.css"
        );
    }

    #[test]
    fn test_build_relative_url_root_level() {
        assert_eq!(
            build_relative_url("http://example.com/index.html", "http://example.com/css/a.css"),
            "css/a.css"
        );
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url("file:///a/b/c.html", "../d/e.css"),
            "file:///a/d/e.css"
        );
        assert_eq!(
            resolve_url("http://example.com/a/", "/root.js"),
            "http://example.com/root.js"
        );
    }

    #[test]
    fn test_resolve_url_keeps_scheme_reference_verbatim() {
        assert_eq!(
            resolve_url("file:///a/", "HTTP://Example.COM/x"),
            "HTTP://Example.COM/x"
        );
        assert_eq!(
            resolve_url("file:///a/", "data:text/plain,hi"),
            "data:text/plain,hi"
        );
    }

    #[test]
    fn test_same_origin() {
        assert!(same_origin("file:///a/b", "file:///c"));
        assert!(same_origin("http://x.com/a", "http://x.com:80/b"));
        assert!(!same_origin("http://x.com/a", "https://x.com/a"));
        assert!(!same_origin("file:///a", "http://x.com/"));
    }

    #[test]
    fn test_trailing_slash_and_file_name() {
        assert_eq!(ensure_trailing_slash("file:///a"), "file:///a/");
        assert_eq!(ensure_trailing_slash("file:///a/"), "file:///a/");
        assert_eq!(file_name("file:///a/b.css?x=1#y"), "b.css");
    }

    #[cfg(unix)]
    #[test]
    fn test_file_url_round_trip() {
        let path = Path::new("/tmp/some dir/a#b%c.html");
        let url = fs_path_to_file_url(path);
        assert_eq!(url, "file:///tmp/some%20dir/a%23b%25c.html");
        assert_eq!(file_url_to_fs_path(&url).unwrap(), path);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_url_strips_query_and_fragment() {
        assert_eq!(
            file_url_to_fs_path("file:///tmp/a.css?v=1#top").unwrap(),
            PathBuf::from("/tmp/a.css")
        );
        assert!(file_url_to_fs_path("http://x/a.css").is_none());
        assert_eq!(fs_dir_to_file_url(Path::new("/tmp")), "file:///tmp/");
    }
}
