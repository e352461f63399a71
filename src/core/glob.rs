//! Glob patterns and file-url matchers.
//!
//! Patterns use `glob::Pattern` syntax, matched against filesystem paths:
//!
//! | Glob     | Meaning                               |
//! |----------|---------------------------------------|
//! | `**/`    | zero or more directories              |
//! | `*`      | anything within one path segment      |
//! | `?`      | one character within a path segment   |
//! | `[a-z]`  | character class (`[!x]` negates)      |

use std::path::Path;

use glob::{MatchOptions, Pattern};

use super::url::file_url_to_fs_path;
use crate::error::{GraphError, Result};

/// `*` and `?` never cross a `/`.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct Glob(Pattern);

impl Glob {
    pub fn new(pattern: &str) -> Result<Self> {
        Pattern::new(pattern)
            .map(Self)
            .map_err(|e| GraphError::Pattern(format!("{pattern}: {e}")))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    #[inline]
    pub fn is_match(&self, candidate: &str) -> bool {
        self.0.matches_with(candidate, MATCH_OPTIONS)
    }
}

const WILDCARDS: [char; 3] = ['*', '?', '['];

/// Whether `pattern` contains any glob metacharacter.
pub fn has_wildcards(pattern: &str) -> bool {
    pattern.contains(WILDCARDS)
}

/// Longest directory prefix of `pattern` free of wildcards.
///
/// `src/**/*.css` -> `src/`, `*.css` -> ``
pub fn literal_prefix(pattern: &str) -> &str {
    let first_wild = pattern.find(WILDCARDS).unwrap_or(pattern.len());
    match pattern[..first_wild].rfind('/') {
        Some(idx) => &pattern[..=idx],
        None => "",
    }
}

/// Matches file urls against one or more glob patterns.
///
/// Relative patterns are anchored at the current directory. Urls with a
/// scheme other than `file:` never match.
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    globs: Vec<Glob>,
}

impl UrlMatcher {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let globs = patterns
            .into_iter()
            .map(|p| Glob::new(&anchor(p.as_ref())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { globs })
    }

    pub fn is_empty(&self) -> bool {
        self.globs.is_empty()
    }

    pub fn matches(&self, url: &str) -> bool {
        let Some(path) = file_url_to_fs_path(url) else {
            return false;
        };
        let path = path.to_string_lossy();
        self.globs.iter().any(|glob| glob.is_match(&path))
    }
}

/// Turn a possibly relative pattern into an absolute filesystem pattern.
fn anchor(pattern: &str) -> String {
    if let Some(path) = file_url_to_fs_path(pattern) {
        return path.to_string_lossy().into_owned();
    }
    if Path::new(pattern).is_absolute() {
        return pattern.to_owned();
    }
    let cwd = std::env::current_dir().unwrap_or_default();
    cwd.join(pattern).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_star_stays_in_segment() {
        let glob = Glob::new("/site/*.css").unwrap();
        assert!(glob.is_match("/site/a.css"));
        assert!(!glob.is_match("/site/sub/a.css"));
    }

    #[test]
    fn test_glob_double_star() {
        let glob = Glob::new("/site/**/*.html").unwrap();
        assert!(glob.is_match("/site/index.html"));
        assert!(glob.is_match("/site/a/b/c.html"));
        assert!(!glob.is_match("/other/index.html"));
    }

    #[test]
    fn test_glob_class() {
        let glob = Glob::new("/x/[!a]?.css").unwrap();
        assert!(glob.is_match("/x/bc.css"));
        assert!(!glob.is_match("/x/ac.css"));
        assert!(!glob.is_match("/x/b/.css"));
        assert_eq!(glob.as_str(), "/x/[!a]?.css");
    }

    #[test]
    fn test_glob_literals() {
        let glob = Glob::new("/a+b/(c).css").unwrap();
        assert!(glob.is_match("/a+b/(c).css"));
        assert!(!glob.is_match("/aab/(c).css"));
    }

    #[test]
    fn test_glob_invalid() {
        assert!(matches!(Glob::new("/a/[bc"), Err(GraphError::Pattern(_))));
        assert!(matches!(Glob::new("/a/b**/c"), Err(GraphError::Pattern(_))));
    }

    #[test]
    fn test_literal_prefix() {
        assert_eq!(literal_prefix("src/**/*.css"), "src/");
        assert_eq!(literal_prefix("*.css"), "");
        assert_eq!(literal_prefix("/a/b/c.css"), "/a/b/");
        assert!(has_wildcards("a/*.css"));
        assert!(!has_wildcards("a/b.css"));
    }

    #[cfg(unix)]
    #[test]
    fn test_url_matcher() {
        let matcher = UrlMatcher::new(["/site/**/*.png", "/site/*.gif"]).unwrap();
        assert!(matcher.matches("file:///site/img/a.png"));
        assert!(matcher.matches("file:///site/a.gif?v=2"));
        assert!(!matcher.matches("file:///site/img/a.gif"));
        assert!(!matcher.matches("http://site/a.gif"));
    }

    #[cfg(unix)]
    #[test]
    fn test_url_matcher_relative_pattern_uses_cwd() {
        use crate::core::url::fs_path_to_file_url;

        let cwd = std::env::current_dir().unwrap();
        let matcher = UrlMatcher::new(["assets/*.css"]).unwrap();
        let url = fs_path_to_file_url(&cwd.join("assets/main.css"));
        assert!(matcher.matches(&url));
    }
}
