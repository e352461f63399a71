//! Configuration section definitions.
//!
//! # Example
//!
//! ```toml
//! [graph]
//! root = "public"                 # site root directory
//!
//! [load]
//! inputs = ["index.html", "**/*.css"]
//! keep_unloaded = ["media/**"]    # registered without reading bytes
//!
//! [populate]
//! enable = true
//! follow = ["HtmlStyle", "CssImport"]  # empty = every relation type
//! external = false                # follow relations leaving the root origin
//!
//! [output]
//! pretty = false
//!
//! [log]
//! verbose = false
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// `[graph]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSection {
    /// Site root directory, relative to the config file.
    pub root: PathBuf,
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }
}

/// `[load]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadSection {
    /// Input paths, globs or urls. Paths are relative to the site root.
    pub inputs: Vec<String>,
    /// Glob patterns of inputs registered without fetching their bytes.
    pub keep_unloaded: Vec<String>,
}

/// `[populate]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulateSection {
    pub enable: bool,
    /// Relation type names to follow; empty follows every type.
    pub follow: Vec<String>,
    /// Follow relations whose target lies outside the root origin.
    pub external: bool,
}

impl Default for PopulateSection {
    fn default() -> Self {
        Self {
            enable: true,
            follow: Vec::new(),
            external: false,
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Pretty-print Css, JavaScript and Json assets after loading.
    pub pretty: bool,
}

/// `[log]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_section_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.graph.root.to_str(), Some("."));
        assert!(config.load.inputs.is_empty());
        assert!(config.populate.enable);
        assert!(!config.populate.external);
        assert!(!config.output.pretty);
        assert!(!config.log.verbose);
    }

    #[test]
    fn test_partial_override() {
        let config = test_parse_config(
            "[load]\ninputs = [\"index.html\"]\n[populate]\nfollow = [\"HtmlStyle\"]\n[log]\nverbose = true",
        );
        assert_eq!(config.load.inputs, ["index.html"]);
        assert!(config.load.keep_unloaded.is_empty());
        assert_eq!(config.populate.follow, ["HtmlStyle"]);
        assert!(config.populate.enable);
        assert!(config.log.verbose);
    }
}
