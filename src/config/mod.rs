//! Project configuration management for `assetgraph.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section    # [graph] [load] [populate] [output] [log]
//! ├── error      # ConfigError
//! ├── util       # config file lookup, path normalization
//! └── mod.rs     # SiteConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section      | Purpose                                         |
//! |--------------|-------------------------------------------------|
//! | `[graph]`    | Site root directory                             |
//! | `[load]`     | Input assets, inputs kept unloaded              |
//! | `[populate]` | Whether and which relations to follow           |
//! | `[output]`   | Pretty-printing after load                      |
//! | `[log]`      | Verbose logging                                 |

mod error;
pub mod section;
mod util;

pub use error::ConfigError;
use section::{GraphSection, LoadSection, LogSection, OutputSection, PopulateSection};
use util::{find_config_file, normalize_path};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use assetgraph::core::UrlMatcher;
use assetgraph::core::url::{fs_dir_to_file_url, fs_path_to_file_url, has_scheme};
use assetgraph::relation::RelationType;
use assetgraph::{debug, log};
use serde::{Deserialize, Serialize};

use crate::cli::{Cli, InputArgs};

/// Default config file name, searched upward from the current directory.
pub const CONFIG_FILE: &str = "assetgraph.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing assetgraph.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute path to the config file, empty when running on defaults
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Absolute site root directory (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub graph: GraphSection,

    #[serde(default)]
    pub load: LoadSection,

    #[serde(default)]
    pub populate: PopulateSection,

    #[serde(default)]
    pub output: OutputSection,

    #[serde(default)]
    pub log: LogSection,
}

impl SiteConfig {
    /// Load configuration for `cli`.
    ///
    /// An explicit `--config` must exist; otherwise the default file is
    /// searched upward from cwd and defaults apply when none is found.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.clone()).into());
                }
                Self::from_path(path)?
            }
            None => match find_config_file(Path::new(CONFIG_FILE)) {
                Some(path) => Self::from_path(&path)?,
                None => {
                    debug!("config"; "no {} found, using defaults", CONFIG_FILE);
                    Self::default()
                }
            },
        };

        config.finalize(cli);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        config.config_path = normalize_path(path);
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Resolve paths and apply CLI overrides.
    fn finalize(&mut self, cli: &Cli) {
        let config_dir = self
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let root = match &cli.root {
            Some(root) => normalize_path(root),
            None => normalize_path(&config_dir.join(&self.graph.root)),
        };
        self.root = root;

        if cli.verbose {
            self.log.verbose = true;
        }
        assetgraph::logger::set_verbose(self.log.verbose);

        self.apply_input_args(cli.command.inputs());
    }

    /// Positional inputs replace `[load] inputs`; they are relative to cwd.
    fn apply_input_args(&mut self, args: &InputArgs) {
        if !args.inputs.is_empty() {
            self.load.inputs = args
                .inputs
                .iter()
                .map(|input| {
                    if has_scheme(input) {
                        input.clone()
                    } else {
                        normalize_path(Path::new(input)).to_string_lossy().into_owned()
                    }
                })
                .collect();
        }
        Self::update_option(&mut self.populate.enable, args.populate.as_ref());
        Self::update_option(&mut self.output.pretty, args.pretty.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // derived values
    // ========================================================================

    /// Root url of the graph, with a trailing slash.
    pub fn root_url(&self) -> String {
        fs_dir_to_file_url(&self.root)
    }

    /// Input urls: paths (and globs) are anchored at the site root.
    pub fn input_urls(&self) -> Vec<String> {
        self.load
            .inputs
            .iter()
            .map(|input| {
                if has_scheme(input) {
                    input.clone()
                } else {
                    fs_path_to_file_url(&self.root.join(input))
                }
            })
            .collect()
    }

    /// Matcher for `[load] keep_unloaded`, anchored at the site root.
    pub fn keep_unloaded(&self) -> Result<UrlMatcher, ConfigError> {
        let patterns = self
            .load
            .keep_unloaded
            .iter()
            .map(|p| self.root.join(p).to_string_lossy().into_owned());
        UrlMatcher::new(patterns).map_err(|e| ConfigError::validation("load.keep_unloaded", e.to_string()))
    }

    /// Relation types named in `[populate] follow`.
    pub fn follow_types(&self) -> Result<Vec<RelationType>, ConfigError> {
        self.populate
            .follow
            .iter()
            .map(|name| {
                name.parse::<RelationType>()
                    .map_err(|_| ConfigError::validation("populate.follow", format!("unknown relation type `{name}`")))
            })
            .collect()
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.root.is_dir() {
            return Err(ConfigError::validation(
                "graph.root",
                format!("`{}` is not a directory", self.root.display()),
            ));
        }
        self.keep_unloaded()?;
        self.follow_types()?;
        Ok(())
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

/// Parse config, panicking on unknown fields (to catch typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> SiteConfig {
    let (parsed, ignored) = SiteConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(SiteConfig::parse_with_ignored("[graph\nroot = \".\"").is_err());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[graph]\nroot = \"public\"\n[unknown_section]\nfield = \"value\"\n[load]\ninptus = []";
        let (config, ignored) = SiteConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.graph.root, PathBuf::from("public"));
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
        assert!(ignored.iter().any(|f| f == "load.inptus"));
    }

    #[test]
    fn test_follow_types() {
        let config = test_parse_config("[populate]\nfollow = [\"HtmlStyle\", \"cssimport\"]");
        assert_eq!(
            config.follow_types().unwrap(),
            [RelationType::HtmlStyle, RelationType::CssImport]
        );

        let config = test_parse_config("[populate]\nfollow = [\"HtmlFrame\"]");
        assert!(matches!(
            config.follow_types(),
            Err(ConfigError::Validation { field: "populate.follow", .. })
        ));
    }

    #[test]
    fn test_load_with_cli_overrides() {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("public");
        std::fs::create_dir(&site).unwrap();
        let config_path = dir.path().join("custom.toml");
        std::fs::write(
            &config_path,
            "[graph]\nroot = \"public\"\n[load]\ninputs = [\"index.html\", \"css/*.css\"]\nkeep_unloaded = [\"media/**\"]",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "assetgraph",
            "-C",
            config_path.to_str().unwrap(),
            "check",
            "--populate=false",
        ]);
        let config = SiteConfig::load(&cli).unwrap();

        assert_eq!(config.root, normalize_path(&site));
        assert!(!config.populate.enable);
        assert!(config.root_url().ends_with("/public/"));
        let inputs = config.input_urls();
        assert_eq!(inputs.len(), 2);
        assert!(inputs[0].starts_with("file://") && inputs[0].ends_with("/public/index.html"));
        assert!(inputs[1].ends_with("/public/css/*.css"));

        let matcher = config.keep_unloaded().unwrap();
        assert!(matcher.matches(&fs_path_to_file_url(&site.join("media/a/b.png"))));
        assert!(!matcher.matches(&inputs[0]));
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let cli = Cli::parse_from(["assetgraph", "-C", "/definitely/not/here.toml", "dump"]);
        let err = SiteConfig::load(&cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NotFound(_))
        ));
    }
}
