//! Byte loading collaborators.
//!
//! The graph never performs I/O itself: expanding inputs and fetching bytes
//! are delegated to an [`AssetLoader`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jwalk::WalkDir;
use rustc_hash::FxHashMap;

use crate::asset::{Asset, AssetConfig};
use crate::core::glob::{Glob, has_wildcards, literal_prefix};
use crate::core::url::{file_url_to_fs_path, fs_path_to_file_url};
use crate::error::{GraphError, Result};

/// Source of asset bytes.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    /// Expand one input into zero or more concrete configs.
    ///
    /// The default keeps the input as is.
    async fn resolve(&self, config: AssetConfig) -> Result<Vec<AssetConfig>> {
        Ok(vec![config])
    }

    /// Fetch the bytes behind `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Turn `config` into an asset, fetching bytes unless the config already
/// carries content, is inline, or asks to stay unloaded.
pub async fn load_asset(loader: &dyn AssetLoader, config: AssetConfig) -> Result<Asset> {
    let fetch_url = match &config.url {
        Some(url) if !config.has_content() && !config.keep_unloaded => Some(url.clone()),
        _ => None,
    };
    let bytes = match &fetch_url {
        Some(url) => Some(loader.fetch(url).await?),
        None => None,
    };
    let mut asset = Asset::from_config(config)?;
    if let Some(bytes) = bytes {
        asset.load_bytes(bytes);
    }
    Ok(asset)
}

fn load_error(url: &str, reason: impl ToString) -> GraphError {
    GraphError::Load {
        url: url.to_owned(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// Filesystem
// =============================================================================

/// Loads `file:` urls from the local filesystem and expands glob inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

#[async_trait]
impl AssetLoader for FsLoader {
    async fn resolve(&self, config: AssetConfig) -> Result<Vec<AssetConfig>> {
        let Some(pattern) = config
            .url
            .as_deref()
            .and_then(file_url_to_fs_path)
            .map(|p| p.to_string_lossy().into_owned())
            .filter(|p| has_wildcards(p))
        else {
            return Ok(vec![config]);
        };

        let paths = tokio::task::spawn_blocking({
            let pattern = pattern.clone();
            move || expand_glob(&pattern)
        })
        .await
        .map_err(|e| GraphError::Task(e.to_string()))??;

        Ok(paths
            .iter()
            .map(|path| AssetConfig {
                url: Some(fs_path_to_file_url(path)),
                ..config.clone()
            })
            .collect())
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let Some(path) = file_url_to_fs_path(url) else {
            return Err(load_error(url, "only file: urls can be loaded"));
        };
        tokio::fs::read(&path).await.map_err(|e| load_error(url, e))
    }
}

/// Files under the pattern's literal prefix matching the pattern, sorted.
fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let glob = Glob::new(pattern)?;
    let base = match literal_prefix(pattern) {
        "" => Path::new("."),
        prefix => Path::new(prefix),
    };
    let mut files: Vec<PathBuf> = WalkDir::new(base)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path())
        .filter(|p| glob.is_match(&p.to_string_lossy()))
        .collect();
    files.sort();
    Ok(files)
}

// =============================================================================
// In-memory
// =============================================================================

/// Serves bytes from a fixed url map. Used by tests and embedders that
/// already hold the content.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: FxHashMap<String, Vec<u8>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(url.to_owned(), bytes.into());
        self
    }
}

#[async_trait]
impl AssetLoader for MemoryLoader {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| load_error(url, "no such file"))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::asset::AssetType;
    use crate::core::url::fs_dir_to_file_url;

    #[tokio::test]
    async fn test_fs_resolve_expands_globs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("css")).unwrap();
        fs::write(dir.path().join("b.html"), "<p>b</p>").unwrap();
        fs::write(dir.path().join("a.html"), "<p>a</p>").unwrap();
        fs::write(dir.path().join("css/x.css"), "a{}").unwrap();

        let root = fs_dir_to_file_url(dir.path());
        let configs = FsLoader
            .resolve(AssetConfig::from(format!("{root}*.html")).initial(true))
            .await
            .unwrap();
        let urls: Vec<_> = configs.iter().filter_map(|c| c.url.as_deref()).collect();
        assert_eq!(urls, [format!("{root}a.html"), format!("{root}b.html")]);
        assert!(configs.iter().all(|c| c.is_initial));

        let plain = FsLoader
            .resolve(AssetConfig::from(format!("{root}css/x.css")))
            .await
            .unwrap();
        assert_eq!(plain.len(), 1);
    }

    #[tokio::test]
    async fn test_fs_fetch() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a b.css"), "a{}").unwrap();
        let url = fs_path_to_file_url(&dir.path().join("a b.css"));
        assert!(url.ends_with("a%20b.css"));
        assert_eq!(FsLoader.fetch(&url).await.unwrap(), b"a{}");

        let missing = fs_path_to_file_url(&dir.path().join("missing.css"));
        assert!(matches!(
            FsLoader.fetch(&missing).await,
            Err(GraphError::Load { url, .. }) if url == missing
        ));
        assert!(FsLoader.fetch("http://example.com/").await.is_err());
    }

    #[tokio::test]
    async fn test_load_asset() {
        let loader = MemoryLoader::new().with("file:///a.css", "a{b:c}");
        let mut asset = load_asset(&loader, AssetConfig::from("file:///a.css")).await.unwrap();
        assert_eq!(asset.asset_type(), AssetType::Css);
        assert_eq!(asset.text().unwrap(), "a{b:c}");
        assert!(!asset.is_dirty());

        let unloaded = load_asset(&loader, AssetConfig::from("file:///zzz.css").keep_unloaded(true))
            .await
            .unwrap();
        assert!(!unloaded.is_loaded());

        assert!(load_asset(&loader, AssetConfig::from("file:///zzz.css")).await.is_err());
    }
}
