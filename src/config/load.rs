use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use super::types::{CO_LOCATED, GallerySettings, ThumbnailCacheConfig, USER_CACHE};
use crate::thumbnail::CachePolicy;

/// A loaded settings file with its associated directory.
///
/// Paths in the settings are relative to the file's location, so we need to
/// track where it was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: GallerySettings,
    /// The directory containing the settings file
    pub settings_dir: PathBuf,
}

impl LoadedSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file: {}", path.display()))?;

        let settings: GallerySettings = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse settings file: {}", path.display()))?;

        let settings_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            settings,
            settings_dir,
        })
    }

    /// Load `path` if it exists, otherwise defaults rooted at its directory.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.is_file() {
            return Self::load(path);
        }
        Ok(Self {
            settings: GallerySettings::default(),
            settings_dir: path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }

    /// Resolve library entries to folders. Glob patterns are expanded; all
    /// paths are relative to the settings directory.
    pub fn resolve_library_paths(&self) -> Result<Vec<PathBuf>> {
        let mut results = Vec::new();

        for pattern in &self.settings.library_paths {
            if is_glob_pattern(pattern) {
                let full_pattern = self.settings_dir.join(pattern);
                let pattern_str = full_pattern.to_string_lossy();

                let paths = glob::glob(&pattern_str)
                    .with_context(|| format!("invalid glob pattern: {}", pattern))?;

                for entry in paths {
                    let path =
                        entry.with_context(|| format!("failed to read glob entry: {}", pattern))?;
                    if path.is_dir() {
                        results.push(path);
                    }
                }
            } else {
                results.push(self.settings_dir.join(pattern));
            }
        }

        Ok(results)
    }

    pub fn resolve_cache_policy(&self) -> Result<CachePolicy> {
        match &self.settings.thumbnail_cache {
            ThumbnailCacheConfig::Named(name) if name == CO_LOCATED => Ok(CachePolicy::CoLocated),
            ThumbnailCacheConfig::Named(name) if name == USER_CACHE => default_cache_dir()
                .map(CachePolicy::Folder)
                .context("no user cache directory on this system"),
            ThumbnailCacheConfig::Named(name) => bail!(
                "unknown thumbnail_cache '{}' in settings file. Valid values: \"{}\", \"{}\" or {{ \"folder\": PATH }}",
                name,
                CO_LOCATED,
                USER_CACHE
            ),
            ThumbnailCacheConfig::Folder { folder } => {
                Ok(CachePolicy::Folder(self.settings_dir.join(folder)))
            }
        }
    }
}

/// Check if a pattern contains glob characters.
fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?') || pattern.contains('[')
}

/// `<user config dir>/clipreel/settings.json`
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(env!("CARGO_PKG_NAME")).join("settings.json"))
}

/// `<user cache dir>/clipreel/thumbnails`
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(env!("CARGO_PKG_NAME")).join("thumbnails"))
}
