use std::path::Path;

use anyhow::{Context, Result};

use super::types::GallerySettings;

/// Save settings to a JSON file with pretty formatting, creating the parent
/// directory if needed.
pub fn save_settings(settings: &GallerySettings, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(settings)
        .with_context(|| "failed to serialize settings to JSON")?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, content)
        .with_context(|| format!("failed to write settings file: {}", path.display()))?;

    Ok(())
}

/// Convert an absolute path to a path relative to the base directory.
///
/// If the path cannot be made relative (e.g., different drive on Windows),
/// returns the original path as a string.
pub fn make_relative(path: &Path, base: &Path) -> String {
    if let Ok(relative) = path.strip_prefix(base) {
        relative.to_string_lossy().into_owned()
    } else {
        path.to_string_lossy().into_owned()
    }
}
