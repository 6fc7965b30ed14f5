use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use super::Clip;
use crate::error::ClipError;

/// User metadata stored next to each clip as `<clip>.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SidecarData {
    pub rating: Option<u8>,
    pub tags: Vec<String>,
    pub description: String,
}

impl SidecarData {
    pub fn from_clip(clip: &Clip) -> Self {
        Self {
            rating: clip.rating,
            tags: clip.tags.clone(),
            description: clip.description.clone(),
        }
    }

    pub fn apply_to(self, clip: &mut Clip) {
        clip.rating = self.rating.filter(|r| (1..=5).contains(r));
        clip.tags = self.tags;
        clip.description = self.description;
    }
}

/// Read a sidecar file. Returns `Ok(None)` when the file does not exist.
pub fn read_sidecar(path: &Path) -> Result<Option<SidecarData>, ClipError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|e| ClipError::SidecarRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let data = serde_json::from_str(&content).map_err(|e| ClipError::SidecarRead {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    Ok(Some(data))
}

/// Populate `clip` from its sidecar. Corrupt sidecars are logged and ignored.
pub fn load_sidecar(clip: &mut Clip) {
    match read_sidecar(&clip.sidecar_path()) {
        Ok(Some(data)) => data.apply_to(clip),
        Ok(None) => {}
        Err(e) => warn!("Ignoring sidecar: {}", e),
    }
}

/// Persist the clip's rating, tags and description to its sidecar.
pub fn save_sidecar(clip: &Clip) -> Result<(), ClipError> {
    let path = clip.sidecar_path();
    let content = serde_json::to_string_pretty(&SidecarData::from_clip(clip)).map_err(|e| {
        ClipError::SidecarWrite {
            path: path.clone(),
            source: e.into(),
        }
    })?;
    std::fs::write(&path, content).map_err(|e| ClipError::SidecarWrite { path, source: e })
}
