use std::path::{Path, PathBuf};

use crate::clip::Clip;

/// Hex characters of the BLAKE3 digest used in cached file names
const HASH_NAME_LEN: usize = 32;

/// Where thumbnail files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePolicy {
    /// `<clip path>.jpg`, next to the clip like its sidecar
    CoLocated,
    /// `<folder>/<hash of clip identity>.jpg`
    Folder(PathBuf),
}

/// Maps clips to deterministic thumbnail paths. Pure and cheap to clone.
#[derive(Debug, Clone)]
pub struct ThumbnailStore {
    policy: CachePolicy,
}

impl ThumbnailStore {
    pub fn new(policy: CachePolicy) -> Self {
        Self { policy }
    }

    pub fn co_located() -> Self {
        Self::new(CachePolicy::CoLocated)
    }

    pub fn in_folder(dir: impl Into<PathBuf>) -> Self {
        Self::new(CachePolicy::Folder(dir.into()))
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn path_for(&self, clip: &Clip) -> PathBuf {
        match &self.policy {
            CachePolicy::CoLocated => {
                let mut raw = clip.path.clone().into_os_string();
                raw.push(".jpg");
                PathBuf::from(raw)
            }
            CachePolicy::Folder(dir) => {
                let digest = blake3::hash(clip.identity().as_str().as_bytes());
                let hex = digest.to_hex();
                dir.join(format!("{}.jpg", &hex[..HASH_NAME_LEN]))
            }
        }
    }

    pub fn exists(&self, clip: &Clip) -> bool {
        self.path_for(clip).is_file()
    }

    /// Create the cache folder if the policy uses one.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        match &self.policy {
            CachePolicy::CoLocated => Ok(()),
            CachePolicy::Folder(dir) => std::fs::create_dir_all(dir),
        }
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        match &self.policy {
            CachePolicy::CoLocated => None,
            CachePolicy::Folder(dir) => Some(dir),
        }
    }
}
