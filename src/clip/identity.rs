use std::fmt;
use std::path::Path;

/// Stable key for a clip, derived from its absolute file path.
///
/// Paths are lowercased on platforms whose default filesystems are
/// case-insensitive, so `D:\Clips\A.mp4` and `d:\clips\a.mp4` map to the
/// same identity there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipIdentity(String);

impl ClipIdentity {
    pub fn from_path(path: &Path) -> Self {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        Self::from_normalized(&absolute.to_string_lossy())
    }

    fn from_normalized(raw: &str) -> Self {
        if cfg!(any(windows, target_os = "macos")) {
            Self(raw.replace('\\', "/").to_lowercase())
        } else {
            Self(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
