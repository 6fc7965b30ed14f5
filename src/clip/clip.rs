use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::ClipIdentity;

/// A single recorded video file plus its probed and sidecar metadata.
#[derive(Debug, Clone)]
pub struct Clip {
    pub path: PathBuf,
    pub file_name: String,
    /// Name of the folder the clip lives in (the recorder's per-game folder)
    pub game_folder: String,
    pub created_at: SystemTime,
    pub size_bytes: u64,
    /// Zero until probed
    pub duration_secs: f64,
    pub audio_tracks: u32,
    /// 1-5, None when unrated
    pub rating: Option<u8>,
    pub tags: Vec<String>,
    pub description: String,
    identity: ClipIdentity,
}

impl Clip {
    /// Create a clip record for `path` with empty metadata.
    ///
    /// The game folder is the parent directory's name, or "Unknown" for
    /// files at a filesystem root.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let game_folder = path
            .parent()
            .and_then(Path::file_name)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Unknown".to_string());
        let identity = ClipIdentity::from_path(&path);

        Self {
            path,
            file_name,
            game_folder,
            created_at: SystemTime::UNIX_EPOCH,
            size_bytes: 0,
            duration_secs: 0.0,
            audio_tracks: 0,
            rating: None,
            tags: Vec::new(),
            description: String::new(),
            identity,
        }
    }

    pub fn identity(&self) -> &ClipIdentity {
        &self.identity
    }

    /// Path of the JSON sidecar holding rating, tags and description.
    pub fn sidecar_path(&self) -> PathBuf {
        let mut raw = self.path.clone().into_os_string();
        raw.push(".json");
        PathBuf::from(raw)
    }

    pub fn has_multi_track_audio(&self) -> bool {
        self.audio_tracks > 1
    }

    /// Duration as `m:ss`, or `--:--` before the clip is probed.
    pub fn duration_display(&self) -> String {
        if self.duration_secs <= 0.0 {
            return "--:--".to_string();
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let total = self.duration_secs as u64;
        format!("{}:{:02}", total / 60, total % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_names() {
        let clip = Clip::new("/videos/Apex Legends/clip_001.mp4");
        assert_eq!(clip.file_name, "clip_001.mp4");
        assert_eq!(clip.game_folder, "Apex Legends");
        assert!(clip.tags.is_empty());
        assert_eq!(clip.rating, None);
    }

    #[test]
    fn test_sidecar_path_appends_json() {
        let clip = Clip::new("/videos/game/clip.mp4");
        assert_eq!(clip.sidecar_path(), PathBuf::from("/videos/game/clip.mp4.json"));
    }

    #[test]
    fn test_duration_display() {
        let mut clip = Clip::new("/videos/game/clip.mp4");
        assert_eq!(clip.duration_display(), "--:--");
        clip.duration_secs = 125.7;
        assert_eq!(clip.duration_display(), "2:05");
    }

    #[test]
    fn test_multi_track_audio() {
        let mut clip = Clip::new("/videos/game/clip.mp4");
        clip.audio_tracks = 1;
        assert!(!clip.has_multi_track_audio());
        clip.audio_tracks = 3;
        assert!(clip.has_multi_track_audio());
    }
}
