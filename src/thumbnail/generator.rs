// Thumbnail generation via the ffmpeg CLI: grabs one frame near the start of
// the clip and writes it as a high-quality JPEG.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use super::ThumbnailStore;
use crate::clip::Clip;
use crate::error::ClipError;

/// Produces a thumbnail file for a clip at its store path.
///
/// Implementations must be idempotent: if the file already exists they
/// return `Ok(())` without doing any work.
pub trait ThumbnailGenerator: Send + Sync {
    fn generate(&self, clip: &Clip) -> Result<(), ClipError>;
}

/// Seconds into the clip to grab the frame from: 10% of the duration,
/// clamped to 1..=5 seconds.
pub fn seek_time(duration_secs: f64) -> f64 {
    (duration_secs * 0.1).clamp(1.0, 5.0)
}

fn ffmpeg_args(seek: f64, input: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-loglevel".into(),
        "error".into(),
        "-ss".into(),
        format!("{:.1}", seek).into(),
        "-i".into(),
        input.as_os_str().to_owned(),
        "-vframes".into(),
        "1".into(),
        "-q:v".into(),
        "2".into(),
        "-y".into(),
        output.as_os_str().to_owned(),
    ]
}

pub struct FfmpegGenerator {
    ffmpeg: PathBuf,
    store: ThumbnailStore,
}

impl FfmpegGenerator {
    pub fn new(ffmpeg: impl Into<PathBuf>, store: ThumbnailStore) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            store,
        }
    }
}

impl ThumbnailGenerator for FfmpegGenerator {
    fn generate(&self, clip: &Clip) -> Result<(), ClipError> {
        let output_path = self.store.path_for(clip);
        if output_path.is_file() {
            return Ok(());
        }

        let failed = |message: String| ClipError::GenerationFailed {
            path: clip.path.clone(),
            message,
        };

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
        }

        let seek = seek_time(clip.duration_secs);
        debug!("ffmpeg frame at {:.1}s -> {}", seek, output_path.display());

        let output = Command::new(&self.ffmpeg)
            .args(ffmpeg_args(seek, &clip.path, &output_path))
            .output()
            .map_err(|e| failed(format!("could not run {}: {}", self.ffmpeg.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last = stderr.lines().last().unwrap_or("").trim();
            return Err(failed(format!("ffmpeg exited with {}: {}", output.status, last)));
        }
        if !output_path.is_file() {
            return Err(failed("ffmpeg produced no file".to_string()));
        }

        Ok(())
    }
}
