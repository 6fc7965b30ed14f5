use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;

use super::{Clip, load_sidecar};
use crate::error::ClipError;

const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm"];

/// Scan library folders for video clips.
///
/// Folders are walked recursively. Missing folders are skipped with a
/// warning so one unplugged drive does not hide the rest of the library.
/// Sidecars are loaded in parallel and the result is sorted newest first.
pub fn scan_library(library_paths: &[impl AsRef<Path>]) -> Result<Vec<Clip>> {
    let mut video_paths = Vec::new();

    for library in library_paths {
        let library = library.as_ref();
        if !library.is_dir() {
            warn!("{}", ClipError::InputNotFound(library.to_path_buf()));
            continue;
        }
        collect_from_directory(library, &mut video_paths)
            .with_context(|| format!("failed to scan library: {}", library.display()))?;
    }

    info!("Found {} clips", video_paths.len());

    let mut clips: Vec<Clip> = video_paths.into_par_iter().map(read_clip).collect();
    clips.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(clips)
}

fn collect_from_directory(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir).context("Failed to read directory")? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            collect_from_directory(&path, paths)?;
        } else if file_type.is_symlink() && path.is_dir() {
            // Linked folders can loop back into the library
            debug!("Skipping linked folder {}", path.display());
        } else if path.is_file() && is_supported_video(&path) {
            paths.push(path);
        }
    }

    Ok(())
}

pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn read_clip(path: PathBuf) -> Clip {
    let mut clip = Clip::new(path);

    if let Ok(meta) = std::fs::metadata(&clip.path) {
        clip.size_bytes = meta.len();
        clip.created_at = meta
            .created()
            .or_else(|_| meta.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
    }

    load_sidecar(&mut clip);
    clip
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported_video() {
        assert!(is_supported_video(Path::new("a.mp4")));
        assert!(is_supported_video(Path::new("a.MKV")));
        assert!(is_supported_video(Path::new("dir/a.webm")));
        assert!(!is_supported_video(Path::new("a.mp4.json")));
        assert!(!is_supported_video(Path::new("a.jpg")));
        assert!(!is_supported_video(Path::new("noext")));
    }

    #[test]
    fn test_scan_library_recurses_and_reads_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let game = dir.path().join("Valorant");
        std::fs::create_dir_all(game.join("nested")).unwrap();
        std::fs::write(game.join("a.mp4"), b"x").unwrap();
        std::fs::write(game.join("nested").join("b.mkv"), b"x").unwrap();
        std::fs::write(game.join("notes.txt"), b"x").unwrap();
        std::fs::write(game.join("a.mp4.json"), r#"{"tags": ["ace"]}"#).unwrap();

        let clips = scan_library(&[dir.path()]).unwrap();
        assert_eq!(clips.len(), 2);

        let a = clips.iter().find(|c| c.file_name == "a.mp4").unwrap();
        assert_eq!(a.game_folder, "Valorant");
        assert_eq!(a.tags, vec!["ace"]);
        assert_eq!(a.size_bytes, 1);

        let b = clips.iter().find(|c| c.file_name == "b.mkv").unwrap();
        assert_eq!(b.game_folder, "nested");
    }

    #[test]
    fn test_scan_library_skips_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let clips = scan_library(&[dir.path().join("missing")]).unwrap();
        assert!(clips.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_library_skips_linked_folders() {
        let dir = tempfile::tempdir().unwrap();
        let game = dir.path().join("Apex");
        std::fs::create_dir_all(&game).unwrap();
        std::fs::write(game.join("a.mp4"), b"x").unwrap();
        // Loop back to the library root, plus a linked clip file
        std::os::unix::fs::symlink(dir.path(), game.join("loop")).unwrap();
        std::os::unix::fs::symlink(game.join("a.mp4"), game.join("linked.mp4")).unwrap();

        let clips = scan_library(&[dir.path()]).unwrap();
        let mut names: Vec<_> = clips.iter().map(|c| c.file_name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["a.mp4", "linked.mp4"]);
    }
}
