// Clip export via the ffmpeg CLI: cuts a time range out of a clip, either
// copying the streams or re-encoding with one of a few presets.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::error::ClipError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportPreset {
    /// Stream copy, no re-encode
    #[default]
    Lossless,
    Discord,
    HighQuality,
    Compressed,
}

impl ExportPreset {
    /// Name used in default output file names.
    pub fn label(self) -> &'static str {
        match self {
            ExportPreset::Lossless => "Lossless",
            ExportPreset::Discord => "Discord",
            ExportPreset::HighQuality => "HighQuality",
            ExportPreset::Compressed => "Compressed",
        }
    }

    fn codec_args(self) -> &'static [&'static str] {
        match self {
            ExportPreset::Lossless => &["-c", "copy"],
            ExportPreset::Discord => &[
                "-c:v", "libx264", "-c:a", "aac", "-b:a", "192k", "-crf", "23", "-preset", "fast",
            ],
            ExportPreset::HighQuality => &[
                "-c:v", "libx264", "-c:a", "aac", "-b:a", "192k", "-crf", "18", "-preset", "slow",
            ],
            ExportPreset::Compressed => &[
                "-c:v", "libx264", "-c:a", "aac", "-b:a", "192k", "-crf", "28", "-preset",
                "veryfast",
            ],
        }
    }
}

/// Build the ffmpeg argument list for exporting `start..end` seconds of `input`.
pub fn trim_args(
    start: f64,
    end: f64,
    input: &Path,
    output: &Path,
    preset: ExportPreset,
) -> Result<Vec<OsString>, ClipError> {
    let duration = end - start;
    if !start.is_finite() || !end.is_finite() || start < 0.0 || duration <= 0.0 {
        return Err(ClipError::InvalidTrimRange { start, end });
    }

    let mut args: Vec<OsString> = vec![
        "-loglevel".into(),
        "error".into(),
        "-ss".into(),
        format!("{:.2}", start).into(),
        "-i".into(),
        input.as_os_str().to_owned(),
        "-t".into(),
        format!("{:.2}", duration).into(),
        "-map".into(),
        "0".into(),
    ];
    args.extend(preset.codec_args().iter().map(OsString::from));
    args.push("-y".into());
    args.push(output.as_os_str().to_owned());
    Ok(args)
}

/// `<clip dir>/<stem>_trim_<preset>_<HHMMSS><ext>`. Lossless keeps the clip's
/// container; re-encoded presets always produce `.mp4`.
pub fn default_export_path(input: &Path, preset: ExportPreset, stamp: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string());
    let ext = match (preset, input.extension()) {
        (ExportPreset::Lossless, Some(ext)) => format!(".{}", ext.to_string_lossy()),
        (ExportPreset::Lossless, None) => String::new(),
        _ => ".mp4".to_string(),
    };
    let name = format!("{}_trim_{}_{}{}", stem, preset.label(), stamp, ext);
    input.with_file_name(name)
}

/// `HHMMSS` of `now` in UTC.
pub fn time_stamp(now: SystemTime) -> String {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        % 86_400;
    format!("{:02}{:02}{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
}

/// Run ffmpeg to export `start..end` seconds of `input` to `output`.
pub fn export_clip(
    ffmpeg: &Path,
    input: &Path,
    output: &Path,
    start: f64,
    end: f64,
    preset: ExportPreset,
) -> Result<(), ClipError> {
    let args = trim_args(start, end, input, output, preset)?;
    let failed = |message: String| ClipError::ExportFailed {
        path: input.to_path_buf(),
        message,
    };

    if !input.is_file() {
        return Err(failed("clip file does not exist".to_string()));
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
    }

    debug!(
        "ffmpeg export {:.2}s..{:.2}s ({}) -> {}",
        start,
        end,
        preset.label(),
        output.display()
    );

    let result = Command::new(ffmpeg)
        .args(args)
        .output()
        .map_err(|e| failed(format!("could not run {}: {}", ffmpeg.display(), e)))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        let last = stderr.lines().last().unwrap_or("").trim();
        return Err(failed(format!("ffmpeg exited with {}: {}", result.status, last)));
    }
    if !output.is_file() {
        return Err(failed("ffmpeg produced no file".to_string()));
    }

    Ok(())
}
