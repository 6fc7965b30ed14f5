// Metadata probing through the ffprobe CLI: duration and audio track count.

use std::path::Path;
use std::process::Command;

use log::{debug, warn};
use serde::Deserialize;

use super::Clip;
use crate::error::ClipError;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProbeInfo {
    pub duration_secs: f64,
    pub audio_tracks: u32,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse ffprobe's `-print_format json -show_format -show_streams` output.
pub fn parse_probe_output(json: &str) -> Result<ProbeInfo, serde_json::Error> {
    let output: ProbeOutput = serde_json::from_str(json)?;

    let duration_secs = output
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0);

    let audio_tracks = output
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some("audio"))
        .count();

    Ok(ProbeInfo {
        duration_secs,
        audio_tracks: u32::try_from(audio_tracks).unwrap_or(u32::MAX),
    })
}

pub fn probe_clip(ffprobe: &Path, path: &Path) -> Result<ProbeInfo, ClipError> {
    let output = Command::new(ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .output()
        .map_err(|e| ClipError::ProbeFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ClipError::ProbeFailed {
            path: path.to_path_buf(),
            message: format!("ffprobe exited with {}", output.status),
        });
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout)).map_err(|e| {
        ClipError::ProbeFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })
}

/// Fill in duration and audio tracks. Failures leave the clip untouched.
pub fn enrich_clip(ffprobe: &Path, clip: &mut Clip) {
    match probe_clip(ffprobe, &clip.path) {
        Ok(info) => {
            debug!(
                "Probed {}: {:.2}s, {} audio track(s)",
                clip.file_name, info.duration_secs, info.audio_tracks
            );
            clip.duration_secs = info.duration_secs;
            clip.audio_tracks = info.audio_tracks;
        }
        Err(e) => warn!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let json = r#"{
            "streams": [
                {"codec_type": "video"},
                {"codec_type": "audio"},
                {"codec_type": "audio"}
            ],
            "format": {"duration": "93.450000"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert!((info.duration_secs - 93.45).abs() < 1e-9);
        assert_eq!(info.audio_tracks, 2);
    }

    #[test]
    fn test_parse_probe_output_missing_fields() {
        let info = parse_probe_output("{}").unwrap();
        assert_eq!(info, ProbeInfo::default());

        let info = parse_probe_output(r#"{"format": {"duration": "N/A"}}"#).unwrap();
        assert_eq!(info.duration_secs, 0.0);
    }

    #[test]
    fn test_parse_probe_output_invalid() {
        assert!(parse_probe_output("not json").is_err());
    }

    #[test]
    fn test_enrich_missing_tool_leaves_clip() {
        let mut clip = Clip::new("/videos/game/clip.mp4");
        enrich_clip(Path::new("/definitely/not/ffprobe"), &mut clip);
        assert_eq!(clip.duration_secs, 0.0);
        assert_eq!(clip.audio_tracks, 0);
    }
}
