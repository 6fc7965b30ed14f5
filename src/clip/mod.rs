mod clip;
mod identity;
mod probe;
mod scanner;
mod sidecar;
mod trim;

pub use clip::Clip;
pub use identity::ClipIdentity;
pub use probe::{ProbeInfo, enrich_clip, parse_probe_output, probe_clip};
pub use scanner::{is_supported_video, scan_library};
pub use sidecar::{SidecarData, load_sidecar, read_sidecar, save_sidecar};
pub use trim::{ExportPreset, default_export_path, export_clip, time_stamp, trim_args};
