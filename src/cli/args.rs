use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::clip::ExportPreset;

#[derive(Parser, Debug)]
#[command(name = "clipreel")]
#[command(version, about = "Game clip library browser", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List clips page by page, with optional filters
    List {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Number of pages to show [default: 1]
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Generate missing thumbnails, visible page first
    Thumbs {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Seconds to wait for generation to finish [default: 600]
        #[arg(long, default_value_t = 600)]
        timeout: u64,
    },
    /// Edit a clip's rating, tags, or description
    Meta(MetaArgs),
    /// Export a time range of a clip
    Trim(TrimArgs),
    /// List games and tags found in the library
    Games(CommonArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Library folders to scan (overrides the settings file)
    pub library: Vec<PathBuf>,

    /// Load settings from this file [default: user config dir]
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Clips per page [default: 100]
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Store thumbnails in this folder
    #[arg(long, value_name = "DIR", conflicts_with = "co_located")]
    pub cache_dir: Option<PathBuf>,

    /// Store thumbnails next to each clip
    #[arg(long)]
    pub co_located: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only clips from this game (display name)
    #[arg(long)]
    pub game: Option<String>,

    /// Only clips with this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Case-insensitive search over name, game, tags and description
    #[arg(short, long)]
    pub search: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct MetaArgs {
    /// The clip file to edit
    pub clip: PathBuf,

    /// Rating from 1 to 5, or 0 to clear
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=5))]
    pub rating: Option<u8>,

    /// Add a tag (repeatable)
    #[arg(long, value_name = "TAG")]
    pub add_tag: Vec<String>,

    /// Remove a tag (repeatable)
    #[arg(long, value_name = "TAG")]
    pub remove_tag: Vec<String>,

    /// Replace the description
    #[arg(long)]
    pub description: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TrimArgs {
    /// The clip file to cut
    pub clip: PathBuf,

    /// Start of the range, in seconds
    #[arg(long)]
    pub start: f64,

    /// End of the range, in seconds
    #[arg(long)]
    pub end: f64,

    /// Output file [default: next to the clip, named after the preset]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Copy streams or re-encode for a target
    #[arg(long, value_enum, default_value = "lossless")]
    pub preset: CliExportPreset,

    /// Load settings from this file [default: user config dir]
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CliExportPreset {
    /// Stream copy, keeps the original container
    Lossless,
    /// x264 CRF 23, fast
    Discord,
    /// x264 CRF 18, slow
    HighQuality,
    /// x264 CRF 28, veryfast
    Compressed,
}

impl From<CliExportPreset> for ExportPreset {
    fn from(preset: CliExportPreset) -> Self {
        match preset {
            CliExportPreset::Lossless => ExportPreset::Lossless,
            CliExportPreset::Discord => ExportPreset::Discord,
            CliExportPreset::HighQuality => ExportPreset::HighQuality,
            CliExportPreset::Compressed => ExportPreset::Compressed,
        }
    }
}
