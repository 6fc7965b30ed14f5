use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{debug, info, warn};
use rayon::prelude::*;

use clipreel::cli::{CliArgs, Command, CommonArgs, FilterArgs, MetaArgs, TrimArgs};
use clipreel::clip::{
    Clip, ExportPreset, default_export_path, enrich_clip, export_clip, load_sidecar, save_sidecar,
    scan_library, time_stamp,
};
use clipreel::config::{LoadedSettings, default_settings_path};
use clipreel::error::ClipError;
use clipreel::gallery::{Gallery, GalleryClip, GalleryOptions, GalleryPager, ViewLoadState};
use clipreel::scheduler::ThumbnailScheduler;
use clipreel::thumbnail::{CachePolicy, FfmpegGenerator, ImageDecoder, ThumbnailStore};

#[allow(clippy::print_stderr)]
fn main() {
    if let Err(e) = run() {
        // Use eprintln instead of error! because logger may not be initialized
        // (e.g., argument parsing fails before logger init)
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = CliArgs::parse();

    let verbose = match &cli.command {
        Command::List { common, .. } | Command::Thumbs { common, .. } | Command::Games(common) => {
            common.verbose
        }
        Command::Meta(meta) => meta.verbose,
        Command::Trim(trim) => trim.verbose,
    };

    env_logger::Builder::new()
        .filter_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_timestamp(None)
        .format_target(false)
        .init();

    debug!("clipreel v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::List {
            common,
            filter,
            pages,
        } => list_clips(&merge_settings_with_args(&common)?, &filter, pages),
        Command::Thumbs {
            common,
            filter,
            timeout,
        } => generate_thumbnails(
            &merge_settings_with_args(&common)?,
            &filter,
            Duration::from_secs(timeout),
        ),
        Command::Meta(meta) => edit_metadata(&meta),
        Command::Trim(trim) => trim_clip(&trim),
        Command::Games(common) => list_games(&merge_settings_with_args(&common)?),
    }
}

/// Merged configuration from CLI args and the settings file.
struct MergedSettings {
    library: Vec<PathBuf>,
    cache: CachePolicy,
    page_size: usize,
    decode_width: u32,
    idle_interval: Duration,
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    loaded: LoadedSettings,
}

impl MergedSettings {
    fn store(&self) -> ThumbnailStore {
        ThumbnailStore::new(self.cache.clone())
    }
}

/// An explicit settings file must exist; the default one is optional.
fn load_settings(config: Option<&Path>) -> Result<LoadedSettings> {
    if let Some(path) = config {
        LoadedSettings::load(path)
            .with_context(|| format!("failed to load settings: {}", path.display()))
    } else if let Some(path) = default_settings_path() {
        LoadedSettings::load_or_default(&path)
            .with_context(|| format!("failed to load settings: {}", path.display()))
    } else {
        LoadedSettings::load_or_default(Path::new("settings.json"))
    }
}

/// Merge settings file values with CLI arguments.
/// CLI arguments always take precedence over settings values.
fn merge_settings_with_args(args: &CommonArgs) -> Result<MergedSettings> {
    let loaded = load_settings(args.config.as_deref())?;

    let library = if !args.library.is_empty() {
        args.library.clone()
    } else {
        loaded
            .resolve_library_paths()
            .context("failed to resolve library paths from settings")?
    };
    if library.is_empty() {
        bail!("no library folders given; pass LIBRARY or set library_paths in the settings file");
    }

    let cache = if args.co_located {
        CachePolicy::CoLocated
    } else if let Some(dir) = &args.cache_dir {
        CachePolicy::Folder(dir.clone())
    } else {
        loaded.resolve_cache_policy()?
    };

    let settings = &loaded.settings;
    Ok(MergedSettings {
        library,
        cache,
        page_size: args.page_size.unwrap_or(settings.page_size),
        decode_width: settings.decode_width,
        idle_interval: Duration::from_millis(settings.idle_poll_ms),
        ffmpeg: PathBuf::from(&settings.ffmpeg),
        ffprobe: PathBuf::from(&settings.ffprobe),
        loaded,
    })
}

/// Scan the library; finding nothing at all is an error.
fn load_entries(merged: &MergedSettings) -> Result<Vec<Clip>> {
    let clips = scan_library(&merged.library)?;
    if clips.is_empty() {
        return Err(ClipError::NoClips.into());
    }
    Ok(clips)
}

fn to_gallery_clips(merged: &MergedSettings, clips: Vec<Clip>) -> Vec<GalleryClip> {
    let settings = &merged.loaded.settings;
    clips
        .into_iter()
        .map(|clip| {
            let game = settings.resolve_display_game(&clip.game_folder);
            GalleryClip::new(Arc::new(clip), game)
        })
        .collect()
}

fn apply_filter_args(pager: &mut GalleryPager, filter: &FilterArgs) {
    pager.filter_by_game(filter.game.clone());
    pager.filter_by_tag(filter.tag.clone());
    if let Some(query) = &filter.search {
        pager.set_search_query(query);
    }
}

#[allow(clippy::print_stdout)]
fn list_clips(merged: &MergedSettings, filter: &FilterArgs, pages: usize) -> Result<()> {
    let clips = to_gallery_clips(merged, load_entries(merged)?);
    let store = merged.store();

    let mut pager = GalleryPager::new(merged.page_size);
    apply_filter_args(&mut pager, filter);
    pager.load_clips(clips);
    for _ in 0..pages.max(1) {
        if pager.load_more().is_none() {
            break;
        }
    }

    let displayed = pager.displayed().to_vec();
    let probed: Vec<Clip> = displayed
        .par_iter()
        .map(|entry| {
            let mut clip = (*entry.clip).clone();
            enrich_clip(&merged.ffprobe, &mut clip);
            clip
        })
        .collect();

    for (entry, clip) in displayed.iter().zip(&probed) {
        let thumb = if store.exists(clip) { '*' } else { ' ' };
        let rating = clip.rating.map(|r| "★".repeat(usize::from(r))).unwrap_or_default();
        let audio = if clip.has_multi_track_audio() { " [multi-audio]" } else { "" };
        let tags = if clip.tags.is_empty() {
            String::new()
        } else {
            format!(" #{}", clip.tags.join(" #"))
        };
        println!(
            "{} {:>6}  {:<24} {:<5} {}{}{}",
            thumb,
            clip.duration_display(),
            entry.display_game,
            rating,
            clip.file_name,
            audio,
            tags
        );
    }

    println!(
        "Showing {} of {} clips ({} remaining)",
        pager.displayed().len(),
        pager.filtered_len(),
        pager.remaining()
    );
    Ok(())
}

fn generate_thumbnails(merged: &MergedSettings, filter: &FilterArgs, timeout: Duration) -> Result<()> {
    let store = merged.store();
    store
        .ensure_dir()
        .with_context(|| format!("failed to create cache folder: {:?}", store.cache_dir()))?;

    // Seek time depends on duration, so probe whatever still needs a thumbnail
    let mut clips = load_entries(merged)?;
    clips
        .par_iter_mut()
        .filter(|clip| !store.exists(clip))
        .for_each(|clip| enrich_clip(&merged.ffprobe, clip));
    let missing_before = clips.iter().filter(|c| !store.exists(c)).count();

    let generator = Arc::new(FfmpegGenerator::new(&merged.ffmpeg, store.clone()));
    let scheduler =
        Arc::new(ThumbnailScheduler::new(generator).with_idle_interval(merged.idle_interval));
    let options = GalleryOptions {
        page_size: merged.page_size,
        decode_width: merged.decode_width,
    };
    let mut gallery = Gallery::new(
        Arc::clone(&scheduler),
        store.clone(),
        Arc::new(ImageDecoder),
        options,
    );

    gallery.filter_by_game(filter.game.clone());
    gallery.filter_by_tag(filter.tag.clone());
    if let Some(query) = &filter.search {
        gallery.set_search_query(query);
    }
    gallery.load_library(to_gallery_clips(merged, clips));

    scheduler.start().context("failed to start thumbnail worker")?;
    let drained = gallery.pump_until(timeout, |g| {
        g.scheduler().queue().is_empty()
            && !g.displayed_states().contains_key(&ViewLoadState::Loading)
    });
    scheduler.stop();
    gallery.pump();

    if !drained {
        warn!(
            "Timed out after {}s with {} thumbnails still queued",
            timeout.as_secs(),
            scheduler.queue().pending_len()
        );
    }

    let missing_after = gallery
        .pager()
        .all()
        .iter()
        .filter(|entry| !store.exists(&entry.clip))
        .count();
    let states = gallery.displayed_states();
    let count = |state| states.get(&state).copied().unwrap_or(0);
    info!(
        "Generated {} of {} missing thumbnails",
        missing_before.saturating_sub(missing_after),
        missing_before
    );
    info!(
        "First page: {} loaded, {} failed",
        count(ViewLoadState::Loaded),
        count(ViewLoadState::Failed)
    );
    Ok(())
}

fn edit_metadata(args: &MetaArgs) -> Result<()> {
    if !args.clip.is_file() {
        return Err(ClipError::InputNotFound(args.clip.clone()).into());
    }

    let mut clip = Clip::new(&args.clip);
    load_sidecar(&mut clip);

    if let Some(rating) = args.rating {
        clip.rating = (rating > 0).then_some(rating);
    }
    for tag in &args.add_tag {
        let tag = tag.trim();
        if !tag.is_empty() && !clip.tags.iter().any(|t| t == tag) {
            clip.tags.push(tag.to_string());
        }
    }
    clip.tags.retain(|t| !args.remove_tag.contains(t));
    if let Some(description) = &args.description {
        clip.description = description.clone();
    }

    save_sidecar(&clip)?;
    info!("Updated {}", clip.sidecar_path().display());
    Ok(())
}

fn trim_clip(args: &TrimArgs) -> Result<()> {
    let loaded = load_settings(args.config.as_deref())?;
    let ffmpeg = PathBuf::from(&loaded.settings.ffmpeg);
    let preset = ExportPreset::from(args.preset);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_export_path(&args.clip, preset, &time_stamp(SystemTime::now())));

    export_clip(&ffmpeg, &args.clip, &output, args.start, args.end, preset)?;
    info!("Exported {}", output.display());
    Ok(())
}

#[allow(clippy::print_stdout)]
fn list_games(merged: &MergedSettings) -> Result<()> {
    let clips = to_gallery_clips(merged, load_entries(merged)?);
    let mut pager = GalleryPager::new(merged.page_size);
    pager.load_clips(clips);

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in pager.all() {
        *counts.entry(entry.display_game.as_str()).or_insert(0) += 1;
    }

    for game in pager.games() {
        println!("{:<32} {:>5}", game, counts.get(game.as_str()).copied().unwrap_or(0));
    }
    if !pager.tags().is_empty() {
        println!();
        println!("Tags: {}", pager.tags().join(", "));
    }
    Ok(())
}
