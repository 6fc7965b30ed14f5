use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use image::RgbaImage;
use log::{debug, info};

use super::filter::GalleryClip;
use super::pager::{GalleryPager, PagerEvent};
use super::view_state::{DecodeContext, DecodeOutcome, ThumbnailViewState, ViewLoadState};
use crate::clip::ClipIdentity;
use crate::scheduler::{CompletionCallback, ThumbnailScheduler};
use crate::thumbnail::{ThumbnailDecoder, ThumbnailStore};

/// Interval between channel polls in [`Gallery::pump_until`]
const PUMP_POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy)]
pub struct GalleryOptions {
    pub page_size: usize,
    pub decode_width: u32,
}

impl Default for GalleryOptions {
    fn default() -> Self {
        Self {
            page_size: super::DEFAULT_PAGE_SIZE,
            decode_width: crate::thumbnail::DEFAULT_DECODE_WIDTH,
        }
    }
}

/// Ties the pager, per-clip view states and the generation scheduler together.
///
/// Owned by a single presentation thread. Background work (generation on the
/// scheduler's worker, decodes on the rayon pool) reports back over channels
/// that are drained by [`Gallery::pump`]; view state is only touched there.
pub struct Gallery {
    pager: GalleryPager,
    views: HashMap<ClipIdentity, ThumbnailViewState>,
    scheduler: Arc<ThumbnailScheduler>,
    store: ThumbnailStore,
    decode: DecodeContext,
    decoded_rx: Receiver<DecodeOutcome>,
    generated_tx: Sender<ClipIdentity>,
    generated_rx: Receiver<ClipIdentity>,
}

impl Gallery {
    pub fn new(
        scheduler: Arc<ThumbnailScheduler>,
        store: ThumbnailStore,
        decoder: Arc<dyn ThumbnailDecoder>,
        options: GalleryOptions,
    ) -> Self {
        let (decoded_tx, decoded_rx) = mpsc::channel();
        let (generated_tx, generated_rx) = mpsc::channel();
        Self {
            pager: GalleryPager::new(options.page_size),
            views: HashMap::new(),
            scheduler,
            store,
            decode: DecodeContext::new(decoder, options.decode_width, decoded_tx),
            decoded_rx,
            generated_tx,
            generated_rx,
        }
    }

    pub fn pager(&self) -> &GalleryPager {
        &self.pager
    }

    pub fn scheduler(&self) -> &Arc<ThumbnailScheduler> {
        &self.scheduler
    }

    /// Replace the library, show the first page, and queue background
    /// generation for every clip that has no thumbnail yet.
    pub fn load_library(&mut self, clips: Vec<GalleryClip>) {
        let events = self.pager.load_clips(clips);
        self.handle_events(events);
        self.load_more();

        let mut queued = 0;
        for entry in self.pager.all() {
            if !self.store.exists(&entry.clip) {
                self.scheduler.request_thumbnail(
                    Arc::clone(&entry.clip),
                    false,
                    Some(self.completion(entry.identity())),
                );
                queued += 1;
            }
        }
        info!(
            "Loaded {} clips, {} thumbnails queued for generation",
            self.pager.all().len(),
            queued
        );
    }

    pub fn filter_by_game(&mut self, game: Option<String>) {
        let events = self.pager.filter_by_game(game);
        self.handle_events(events);
        self.load_more();
    }

    pub fn filter_by_tag(&mut self, tag: Option<String>) {
        let events = self.pager.filter_by_tag(tag);
        self.handle_events(events);
        self.load_more();
    }

    pub fn set_search_query(&mut self, query: &str) {
        let events = self.pager.set_search_query(query);
        self.handle_events(events);
        self.load_more();
    }

    /// Show the next page. Returns how many clips were appended.
    pub fn load_more(&mut self) -> usize {
        match self.pager.load_more() {
            Some(event) => {
                let appended = match &event {
                    PagerEvent::Appended { clips, .. } => clips.len(),
                    PagerEvent::Cleared { .. } => 0,
                };
                self.handle_events(vec![event]);
                appended
            }
            None => 0,
        }
    }

    /// Swap in an entry whose metadata was edited.
    pub fn replace_clip(&mut self, entry: GalleryClip) -> bool {
        self.pager.replace_clip(entry)
    }

    /// Scroll hint: a cell came into view, so its pending generation should
    /// run before background work.
    pub fn clip_became_visible(&self, identity: &ClipIdentity) {
        if let Some(entry) = self.pager.find(identity) {
            self.scheduler.prioritize_clip(&entry.clip);
        }
    }

    pub fn load_state(&self, identity: &ClipIdentity) -> ViewLoadState {
        self.views
            .get(identity)
            .map_or(ViewLoadState::NotLoaded, ThumbnailViewState::state)
    }

    pub fn image(&self, identity: &ClipIdentity) -> Option<Arc<RgbaImage>> {
        self.views.get(identity).and_then(|v| v.image().cloned())
    }

    /// Apply everything background work has reported so far. Returns the
    /// number of messages handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;

        while let Ok(identity) = self.generated_rx.try_recv() {
            handled += 1;
            // Views exist only for displayed clips
            if let Some(view) = self.views.get_mut(&identity) {
                if view.mark_thumbnail_file_ready() {
                    debug!("Thumbnail ready for {}", identity);
                }
                view.load_async(&self.decode);
            }
        }

        while let Ok(outcome) = self.decoded_rx.try_recv() {
            handled += 1;
            if let Some(view) = self.views.get_mut(&outcome.identity) {
                view.apply(outcome);
            }
        }
        handled
    }

    /// Pump until `done` holds or `timeout` elapses. Returns whether `done`
    /// was reached.
    pub fn pump_until(&mut self, timeout: Duration, mut done: impl FnMut(&Gallery) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if done(self) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(PUMP_POLL_INTERVAL);
        }
    }

    /// Count displayed clips per load state.
    pub fn displayed_states(&self) -> HashMap<ViewLoadState, usize> {
        let mut counts = HashMap::new();
        for entry in self.pager.displayed() {
            *counts.entry(self.load_state(entry.identity())).or_insert(0) += 1;
        }
        counts
    }

    fn handle_events(&mut self, events: Vec<PagerEvent>) {
        for event in events {
            match event {
                PagerEvent::Cleared { unloaded } => {
                    for entry in unloaded {
                        if let Some(mut view) = self.views.remove(entry.identity()) {
                            view.unload();
                        }
                    }
                }
                PagerEvent::Appended { clips, .. } => {
                    for entry in clips {
                        self.show(&entry);
                    }
                }
            }
        }
    }

    /// A clip entered the displayed collection: decode what exists, and ask
    /// for anything missing at high priority.
    fn show(&mut self, entry: &GalleryClip) {
        let identity = entry.identity().clone();
        let view = self.views.entry(identity.clone()).or_insert_with(|| {
            ThumbnailViewState::new(identity.clone(), self.store.path_for(&entry.clip))
        });

        if matches!(view.state(), ViewLoadState::NotLoaded | ViewLoadState::Failed) {
            view.load_async(&self.decode);
        }
        if !view.has_thumbnail_file() {
            self.scheduler.request_thumbnail(
                Arc::clone(&entry.clip),
                true,
                Some(self.completion(&identity)),
            );
        }
    }

    fn completion(&self, identity: &ClipIdentity) -> CompletionCallback {
        let tx = self.generated_tx.clone();
        let identity = identity.clone();
        Box::new(move || {
            // Receiver gone means the gallery was dropped
            let _ = tx.send(identity);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::Clip;
    use crate::error::ClipError;
    use crate::scheduler::CancellationToken;
    use crate::thumbnail::{ImageDecoder, ThumbnailGenerator};
    use parking_lot::Mutex;
    use std::path::Path;

    /// Writes a small PNG to the store path, recording call order.
    struct FakeGenerator {
        store: ThumbnailStore,
        order: Mutex<Vec<String>>,
    }

    impl ThumbnailGenerator for FakeGenerator {
        fn generate(&self, clip: &Clip) -> Result<(), ClipError> {
            self.order.lock().push(clip.file_name.clone());
            write_png(&self.store.path_for(clip));
            Ok(())
        }
    }

    fn write_png(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        RgbaImage::new(64, 36)
            .save_with_format(path, image::ImageFormat::Png)
            .unwrap();
    }

    fn clip(root: &Path, game: &str, name: &str) -> GalleryClip {
        GalleryClip::unaliased(Clip::new(root.join(game).join(name)))
    }

    /// Blocks inside decode until released, then honours its token.
    struct GatedDecoder {
        started: Mutex<Sender<()>>,
        release: Mutex<Receiver<()>>,
    }

    impl ThumbnailDecoder for GatedDecoder {
        fn decode_scaled(
            &self,
            _path: &Path,
            _target_width: u32,
            token: &CancellationToken,
        ) -> Result<RgbaImage, ClipError> {
            let _ = self.started.lock().send(());
            let _ = self.release.lock().recv_timeout(Duration::from_secs(5));
            token.check()?;
            Ok(RgbaImage::new(4, 4))
        }
    }

    fn gallery(
        store: ThumbnailStore,
        page_size: usize,
    ) -> (Gallery, Arc<ThumbnailScheduler>, Arc<FakeGenerator>) {
        gallery_with_decoder(store, page_size, Arc::new(ImageDecoder))
    }

    fn gallery_with_decoder(
        store: ThumbnailStore,
        page_size: usize,
        decoder: Arc<dyn ThumbnailDecoder>,
    ) -> (Gallery, Arc<ThumbnailScheduler>, Arc<FakeGenerator>) {
        let generator = Arc::new(FakeGenerator {
            store: store.clone(),
            order: Mutex::new(Vec::new()),
        });
        let scheduler = Arc::new(
            ThumbnailScheduler::new(generator.clone()).with_idle_interval(Duration::from_millis(5)),
        );
        let options = GalleryOptions {
            page_size,
            decode_width: 32,
        };
        let gallery = Gallery::new(Arc::clone(&scheduler), store, decoder, options);
        (gallery, scheduler, generator)
    }

    #[test]
    fn test_visible_clip_generated_first_and_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThumbnailStore::in_folder(dir.path().join("cache"));
        let (mut gallery, scheduler, generator) = gallery(store.clone(), 1);

        let clips = vec![
            clip(dir.path(), "Valorant", "a.mp4"),
            clip(dir.path(), "Valorant", "b.mp4"),
            clip(dir.path(), "Valorant", "c.mp4"),
        ];
        let ids: Vec<_> = clips.iter().map(|c| c.identity().clone()).collect();

        gallery.load_library(clips);
        assert_eq!(gallery.pager().displayed().len(), 1);
        assert_eq!(gallery.load_state(&ids[0]), ViewLoadState::Failed);
        assert_eq!(scheduler.queue().lane_lens(), (1, 2));

        scheduler.start().unwrap();
        let loaded = gallery.pump_until(Duration::from_secs(10), |g| {
            g.load_state(&ids[0]) == ViewLoadState::Loaded && g.scheduler().queue().is_empty()
        });
        scheduler.stop();

        assert!(loaded);
        assert_eq!(generator.order.lock()[0], "a.mp4");
        assert_eq!(generator.order.lock().len(), 3);
        assert_eq!(gallery.image(&ids[0]).unwrap().dimensions(), (32, 18));
        // Generated but never displayed, so never decoded
        assert_eq!(gallery.load_state(&ids[1]), ViewLoadState::NotLoaded);
        assert_eq!(gallery.load_state(&ids[2]), ViewLoadState::NotLoaded);
        for entry in gallery.pager().all() {
            assert!(store.exists(&entry.clip));
        }
    }

    #[test]
    fn test_filter_change_unloads_hidden_clips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThumbnailStore::co_located();
        let (mut gallery, scheduler, _generator) = gallery(store.clone(), 100);

        let clips = vec![
            clip(dir.path(), "Valorant", "a.mp4"),
            clip(dir.path(), "Valorant", "b.mp4"),
            clip(dir.path(), "Apex", "c.mp4"),
        ];
        for entry in &clips {
            write_png(&store.path_for(&entry.clip));
        }
        let ids: Vec<_> = clips.iter().map(|c| c.identity().clone()).collect();

        gallery.load_library(clips);
        assert!(scheduler.queue().is_empty());
        assert!(gallery.pump_until(Duration::from_secs(10), |g| {
            ids.iter().all(|id| g.load_state(id) == ViewLoadState::Loaded)
        }));

        gallery.filter_by_game(Some("Apex".to_string()));
        assert_eq!(gallery.load_state(&ids[0]), ViewLoadState::NotLoaded);
        assert_eq!(gallery.load_state(&ids[1]), ViewLoadState::NotLoaded);
        assert!(gallery.image(&ids[0]).is_none());

        assert!(gallery.pump_until(Duration::from_secs(10), |g| {
            g.load_state(&ids[2]) == ViewLoadState::Loaded
        }));
        assert_eq!(gallery.pager().displayed().len(), 1);
        assert_eq!(gallery.displayed_states().get(&ViewLoadState::Loaded), Some(&1));
    }

    #[test]
    fn test_visible_hint_escalates_background_request() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThumbnailStore::in_folder(dir.path().join("cache"));
        let (mut gallery, scheduler, generator) = gallery(store, 1);

        let clips = vec![
            clip(dir.path(), "Apex", "a.mp4"),
            clip(dir.path(), "Apex", "b.mp4"),
            clip(dir.path(), "Apex", "c.mp4"),
        ];
        let last = clips[2].identity().clone();
        gallery.load_library(clips);
        gallery.clip_became_visible(&last);

        while scheduler.run_once() {}
        assert_eq!(*generator.order.lock(), vec!["a.mp4", "c.mp4", "b.mp4"]);
    }

    #[test]
    fn test_completion_for_unloaded_clip_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThumbnailStore::in_folder(dir.path().join("cache"));
        let (mut gallery, scheduler, _generator) = gallery(store, 100);

        let a = clip(dir.path(), "Valorant", "a.mp4");
        let id = a.identity().clone();
        gallery.load_library(vec![a]);
        gallery.set_search_query("no match");

        while scheduler.run_once() {}
        gallery.pump();
        assert_eq!(gallery.load_state(&id), ViewLoadState::NotLoaded);
    }

    #[test]
    fn test_refilter_during_decode_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThumbnailStore::co_located();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let decoder = Arc::new(GatedDecoder {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        });
        let (mut gallery, _scheduler, _generator) = gallery_with_decoder(store.clone(), 100, decoder);

        let a = clip(dir.path(), "Valorant", "a.mp4");
        write_png(&store.path_for(&a.clip));
        let id = a.identity().clone();

        gallery.load_library(vec![a]);
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // Hide and re-show while the first decode is still blocked
        gallery.set_search_query("zzz");
        gallery.set_search_query("");
        assert_eq!(gallery.load_state(&id), ViewLoadState::Loading);

        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();
        assert!(gallery.pump_until(Duration::from_secs(10), |g| {
            g.load_state(&id) == ViewLoadState::Loaded
        }));
        assert_eq!(gallery.image(&id).unwrap().dimensions(), (4, 4));
    }

    #[test]
    fn test_existing_thumbnail_skips_generation() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThumbnailStore::in_folder(dir.path().join("cache"));
        let (mut gallery, scheduler, generator) = gallery(store.clone(), 100);

        let a = clip(dir.path(), "Valorant", "a.mp4");
        let id = a.identity().clone();
        gallery.load_library(vec![a.clone()]);
        while scheduler.run_once() {}
        assert!(gallery.pump_until(Duration::from_secs(10), |g| {
            g.load_state(&id) == ViewLoadState::Loaded
        }));
        assert_eq!(generator.order.lock().len(), 1);
        assert!(store.exists(&a.clip));

        // Reload and re-show with the file already on disk
        gallery.load_library(vec![a]);
        gallery.clip_became_visible(&id);
        assert!(scheduler.queue().is_empty());
        assert!(!scheduler.run_once());
        assert!(gallery.pump_until(Duration::from_secs(10), |g| {
            g.load_state(&id) == ViewLoadState::Loaded
        }));
        assert_eq!(generator.order.lock().len(), 1);
    }
}
