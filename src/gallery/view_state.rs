use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;

use image::RgbaImage;
use log::{debug, warn};

use crate::clip::ClipIdentity;
use crate::error::ClipError;
use crate::scheduler::CancellationToken;
use crate::thumbnail::ThumbnailDecoder;

/// Display state of one grid cell's thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewLoadState {
    NotLoaded,
    Loading,
    Loaded,
    Failed,
}

/// Result of a background decode, delivered back to the presentation thread.
pub struct DecodeOutcome {
    pub identity: ClipIdentity,
    pub generation: u64,
    pub result: Result<RgbaImage, ClipError>,
}

/// What a view needs to start a background decode.
///
/// Clones share one generation counter, so a generation number is never
/// issued twice even when a view is dropped and recreated for the same clip.
#[derive(Clone)]
pub struct DecodeContext {
    pub decoder: Arc<dyn ThumbnailDecoder>,
    pub target_width: u32,
    pub results: Sender<DecodeOutcome>,
    generations: Arc<AtomicU64>,
}

impl DecodeContext {
    pub fn new(
        decoder: Arc<dyn ThumbnailDecoder>,
        target_width: u32,
        results: Sender<DecodeOutcome>,
    ) -> Self {
        Self {
            decoder,
            target_width,
            results,
            // 0 marks a view with no decode issued
            generations: Arc::new(AtomicU64::new(1)),
        }
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed)
    }
}

/// Per-clip presentation state, owned by the presentation thread.
///
/// Every load takes a fresh generation from the [`DecodeContext`] and every
/// unload resets it to 0. A decode result is applied only if it carries the
/// current generation and its token was not cancelled, so results arriving
/// after an unload never resurrect the image, even in a recreated view.
pub struct ThumbnailViewState {
    identity: ClipIdentity,
    thumbnail_path: PathBuf,
    state: ViewLoadState,
    image: Option<Arc<RgbaImage>>,
    has_file: bool,
    generation: u64,
    cancel: Option<CancellationToken>,
}

impl ThumbnailViewState {
    pub fn new(identity: ClipIdentity, thumbnail_path: PathBuf) -> Self {
        let has_file = thumbnail_path.is_file();
        Self {
            identity,
            thumbnail_path,
            state: ViewLoadState::NotLoaded,
            image: None,
            has_file,
            generation: 0,
            cancel: None,
        }
    }

    pub fn identity(&self) -> &ClipIdentity {
        &self.identity
    }

    pub fn thumbnail_path(&self) -> &Path {
        &self.thumbnail_path
    }

    pub fn state(&self) -> ViewLoadState {
        self.state
    }

    pub fn image(&self) -> Option<&Arc<RgbaImage>> {
        self.image.as_ref()
    }

    pub fn has_thumbnail_file(&self) -> bool {
        self.has_file
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start decoding on the rayon pool. Returns true if a decode was started.
    ///
    /// No-op while loading or once loaded. A missing file fails immediately;
    /// [`Self::mark_thumbnail_file_ready`] followed by another call retries.
    pub fn load_async(&mut self, ctx: &DecodeContext) -> bool {
        if matches!(self.state, ViewLoadState::Loading | ViewLoadState::Loaded) {
            return false;
        }
        self.cancel_pending();

        self.has_file = self.thumbnail_path.is_file();
        if !self.has_file {
            self.state = ViewLoadState::Failed;
            return false;
        }

        self.generation = ctx.next_generation();
        self.state = ViewLoadState::Loading;
        let token = CancellationToken::new();
        self.cancel = Some(token.clone());

        let identity = self.identity.clone();
        let generation = self.generation;
        let path = self.thumbnail_path.clone();
        let decoder = Arc::clone(&ctx.decoder);
        let target_width = ctx.target_width;
        let results = ctx.results.clone();

        rayon::spawn(move || {
            let result = token
                .check()
                .and_then(|()| decoder.decode_scaled(&path, target_width, &token));
            // Receiver gone means the gallery was dropped
            let _ = results.send(DecodeOutcome {
                identity,
                generation,
                result,
            });
        });
        true
    }

    /// Apply a finished decode. Returns true if the state changed.
    pub fn apply(&mut self, outcome: DecodeOutcome) -> bool {
        let cancelled = self.cancel.as_ref().is_none_or(CancellationToken::is_cancelled);
        if outcome.generation != self.generation
            || self.state != ViewLoadState::Loading
            || cancelled
        {
            debug!("Discarding stale decode for {}", self.identity);
            return false;
        }
        self.cancel = None;

        match outcome.result {
            Ok(img) => {
                self.image = Some(Arc::new(img));
                self.state = ViewLoadState::Loaded;
            }
            Err(e) if e.is_cancelled() => {
                self.state = ViewLoadState::NotLoaded;
            }
            Err(e) => {
                warn!("{}", e);
                self.state = ViewLoadState::Failed;
            }
        }
        true
    }

    /// Drop the decoded image and abandon any decode in flight.
    pub fn unload(&mut self) {
        self.cancel_pending();
        self.generation = 0;
        self.image = None;
        self.state = ViewLoadState::NotLoaded;
    }

    /// Re-check the thumbnail file after generation finished. Returns whether
    /// it now exists.
    pub fn mark_thumbnail_file_ready(&mut self) -> bool {
        self.has_file = self.thumbnail_path.is_file();
        self.has_file
    }

    fn cancel_pending(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }
}

impl Drop for ThumbnailViewState {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thumbnail::ImageDecoder;
    use parking_lot::Mutex;
    use std::sync::mpsc::{self, Receiver};
    use std::time::Duration;

    /// Blocks inside decode until the test releases it.
    struct GatedDecoder {
        started: Mutex<Sender<()>>,
        release: Mutex<Receiver<()>>,
    }

    impl ThumbnailDecoder for GatedDecoder {
        fn decode_scaled(
            &self,
            _path: &Path,
            _target_width: u32,
            _token: &CancellationToken,
        ) -> Result<RgbaImage, ClipError> {
            let _ = self.started.lock().send(());
            let _ = self.release.lock().recv_timeout(Duration::from_secs(5));
            Ok(RgbaImage::new(4, 4))
        }
    }

    fn context(decoder: Arc<dyn ThumbnailDecoder>) -> (DecodeContext, Receiver<DecodeOutcome>) {
        let (tx, rx) = mpsc::channel();
        (DecodeContext::new(decoder, 320, tx), rx)
    }

    fn write_thumbnail(dir: &Path) -> PathBuf {
        let path = dir.join("a.mp4.jpg");
        RgbaImage::new(64, 36)
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();
        path
    }

    fn view(path: PathBuf) -> ThumbnailViewState {
        ThumbnailViewState::new(ClipIdentity::from_path(Path::new("/videos/game/a.mp4")), path)
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _rx) = context(Arc::new(ImageDecoder));
        let mut v = view(dir.path().join("a.mp4.jpg"));

        assert!(!v.has_thumbnail_file());
        assert!(!v.load_async(&ctx));
        assert_eq!(v.state(), ViewLoadState::Failed);
    }

    #[test]
    fn test_load_and_apply() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, rx) = context(Arc::new(ImageDecoder));
        let mut v = view(write_thumbnail(dir.path()));

        assert!(v.load_async(&ctx));
        assert_eq!(v.state(), ViewLoadState::Loading);
        // Already loading
        assert!(!v.load_async(&ctx));

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(v.apply(outcome));
        assert_eq!(v.state(), ViewLoadState::Loaded);
        assert_eq!(v.image().unwrap().dimensions(), (64, 36));
    }

    #[test]
    fn test_retry_after_file_ready() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, rx) = context(Arc::new(ImageDecoder));
        let mut v = view(dir.path().join("a.mp4.jpg"));
        v.load_async(&ctx);
        assert_eq!(v.state(), ViewLoadState::Failed);

        write_thumbnail(dir.path());
        assert!(v.mark_thumbnail_file_ready());
        assert!(v.load_async(&ctx));

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        v.apply(outcome);
        assert_eq!(v.state(), ViewLoadState::Loaded);
    }

    #[test]
    fn test_corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp4.jpg");
        std::fs::write(&path, b"garbage").unwrap();
        let (ctx, rx) = context(Arc::new(ImageDecoder));
        let mut v = view(path);

        v.load_async(&ctx);
        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        v.apply(outcome);
        assert_eq!(v.state(), ViewLoadState::Failed);
        assert!(v.image().is_none());
    }

    #[test]
    fn test_decode_finishing_after_unload_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let decoder = Arc::new(GatedDecoder {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        });
        let (ctx, rx) = context(decoder);
        let mut v = view(write_thumbnail(dir.path()));

        assert!(v.load_async(&ctx));
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        v.unload();
        release_tx.send(()).unwrap();

        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!v.apply(outcome));
        assert_eq!(v.state(), ViewLoadState::NotLoaded);
        assert!(v.image().is_none());
    }

    #[test]
    fn test_recreated_view_ignores_outcome_of_dropped_view() {
        let dir = tempfile::tempdir().unwrap();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let decoder = Arc::new(GatedDecoder {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        });
        let (ctx, rx) = context(decoder);
        let path = write_thumbnail(dir.path());

        let mut first = view(path.clone());
        assert!(first.load_async(&ctx));
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        drop(first);

        let mut second = view(path);
        assert!(second.load_async(&ctx));
        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();

        let stale = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let fresh = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let (stale, fresh) = if stale.generation == second.generation() {
            (fresh, stale)
        } else {
            (stale, fresh)
        };
        assert_ne!(stale.generation, fresh.generation);
        assert!(!second.apply(stale));
        assert_eq!(second.state(), ViewLoadState::Loading);
        assert!(second.apply(fresh));
        assert_eq!(second.state(), ViewLoadState::Loaded);
    }

    #[test]
    fn test_unload_releases_image() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, rx) = context(Arc::new(ImageDecoder));
        let mut v = view(write_thumbnail(dir.path()));
        v.load_async(&ctx);
        v.apply(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        assert_eq!(v.state(), ViewLoadState::Loaded);

        v.unload();
        assert_eq!(v.state(), ViewLoadState::NotLoaded);
        assert!(v.image().is_none());

        // Reloadable
        assert!(v.load_async(&ctx));
    }
}
