use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use parking_lot::Mutex;

use super::queue::ThumbnailQueue;
use super::request::{CompletionCallback, Priority};
use crate::clip::Clip;
use crate::thumbnail::ThumbnailGenerator;

/// How long the worker sleeps when both lanes are empty
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(50);

/// Runs thumbnail generation on a single background thread.
///
/// Generation calls shell out to an external tool, so they are never run in
/// parallel with each other. Failures are logged and never retried; the
/// request's callbacks still fire so callers can re-check the file.
pub struct ThumbnailScheduler {
    queue: Arc<ThumbnailQueue>,
    generator: Arc<dyn ThumbnailGenerator>,
    worker: Mutex<Option<WorkerHandle>>,
    idle_interval: Duration,
}

/// One spawned worker loop and the flag that stops only that loop.
struct WorkerHandle {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ThumbnailScheduler {
    pub fn new(generator: Arc<dyn ThumbnailGenerator>) -> Self {
        Self {
            queue: Arc::new(ThumbnailQueue::new()),
            generator,
            worker: Mutex::new(None),
            idle_interval: DEFAULT_IDLE_INTERVAL,
        }
    }

    pub fn with_idle_interval(mut self, idle_interval: Duration) -> Self {
        self.idle_interval = idle_interval;
        self
    }

    pub fn queue(&self) -> &ThumbnailQueue {
        &self.queue
    }

    /// Request a thumbnail; see [`ThumbnailQueue::request`].
    pub fn request_thumbnail(
        &self,
        clip: Arc<Clip>,
        high_priority: bool,
        on_complete: Option<CompletionCallback>,
    ) {
        self.queue
            .request(clip, Priority::from_high(high_priority), on_complete);
    }

    /// Best-effort hint that a clip became visible.
    pub fn prioritize_clip(&self, clip: &Clip) {
        if self.queue.prioritize(clip.identity()) {
            debug!("Prioritized thumbnail for {}", clip.file_name);
        }
    }

    /// Spawn the worker thread. No-op if it is already running.
    ///
    /// Each start gets its own stop flag, so a worker abandoned by a
    /// [`Self::stop`] issued from its own callback exits even if the
    /// scheduler is restarted right away.
    pub fn start(&self) -> std::io::Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Ok(());
        }

        let running = Arc::new(AtomicBool::new(true));
        let queue = Arc::clone(&self.queue);
        let generator = Arc::clone(&self.generator);
        let flag = Arc::clone(&running);
        let idle_interval = self.idle_interval;

        let handle = thread::Builder::new()
            .name("thumbnail-worker".to_string())
            .spawn(move || {
                while flag.load(Ordering::Acquire) {
                    if !process_next(&queue, generator.as_ref()) {
                        thread::sleep(idle_interval);
                    }
                }
                debug!("Thumbnail worker stopped");
            })?;

        *worker = Some(WorkerHandle { running, handle });
        info!("Thumbnail worker started");
        Ok(())
    }

    /// Stop dequeuing. A generation call already in progress finishes (and its
    /// callbacks fire) before this returns. Idempotent.
    pub fn stop(&self) {
        let worker = self.worker.lock().take();
        if let Some(WorkerHandle { running, handle }) = worker {
            running.store(false, Ordering::Release);
            // A callback stopping its own scheduler must not join itself
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                warn!("Thumbnail worker panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|w| w.running.load(Ordering::Acquire))
    }

    /// Process one request on the calling thread. Returns false if both lanes
    /// were empty.
    pub fn run_once(&self) -> bool {
        process_next(&self.queue, self.generator.as_ref())
    }

    /// Block until every request has completed or `timeout` elapses.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.queue.is_empty() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
        true
    }
}

impl Drop for ThumbnailScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn process_next(queue: &ThumbnailQueue, generator: &dyn ThumbnailGenerator) -> bool {
    let Some(job) = queue.next_job() else {
        return false;
    };

    debug!("Generating thumbnail for {}", job.clip.file_name);
    if let Err(e) = generator.generate(&job.clip) {
        warn!("{}", e);
    }
    queue.complete(&job);
    true
}
