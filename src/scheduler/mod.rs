mod cancel;
mod queue;
mod request;
mod worker;

pub use cancel::CancellationToken;
pub use queue::ThumbnailQueue;
pub use request::{CompletionCallback, Job, Priority, RequestId, RequestState};
pub use worker::{DEFAULT_IDLE_INTERVAL, ThumbnailScheduler};
