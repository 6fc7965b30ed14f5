mod filter;
mod orchestrator;
mod pager;
mod view_state;

pub use filter::{ClipFilter, GalleryClip};
pub use orchestrator::{Gallery, GalleryOptions};
pub use pager::{DEFAULT_PAGE_SIZE, GalleryPager, PagerEvent};
pub use view_state::{DecodeContext, DecodeOutcome, ThumbnailViewState, ViewLoadState};
