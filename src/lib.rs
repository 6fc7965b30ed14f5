pub mod cli;
pub mod clip;
pub mod config;
pub mod error;
pub mod gallery;
pub mod scheduler;
pub mod thumbnail;

pub use clip::{Clip, ClipIdentity};
pub use error::ClipError;
pub use gallery::{Gallery, GalleryClip, GalleryPager};
pub use scheduler::{CancellationToken, ThumbnailScheduler};
pub use thumbnail::{ThumbnailDecoder, ThumbnailGenerator, ThumbnailStore};
