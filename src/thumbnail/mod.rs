mod decode;
mod generator;
mod store;

pub use decode::{DEFAULT_DECODE_WIDTH, ImageDecoder, ThumbnailDecoder, scale_to_width};
pub use generator::{FfmpegGenerator, ThumbnailGenerator, seek_time};
pub use store::{CachePolicy, ThumbnailStore};
