mod load;
mod save;
mod types;

pub use load::{LoadedSettings, default_cache_dir, default_settings_path};
pub use save::{make_relative, save_settings};
pub use types::{CO_LOCATED, GallerySettings, RegisteredGame, ThumbnailCacheConfig, USER_CACHE};
