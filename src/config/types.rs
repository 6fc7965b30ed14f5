use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::gallery::DEFAULT_PAGE_SIZE;
use crate::thumbnail::DEFAULT_DECODE_WIDTH;

/// Where generated thumbnails are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThumbnailCacheConfig {
    /// "co-located" (next to each clip) or "user-cache"
    Named(String),
    /// A cache folder, relative to the settings file
    Folder { folder: String },
}

impl Default for ThumbnailCacheConfig {
    fn default() -> Self {
        ThumbnailCacheConfig::Named(CO_LOCATED.to_string())
    }
}

pub const CO_LOCATED: &str = "co-located";
/// Shared folder under the user cache directory
pub const USER_CACHE: &str = "user-cache";

/// A game the user registered by hand, grouping one or more recorder folders
/// under a display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisteredGame {
    pub id: String,
    pub display_name: String,
    pub icon_path: Option<String>,
    pub box_art_path: Option<String>,
    /// Recorder folder names that belong to this game
    pub folder_names: Vec<String>,
}

/// Clip gallery settings file structure.
///
/// All paths in the file are relative to the file's location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GallerySettings {
    /// Settings file version (currently 1)
    pub version: u32,
    /// Library folders or glob patterns
    pub library_paths: Vec<String>,
    /// Legacy folder name to display name mapping
    pub game_aliases: BTreeMap<String, String>,
    pub registered_games: Vec<RegisteredGame>,
    pub thumbnail_cache: ThumbnailCacheConfig,
    /// Clips appended per "load more"
    pub page_size: usize,
    /// Width thumbnails are decoded at for the grid
    pub decode_width: u32,
    /// Worker sleep when there is nothing to generate, in milliseconds
    pub idle_poll_ms: u64,
    /// ffmpeg executable name or path
    pub ffmpeg: String,
    /// ffprobe executable name or path
    pub ffprobe: String,
}

impl Default for GallerySettings {
    fn default() -> Self {
        Self {
            version: 1,
            library_paths: Vec::new(),
            game_aliases: BTreeMap::new(),
            registered_games: Vec::new(),
            thumbnail_cache: ThumbnailCacheConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
            decode_width: DEFAULT_DECODE_WIDTH,
            idle_poll_ms: 50,
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl GallerySettings {
    /// Display name for a recorder folder: a registered game listing the
    /// folder wins, then a legacy alias, then the folder name itself.
    pub fn resolve_display_game(&self, folder: &str) -> String {
        if let Some(game) = self
            .registered_games
            .iter()
            .find(|g| g.folder_names.iter().any(|f| f.eq_ignore_ascii_case(folder)))
        {
            return game.display_name.clone();
        }
        self.game_aliases
            .get(folder)
            .cloned()
            .unwrap_or_else(|| folder.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let settings: GallerySettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.page_size, 100);
        assert_eq!(settings.decode_width, 320);
        assert_eq!(settings.idle_poll_ms, 50);
        assert_eq!(settings.ffmpeg, "ffmpeg");
        assert_eq!(settings.thumbnail_cache, ThumbnailCacheConfig::Named(CO_LOCATED.to_string()));
    }

    #[test]
    fn test_cache_folder_form() {
        let settings: GallerySettings =
            serde_json::from_str(r#"{ "thumbnail_cache": { "folder": "thumbs" } }"#).unwrap();
        assert_eq!(
            settings.thumbnail_cache,
            ThumbnailCacheConfig::Folder {
                folder: "thumbs".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_display_game_order() {
        let mut settings = GallerySettings::default();
        settings
            .game_aliases
            .insert("VALORANT-Win64".to_string(), "Valorant (alias)".to_string());
        settings
            .game_aliases
            .insert("r5apex".to_string(), "Apex Legends".to_string());
        settings.registered_games.push(RegisteredGame {
            id: "valorant".to_string(),
            display_name: "Valorant".to_string(),
            folder_names: vec!["valorant-win64".to_string()],
            ..Default::default()
        });

        assert_eq!(settings.resolve_display_game("VALORANT-Win64"), "Valorant");
        assert_eq!(settings.resolve_display_game("r5apex"), "Apex Legends");
        assert_eq!(settings.resolve_display_game("Minecraft"), "Minecraft");
    }

    #[test]
    fn test_registered_game_camel_case() {
        let json = r#"{ "id": "cs2", "displayName": "Counter-Strike 2", "folderNames": ["cs2"] }"#;
        let game: RegisteredGame = serde_json::from_str(json).unwrap();
        assert_eq!(game.display_name, "Counter-Strike 2");
        assert_eq!(game.icon_path, None);
        assert_eq!(game.folder_names, vec!["cs2"]);
    }
}
