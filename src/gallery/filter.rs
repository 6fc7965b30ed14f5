use std::sync::Arc;

use crate::clip::{Clip, ClipIdentity};

/// A clip as shown in the gallery: the record plus its resolved game name.
#[derive(Debug, Clone)]
pub struct GalleryClip {
    pub clip: Arc<Clip>,
    /// Display name after aliasing; several folders may share one
    pub display_game: String,
}

impl GalleryClip {
    pub fn new(clip: Arc<Clip>, display_game: impl Into<String>) -> Self {
        Self {
            clip,
            display_game: display_game.into(),
        }
    }

    /// Entry whose display name is just the folder name.
    pub fn unaliased(clip: Clip) -> Self {
        let display_game = clip.game_folder.clone();
        Self::new(Arc::new(clip), display_game)
    }

    pub fn identity(&self) -> &ClipIdentity {
        self.clip.identity()
    }
}

/// Active gallery filters, combined with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipFilter {
    pub game: Option<String>,
    pub tag: Option<String>,
    /// Stored lowercased; empty matches everything
    search: String,
}

impl ClipFilter {
    pub fn set_search(&mut self, query: &str) {
        self.search = query.trim().to_lowercase();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn is_active(&self) -> bool {
        self.game.is_some() || self.tag.is_some() || !self.search.is_empty()
    }

    pub fn matches(&self, entry: &GalleryClip) -> bool {
        if let Some(game) = &self.game
            && entry.display_game != *game
        {
            return false;
        }
        if let Some(tag) = &self.tag
            && !entry.clip.tags.iter().any(|t| t == tag)
        {
            return false;
        }
        self.search.is_empty() || self.matches_search(entry)
    }

    fn matches_search(&self, entry: &GalleryClip) -> bool {
        let q = self.search.as_str();
        let clip = &entry.clip;
        clip.file_name.to_lowercase().contains(q)
            || entry.display_game.to_lowercase().contains(q)
            || clip.tags.iter().any(|t| t.to_lowercase().contains(q))
            || clip.description.to_lowercase().contains(q)
    }
}
