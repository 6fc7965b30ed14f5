use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use log::debug;

use super::filter::{ClipFilter, GalleryClip};
use crate::clip::ClipIdentity;

/// Clips appended per page
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Changes to the displayed collection, in the order they happened.
#[derive(Debug, Clone)]
pub enum PagerEvent {
    /// The displayed collection was emptied; these entries are no longer shown
    Cleared { unloaded: Vec<Arc<GalleryClip>> },
    /// A page was appended to the displayed collection
    Appended {
        clips: Vec<Arc<GalleryClip>>,
        remaining: usize,
    },
}

/// Filtered, progressively disclosed view over the clip library.
///
/// The displayed collection is always a prefix of the filtered collection,
/// grown one page at a time by [`GalleryPager::load_more`]. Any filter change
/// clears it; the caller shows the first page again with `load_more`.
pub struct GalleryPager {
    all: Vec<Arc<GalleryClip>>,
    filtered: Vec<Arc<GalleryClip>>,
    displayed_len: usize,
    displayed_ids: HashSet<ClipIdentity>,
    filter: ClipFilter,
    page_size: usize,
    games: Vec<String>,
    tags: Vec<String>,
}

impl Default for GalleryPager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl GalleryPager {
    pub fn new(page_size: usize) -> Self {
        Self {
            all: Vec::new(),
            filtered: Vec::new(),
            displayed_len: 0,
            displayed_ids: HashSet::new(),
            filter: ClipFilter::default(),
            page_size: page_size.max(1),
            games: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Replace the library. Filters are kept, pagination restarts.
    pub fn load_clips(&mut self, clips: Vec<GalleryClip>) -> Vec<PagerEvent> {
        self.all = clips.into_iter().map(Arc::new).collect();
        self.refresh_facets();
        self.apply_filters()
    }

    pub fn filter_by_game(&mut self, game: Option<String>) -> Vec<PagerEvent> {
        self.filter.game = game;
        self.apply_filters()
    }

    pub fn filter_by_tag(&mut self, tag: Option<String>) -> Vec<PagerEvent> {
        self.filter.tag = tag;
        self.apply_filters()
    }

    pub fn set_search_query(&mut self, query: &str) -> Vec<PagerEvent> {
        self.filter.set_search(query);
        self.apply_filters()
    }

    /// Append the next page. `None` when nothing is left to show.
    pub fn load_more(&mut self) -> Option<PagerEvent> {
        if !self.has_more() {
            return None;
        }

        let end = (self.displayed_len + self.page_size).min(self.filtered.len());
        let clips = self.filtered[self.displayed_len..end].to_vec();
        self.displayed_ids
            .extend(clips.iter().map(|c| c.identity().clone()));
        self.displayed_len = end;

        let remaining = self.remaining();
        debug!(
            "Showing {} of {} clips ({} remaining)",
            self.displayed_len,
            self.filtered.len(),
            remaining
        );
        Some(PagerEvent::Appended { clips, remaining })
    }

    /// Swap in an edited entry (after a metadata change) without touching
    /// pagination. Returns false if the clip is not in the library.
    pub fn replace_clip(&mut self, entry: GalleryClip) -> bool {
        let entry = Arc::new(entry);
        let id = entry.identity().clone();
        let Some(slot) = self.all.iter_mut().find(|c| *c.identity() == id) else {
            return false;
        };
        *slot = Arc::clone(&entry);
        if let Some(slot) = self.filtered.iter_mut().find(|c| *c.identity() == id) {
            *slot = entry;
        }
        self.refresh_facets();
        true
    }

    /// Recompute the distinct, sorted game and tag lists from the library.
    pub fn refresh_facets(&mut self) {
        let games: BTreeSet<&str> = self.all.iter().map(|c| c.display_game.as_str()).collect();
        let tags: BTreeSet<&str> = self
            .all
            .iter()
            .flat_map(|c| c.clip.tags.iter().map(String::as_str))
            .collect();
        self.games = games.into_iter().map(str::to_string).collect();
        self.tags = tags.into_iter().map(str::to_string).collect();
    }

    pub fn games(&self) -> &[String] {
        &self.games
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn filter(&self) -> &ClipFilter {
        &self.filter
    }

    pub fn all(&self) -> &[Arc<GalleryClip>] {
        &self.all
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn displayed(&self) -> &[Arc<GalleryClip>] {
        &self.filtered[..self.displayed_len]
    }

    pub fn is_displayed(&self, identity: &ClipIdentity) -> bool {
        self.displayed_ids.contains(identity)
    }

    pub fn find(&self, identity: &ClipIdentity) -> Option<&Arc<GalleryClip>> {
        self.all.iter().find(|c| c.identity() == identity)
    }

    pub fn remaining(&self) -> usize {
        self.filtered.len() - self.displayed_len
    }

    pub fn has_more(&self) -> bool {
        self.displayed_len < self.filtered.len()
    }

    fn apply_filters(&mut self) -> Vec<PagerEvent> {
        let unloaded = self.displayed().to_vec();
        self.displayed_len = 0;
        self.displayed_ids.clear();
        self.filtered = self
            .all
            .iter()
            .filter(|c| self.filter.matches(c))
            .cloned()
            .collect();

        debug!("{} of {} clips match filters", self.filtered.len(), self.all.len());
        vec![PagerEvent::Cleared { unloaded }]
    }
}
