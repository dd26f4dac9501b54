//! Cache-first article and newsgroup reads.
//!
//! The retriever is the only read path handlers use. It resolves metagroup
//! suffixes to a base group plus a visibility filter, consults the cache,
//! and falls back to the store, populating the cache on the way back.

use crate::cache::ArticleCache;
use crate::models::{Administrator, Newsgroup, StoredArticle, Visibility};
use crate::storage::DynStore;
use anyhow::Result;
use std::sync::Arc;

/// Suffixes that synthesize a read-only view of a real group.
const DELETED_SUFFIX: &str = ".deleted";
const PENDING_SUFFIX: &str = ".pending";

/// Strip a metagroup suffix from a requested name. Pure function of the
/// name; capability checks happen at resolution time.
pub fn split_view(requested: &str) -> (&str, Visibility) {
    if let Some(base) = requested.strip_suffix(DELETED_SUFFIX)
        && !base.is_empty()
    {
        (base, Visibility::Cancelled)
    } else if let Some(base) = requested.strip_suffix(PENDING_SUFFIX)
        && !base.is_empty()
    {
        (base, Visibility::Pending)
    } else {
        (requested, Visibility::Visible)
    }
}

/// A resolved group selection: the real group plus the visibility filter
/// derived from the requested name.
#[derive(Clone)]
pub struct GroupView {
    pub group: Arc<Newsgroup>,
    pub visibility: Visibility,
    pub requested_name: String,
}

pub struct Retriever {
    store: DynStore,
    cache: Arc<ArticleCache>,
}

impl Retriever {
    pub fn new(store: DynStore, cache: Arc<ArticleCache>) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &Arc<ArticleCache> {
        &self.cache
    }

    /// Resolve a requested group name, honouring metagroup suffixes.
    ///
    /// Metagroup views are synthesized only for principals whose
    /// capabilities allow them; for everyone else the name does not exist.
    pub async fn group_view(
        &self,
        requested: &str,
        identity: Option<&Administrator>,
    ) -> Result<Option<GroupView>> {
        let (base, visibility) = split_view(requested);
        match visibility {
            Visibility::Cancelled => {
                if !identity.is_some_and(|a| a.caps.can_cancel) {
                    return Ok(None);
                }
            }
            Visibility::Pending => {
                if !identity.is_some_and(Administrator::can_see_pending) {
                    return Ok(None);
                }
            }
            Visibility::Visible => {}
        }
        Ok(self.group(base).await?.map(|group| GroupView {
            group,
            visibility,
            requested_name: requested.to_string(),
        }))
    }

    /// Resolve a real (base) group name through the cache.
    pub async fn group(&self, name: &str) -> Result<Option<Arc<Newsgroup>>> {
        if let Some(group) = self.cache.get_group(name) {
            return Ok(Some(group));
        }
        match self.store.get_newsgroup(name).await? {
            Some(group) => {
                let group = Arc::new(group);
                self.cache.cache_group(group.clone());
                Ok(Some(group))
            }
            None => Ok(None),
        }
    }

    /// (count, low, high) for a view. Visible views use the group's cached
    /// counters; metagroup views ask the store.
    pub async fn view_stats(&self, view: &GroupView) -> Result<(u64, u64, u64)> {
        match view.visibility {
            Visibility::Visible => Ok((
                view.group.post_count,
                view.group.low_watermark,
                view.group.high_watermark,
            )),
            _ => {
                self.store
                    .group_stats(&view.group.name, view.visibility)
                    .await
            }
        }
    }

    /// Look an article up by message-id (visible links only).
    pub async fn article_by_id(&self, message_id: &str) -> Result<Option<Arc<StoredArticle>>> {
        if let Some(hit) = self.cache.get_article_by_id(message_id) {
            return Ok(Some(hit));
        }
        match self.store.get_article_by_message_id(message_id).await? {
            Some(stored) => {
                let stored = Arc::new(stored);
                self.cache.cache_article(stored.clone());
                // keep the eager-loaded group warm as well
                self.group(&stored.link.group_name).await?;
                Ok(Some(stored))
            }
            None => Ok(None),
        }
    }

    /// Positional lookup within a view. Only the visible view flows through
    /// the cache; metagroup reads always hit the store.
    pub async fn article_by_number(
        &self,
        view: &GroupView,
        number: u64,
    ) -> Result<Option<Arc<StoredArticle>>> {
        if view.visibility == Visibility::Visible
            && let Some(hit) = self.cache.get_article_by_number(&view.group.name, number)
        {
            return Ok(Some(hit));
        }
        match self
            .store
            .get_article_by_number(&view.group.name, number, view.visibility)
            .await?
        {
            Some(stored) => {
                let stored = Arc::new(stored);
                if view.visibility == Visibility::Visible {
                    self.cache.cache_article(stored.clone());
                }
                Ok(Some(stored))
            }
            None => Ok(None),
        }
    }

    /// Bulk range read for LISTGROUP and OVER. Bypasses the cache for both
    /// lookup and population.
    pub async fn article_range(
        &self,
        view: &GroupView,
        lo: u64,
        hi: u64,
        max: usize,
    ) -> Result<Vec<StoredArticle>> {
        self.store
            .list_articles_in_range(&view.group.name, lo, hi, max, view.visibility)
            .await
    }

    /// The numerically next article after `number` in a view.
    pub async fn next_article(
        &self,
        view: &GroupView,
        number: u64,
    ) -> Result<Option<StoredArticle>> {
        self.store
            .next_article(&view.group.name, number, view.visibility)
            .await
    }

    /// The numerically previous article before `number` in a view.
    pub async fn previous_article(
        &self,
        view: &GroupView,
        number: u64,
    ) -> Result<Option<StoredArticle>> {
        self.store
            .previous_article(&view.group.name, number, view.visibility)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_suffix_stripping() {
        assert_eq!(split_view("comp.test"), ("comp.test", Visibility::Visible));
        assert_eq!(
            split_view("comp.test.deleted"),
            ("comp.test", Visibility::Cancelled)
        );
        assert_eq!(
            split_view("comp.test.pending"),
            ("comp.test", Visibility::Pending)
        );
        // a bare suffix is not a view of the empty group
        assert_eq!(split_view(".deleted"), (".deleted", Visibility::Visible));
    }
}
