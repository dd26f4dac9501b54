//! Byte-budgeted TTL cache in front of the store.
//!
//! Three concurrent indexes: message-id and (group, number) for crosspost
//! entries, group name for newsgroup records. Entries carry an estimated
//! byte cost and an atomic last-access stamp; the total is tracked with an
//! atomic counter, so accounting is approximate under races but bounded.
//! Values are handed out as `Arc` clones, so eviction never invalidates a
//! reference a handler already holds.

use crate::models::{Newsgroup, StoredArticle};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const ARTICLE_ENTRY_OVERHEAD: u64 = 1024;
const GROUP_ENTRY_OVERHEAD: u64 = 512;

/// Fraction of entries evicted when the budget is exceeded.
const EVICT_DENOMINATOR: usize = 10;

struct Entry<T> {
    value: Arc<T>,
    cost: u64,
    inserted_at: Instant,
    last_access_ms: AtomicU64,
}

impl<T> Entry<T> {
    fn new(value: Arc<T>, cost: u64, now_ms: u64) -> Self {
        Self {
            value,
            cost,
            inserted_at: Instant::now(),
            last_access_ms: AtomicU64::new(now_ms),
        }
    }
}

pub struct ArticleCache {
    by_id: DashMap<String, Entry<StoredArticle>>,
    by_number: DashMap<(String, u64), Entry<StoredArticle>>,
    groups: DashMap<String, Entry<Newsgroup>>,
    total: AtomicU64,
    max_bytes: u64,
    ttl: Duration,
    epoch: Instant,
}

impl ArticleCache {
    pub fn new(max_bytes: u64, ttl: Duration) -> Self {
        Self {
            by_id: DashMap::new(),
            by_number: DashMap::new(),
            groups: DashMap::new(),
            total: AtomicU64::new(0),
            max_bytes,
            ttl,
            epoch: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn estimate_article(entry: &StoredArticle) -> u64 {
        entry.article.raw_headers.len() as u64
            + entry.article.body.len() as u64
            + ARTICLE_ENTRY_OVERHEAD
    }

    /// Look up an article by message-id. Expired entries count as misses.
    pub fn get_article_by_id(&self, message_id: &str) -> Option<Arc<StoredArticle>> {
        self.lookup(&self.by_id, &message_id.to_string())
    }

    /// Look up an article by (group, number).
    pub fn get_article_by_number(&self, group: &str, number: u64) -> Option<Arc<StoredArticle>> {
        self.lookup(&self.by_number, &(group.to_string(), number))
    }

    /// Look up a newsgroup record by name.
    pub fn get_group(&self, name: &str) -> Option<Arc<Newsgroup>> {
        self.lookup(&self.groups, &name.to_string())
    }

    fn lookup<K, T>(&self, map: &DashMap<K, Entry<T>>, key: &K) -> Option<Arc<T>>
    where
        K: std::hash::Hash + Eq + Clone,
    {
        // The shard guard must drop before the expired-entry removal below.
        {
            let entry = map.get(key)?;
            if entry.inserted_at.elapsed() < self.ttl {
                entry.last_access_ms.store(self.now_ms(), Ordering::Relaxed);
                return Some(entry.value.clone());
            }
        }
        if let Some((_, entry)) = map.remove(key) {
            self.total.fetch_sub(entry.cost, Ordering::Relaxed);
        }
        None
    }

    /// Insert an article under both indexes.
    pub fn cache_article(&self, entry: Arc<StoredArticle>) {
        let cost = Self::estimate_article(&entry);
        let now = self.now_ms();
        self.reserve(cost * 2);
        let id_key = entry.article.message_id.clone();
        let num_key = (entry.link.group_name.clone(), entry.link.number);
        self.insert(&self.by_id, id_key, Entry::new(entry.clone(), cost, now));
        self.insert(&self.by_number, num_key, Entry::new(entry, cost, now));
    }

    /// Insert a newsgroup record.
    pub fn cache_group(&self, group: Arc<Newsgroup>) {
        let cost = GROUP_ENTRY_OVERHEAD + group.name.len() as u64;
        self.reserve(cost);
        let now = self.now_ms();
        self.insert(&self.groups, group.name.clone(), Entry::new(group, cost, now));
    }

    fn insert<K, T>(&self, map: &DashMap<K, Entry<T>>, key: K, entry: Entry<T>)
    where
        K: std::hash::Hash + Eq + Clone,
    {
        self.total.fetch_add(entry.cost, Ordering::Relaxed);
        if let Some(old) = map.insert(key, entry) {
            self.total.fetch_sub(old.cost, Ordering::Relaxed);
        }
    }

    /// Make room before an insert by evicting the oldest tenth of entries
    /// once the budget is exceeded.
    fn reserve(&self, incoming: u64) {
        if self.total.load(Ordering::Relaxed) + incoming > self.max_bytes {
            self.evict_oldest();
        }
    }

    fn evict_oldest(&self) {
        enum Key {
            Id(String),
            Number(String, u64),
            Group(String),
        }

        let mut candidates: Vec<(u64, Key)> = Vec::new();
        for e in self.by_id.iter() {
            candidates.push((
                e.last_access_ms.load(Ordering::Relaxed),
                Key::Id(e.key().clone()),
            ));
        }
        for e in self.by_number.iter() {
            candidates.push((
                e.last_access_ms.load(Ordering::Relaxed),
                Key::Number(e.key().0.clone(), e.key().1),
            ));
        }
        for e in self.groups.iter() {
            candidates.push((
                e.last_access_ms.load(Ordering::Relaxed),
                Key::Group(e.key().clone()),
            ));
        }

        candidates.sort_by_key(|(stamp, _)| *stamp);
        let victims = candidates.len().div_ceil(EVICT_DENOMINATOR);
        for (_, key) in candidates.into_iter().take(victims) {
            let removed_cost = match key {
                Key::Id(k) => self.by_id.remove(&k).map(|(_, e)| e.cost),
                Key::Number(g, n) => self.by_number.remove(&(g, n)).map(|(_, e)| e.cost),
                Key::Group(k) => self.groups.remove(&k).map(|(_, e)| e.cost),
            };
            if let Some(cost) = removed_cost {
                self.total.fetch_sub(cost, Ordering::Relaxed);
            }
        }
    }

    /// Drop the message-id entry and every (group, number) entry for an
    /// article. Called after cancel, post and moderation approval.
    pub fn invalidate_article(&self, message_id: &str) {
        if let Some((_, entry)) = self.by_id.remove(message_id) {
            self.total.fetch_sub(entry.cost, Ordering::Relaxed);
        }
        let stale: Vec<(String, u64)> = self
            .by_number
            .iter()
            .filter(|e| e.value.article.message_id == message_id)
            .map(|e| e.key().clone())
            .collect();
        for key in stale {
            if let Some((_, entry)) = self.by_number.remove(&key) {
                self.total.fetch_sub(entry.cost, Ordering::Relaxed);
            }
        }
    }

    /// Drop a group record, e.g. after a watermark change.
    pub fn invalidate_group(&self, name: &str) {
        if let Some((_, entry)) = self.groups.remove(name) {
            self.total.fetch_sub(entry.cost, Ordering::Relaxed);
        }
    }

    /// Evict every expired entry; returns the bytes reclaimed. Run
    /// periodically by the server.
    pub fn sweep(&self) -> u64 {
        let mut reclaimed = 0u64;

        let expired_ids: Vec<String> = self
            .by_id
            .iter()
            .filter(|e| e.inserted_at.elapsed() >= self.ttl)
            .map(|e| e.key().clone())
            .collect();
        for key in expired_ids {
            if let Some((_, e)) = self.by_id.remove(&key) {
                reclaimed += e.cost;
            }
        }

        let expired_numbers: Vec<(String, u64)> = self
            .by_number
            .iter()
            .filter(|e| e.inserted_at.elapsed() >= self.ttl)
            .map(|e| e.key().clone())
            .collect();
        for key in expired_numbers {
            if let Some((_, e)) = self.by_number.remove(&key) {
                reclaimed += e.cost;
            }
        }

        let expired_groups: Vec<String> = self
            .groups
            .iter()
            .filter(|e| e.inserted_at.elapsed() >= self.ttl)
            .map(|e| e.key().clone())
            .collect();
        for key in expired_groups {
            if let Some((_, e)) = self.groups.remove(&key) {
                reclaimed += e.cost;
            }
        }

        self.total.fetch_sub(reclaimed, Ordering::Relaxed);
        reclaimed
    }

    /// Current estimated total, for logging and tests.
    pub fn total_bytes(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}
