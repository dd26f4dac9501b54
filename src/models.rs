//! Core records: articles, newsgroups, crosspost links, administrators.
//!
//! The three article-side records form the join shape the protocol works
//! with: an `Article` is stored once, a `Crosspost` places it in one group
//! under a per-group number, and `Newsgroup` carries the group metadata and
//! cached watermark counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A stored article: parsed headers plus the verbatim header block.
///
/// `raw_headers` is what HEAD/ARTICLE emit; `headers` are the parsed copies
/// used for overview rows and header hygiene. The two are kept consistent
/// by regenerating `raw_headers` whenever the server rewrites headers
/// before storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub message_id: String,
    pub headers: Vec<(String, String)>,
    pub raw_headers: String,
    pub body: String,
}

impl Article {
    /// First value of a header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace or insert a header value, keeping `raw_headers` in sync.
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let Some(slot) = self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            slot.1 = value.to_string();
        } else {
            self.headers.push((name.to_string(), value.to_string()));
        }
        self.regenerate_raw();
    }

    /// Drop all values of a header, keeping `raw_headers` in sync.
    pub fn remove_header(&mut self, name: &str) {
        let before = self.headers.len();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        if self.headers.len() != before {
            self.regenerate_raw();
        }
    }

    /// Groups named by the Newsgroups header, comma-separated per RFC 5536.
    pub fn newsgroups(&self) -> SmallVec<[String; 4]> {
        self.header("Newsgroups")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn regenerate_raw(&mut self) {
        let mut raw = String::new();
        for (k, v) in &self.headers {
            raw.push_str(k);
            raw.push_str(": ");
            raw.push_str(v);
            raw.push_str("\r\n");
        }
        self.raw_headers = raw;
    }
}

/// Visibility state of a crosspost link. Exactly one holds per link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Visible,
    Cancelled,
    Pending,
}

/// One article's placement in one newsgroup.
///
/// `number` is assigned as max+1 at post time and never reused, even after
/// cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crosspost {
    pub message_id: String,
    pub group_name: String,
    pub number: u64,
    pub cancelled: bool,
    pub pending: bool,
}

impl Crosspost {
    pub fn visibility(&self) -> Visibility {
        if self.cancelled {
            Visibility::Cancelled
        } else if self.pending {
            Visibility::Pending
        } else {
            Visibility::Visible
        }
    }
}

/// The eager-loaded shape handlers consume: an article together with the
/// crosspost link that matched the lookup.
#[derive(Debug, Clone)]
pub struct StoredArticle {
    pub article: Article,
    pub link: Crosspost,
}

/// A named feed of articles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Newsgroup {
    pub name: String,
    pub description: String,
    pub creator: String,
    pub created_at: DateTime<Utc>,
    pub moderated: bool,
    pub deny_local_posting: bool,
    pub deny_peer_posting: bool,
    pub post_count: u64,
    pub low_watermark: u64,
    pub high_watermark: u64,
}

impl Newsgroup {
    /// A freshly created group with empty counters.
    pub fn new(name: &str, description: &str, creator: &str, moderated: bool) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            creator: creator.to_string(),
            created_at: Utc::now(),
            moderated,
            deny_local_posting: false,
            deny_peer_posting: false,
            post_count: 0,
            low_watermark: 0,
            high_watermark: 0,
        }
    }

    /// LIST ACTIVE status flag: `m` moderated, `y` posting allowed, `n` not.
    pub fn list_flag(&self, posting_allowed: bool) -> char {
        if self.moderated {
            'm'
        } else if posting_allowed && !self.deny_local_posting {
            'y'
        } else {
            'n'
        }
    }
}

/// Capability flags carried by an administrator account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_approve_any: bool,
    pub can_cancel: bool,
    pub can_inject: bool,
    pub can_create_group: bool,
    pub can_delete_group: bool,
    pub can_check_groups: bool,
    pub local_only: bool,
}

/// An authenticated principal with its moderation assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Administrator {
    pub username: String,
    pub caps: Capabilities,
    pub moderates: Vec<String>,
}

impl Administrator {
    /// Whether this principal may approve posts into `group`.
    pub fn can_approve_for(&self, group: &str) -> bool {
        self.caps.can_approve_any
            || self.caps.can_inject
            || self.moderates.iter().any(|g| g == group)
    }

    /// Whether this principal may see moderation queues at all.
    pub fn can_see_pending(&self) -> bool {
        self.caps.can_approve_any || !self.moderates.is_empty()
    }
}
