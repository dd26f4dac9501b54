//! Posting pipeline: validation, header hygiene, number assignment and
//! control-message side effects.

use crate::cache::ArticleCache;
use crate::control::{self, ControlCommand};
use crate::models::{Administrator, Article};
use crate::parse;
use crate::storage::{DynStore, GroupPost};
use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

/// Required headers beyond Message-ID, which the parser already enforces.
const REQUIRED_HEADERS: &[&str] = &["Date", "From", "Subject", "Newsgroups", "Path"];

/// Outcome of a POST, mapped to a response code by the handler.
#[derive(Debug, PartialEq, Eq)]
pub enum PostOutcome {
    /// 240: accepted and persisted (or applied as moderation approval).
    Received,
    /// 441: parse or validation failure.
    Rejected,
    /// 480: control message without the matching capability.
    PermissionDenied,
}

pub struct Poster {
    store: DynStore,
    cache: Arc<ArticleCache>,
    /// Per-group serialization points for the max+1 number assignment.
    group_locks: DashMap<String, Arc<Mutex<()>>>,
    site_name: String,
}

impl Poster {
    pub fn new(store: DynStore, cache: Arc<ArticleCache>, site_name: String) -> Self {
        Self {
            store,
            cache,
            group_locks: DashMap::new(),
            site_name,
        }
    }

    /// Process one accumulated article submission.
    #[tracing::instrument(skip_all)]
    pub async fn submit(
        &self,
        raw: &str,
        identity: Option<&Administrator>,
    ) -> Result<PostOutcome> {
        let Some(mut article) = parse::parse_article(raw) else {
            return Ok(PostOutcome::Rejected);
        };
        for required in REQUIRED_HEADERS {
            if article.header(required).is_none() {
                debug!(header = %required, "post missing required header");
                return Ok(PostOutcome::Rejected);
            }
        }

        // Permission gate for control messages before any side effect.
        let control_cmd = match article.header("Control").filter(|v| !v.trim().is_empty()) {
            Some(value) => {
                let Some(cmd) = control::parse_control(value) else {
                    return Ok(PostOutcome::Rejected);
                };
                let allowed =
                    identity.is_some_and(|admin| control::authorized(&cmd, &admin.caps));
                if !allowed {
                    debug!(
                        capability = control::required_capability(&cmd),
                        "control message denied"
                    );
                    return Ok(PostOutcome::PermissionDenied);
                }
                Some(cmd)
            }
            None => None,
        };

        self.apply_header_hygiene(&mut article, identity);

        let groups = article.newsgroups();
        if groups.is_empty() {
            return Ok(PostOutcome::Rejected);
        }

        let approval_body = article.body.starts_with("APPROVE\r\n")
            || article.body.starts_with("APPROVED\r\n");
        let reference = article
            .header("References")
            .and_then(|r| r.split_whitespace().last())
            .map(str::to_string);

        let mut posts: Vec<GroupPost> = Vec::new();
        for group_name in &groups {
            let Some(group) = self.store.get_newsgroup(group_name).await? else {
                // unknown target groups are skipped, not fatal
                debug!(group = %group_name, "skipping unknown newsgroup");
                continue;
            };
            let can_approve = identity.is_some_and(|a| a.can_approve_for(group_name));

            if approval_body
                && can_approve
                && let Some(target) = reference.as_deref()
            {
                if self
                    .approve_pending(target, group_name, &article, identity)
                    .await?
                {
                    continue;
                }
            }

            posts.push(GroupPost {
                group_name: group_name.to_string(),
                pending: group.moderated && !can_approve,
            });
        }

        if !posts.is_empty() {
            let _guards = self.lock_groups(&posts).await;
            let links = self.store.insert_article(&article, &posts).await?;
            self.cache.invalidate_article(&article.message_id);
            for link in &links {
                self.cache.invalidate_group(&link.group_name);
            }
            info!(message_id = %article.message_id, groups = links.len(), "article stored");

            if let Some(cmd) = &control_cmd {
                self.execute_control(cmd, &article, &links, identity).await?;
            }
        }

        Ok(PostOutcome::Received)
    }

    /// Server-side header rewriting applied before storage.
    fn apply_header_hygiene(&self, article: &mut Article, identity: Option<&Administrator>) {
        let can_approve_all = identity.is_some_and(|admin| {
            article
                .newsgroups()
                .iter()
                .all(|g| admin.can_approve_for(g))
        });
        if !can_approve_all {
            article.remove_header("Approved");
        }

        if !identity.is_some_and(|a| a.caps.can_cancel) {
            article.remove_header("Supersedes");
        }

        if !identity.is_some_and(|a| a.caps.can_inject) {
            article.set_header("Injection-Date", &chrono::Utc::now().to_rfc2822());
            article.remove_header("Injection-Info");
            article.remove_header("Xref");
            let redundant_followup = match (article.header("Followup-To"), article.header("Newsgroups")) {
                (Some(f), Some(n)) => f.trim() == n.trim(),
                _ => false,
            };
            if redundant_followup {
                article.remove_header("Followup-To");
            }
        }
    }

    /// Moderation short-circuit: approve a referenced pending crosspost in
    /// `group` instead of storing a new article. Returns true when applied.
    async fn approve_pending(
        &self,
        target: &str,
        group: &str,
        approval: &Article,
        identity: Option<&Administrator>,
    ) -> Result<bool> {
        let Some(mut link) = self.store.find_link(target, group).await? else {
            return Ok(false);
        };
        if !link.pending {
            return Ok(false);
        }
        let Some(mut pending_article) = self.store.get_article(target).await? else {
            return Ok(false);
        };

        let mailbox = approval
            .header("From")
            .map(str::to_string)
            .or_else(|| identity.map(|a| format!("{}@{}", a.username, self.site_name)))
            .unwrap_or_default();
        pending_article.set_header("Approved", &mailbox);
        self.store.update_article_headers(&pending_article).await?;

        link.pending = false;
        self.store.update_link(&link).await?;

        self.cache.invalidate_article(target);
        self.cache.invalidate_group(group);
        info!(message_id = %target, group = %group, "pending article approved");
        Ok(true)
    }

    /// Acquire the per-group locks for `posts` in name order so concurrent
    /// crossposts cannot deadlock.
    async fn lock_groups(&self, posts: &[GroupPost]) -> Vec<OwnedMutexGuard<()>> {
        let mut names: Vec<&str> = posts.iter().map(|p| p.group_name.as_str()).collect();
        names.sort_unstable();
        names.dedup();

        let mut guards = Vec::with_capacity(names.len());
        for name in names {
            let lock = self
                .group_locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();
            guards.push(lock.lock_owned().await);
        }
        guards
    }

    async fn execute_control(
        &self,
        cmd: &ControlCommand,
        carrier: &Article,
        links: &[crate::models::Crosspost],
        identity: Option<&Administrator>,
    ) -> Result<()> {
        let creator = identity.map_or("", |a| a.username.as_str());
        control::execute(cmd, carrier, links, &self.store, &self.cache, creator).await
    }
}
