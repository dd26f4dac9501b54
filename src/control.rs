//! Control message parsing and execution.
//!
//! Control actions are permission-gated on the posting administrator's
//! capability flags; there are no anonymous control messages.

use crate::cache::ArticleCache;
use crate::models::{Article, Capabilities, Crosspost, Newsgroup};
use crate::storage::DynStore;
use anyhow::Result;
use tracing::{debug, warn};

#[derive(Debug, PartialEq, Eq)]
pub enum ControlCommand {
    Cancel(String),
    NewGroup { group: String, moderated: bool },
    RmGroup(String),
    CheckGroups,
}

/// Parse a Control header value.
pub fn parse_control(val: &str) -> Option<ControlCommand> {
    let mut parts = val.split_whitespace();
    match parts.next()?.to_ascii_lowercase().as_str() {
        "cancel" => parts
            .next()
            .map(|id| ControlCommand::Cancel(id.to_string())),
        "newgroup" => {
            let group = parts.next()?;
            let moderated = parts
                .next()
                .is_some_and(|w| w.eq_ignore_ascii_case("moderated"));
            Some(ControlCommand::NewGroup {
                group: group.to_string(),
                moderated,
            })
        }
        "rmgroup" => parts.next().map(|g| ControlCommand::RmGroup(g.to_string())),
        "checkgroups" => Some(ControlCommand::CheckGroups),
        _ => None,
    }
}

/// Capability required to execute a control command.
pub fn required_capability(cmd: &ControlCommand) -> &'static str {
    match cmd {
        ControlCommand::Cancel(_) => "cancel",
        ControlCommand::NewGroup { .. } => "newgroup",
        ControlCommand::RmGroup(_) => "rmgroup",
        ControlCommand::CheckGroups => "checkgroups",
    }
}

/// Whether `caps` authorizes `cmd`.
pub fn authorized(cmd: &ControlCommand, caps: &Capabilities) -> bool {
    match cmd {
        ControlCommand::Cancel(_) => caps.can_cancel,
        ControlCommand::NewGroup { .. } => caps.can_create_group,
        ControlCommand::RmGroup(_) => caps.can_delete_group,
        ControlCommand::CheckGroups => caps.can_check_groups,
    }
}

/// Execute a control command after its carrier article has been persisted.
///
/// `carrier` is the control article itself and `carrier_links` its freshly
/// assigned crosspost links.
pub async fn execute(
    cmd: &ControlCommand,
    carrier: &Article,
    carrier_links: &[Crosspost],
    store: &DynStore,
    cache: &ArticleCache,
    creator: &str,
) -> Result<()> {
    match cmd {
        ControlCommand::Cancel(target) => {
            // Cancel the target in every group the cancel article reaches.
            for group in carrier.newsgroups() {
                if let Some(mut link) = store.find_link(target, &group).await? {
                    link.cancelled = true;
                    store.update_link(&link).await?;
                    cache.invalidate_group(&group);
                    debug!(target = %target, group = %group, "article cancelled");
                }
            }
            cache.invalidate_article(target);

            // The cancel article is administrative noise; hide it too.
            for link in carrier_links {
                let mut own = link.clone();
                own.cancelled = true;
                store.update_link(&own).await?;
                cache.invalidate_group(&link.group_name);
            }
            cache.invalidate_article(&carrier.message_id);
        }
        ControlCommand::NewGroup { group, moderated } => {
            if store.get_newsgroup(group).await?.is_none() {
                store
                    .create_group(&Newsgroup::new(group, "", creator, *moderated))
                    .await?;
            } else if let Err(e) = store.set_group_moderated(group, *moderated).await {
                warn!(group = %group, error = %e, "newgroup update failed");
            }
            cache.invalidate_group(group);
        }
        ControlCommand::RmGroup(group) => {
            store.remove_group(group).await?;
            cache.invalidate_group(group);
        }
        ControlCommand::CheckGroups => {
            // Body lines are `group description` pairs; create what is
            // missing.
            for line in carrier.body.split("\r\n") {
                let mut parts = line.splitn(2, [' ', '\t']);
                let Some(name) = parts.next().filter(|n| n.contains('.')) else {
                    continue;
                };
                let description = parts.next().unwrap_or("").trim();
                if store.get_newsgroup(name).await?.is_none() {
                    store
                        .create_group(&Newsgroup::new(name, description, creator, false))
                        .await?;
                    cache.invalidate_group(name);
                }
            }
        }
    }
    Ok(())
}
