//! Connection session state management

use crate::models::Administrator;

/// Encapsulated session state for a client connection
pub struct Session {
    current_group: Option<String>,
    current_article: Option<u64>,
    identity: Option<Administrator>,
    pending_username: Option<String>,
    is_tls: bool,
    peer_is_loopback: bool,
    gzip: bool,
    posting_allowed: bool,
}

impl Session {
    pub fn new(is_tls: bool, peer_is_loopback: bool, posting_allowed: bool) -> Self {
        Self {
            current_group: None,
            current_article: None,
            identity: None,
            pending_username: None,
            is_tls,
            peer_is_loopback,
            gzip: false,
            posting_allowed,
        }
    }

    // Group management
    pub fn select_group(&mut self, group: String, first_article: Option<u64>) {
        self.current_group = Some(group);
        self.current_article = first_article;
    }

    pub fn current_group(&self) -> Option<&str> {
        self.current_group.as_deref()
    }

    // Article navigation
    pub fn current_article(&self) -> Option<u64> {
        self.current_article
    }

    pub fn set_current_article(&mut self, num: u64) {
        self.current_article = Some(num);
    }

    // Authentication
    /// Set the pending username for the AUTHINFO USER/PASS flow.
    pub fn set_pending_username(&mut self, username: String) {
        self.pending_username = Some(username);
    }

    pub fn pending_username(&self) -> Option<&str> {
        self.pending_username.as_deref()
    }

    pub fn authenticate(&mut self, identity: Administrator) {
        self.pending_username = None;
        self.identity = Some(identity);
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn identity(&self) -> Option<&Administrator> {
        self.identity.as_ref()
    }

    // Posting permission for this connection
    pub fn can_post(&self) -> bool {
        self.posting_allowed || self.identity.is_some()
    }

    pub fn is_tls(&self) -> bool {
        self.is_tls
    }

    pub fn peer_is_loopback(&self) -> bool {
        self.peer_is_loopback
    }

    // Multi-line compression negotiated via XFEATURE COMPRESS GZIP TERMINATOR
    pub fn enable_gzip(&mut self) {
        self.gzip = true;
    }

    pub fn gzip_active(&self) -> bool {
        self.gzip
    }
}
