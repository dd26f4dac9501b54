//! Domain error types for the NNTP server
//!
//! Errors are structured internally for logging but map to generic NNTP
//! response lines so clients never see backend details.

use thiserror::Error;

/// Top-level server error type
#[derive(Error, Debug)]
pub enum NntpError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Posting error: {0}")]
    Posting(#[from] PostingError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Article not found: {0}")]
    ArticleNotFound(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Error, Debug)]
pub enum PostingError {
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("Malformed article")]
    Malformed,

    #[error("Control message requires capability: {0}")]
    ControlDenied(&'static str),

    #[error("Posting not permitted")]
    NotPermitted,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication required")]
    Required,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication commands out of sequence")]
    OutOfSequence,

    #[error("Account restricted to local connections")]
    LocalOnly,
}

impl NntpError {
    /// Get the NNTP response code for this error
    pub fn response_code(&self) -> u16 {
        match self {
            NntpError::Storage(StorageError::ArticleNotFound(_)) => 430,
            NntpError::Storage(StorageError::GroupNotFound(_)) => 411,
            NntpError::Storage(_) => 403,

            NntpError::Posting(PostingError::ControlDenied(_)) => 480,
            NntpError::Posting(PostingError::NotPermitted) => 440,
            NntpError::Posting(_) => 441,

            NntpError::Auth(AuthError::Required) => 480,
            NntpError::Auth(AuthError::OutOfSequence) => 482,
            NntpError::Auth(_) => 481,

            NntpError::Config(_) => 403,
            NntpError::Io(_) => 403,
            NntpError::Protocol(_) => 500,
        }
    }

    /// Get a client-safe response message (generic, no internal details)
    pub fn client_message(&self) -> &'static str {
        match self {
            NntpError::Storage(StorageError::ArticleNotFound(_)) => {
                "No article with that message-id"
            }
            NntpError::Storage(StorageError::GroupNotFound(_)) => "No such newsgroup",
            NntpError::Storage(_) => "Archive server temporarily offline",

            NntpError::Posting(PostingError::ControlDenied(_)) => "Permission denied",
            NntpError::Posting(PostingError::NotPermitted) => "Posting not allowed",
            NntpError::Posting(_) => "Posting failed",

            NntpError::Auth(AuthError::Required) => "Authentication required",
            NntpError::Auth(AuthError::OutOfSequence) => {
                "Authentication commands issued out of sequence"
            }
            NntpError::Auth(_) => "Authentication failed",

            NntpError::Config(_) => "Archive server temporarily offline",
            NntpError::Io(_) => "Archive server temporarily offline",
            NntpError::Protocol(_) => "Command not recognized",
        }
    }

    /// Format as NNTP response line (code + generic message)
    pub fn to_response(&self) -> String {
        format!("{} {}\r\n", self.response_code(), self.client_message())
    }
}
