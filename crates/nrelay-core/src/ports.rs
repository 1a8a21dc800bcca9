use std::fmt;

use async_trait::async_trait;

use crate::{domain::Channel, Result};

/// Why the directory explicitly refused a login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DenyReason {
    /// No entry matched the account name (also used for empty usernames).
    NotFound,
    /// Entry found but it carries no group-membership attribute.
    NoGroupAttribute,
    /// Entry found but no membership contains the target group.
    NotInGroup,
    /// The credentials could not be used for a bind attempt (e.g. empty password).
    InvalidCredentials,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DenyReason::NotFound => "user not found",
            DenyReason::NoGroupAttribute => "group attribute missing",
            DenyReason::NotInGroup => "not a member of the target group",
            DenyReason::InvalidCredentials => "invalid credentials",
        };
        f.write_str(s)
    }
}

/// Outcome of a directory login.
///
/// `Unavailable` means the directory gave no answer (network, timeout, bind
/// failure, malformed response) and local authentication should be tried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectoryVerdict {
    Allow,
    Deny(DenyReason),
    Unavailable(String),
}

/// Hexagonal port for directory (LDAP) authentication.
#[async_trait]
pub trait DirectoryAuthenticator: Send + Sync {
    async fn verify(&self, username: &str, password: &str) -> DirectoryVerdict;
}

/// Hexagonal port for one outbound delivery mechanism.
///
/// Implementations report transport problems as errors; [`crate::dispatch::AuditedSender`]
/// turns them into logged `false` results.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    fn channel(&self) -> Channel;

    async fn deliver(&self, recipient: &str, message: &str) -> Result<()>;
}
