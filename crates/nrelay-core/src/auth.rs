//! Authentication: directory first, local credential file as fallback.
//!
//! The directory's explicit allow/deny is final. Only an `Unavailable` verdict falls
//! through to the local store.

use std::sync::Arc;

use crate::{
    audit::AuditLog,
    credentials::{verify_password, CredentialStore},
    errors::Error,
    ports::{DirectoryAuthenticator, DirectoryVerdict},
    Result,
};

const SYSTEM_ACTOR: &str = "system";

/// Authenticated operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub username: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocalOutcome {
    Match,
    Mismatch,
    NotFound,
}

/// Checks credentials against `users.txt`.
#[derive(Clone)]
pub struct LocalAuthenticator {
    store: CredentialStore,
}

impl LocalAuthenticator {
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    pub async fn verify(&self, username: &str, password: &str) -> Result<LocalOutcome> {
        let Some(record) = self.store.find(username).await? else {
            return Ok(LocalOutcome::NotFound);
        };
        if verify_password(password, &record.password_hash) {
            Ok(LocalOutcome::Match)
        } else {
            Ok(LocalOutcome::Mismatch)
        }
    }
}

pub struct AuthCoordinator {
    directory: Option<Arc<dyn DirectoryAuthenticator>>,
    local: LocalAuthenticator,
    credentials: CredentialStore,
    audit: AuditLog,
}

impl AuthCoordinator {
    pub fn new(credentials: CredentialStore, audit: AuditLog) -> Self {
        Self {
            directory: None,
            local: LocalAuthenticator::new(credentials.clone()),
            credentials,
            audit,
        }
    }

    /// Enable directory authentication in front of the local store.
    pub fn with_directory(mut self, directory: Arc<dyn DirectoryAuthenticator>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> bool {
        if let Some(directory) = &self.directory {
            match directory.verify(username, password).await {
                DirectoryVerdict::Allow => {
                    self.record("ldap", username, "LDAP authentication successful", true);
                    return true;
                }
                DirectoryVerdict::Deny(reason) => {
                    self.record(
                        "ldap",
                        username,
                        &format!("LDAP authentication denied ({reason})"),
                        false,
                    );
                    return false;
                }
                DirectoryVerdict::Unavailable(reason) => {
                    tracing::warn!("directory unavailable, falling back to local auth: {reason}");
                    self.audit.message(
                        "ldap",
                        "auth_attempt",
                        &format!("LDAP unavailable for {username}: {reason}"),
                        username,
                        "unavailable",
                    );
                }
            }
        }

        match self.local.verify(username, password).await {
            Ok(LocalOutcome::Match) => {
                self.record("file", username, "File authentication successful", true);
                true
            }
            Ok(LocalOutcome::Mismatch) => {
                self.record("file", username, "File authentication failed", false);
                false
            }
            Ok(LocalOutcome::NotFound) => {
                self.record(
                    "file",
                    username,
                    "File authentication failed - user not found",
                    false,
                );
                false
            }
            Err(e) => {
                self.audit
                    .error("auth", &format!("credential store: {e}"), username);
                self.audit.auth_attempt(username, false);
                false
            }
        }
    }

    /// [`Self::authenticate`] that yields a session or `AuthDenied`.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        if self.authenticate(username, password).await {
            Ok(Session {
                username: username.to_string(),
            })
        } else {
            Err(Error::AuthDenied)
        }
    }

    pub async fn create_user(&self, username: &str, password: &str) -> Result<()> {
        self.credentials.insert(username, password).await?;
        self.audit.message(
            "system",
            "new_user",
            &format!("User created: {username}"),
            SYSTEM_ACTOR,
            "success",
        );
        Ok(())
    }

    /// Remove a local user. Refusing to delete the acting user is the caller's job.
    pub async fn delete_user(&self, username: &str) -> Result<()> {
        self.credentials.remove(username).await?;
        self.audit.message(
            "system",
            "delete_user",
            &format!("User deleted: {username}"),
            SYSTEM_ACTOR,
            "success",
        );
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<String>> {
        Ok(self
            .credentials
            .all()
            .await?
            .into_iter()
            .map(|r| r.username)
            .collect())
    }

    fn record(&self, method: &str, username: &str, what: &str, success: bool) {
        self.audit.auth_attempt(username, success);
        self.audit.message(
            method,
            "auth_attempt",
            &format!("{what} for: {username}"),
            username,
            if success { "success" } else { "failure" },
        );
    }
}
