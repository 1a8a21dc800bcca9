//! LDAP adapter (ldap3).
//!
//! Bind as `<user><domain-suffix>`, look the account up under the base DN and
//! authorize on group membership. Anything that prevents an answer is reported
//! as `Unavailable` so the caller can fall back to local credentials.

use async_trait::async_trait;
use ldap3::{ldap_escape, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};

use nrelay_core::{
    config::LdapConfig,
    ports::{DenyReason, DirectoryAuthenticator, DirectoryVerdict},
};

/// What the directory said about the account after a successful bind.
#[derive(Debug, PartialEq, Eq)]
enum Lookup {
    NotFound,
    Found { groups: Option<Vec<String>> },
}

#[derive(Clone, Debug)]
pub struct LdapAuthenticator {
    cfg: LdapConfig,
}

impl LdapAuthenticator {
    pub fn new(cfg: LdapConfig) -> Self {
        Self { cfg }
    }

    async fn lookup(&self, username: &str, password: &str) -> Result<Lookup, LdapError> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.cfg.timeout);
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.cfg.url).await?;
        ldap3::drive!(conn);

        let bind_dn = format!("{username}{}", self.cfg.domain_suffix);
        ldap.simple_bind(&bind_dn, password).await?.success()?;

        let filter = format!("({}={})", self.cfg.account_attr, ldap_escape(username));
        let (entries, _) = ldap
            .search(
                &self.cfg.base_dn,
                Scope::Subtree,
                &filter,
                vec![self.cfg.group_attr.as_str()],
            )
            .await?
            .success()?;
        let _ = ldap.unbind().await;

        let Some(entry) = entries
            .into_iter()
            .find(|e| !e.is_ref() && !e.is_intermediate())
        else {
            return Ok(Lookup::NotFound);
        };

        let entry = SearchEntry::construct(entry);
        let groups = entry
            .attrs
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(&self.cfg.group_attr))
            .map(|(_, v)| v);
        Ok(Lookup::Found { groups })
    }
}

#[async_trait]
impl DirectoryAuthenticator for LdapAuthenticator {
    async fn verify(&self, username: &str, password: &str) -> DirectoryVerdict {
        if username.trim().is_empty() {
            return DirectoryVerdict::Deny(DenyReason::NotFound);
        }
        // An empty password would turn the bind into an unauthenticated one.
        if password.is_empty() {
            return DirectoryVerdict::Deny(DenyReason::InvalidCredentials);
        }

        let lookup = tokio::time::timeout(self.cfg.timeout, self.lookup(username, password)).await;
        match lookup {
            Err(_) => DirectoryVerdict::Unavailable(format!(
                "no answer from {} within {:?}",
                self.cfg.url, self.cfg.timeout
            )),
            Ok(Err(e)) => {
                tracing::debug!("ldap lookup for {username} failed: {e}");
                DirectoryVerdict::Unavailable(e.to_string())
            }
            Ok(Ok(lookup)) => verdict_for(lookup, &self.cfg.target_group),
        }
    }
}

fn verdict_for(lookup: Lookup, target_group: &str) -> DirectoryVerdict {
    match lookup {
        Lookup::NotFound => DirectoryVerdict::Deny(DenyReason::NotFound),
        Lookup::Found { groups: None } => DirectoryVerdict::Deny(DenyReason::NoGroupAttribute),
        Lookup::Found {
            groups: Some(groups),
        } => {
            if groups.iter().any(|g| g.contains(target_group)) {
                DirectoryVerdict::Allow
            } else {
                DirectoryVerdict::Deny(DenyReason::NotInGroup)
            }
        }
    }
}
