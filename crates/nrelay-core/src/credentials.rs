//! `users.txt`: `username:passwordHash` records.

use crate::{domain::Record, errors::Error, store::FlatFileStore, Result};

pub const USERS_FILE: &str = "users.txt";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialRecord {
    pub username: String,
    pub password_hash: String,
}

impl From<Record> for CredentialRecord {
    fn from(r: Record) -> Self {
        Self {
            username: r.label,
            password_hash: r.value,
        }
    }
}

#[derive(Clone)]
pub struct CredentialStore {
    files: FlatFileStore,
    cost: u32,
}

impl CredentialStore {
    pub fn new(files: FlatFileStore) -> Self {
        Self {
            files,
            cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Override the bcrypt work factor used for new records.
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    pub async fn all(&self) -> Result<Vec<CredentialRecord>> {
        Ok(self
            .files
            .load(USERS_FILE)
            .await?
            .into_iter()
            .map(CredentialRecord::from)
            .collect())
    }

    pub async fn find(&self, username: &str) -> Result<Option<CredentialRecord>> {
        Ok(self.all().await?.into_iter().find(|r| r.username == username))
    }

    /// Append a new user with a freshly salted hash.
    pub async fn insert(&self, username: &str, password: &str) -> Result<()> {
        validate_username(username)?;
        let hash = hash_password(password, self.cost)?;
        self.files
            .update(USERS_FILE, |records| {
                if records.iter().any(|r| r.label == username) {
                    return Err(Error::DuplicateUser(username.to_string()));
                }
                records.push(Record::new(username, hash));
                Ok(())
            })
            .await
    }

    pub async fn remove(&self, username: &str) -> Result<()> {
        self.files
            .update(USERS_FILE, |records| {
                let before = records.len();
                records.retain(|r| r.label != username);
                if records.len() == before {
                    return Err(Error::UserNotFound(username.to_string()));
                }
                Ok(())
            })
            .await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.files.load(USERS_FILE).await?.is_empty())
    }
}

fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(Error::Validation("username must not be empty".to_string()));
    }
    if username.trim() != username {
        return Err(Error::Validation(
            "username must not have surrounding whitespace".to_string(),
        ));
    }
    if username.contains(':') || username.contains('\n') || username.contains('\r') {
        return Err(Error::Validation(
            "username must not contain ':' or line breaks".to_string(),
        ));
    }
    Ok(())
}

/// Salted bcrypt hash (`$2b$<cost>$...`).
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost)
        .map_err(|e| Error::PasswordHash(format!("failed to hash password: {e}")))
}

/// Verify `password` against a `$2a$`/`$2b$`/`$2y$` hash. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(FlatFileStore::new(dir.path())).with_cost(TEST_COST);
        (dir, store)
    }

    const TEST_COST: u32 = 4;

    #[test]
    fn hash_is_salted_and_verifies() {
        let a = hash_password("s3cret", TEST_COST).unwrap();
        let b = hash_password("s3cret", TEST_COST).unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$2b$04$"), "{a}");
        assert!(verify_password("s3cret", &a));
        assert!(!verify_password("wrong", &a));
        assert!(!a.contains(':'));
    }

    #[test]
    fn verifies_existing_2a_records() {
        // OpenBSD bcrypt test vector.
        let legacy = "$2a$05$CCCCCCCCCCCCCCCCCCCCC.E5YPO9kmyuRGyh0XouQYb4YMJKvyOeW";
        assert!(verify_password("U*U", legacy));
        assert!(!verify_password("U*V", legacy));
    }

    #[tokio::test]
    async fn legacy_users_file_still_authenticates() {
        let (dir, store) = store();
        std::fs::write(
            dir.path().join(USERS_FILE),
            "ops:$2a$05$CCCCCCCCCCCCCCCCCCCCC.E5YPO9kmyuRGyh0XouQYb4YMJKvyOeW\n",
        )
        .unwrap();

        let record = store.find("ops").await.unwrap().unwrap();
        assert!(verify_password("U*U", &record.password_hash));
    }

    #[test]
    fn malformed_hash_never_matches() {
        assert!(!verify_password("x", "not-a-hash"));
        assert!(!verify_password("", ""));
    }

    #[tokio::test]
    async fn duplicate_insert_keeps_one_record() {
        let (_dir, store) = store();
        store.insert("alice", "pw1").await.unwrap();
        let err = store.insert("alice", "pw2").await.unwrap_err();
        assert!(matches!(err, Error::DuplicateUser(ref u) if u == "alice"));

        let all = store.all().await.unwrap();
        assert_eq!(all.iter().filter(|r| r.username == "alice").count(), 1);
        assert!(verify_password("pw1", &all[0].password_hash));
    }

    #[tokio::test]
    async fn remove_only_touches_matching_user() {
        let (_dir, store) = store();
        store.insert("alice", "a").await.unwrap();
        store.insert("bob", "b").await.unwrap();

        store.remove("alice").await.unwrap();
        let names: Vec<_> = store
            .all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.username)
            .collect();
        assert_eq!(names, vec!["bob"]);

        assert!(matches!(
            store.remove("alice").await,
            Err(Error::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn rejects_usernames_that_break_the_file_format() {
        let (_dir, store) = store();
        for bad in ["", "  ", "a:b", "a\nb", " padded"] {
            assert!(
                matches!(store.insert(bad, "pw").await, Err(Error::Validation(_))),
                "accepted {bad:?}"
            );
        }
        assert!(store.is_empty().await.unwrap());
    }
}
