//! Flat-file persistence: one `label:value` record per line.
//!
//! Writers inside one process are serialized per file through [`FileLocks`].
//! Separate processes writing the same file are not coordinated.

use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{domain::Record, Result};

/// In-process single-writer arbitration keyed by file path.
#[derive(Default)]
pub struct FileLocks {
    inner: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl FileLocks {
    pub async fn lock_file(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[derive(Clone)]
pub struct FlatFileStore {
    dir: PathBuf,
    locks: Arc<FileLocks>,
}

impl FlatFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Arc::new(FileLocks::default()),
        }
    }

    pub fn path_for(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Load all records of `file`. A missing file reads as empty.
    pub async fn load(&self, file: &str) -> Result<Vec<Record>> {
        let path = self.path_for(file);
        let _guard = self.locks.lock_file(&path).await;
        read_records(&path).await
    }

    /// Replace the contents of `file` with `records`.
    pub async fn save(&self, file: &str, records: &[Record]) -> Result<()> {
        let path = self.path_for(file);
        let _guard = self.locks.lock_file(&path).await;
        write_records(&path, records).await
    }

    /// Read-modify-write under the file lock.
    ///
    /// The file is rewritten only when `f` returns `Ok`.
    pub async fn update<T>(
        &self,
        file: &str,
        f: impl FnOnce(&mut Vec<Record>) -> Result<T>,
    ) -> Result<T> {
        let path = self.path_for(file);
        let _guard = self.locks.lock_file(&path).await;
        let mut records = read_records(&path).await?;
        let out = f(&mut records)?;
        write_records(&path, &records).await?;
        Ok(out)
    }
}

async fn read_records(path: &Path) -> Result<Vec<Record>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(s) => s,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    Ok(contents.lines().filter_map(Record::parse_line).collect())
}

async fn write_records(path: &Path, records: &[Record]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut out = String::new();
    for r in records {
        out.push_str(&r.to_line());
        out.push('\n');
    }
    tokio::fs::write(path, out).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());
        assert!(store.load("nope.txt").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());
        let recs = vec![Record::new("b", "2"), Record::new("a", "1")];
        store.save("x.txt", &recs).await.unwrap();

        assert_eq!(store.load("x.txt").await.unwrap(), recs);
        let raw = std::fs::read_to_string(dir.path().join("x.txt")).unwrap();
        assert_eq!(raw, "b:2\na:1\n");
    }

    #[tokio::test]
    async fn failed_update_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());
        store.save("x.txt", &[Record::new("a", "1")]).await.unwrap();

        let res: Result<()> = store
            .update("x.txt", |recs| {
                recs.clear();
                Err(Error::Validation("nope".to_string()))
            })
            .await;
        assert!(res.is_err());
        assert_eq!(store.load("x.txt").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_updates_do_not_lose_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update("x.txt", |recs| {
                        recs.push(Record::new(format!("k{i}"), "v"));
                        Ok(())
                    })
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(store.load("x.txt").await.unwrap().len(), 16);
    }
}
