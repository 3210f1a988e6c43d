// src/pool/store.rs
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use once_cell::sync::Lazy;
use tracing::warn;

use crate::ingest::{item_key, normalize_url};
use crate::model::ContentPool;
use crate::storage::{read_json, write_json_atomic, Loaded};

/// One write lock per snapshot path, shared by every store opened on it.
static WRITE_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = Lazy::new(Default::default);

fn write_lock_for(path: &Path) -> Arc<Mutex<()>> {
    let mut locks = WRITE_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
    locks.entry(path.to_path_buf()).or_default().clone()
}

/// The persisted pool snapshot. Readers load the whole file; writers replace it whole
/// under the path's write lock, so read-modify-replace cycles never interleave.
#[derive(Debug, Clone)]
pub struct PoolStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl PoolStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            write_lock: write_lock_for(&path),
            path,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current snapshot. A missing or unreadable file reads as an empty pool.
    pub fn load(&self) -> ContentPool {
        let mut pool = match read_json::<ContentPool>(&self.path) {
            Loaded::Ok(p) => p,
            Loaded::Missing => ContentPool::default(),
            Loaded::Corrupt(reason) => {
                warn!(path = %self.path.display(), %reason, "pool snapshot unreadable; treating as empty");
                ContentPool::default()
            }
        };
        // Snapshots written by older tooling may lack keys.
        for a in pool.articles.iter_mut() {
            if a.item_key.trim().is_empty() {
                a.url = a.url.as_deref().and_then(normalize_url);
                a.item_key = item_key(a.url.as_deref(), &a.title, &a.source, "");
            }
        }
        pool
    }

    pub fn replace(&self, pool: &ContentPool) -> Result<()> {
        let _write = self.lock();
        write_json_atomic(&self.path, pool)
    }

    /// Load, edit and replace the snapshot as one step under the write lock.
    /// When `apply` returns `None` the file is left untouched.
    pub fn update<R>(&self, apply: impl FnOnce(&mut ContentPool) -> Option<R>) -> Result<Option<R>> {
        let _write = self.lock();
        let mut pool = self.load();
        let Some(out) = apply(&mut pool) else {
            return Ok(None);
        };
        write_json_atomic(&self.path, &pool)?;
        Ok(Some(out))
    }

    /// Bump `recommended_count` of one pooled item. Returns whether the item was found.
    pub fn record_recommendation(&self, item_key: &str) -> Result<bool> {
        let bumped = self.update(|pool| {
            let item = pool.articles.iter_mut().find(|a| a.item_key == item_key)?;
            item.recommended_count = item.recommended_count.saturating_add(1);
            Some(())
        })?;
        Ok(bumped.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("content_pool.json");
        fs::write(&p, "][").unwrap();
        let store = PoolStore::new(&p);
        assert!(store.load().articles.is_empty());
    }

    #[test]
    fn legacy_articles_get_keys_and_counts_bump() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("content_pool.json");
        fs::write(
            &p,
            r#"{"articles":[{"title":"T","url":"HTTPS://A.test/x/","source":"S","tags":["ai"]}],"pool_size":1}"#,
        )
        .unwrap();
        let store = PoolStore::new(&p);
        let pool = store.load();
        let key = pool.articles[0].item_key.clone();
        assert_eq!(key.len(), 64);
        assert_eq!(pool.articles[0].url.as_deref(), Some("https://a.test/x"));

        assert!(store.record_recommendation(&key).unwrap());
        assert!(!store.record_recommendation("nope").unwrap());
        assert_eq!(store.load().articles[0].recommended_count, 1);
    }

    #[test]
    fn concurrent_bumps_from_separate_stores_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("content_pool.json");
        fs::write(
            &p,
            r#"{"articles":[{"item_key":"k1","title":"T","url":"https://a.test/1","source":"S"}],"pool_size":1}"#,
        )
        .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = PoolStore::new(&p);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        assert!(store.record_recommendation("k1").unwrap());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(PoolStore::new(&p).load().articles[0].recommended_count, 100);
    }

    #[test]
    fn update_returning_none_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("content_pool.json");
        let store = PoolStore::new(&p);
        assert_eq!(store.update(|_| None::<()>).unwrap(), None);
        assert!(!p.exists());
    }
}
