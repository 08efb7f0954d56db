use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// One async read/write lock per collection name, created on first use and
/// dropped once no guard or waiter refers to it.
#[derive(Debug, Default)]
pub struct CollectionLocks {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl CollectionLocks {
    fn lock_for(&self, name: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock();
        locks.retain(|key, lock| key == name || Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(name.to_string()).or_default())
    }

    /// Shared access for queries.
    pub async fn read(&self, name: &str) -> OwnedRwLockReadGuard<()> {
        self.lock_for(name).read_owned().await
    }

    /// Exclusive access for the duration of an ingestion run.
    pub async fn write(&self, name: &str) -> OwnedRwLockWriteGuard<()> {
        self.lock_for(name).write_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_writer_blocks_readers_of_same_collection() {
        let locks = Arc::new(CollectionLocks::default());
        let guard = locks.write("books").await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.read("books")).await;
        assert!(blocked.is_err());

        drop(guard);
        let reader = tokio::time::timeout(Duration::from_millis(50), locks.read("books")).await;
        assert!(reader.is_ok());
    }

    #[tokio::test]
    async fn test_other_collections_unaffected() {
        let locks = CollectionLocks::default();
        let _writer = locks.write("books").await;

        let other = tokio::time::timeout(Duration::from_millis(50), locks.read("papers")).await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn test_idle_locks_are_pruned() {
        let locks = CollectionLocks::default();
        for i in 0..10 {
            drop(locks.write(&format!("c{i}")).await);
        }
        let held = locks.read("kept").await;
        drop(locks.read("other").await);

        let names: Vec<String> = {
            let mut names: Vec<_> = locks.locks.lock().keys().cloned().collect();
            names.sort();
            names
        };
        assert_eq!(names, vec!["kept".to_string(), "other".to_string()]);
        drop(held);
    }

    #[tokio::test]
    async fn test_readers_share() {
        let locks = CollectionLocks::default();
        let _first = locks.read("books").await;
        let second = tokio::time::timeout(Duration::from_millis(50), locks.read("books")).await;
        assert!(second.is_ok());
    }
}
