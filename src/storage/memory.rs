//! In-process volatile backend
//!
//! Nothing survives a restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::errors::{Result, ShortenerError};
use crate::storage::deletion::{DEFAULT_QUEUE_CAPACITY, DeleteBatch, SoftDeleter};
use crate::storage::models::{OwnerId, UrlRecord, normalize_owner};
use crate::storage::Storage;

struct Entry {
    url: String,
    deleted: bool,
}

/// key→URL 与 key→owner 两张表，总是在同一把写锁下一起修改
#[derive(Default)]
struct Tables {
    urls: HashMap<String, Entry>,
    owners: HashMap<String, OwnerId>,
}

impl Tables {
    fn insert(&mut self, owner: Option<OwnerId>, record: &UrlRecord) -> Result<()> {
        if let Some(existing) = self.urls.get(&record.short_key) {
            if existing.url == record.original_url {
                return Err(ShortenerError::conflict(&record.short_key));
            }
            return Err(ShortenerError::validation(format!(
                "key {} already maps to a different URL",
                record.short_key
            )));
        }

        self.urls.insert(
            record.short_key.clone(),
            Entry {
                url: record.original_url.clone(),
                deleted: false,
            },
        );
        if let Some(owner) = normalize_owner(owner.or(record.owner_id)) {
            self.owners.insert(record.short_key.clone(), owner);
        }
        Ok(())
    }

    fn soft_delete(&mut self, owner: OwnerId, key: &str) -> bool {
        if self.owners.get(key) != Some(&owner) {
            return false;
        }
        match self.urls.get_mut(key) {
            Some(entry) if !entry.deleted => {
                entry.deleted = true;
                true
            }
            _ => false,
        }
    }
}

pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
    queue_capacity: usize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

struct MemoryDeleter {
    tables: Arc<RwLock<Tables>>,
}

#[async_trait]
impl SoftDeleter for MemoryDeleter {
    async fn soft_delete(&mut self, owner: OwnerId, key: &str) -> Result<bool> {
        Ok(self.tables.write().soft_delete(owner, key))
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn insert(&self, owner: Option<OwnerId>, record: &UrlRecord) -> Result<()> {
        self.tables.write().insert(owner, record)?;
        trace!("Stored {} in memory", record.short_key);
        Ok(())
    }

    async fn insert_batch(&self, owner: Option<OwnerId>, records: &[UrlRecord]) -> Result<()> {
        let mut tables = self.tables.write();
        let mut skipped = 0usize;
        for record in records {
            match tables.insert(owner, record) {
                Ok(()) => {}
                Err(ShortenerError::Conflict { .. }) => skipped += 1,
                Err(e) => return Err(e),
            }
        }
        debug!(
            "Memory batch applied: {} stored, {} already present",
            records.len() - skipped,
            skipped
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String> {
        let tables = self.tables.read();
        match tables.urls.get(key) {
            Some(entry) if entry.deleted => Err(ShortenerError::gone(key)),
            Some(entry) => Ok(entry.url.clone()),
            None => Err(ShortenerError::not_found(key)),
        }
    }

    async fn get_owner_urls(&self, owner: OwnerId) -> Result<Vec<UrlRecord>> {
        let tables = self.tables.read();
        let records = tables
            .owners
            .iter()
            .filter(|(_, id)| **id == owner && owner > 0)
            .filter_map(|(key, id)| {
                tables.urls.get(key).map(|entry| UrlRecord {
                    short_key: key.clone(),
                    original_url: entry.url.clone(),
                    owner_id: Some(*id),
                    deleted: entry.deleted,
                })
            })
            .collect();
        Ok(records)
    }

    fn delete_batch_for_owner(&self, owner: OwnerId) -> Result<DeleteBatch> {
        let deleter = MemoryDeleter {
            tables: Arc::clone(&self.tables),
        };
        Ok(DeleteBatch::spawn(owner, self.queue_capacity, deleter))
    }

    async fn create_owner(&self) -> Result<OwnerId> {
        Ok(rand::random_range(1..=OwnerId::MAX))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn count_urls(&self) -> Result<u64> {
        Ok(self.tables.read().urls.len() as u64)
    }

    async fn count_owners(&self) -> Result<u64> {
        Err(ShortenerError::unsupported(
            "owner counting is not supported by the memory backend",
        ))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_conflict_returns_first_key() {
        let storage = MemoryStorage::new();
        let record = UrlRecord::new("https://example.com");
        storage.save(&record).await.unwrap();

        let err = storage.save_with_owner(9, &record).await.unwrap_err();
        assert_eq!(err.conflict_key(), Some(record.short_key.as_str()));
        assert!(storage.get_owner_urls(9).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_key_collision_is_not_conflict() {
        let storage = MemoryStorage::new();
        let mut forged = UrlRecord::new("https://a.example");
        storage.save(&forged).await.unwrap();
        forged.original_url = "https://b.example".to_string();

        let err = storage.save(&forged).await.unwrap_err();
        assert!(matches!(err, ShortenerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_batch_skips_stored_urls() {
        let storage = MemoryStorage::new();
        let a = UrlRecord::new("https://a.example");
        let b = UrlRecord::new("https://b.example");
        storage.save(&a).await.unwrap();

        storage
            .save_batch_with_owner(4, &[a.clone(), b.clone()])
            .await
            .unwrap();

        let owned = storage.get_owner_urls(4).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].short_key, b.short_key);
        assert_eq!(storage.count_urls().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_soft_delete_requires_owner_match() {
        let storage = MemoryStorage::new();
        let record = UrlRecord::new("https://owned.example");
        storage.save_with_owner(1, &record).await.unwrap();

        let mut tables = storage.tables.write();
        assert!(!tables.soft_delete(2, &record.short_key));
        assert!(tables.soft_delete(1, &record.short_key));
        assert!(!tables.soft_delete(1, &record.short_key));
    }

    #[tokio::test]
    async fn test_anonymous_records_are_never_owned() {
        let storage = MemoryStorage::new();
        storage
            .save_with_owner(0, &UrlRecord::new("https://anon.example"))
            .await
            .unwrap();
        assert!(storage.get_owner_urls(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_count_owners_unsupported() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.count_owners().await,
            Err(ShortenerError::Unsupported(_))
        ));
        assert!(storage.create_owner().await.unwrap() > 0);
    }
}
