//! Storage facade
//!
//! Derives keys and delegates to the active backend. HTTP handlers only talk
//! to the storage through this service.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{Result, ShortenerError};
use crate::storage::{OwnerId, Storage, UrlRecord};

/// Counters reported by the stats endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub urls: u64,
    pub users: u64,
}

/// Service for short URL operations
pub struct UrlService {
    storage: Arc<dyn Storage>,
}

impl UrlService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn backend_name(&self) -> &'static str {
        self.storage.backend_name()
    }

    fn build_record(original_url: &str) -> Result<UrlRecord> {
        let original_url = original_url.trim();
        if original_url.is_empty() {
            return Err(ShortenerError::validation("URL cannot be empty"));
        }
        Ok(UrlRecord::new(original_url))
    }

    /// Store `original_url` and return its key.
    ///
    /// A URL that is already stored yields `Conflict { key }` with the stored key.
    pub async fn shorten(&self, original_url: &str, owner: Option<OwnerId>) -> Result<String> {
        let record = Self::build_record(original_url)?;

        let result = match owner.filter(|id| *id > 0) {
            Some(owner) => self.storage.save_with_owner(owner, &record).await,
            None => self.storage.save(&record).await,
        };

        match result {
            Ok(()) => {
                debug!("UrlService: shortened '{}' -> {}", record.original_url, record.short_key);
                Ok(record.short_key)
            }
            Err(e) => {
                if e.conflict_key().is_none() {
                    warn!("UrlService: failed to store '{}': {}", record.original_url, e);
                }
                Err(e)
            }
        }
    }

    /// Store a list of URLs and return their keys in input order.
    pub async fn shorten_batch(
        &self,
        original_urls: &[String],
        owner: Option<OwnerId>,
    ) -> Result<Vec<String>> {
        let records = original_urls
            .iter()
            .map(|url| Self::build_record(url))
            .collect::<Result<Vec<_>>>()?;

        match owner.filter(|id| *id > 0) {
            Some(owner) => self.storage.save_batch_with_owner(owner, &records).await?,
            None => self.storage.save_batch(&records).await?,
        }

        info!("UrlService: stored batch of {} URLs", records.len());
        Ok(records.into_iter().map(|r| r.short_key).collect())
    }

    pub async fn original_url(&self, key: &str) -> Result<String> {
        self.storage.get(key).await
    }

    /// Records owned by `owner` that have not been deleted.
    pub async fn owner_urls(&self, owner: OwnerId) -> Result<Vec<UrlRecord>> {
        let mut records = self.storage.get_owner_urls(owner).await?;
        records.retain(|r| !r.deleted);
        Ok(records)
    }

    /// Queue `keys` for soft deletion under `owner`.
    ///
    /// Returns once the batch is open; the keys are fed and applied in the
    /// background. The handle resolves when the whole batch has been handled.
    pub fn delete_urls(&self, owner: OwnerId, keys: Vec<String>) -> Result<JoinHandle<()>> {
        let batch = self.storage.delete_batch_for_owner(owner)?;
        let count = keys.len();

        let feeder = tokio::spawn(async move {
            for key in keys {
                if let Err(e) = batch.push(key).await {
                    warn!("UrlService: deletion batch for owner {} closed early: {}", owner, e);
                    break;
                }
            }
            if let Err(e) = batch.close().await {
                warn!("UrlService: deletion worker for owner {} failed: {}", owner, e);
            }
        });

        debug!("UrlService: accepted {} keys for deletion (owner {})", count, owner);
        Ok(feeder)
    }

    pub async fn create_owner(&self) -> Result<OwnerId> {
        self.storage.create_owner().await
    }

    pub async fn ping(&self) -> Result<()> {
        self.storage.ping().await
    }

    pub async fn stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            urls: self.storage.count_urls().await?,
            users: self.storage.count_owners().await?,
        })
    }
}
