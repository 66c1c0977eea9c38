//! 异步批量软删除管道
//!
//! `Storage::delete_batch_for_owner` 返回一个 [`DeleteBatch`]：调用方把短链接 key
//! 推入有界队列后关闭它，后台任务逐个执行 `(owner, key)` 条件软删除。
//! 调用方拿不到逐 key 的结果。

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use crate::errors::{Result, ShortenerError};
use crate::storage::models::OwnerId;

/// 默认队列容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// Backend half of the pipeline: applies one conditional soft delete at a time.
#[async_trait]
pub trait SoftDeleter: Send + 'static {
    /// Mark `key` deleted if and only if it is owned by `owner`.
    ///
    /// Returns whether a record was flipped.
    async fn soft_delete(&mut self, owner: OwnerId, key: &str) -> Result<bool>;

    /// Transactional deleters only see keys after the queue is closed,
    /// and stop applying them after the first failure.
    fn aborts_on_failure(&self) -> bool {
        false
    }

    /// Called once after the queue is closed and no key failed fatally.
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once after the first failure of an aborting deleter.
    async fn abort(&mut self) {}
}

/// 删除批次的写入端
///
/// Dropping it or calling [`DeleteBatch::close`] ends the batch.
pub struct DeleteBatch {
    owner: OwnerId,
    tx: mpsc::Sender<String>,
    worker: JoinHandle<()>,
}

impl DeleteBatch {
    /// Spawn the background worker for one batch. Must run inside a tokio runtime.
    pub fn spawn<D: SoftDeleter>(owner: OwnerId, capacity: usize, deleter: D) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(drain(owner, rx, deleter));
        debug!("Deletion batch opened for owner {}", owner);
        Self { owner, tx, worker }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Queue one key, waiting while the queue is full.
    pub async fn push(&self, key: impl Into<String>) -> Result<()> {
        self.tx
            .send(key.into())
            .await
            .map_err(|_| ShortenerError::internal("deletion worker is no longer running"))
    }

    /// Close the queue. The returned handle resolves once every queued key was handled.
    pub fn close(self) -> JoinHandle<()> {
        let Self { tx, worker, .. } = self;
        drop(tx);
        worker
    }
}

async fn drain<D: SoftDeleter>(owner: OwnerId, mut rx: mpsc::Receiver<String>, mut deleter: D) {
    let mut tally = Tally::default();

    if deleter.aborts_on_failure() {
        // 先收齐再开事务，调用方推送期间不占用连接
        let mut keys = Vec::new();
        while let Some(key) = rx.recv().await {
            keys.push(key);
        }
        trace!("Deletion batch for owner {} collected {} keys", owner, keys.len());
        for key in keys {
            tally.step(owner, &key, &mut deleter).await;
        }
    } else {
        while let Some(key) = rx.recv().await {
            tally.step(owner, &key, &mut deleter).await;
        }
    }

    if tally.aborted {
        warn!(
            "Deletion batch for owner {} rolled back, {} queued keys discarded",
            owner, tally.discarded
        );
        return;
    }

    if let Err(e) = deleter.finish().await {
        error!("Deletion batch for owner {} failed to commit: {}", owner, e);
        return;
    }

    debug!(
        "Deletion batch for owner {} done: {} deleted, {} skipped, {} failed",
        owner, tally.applied, tally.skipped, tally.failures
    );
}

#[derive(Default)]
struct Tally {
    applied: usize,
    skipped: usize,
    discarded: usize,
    failures: usize,
    aborted: bool,
}

impl Tally {
    async fn step<D: SoftDeleter>(&mut self, owner: OwnerId, key: &str, deleter: &mut D) {
        if self.aborted {
            self.discarded += 1;
            return;
        }

        match deleter.soft_delete(owner, key).await {
            Ok(true) => self.applied += 1,
            Ok(false) => {
                trace!("Key {} not owned by {}, nothing to delete", key, owner);
                self.skipped += 1;
            }
            Err(e) => {
                self.failures += 1;
                if self.failures == 1 {
                    error!("Soft delete of {} for owner {} failed: {}", key, owner, e);
                } else {
                    debug!("Soft delete of {} for owner {} failed: {}", key, owner, e);
                }
                if deleter.aborts_on_failure() {
                    deleter.abort().await;
                    self.aborted = true;
                }
            }
        }
    }
}
