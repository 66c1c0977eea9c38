//! Append-only JSON-lines backend
//!
//! 每次写入在文件末尾追加一行 JSON，记录从不原地改写，因此不支持删除。
//! 一把异步锁串行化每次 打开-扫描-写入-关闭 的完整周期。

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use crate::errors::{Result, ShortenerError};
use crate::storage::deletion::DeleteBatch;
use crate::storage::models::{OwnerId, UrlRecord, normalize_owner};
use crate::storage::Storage;

/// One line of the log file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub key: String,
    pub url: String,
    /// 0 表示匿名
    #[serde(default)]
    pub owner_id: OwnerId,
    #[serde(default)]
    pub deleted: bool,
}

impl From<LogEntry> for UrlRecord {
    fn from(entry: LogEntry) -> Self {
        UrlRecord {
            short_key: entry.key,
            original_url: entry.url,
            owner_id: normalize_owner(Some(entry.owner_id)),
            deleted: entry.deleted,
        }
    }
}

struct LogState {
    /// 只在持有锁时读写
    last_id: Option<u64>,
}

pub struct FileStorage {
    path: PathBuf,
    state: Mutex<LogState>,
}

/// Streaming reader over the log, one entry per non-empty line.
struct LogReader {
    lines: Option<Lines<BufReader<File>>>,
    line_no: usize,
}

impl LogReader {
    async fn open(path: &Path) -> Result<Self> {
        let lines = match File::open(path).await {
            Ok(file) => Some(BufReader::new(file).lines()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(ShortenerError::file_operation(format!(
                    "Failed to open {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        Ok(Self { lines, line_no: 0 })
    }

    async fn next(&mut self) -> Result<Option<LogEntry>> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };
        while let Some(line) = lines.next_line().await? {
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str::<LogEntry>(&line).map_err(|e| {
                ShortenerError::serialization(format!("line {}: {}", self.line_no, e))
            })?;
            return Ok(Some(entry));
        }
        Ok(None)
    }
}

impl FileStorage {
    /// Open (or create) the log at `path`.
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        Self::open_for_append(&path).await?;

        info!("File storage initialized at {}", path.display());
        Ok(Self {
            path,
            state: Mutex::new(LogState { last_id: None }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open_for_append(path: &Path) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| {
                ShortenerError::file_operation(format!("Failed to open {}: {}", path.display(), e))
            })
    }

    /// Scan the whole log: fills the id cache and collects the stored URLs.
    async fn scan_urls(&self, state: &mut LogState) -> Result<HashMap<String, String>> {
        let mut reader = LogReader::open(&self.path).await?;
        let mut urls = HashMap::new();
        let mut last_seen = None;
        while let Some(entry) = reader.next().await? {
            last_seen = Some(entry.id);
            urls.entry(entry.url).or_insert(entry.key);
        }
        if state.last_id.is_none() {
            state.last_id = last_seen;
        }
        Ok(urls)
    }

    async fn append(&self, state: &mut LogState, entries: Vec<(OwnerId, &UrlRecord)>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut next_id = state.last_id.unwrap_or(0);
        let mut buf = Vec::new();
        for (owner, record) in entries {
            next_id += 1;
            let entry = LogEntry {
                id: next_id,
                key: record.short_key.clone(),
                url: record.original_url.clone(),
                owner_id: owner,
                deleted: false,
            };
            serde_json::to_writer(&mut buf, &entry)?;
            buf.push(b'\n');
        }

        let mut file = Self::open_for_append(&self.path).await?;
        file.write_all(&buf).await?;
        file.flush().await?;

        state.last_id = Some(next_id);
        Ok(())
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn insert(&self, owner: Option<OwnerId>, record: &UrlRecord) -> Result<()> {
        let mut state = self.state.lock().await;
        let urls = self.scan_urls(&mut state).await?;

        if let Some(existing) = urls.get(&record.original_url) {
            return Err(ShortenerError::conflict(existing));
        }

        let owner = normalize_owner(owner.or(record.owner_id)).unwrap_or(0);
        self.append(&mut state, vec![(owner, record)]).await?;
        trace!("Appended {} to {}", record.short_key, self.path.display());
        Ok(())
    }

    async fn insert_batch(&self, owner: Option<OwnerId>, records: &[UrlRecord]) -> Result<()> {
        let mut state = self.state.lock().await;
        let urls = self.scan_urls(&mut state).await?;

        let mut seen: HashSet<&str> = HashSet::new();
        let fresh: Vec<_> = records
            .iter()
            .filter(|&r| !urls.contains_key(&r.original_url) && seen.insert(r.original_url.as_str()))
            .map(|r| (normalize_owner(owner.or(r.owner_id)).unwrap_or(0), r))
            .collect();

        let stored = fresh.len();
        self.append(&mut state, fresh).await?;
        debug!(
            "File batch applied: {} stored, {} already present",
            stored,
            records.len() - stored
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String> {
        let _state = self.state.lock().await;
        let mut reader = LogReader::open(&self.path).await?;
        while let Some(entry) = reader.next().await? {
            if entry.key == key {
                if entry.deleted {
                    return Err(ShortenerError::gone(key));
                }
                return Ok(entry.url);
            }
        }
        Err(ShortenerError::not_found(key))
    }

    async fn get_owner_urls(&self, owner: OwnerId) -> Result<Vec<UrlRecord>> {
        if owner <= 0 {
            return Ok(Vec::new());
        }
        let _state = self.state.lock().await;
        let mut reader = LogReader::open(&self.path).await?;
        let mut records = Vec::new();
        while let Some(entry) = reader.next().await? {
            if entry.owner_id == owner {
                records.push(entry.into());
            }
        }
        Ok(records)
    }

    fn delete_batch_for_owner(&self, _owner: OwnerId) -> Result<DeleteBatch> {
        Err(ShortenerError::unsupported(
            "deletion is not supported by the file backend",
        ))
    }

    async fn create_owner(&self) -> Result<OwnerId> {
        Ok(rand::random_range(1..=OwnerId::MAX))
    }

    async fn ping(&self) -> Result<()> {
        let _state = self.state.lock().await;
        Self::open_for_append(&self.path).await.map(|_| ())
    }

    async fn count_urls(&self) -> Result<u64> {
        let _state = self.state.lock().await;
        let mut reader = LogReader::open(&self.path).await?;
        let mut count = 0u64;
        while reader.next().await?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    async fn count_owners(&self) -> Result<u64> {
        Err(ShortenerError::unsupported(
            "owner counting is not supported by the file backend",
        ))
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn storage_in(dir: &TempDir) -> FileStorage {
        FileStorage::new(dir.path().join("short-url-db.json"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_ids_continue_across_instances() {
        let dir = TempDir::new().unwrap();
        {
            let storage = storage_in(&dir).await;
            storage.save(&UrlRecord::new("https://one.example")).await.unwrap();
        }
        let storage = storage_in(&dir).await;
        storage.save(&UrlRecord::new("https://two.example")).await.unwrap();

        let content = std::fs::read_to_string(storage.path()).unwrap();
        let ids: Vec<u64> = content
            .lines()
            .map(|l| serde_json::from_str::<LogEntry>(l).unwrap().id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_owner_written_as_zero_when_anonymous() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir).await;
        storage.save(&UrlRecord::new("https://anon.example")).await.unwrap();

        let content = std::fs::read_to_string(storage.path()).unwrap();
        let entry: LogEntry = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(entry.owner_id, 0);
        assert!(!entry.deleted);
    }

    #[tokio::test]
    async fn test_batch_skips_duplicates_within_and_across() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir).await;
        let a = UrlRecord::new("https://a.example");
        let b = UrlRecord::new("https://b.example");
        storage.save(&a).await.unwrap();

        storage
            .save_batch_with_owner(5, &[a.clone(), b.clone(), b.clone()])
            .await
            .unwrap();

        assert_eq!(storage.count_urls().await.unwrap(), 2);
        let owned = storage.get_owner_urls(5).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].short_key, b.short_key);
    }

    #[tokio::test]
    async fn test_deleted_line_reads_as_gone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short-url-db.json");
        std::fs::write(
            &path,
            "{\"id\":1,\"key\":\"abcdefghijklmnop\",\"url\":\"https://x.example\",\"owner_id\":3,\"deleted\":true}\n",
        )
        .unwrap();
        let storage = FileStorage::new(&path).await.unwrap();

        assert!(matches!(
            storage.get("abcdefghijklmnop").await,
            Err(ShortenerError::Gone(_))
        ));
        assert!(matches!(
            storage.get("zzzzzzzzzzzzzzzz").await,
            Err(ShortenerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_line_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short-url-db.json");
        std::fs::write(&path, "not json\n").unwrap();
        let storage = FileStorage::new(&path).await.unwrap();

        let err = storage.get("abcdefghijklmnop").await.unwrap_err();
        assert!(matches!(err, ShortenerError::Serialization(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_unsupported_operations() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir).await;
        assert!(matches!(
            storage.delete_batch_for_owner(1),
            Err(ShortenerError::Unsupported(_))
        ));
        assert!(matches!(
            storage.count_owners().await,
            Err(ShortenerError::Unsupported(_))
        ));
    }
}
