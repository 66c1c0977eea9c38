//! 存储契约集成测试
//!
//! 三种后端共享同一组行为：以 URL 去重、owner 归属、NotFound / Gone 区分。

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use url_shortener::config::StorageConfig;
use url_shortener::errors::ShortenerError;
use url_shortener::storage::file::LogEntry;
use url_shortener::storage::{FileStorage, MemoryStorage, SeaOrmStorage, Storage, UrlRecord};
use url_shortener::utils::derive_key;

// =============================================================================
// 测试环境初始化
// =============================================================================

async fn sqlite_storage(dir: &TempDir) -> SeaOrmStorage {
    let db_path = dir.path().join("storage_test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    SeaOrmStorage::new(&db_url, "sqlite", &StorageConfig::default())
        .await
        .expect("创建 SQLite 存储失败")
}

async fn all_backends(dir: &TempDir) -> Vec<Arc<dyn Storage>> {
    vec![
        Arc::new(MemoryStorage::new()),
        Arc::new(
            FileStorage::new(dir.path().join("short-url-db.json"))
                .await
                .unwrap(),
        ),
        Arc::new(sqlite_storage(dir).await),
    ]
}

// =============================================================================
// 契约：所有后端
// =============================================================================

#[tokio::test]
async fn test_repeat_save_conflicts_with_first_key() {
    let dir = TempDir::new().unwrap();
    for storage in all_backends(&dir).await {
        let record = UrlRecord::new("https://example.com");
        storage.save(&record).await.unwrap();

        let err = storage.save(&record).await.unwrap_err();
        assert_eq!(
            err.conflict_key(),
            Some(record.short_key.as_str()),
            "backend {}",
            storage.backend_name()
        );

        let err = storage.save_with_owner(3, &record).await.unwrap_err();
        assert_eq!(err.conflict_key(), Some(record.short_key.as_str()));
    }
}

#[tokio::test]
async fn test_get_distinguishes_missing_keys() {
    let dir = TempDir::new().unwrap();
    for storage in all_backends(&dir).await {
        let record = UrlRecord::new("https://get.example/path?q=1");
        storage.save(&record).await.unwrap();

        assert_eq!(
            storage.get(&record.short_key).await.unwrap(),
            "https://get.example/path?q=1"
        );
        assert!(
            matches!(
                storage.get(&derive_key(b"never written")).await,
                Err(ShortenerError::NotFound(_))
            ),
            "backend {}",
            storage.backend_name()
        );
    }
}

#[tokio::test]
async fn test_owner_scoped_listing() {
    let dir = TempDir::new().unwrap();
    for storage in all_backends(&dir).await {
        let mine = UrlRecord::new("https://mine.example");
        let theirs = UrlRecord::new("https://theirs.example");
        storage.save_with_owner(1, &mine).await.unwrap();
        storage.save_with_owner(2, &theirs).await.unwrap();
        storage.save(&UrlRecord::new("https://nobody.example")).await.unwrap();

        let owned = storage.get_owner_urls(1).await.unwrap();
        assert_eq!(owned.len(), 1, "backend {}", storage.backend_name());
        assert_eq!(owned[0].short_key, mine.short_key);
        assert_eq!(owned[0].original_url, mine.original_url);
        assert_eq!(owned[0].owner_id, Some(1));
        assert!(!owned[0].deleted);

        assert!(storage.get_owner_urls(99).await.unwrap().is_empty());
        assert_eq!(storage.count_urls().await.unwrap(), 3);
    }
}

#[tokio::test]
async fn test_ping_and_create_owner() {
    let dir = TempDir::new().unwrap();
    for storage in all_backends(&dir).await {
        storage.ping().await.unwrap();
        let a = storage.create_owner().await.unwrap();
        let b = storage.create_owner().await.unwrap();
        assert!(a > 0 && b > 0);
        assert_ne!(a, b);
    }
}

// =============================================================================
// 场景
// =============================================================================

#[tokio::test]
async fn test_memory_conflict_scenario() {
    let storage = MemoryStorage::new();
    let record = UrlRecord::new("https://example.com");
    storage.save(&record).await.unwrap();

    match storage.save(&record).await {
        Err(ShortenerError::Conflict { key }) => assert_eq!(key, record.short_key),
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn test_log_ids_follow_write_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short-url-db.json");
    let urls = [
        "https://one.example",
        "https://two.example",
        "https://three.example",
    ];

    {
        let storage = FileStorage::new(&path).await.unwrap();
        for url in urls {
            storage.save(&UrlRecord::new(url)).await.unwrap();
        }
    }

    let content = std::fs::read_to_string(&path).unwrap();
    let entries: Vec<LogEntry> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(
        entries.iter().map(|e| e.id).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    let fresh = FileStorage::new(&path).await.unwrap();
    for url in urls {
        let key = derive_key(url.as_bytes());
        assert_eq!(fresh.get(&key).await.unwrap(), url);
    }
}

#[tokio::test]
async fn test_log_concurrent_writers_get_unique_ids() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short-url-db.json");
    let storage = Arc::new(FileStorage::new(&path).await.unwrap());

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let storage = Arc::clone(&storage);
            tokio::spawn(async move {
                let record = UrlRecord::new(format!("https://concurrent.example/{}", i));
                storage.save(&record).await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    let ids: Vec<u64> = content
        .lines()
        .map(|line| serde_json::from_str::<LogEntry>(line).unwrap().id)
        .collect();
    assert_eq!(ids, (1..=20).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_batch_with_repeated_url_stores_it_once() {
    let dir = TempDir::new().unwrap();
    for storage in all_backends(&dir).await {
        let a = UrlRecord::new("https://twice.example");
        let b = UrlRecord::new("https://once.example");
        storage
            .save_batch_with_owner(6, &[a.clone(), b.clone(), a.clone()])
            .await
            .unwrap_or_else(|e| panic!("backend {}: {}", storage.backend_name(), e));

        assert_eq!(storage.get(&a.short_key).await.unwrap(), a.original_url);
        assert_eq!(storage.get_owner_urls(6).await.unwrap().len(), 2);
        assert_eq!(storage.count_urls().await.unwrap(), 2);
    }
}

#[tokio::test]
async fn test_relational_batch_rolls_back_on_violation() {
    let dir = TempDir::new().unwrap();
    let storage = sqlite_storage(&dir).await;

    let existing = UrlRecord::new("https://existing.example");
    storage.save(&existing).await.unwrap();

    let first = UrlRecord::new("https://first.example");
    let last = UrlRecord::new("https://last.example");
    let err = storage
        .save_batch_with_owner(7, &[first.clone(), existing.clone(), last.clone()])
        .await
        .unwrap_err();
    assert_eq!(err.conflict_key(), Some(existing.short_key.as_str()));

    for record in [&first, &last] {
        assert!(matches!(
            storage.get(&record.short_key).await,
            Err(ShortenerError::NotFound(_))
        ));
    }
    assert!(storage.get_owner_urls(7).await.unwrap().is_empty());
    assert_eq!(storage.count_urls().await.unwrap(), 1);
}

#[tokio::test]
async fn test_relational_batch_commits_all_rows() {
    let dir = TempDir::new().unwrap();
    let storage = sqlite_storage(&dir).await;

    let records: Vec<_> = (0..5)
        .map(|i| UrlRecord::new(format!("https://batch.example/{}", i)))
        .collect();
    storage.save_batch_with_owner(4, &records).await.unwrap();

    assert_eq!(storage.get_owner_urls(4).await.unwrap().len(), 5);
    for record in &records {
        assert_eq!(
            storage.get(&record.short_key).await.unwrap(),
            record.original_url
        );
    }
}

#[tokio::test]
async fn test_relational_owner_counting() {
    let dir = TempDir::new().unwrap();
    let storage = sqlite_storage(&dir).await;

    assert_eq!(storage.count_owners().await.unwrap(), 0);
    let first = storage.create_owner().await.unwrap();
    let second = storage.create_owner().await.unwrap();
    assert!(second > first);
    assert_eq!(storage.count_owners().await.unwrap(), 2);
}

#[tokio::test]
async fn test_relational_deadline_applies() {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig {
        query_timeout_ms: 1000,
        ..StorageConfig::default()
    };
    let db_url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("deadline.db").display()
    );
    let storage = SeaOrmStorage::new(&db_url, "sqlite", &config).await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), storage.ping()).await;
    assert!(matches!(result, Ok(Ok(()))));
}
