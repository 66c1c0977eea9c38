use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::jwt::OwnerTokenService;
use crate::config::StaticConfig;
use crate::services::{AdmissionLimiter, UrlService};
use crate::storage::StorageFactory;

pub struct StartupContext {
    pub service: Arc<UrlService>,
    pub tokens: Arc<OwnerTokenService>,
    /// `None` when admission control is disabled
    pub limiter: Option<Arc<AdmissionLimiter>>,
}

/// 准备服务器启动的上下文：存储、facade、会话签名与准入限流
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let storage = StorageFactory::create(config)
        .await
        .context("Failed to create storage backend")?;

    storage
        .ping()
        .await
        .context("Storage backend is not reachable")?;

    let service = Arc::new(UrlService::new(storage));
    let tokens = Arc::new(OwnerTokenService::from_config(&config.session));

    let limiter = if config.limiter.enabled {
        info!(
            "Admission control: {} requests per {}s",
            config.limiter.capacity, config.limiter.window_secs
        );
        Some(Arc::new(AdmissionLimiter::new(
            config.limiter.capacity,
            Duration::from_secs(config.limiter.window_secs),
        )))
    } else {
        warn!("Admission control disabled");
        None
    };

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        service,
        tokens,
        limiter,
    })
}
