//! Server mode
//!
//! Builds the storage stack and serves the HTTP routes until Ctrl+C.

use actix_web::{App, HttpServer, web};
use anyhow::Result;
use tracing::{error, warn};

use crate::api::constants::JSON_BODY_LIMIT;
use crate::api::middleware::{AdmissionControl, OwnerSession};
use crate::api::services::{AppState, configure_routes};
use crate::config::get_config;
use crate::runtime::lifetime;

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let config = get_config();

    let startup = lifetime::startup::prepare_server_startup(&config)
        .await
        .map_err(|e| {
            error!("Server startup failed: {}", e);
            e
        })?;

    let state = web::Data::new(AppState::new(
        startup.service.clone(),
        startup.tokens.clone(),
        &config.server.base_url,
        &config.session.cookie_name,
    ));
    let tokens = startup.tokens.clone();
    let cookie_name = config.session.cookie_name.clone();

    let admission = AdmissionControl::from_limiter(startup.limiter.clone());

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(OwnerSession::new(tokens.clone(), &cookie_name))
            .wrap(admission.clone())
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().limit(JSON_BODY_LIMIT))
            .app_data(web::PayloadConfig::new(JSON_BODY_LIMIT))
            .configure(configure_routes)
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server.bind(bind_address)?.run();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown() => {
            warn!("Graceful shutdown complete");
        }
    }

    Ok(())
}
