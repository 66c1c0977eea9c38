pub mod helpers;
pub mod redirect;
pub mod shorten;
pub mod system;
pub mod user_urls;

pub use helpers::AppState;
pub use redirect::{RedirectService, redirect_routes};
pub use shorten::{ShortenService, shorten_routes};
pub use system::{SystemService, system_routes};
pub use user_urls::{UserUrlsService, user_urls_routes};

use actix_web::web;

/// Register every route in matching order.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(system_routes)
        .configure(shorten_routes)
        .configure(user_urls_routes)
        .configure(redirect_routes);
}
