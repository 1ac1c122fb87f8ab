use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use chrono::{Datelike, Utc};
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod leave;
mod model;
mod models;
mod routes;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::leave::directory::MySqlEmployeeDirectory;
use crate::leave::engine::LeaveEngine;
use crate::leave::mysql::MySqlLeaveStore;
use crate::leave::notify::LogNotifier;
use crate::leave::seed::seed_leave_balances;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Leave ledger is running"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config).await?;

    if config.approver_email.is_none() {
        warn!("APPROVER_EMAIL not set; submission notifications will fail and be logged");
    }

    let store = Arc::new(MySqlLeaveStore::new(pool.clone()));
    let directory = Arc::new(MySqlEmployeeDirectory::new(
        pool.clone(),
        config.employee_cache_ttl,
    ));
    let notifier = Arc::new(LogNotifier::new(
        config.public_base_url.clone(),
        config.approver_email.clone(),
        config.notify_log_links,
    ));
    let engine = Data::new(LeaveEngine::new(
        store.clone(),
        directory,
        notifier,
        config.engine_settings(),
    ));

    // 👇 clone what you need BEFORE moving config
    let server_addr = config.server_addr.clone();
    let config_data = config.clone();
    let seed_pool = pool.clone();
    let seed_types = config.seed_leave_types.clone();
    let seed_total = config.default_leave_total;

    actix_web::rt::spawn(async move {
        let year = Utc::now().year();
        if let Err(e) =
            seed_leave_balances(&seed_pool, store.as_ref(), &seed_types, year, seed_total).await
        {
            error!(error = %e, year, "Failed to seed leave balances");
        }
    });

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(engine.clone())
            .service(index)
            // public decision links + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
