use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod form;
mod listing;
mod model;
mod repository;
mod requests;
mod routes;
mod tax_lookup;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::repository::{MySqlStore, ProfileRepository, RequestRepository, UserRepository};
use crate::tax_lookup::TaxLookup;
use crate::utils::email_registry;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let pool = init_db(&config.database_url)
        .await
        .context("could not connect to DATABASE_URL")?;

    let store = Arc::new(MySqlStore::new(pool.clone()));
    let request_repo: Arc<dyn RequestRepository> = store.clone();
    let profile_repo: Arc<dyn ProfileRepository> = store.clone();
    let user_repo: Arc<dyn UserRepository> = store;

    let tax = Data::new(
        TaxLookup::new(Duration::from_secs(config.tax_lookup_timeout_secs))
            .context("could not build the tax lookup HTTP client")?,
    );

    let pool_for_warmup = pool.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = email_registry::warmup_email_registry(&pool_for_warmup, 500).await {
            warn!(error = ?e, "Failed to warm up email registry");
        }
    });

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard {_:.*} matches the bundled JS/CSS
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(Data::from(request_repo.clone()))
            .app_data(Data::from(profile_repo.clone()))
            .app_data(Data::from(user_repo.clone()))
            .app_data(tax.clone())
            .configure(|cfg| routes::configure(cfg, &config_data))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
