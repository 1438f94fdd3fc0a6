use std::sync::Arc;

use maxdate_api::config::{AppConfig, PhotoBackend, StoreBackend};
use maxdate_api::{create_router, AppState};
use maxdate_core::{CityDirectory, LogMailer, Mailer, MemoryPhotoStorage, PgStore, PhotoStorage, Stores};
use maxdate_shared::clients::db::create_pool;
use maxdate_shared::clients::email::EmailClient;
use maxdate_shared::clients::minio::MinioClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    maxdate_shared::middleware::init_tracing("maxdate-api");

    let config = AppConfig::load()?;
    let port = config.port;
    let metrics = maxdate_shared::middleware::init_metrics()?;

    let stores = match config.store {
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database_url, config.db_pool_size)?;
            Stores::from_backend(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, data is lost on restart");
            Stores::memory()
        }
    };

    let mailer: Arc<dyn Mailer> = if config.resend_api_key.is_empty() {
        tracing::warn!("no Resend API key configured, emails are only logged");
        Arc::new(LogMailer)
    } else {
        Arc::new(EmailClient::new(
            &config.resend_api_key,
            &config.from_email,
            &config.from_name,
            &config.frontend_url,
        ))
    };

    let storage: Arc<dyn PhotoStorage> = match config.photo_storage {
        PhotoBackend::Minio => Arc::new(
            MinioClient::new(
                &config.minio_endpoint,
                &config.minio_access_key,
                &config.minio_secret_key,
                &config.minio_bucket,
                &config.minio_public_url,
            )
            .await,
        ),
        PhotoBackend::Memory => Arc::new(MemoryPhotoStorage::new(format!("http://localhost:{port}/photos"))),
    };

    let cities = Arc::new(CityDirectory::embedded()?);
    tracing::info!(count = cities.len(), "city directory loaded");

    let state = Arc::new(AppState::new(config, stores, mailer, storage, cities, Some(metrics)));
    let app = create_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "maxdate-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
