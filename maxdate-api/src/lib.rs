use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRef};
use axum::routing::{delete, get, post, put};
use axum::{middleware, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use maxdate_core::mailer::Mailer;
use maxdate_core::services::{
    AccountService, FeedSelector, MatchService, MatchingEngine, PhotoService, ProfileService,
};
use maxdate_core::{CityDirectory, PhotoStorage, Stores};
use maxdate_shared::middleware::{metrics_middleware, JwtKeys};

pub mod config;
pub mod routes;
pub mod services;

use config::AppConfig;

/// Multipart framing on top of the photo itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub struct AppState {
    pub config: AppConfig,
    pub jwt: JwtKeys,
    pub stores: Stores,
    pub cities: Arc<CityDirectory>,
    pub accounts: AccountService,
    pub profiles: ProfileService,
    pub photos: PhotoService,
    pub feed: FeedSelector,
    pub engine: MatchingEngine,
    pub matches: MatchService,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        stores: Stores,
        mailer: Arc<dyn Mailer>,
        storage: Arc<dyn PhotoStorage>,
        cities: Arc<CityDirectory>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            jwt: JwtKeys::new(&config.jwt_secret),
            accounts: AccountService::new(&stores, mailer.clone(), storage.clone()),
            profiles: ProfileService::new(&stores, cities.clone()),
            photos: PhotoService::new(&stores, storage, config.max_photo_bytes),
            feed: FeedSelector::new(&stores, cities.clone()),
            engine: MatchingEngine::new(&stores, mailer),
            matches: MatchService::new(&stores, cities.clone()),
            config,
            stores,
            cities,
            metrics,
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_photo_bytes + MULTIPART_OVERHEAD_BYTES;

    let api = Router::new()
        // Auth
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/confirm-email", get(routes::auth::confirm_email))
        .route("/auth/request-reset", post(routes::auth::request_password_reset))
        .route("/auth/reset-password", post(routes::auth::reset_password))
        .route("/auth/change-password", post(routes::auth::change_password))
        // Account
        .route("/users/me", get(routes::users::get_me).delete(routes::users::delete_me))
        .route("/users/me/deactivate", delete(routes::users::deactivate_me))
        // Profiles and photos
        .route("/profiles", post(routes::profiles::create_profile).put(routes::profiles::update_profile))
        .route("/profiles/me", get(routes::profiles::get_own_profile))
        .route("/profiles/photos", post(routes::photos::upload_photo))
        .route("/profiles/photos/:photo_id", delete(routes::photos::delete_photo))
        .route("/profiles/photos/:photo_id/main", put(routes::photos::set_main_photo))
        .route("/profiles/:profile_id", get(routes::profiles::get_profile))
        // Cities
        .route("/cities", get(routes::cities::list_cities))
        // Feed, likes, matches
        .route("/likes/feed", get(routes::likes::get_feed))
        .route("/likes/like/:user_id", post(routes::likes::like))
        .route("/likes/dislike/:user_id", post(routes::likes::dislike))
        .route("/likes/matches", get(routes::likes::get_matches))
        .route("/likes/matches/unviewed-count", get(routes::likes::unviewed_count))
        .route("/likes/matches/:match_id/view", post(routes::likes::mark_match_viewed));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .nest("/api", api)
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
