use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use maxdate_core::services::feed::FeedCandidate;
use maxdate_core::services::matches::MatchSummary;
use maxdate_core::services::matching::LikeResult;
use maxdate_shared::errors::AppResult;
use maxdate_shared::types::api::MessageBody;
use maxdate_shared::types::auth::AuthUser;
use maxdate_shared::types::{ApiResponse, PaginationParams};

use crate::AppState;

pub async fn get_feed(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Vec<FeedCandidate>>>> {
    let feed = state.feed.get_feed(user.id, page.page, page.limit).await?;
    Ok(Json(ApiResponse::ok(feed)))
}

pub async fn like(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<LikeResult>>> {
    let result = state.engine.like(user.id, target_id).await?;
    Ok(Json(ApiResponse::ok(result)))
}

pub async fn dislike(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MessageBody>>> {
    state.engine.dislike(user.id, target_id).await?;
    Ok(Json(ApiResponse::message("dislike recorded")))
}

pub async fn get_matches(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<MatchSummary>>>> {
    let matches = state.matches.get_matches(user.id).await?;
    Ok(Json(ApiResponse::ok(matches)))
}

pub async fn mark_match_viewed(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MessageBody>>> {
    state.matches.mark_match_as_viewed(user.id, match_id).await?;
    Ok(Json(ApiResponse::message("match marked as viewed")))
}

#[derive(Debug, Serialize)]
pub struct UnviewedCount {
    pub count: i64,
}

pub async fn unviewed_count(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UnviewedCount>>> {
    let count = state.matches.get_unviewed_match_count(user.id).await?;
    Ok(Json(ApiResponse::ok(UnviewedCount { count })))
}
