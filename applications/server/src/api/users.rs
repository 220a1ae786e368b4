/// User membership API routes
use crate::{api::segments::validate_slug, error::Result, error::ServerError, state::AppState};
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use segment_core::{HistoryEntry, HistoryPeriod, MembershipError, MembershipUpdate, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserSegmentsRequest {
    pub user_id: u64,
    #[serde(default)]
    pub slugs_to_add: Vec<String>,
    #[serde(default)]
    pub slugs_to_del: Vec<String>,
    /// Unix seconds; 0 means the new memberships never expire
    #[serde(default)]
    pub delete_at: i64,
}

#[derive(Debug, Serialize)]
pub struct UserSegmentsResponse {
    pub user_id: UserId,
    pub segments: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UserHistoryResponse {
    pub user_id: UserId,
    pub history: Vec<HistoryEntry>,
}

/// GET /user/:user_id
/// Active segments of a user
pub async fn get_user_segments(
    State(app_state): State<AppState>,
    path: std::result::Result<Path<u64>, PathRejection>,
) -> Result<Json<UserSegmentsResponse>> {
    let Path(raw_id) = path?;
    let user_id = UserId::try_from(raw_id)?;

    let segments = app_state
        .engine
        .active_segments(user_id)
        .await
        .map_err(|e| match e {
            MembershipError::NotFound { .. } => {
                ServerError::NotFound(format!("segments for user {user_id} not found"))
            }
            other => other.into(),
        })?;

    Ok(Json(UserSegmentsResponse { user_id, segments }))
}

/// GET /user/history/:user_id?month=&year=
/// Memberships a user gained during one calendar month
pub async fn get_user_history(
    State(app_state): State<AppState>,
    path: std::result::Result<Path<u64>, PathRejection>,
    query: std::result::Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<UserHistoryResponse>> {
    let Path(raw_id) = path?;
    let Query(query) = query?;
    let user_id = UserId::try_from(raw_id)?;
    let period = HistoryPeriod::new(query.month, query.year)?;

    let history = app_state
        .engine
        .user_history(user_id, period)
        .await
        .map_err(|e| match e {
            MembershipError::NotFound { .. } => {
                ServerError::NotFound(format!("history for user {user_id} not found"))
            }
            other => other.into(),
        })?;

    Ok(Json(UserHistoryResponse { user_id, history }))
}

/// PUT /user/segment
/// Add and remove segments for a user, optionally scheduling expiry of the additions
pub async fn update_user_segments(
    State(app_state): State<AppState>,
    body: std::result::Result<Json<UpdateUserSegmentsRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let Json(req) = body?;
    let user_id = UserId::try_from(req.user_id)?;
    let expire_at = parse_delete_at(req.delete_at, Utc::now())?;

    let mut update = MembershipUpdate::new(user_id);
    for slug in &req.slugs_to_add {
        update = update.add(validate_slug(slug)?);
    }
    for slug in &req.slugs_to_del {
        update = update.remove(validate_slug(slug)?);
    }
    if let Some(at) = expire_at {
        update = update.expire_at(at);
    }

    app_state.engine.update_user_segments(update).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Interpret `delete_at` relative to `now`
///
/// Zero means no expiry; anything earlier than `now` is rejected.
fn parse_delete_at(delete_at: i64, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    if delete_at == 0 {
        return Ok(None);
    }
    if delete_at < now.timestamp() {
        return Err(ServerError::BadRequest("invalid value delete_at".to_string()));
    }

    DateTime::from_timestamp(delete_at, 0)
        .map(Some)
        .ok_or_else(|| ServerError::BadRequest("invalid value delete_at".to_string()))
}
