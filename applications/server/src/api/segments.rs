/// Segments API routes
use crate::{error::Result, error::ServerError, state::AppState};
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use segment_core::{MembershipError, Percentage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AddSegmentRequest {
    pub slug: String,
    #[serde(default)]
    pub percentage: u32,
}

#[derive(Debug, Deserialize)]
pub struct DeleteSegmentRequest {
    pub slug: String,
}

#[derive(Debug, Serialize)]
pub struct AddSegmentResponse {
    pub status: String,
    pub slug: String,
    pub enrolled: u64,
}

/// POST /segment/add
/// Create a segment and enroll `percentage` of known users at random
pub async fn add_segment(
    State(app_state): State<AppState>,
    body: std::result::Result<Json<AddSegmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AddSegmentResponse>)> {
    let Json(req) = body?;
    let slug = validate_slug(&req.slug)?;
    let percentage = Percentage::new(req.percentage)
        .map_err(|_| ServerError::BadRequest("invalid percentage".to_string()))?;

    let enrollment = app_state.engine.create_segment(slug, percentage).await?;

    Ok((
        StatusCode::CREATED,
        Json(AddSegmentResponse {
            status: "new segment added".to_string(),
            slug: enrollment.segment.slug,
            enrolled: enrollment.enrolled,
        }),
    ))
}

/// DELETE /segment/delete
/// Retire a segment; its memberships remain as history
pub async fn delete_segment(
    State(app_state): State<AppState>,
    body: std::result::Result<Json<DeleteSegmentRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let Json(req) = body?;
    let slug = validate_slug(&req.slug)?;

    app_state
        .engine
        .delete_segment(slug)
        .await
        .map_err(|e| match e {
            MembershipError::NotFound { .. } => {
                ServerError::NotFound(format!("segment {slug} not found"))
            }
            other => other.into(),
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Trim a slug and reject it when nothing is left
pub(crate) fn validate_slug(slug: &str) -> Result<&str> {
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(ServerError::BadRequest("slug must not be empty".to_string()));
    }
    Ok(slug)
}
