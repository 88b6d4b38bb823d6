//! Runtime threshold adjustment

use axum::{Json, extract::State};
use tracing::info;

use crate::api::{
    ApiResult,
    state::ApiState,
    types::{ThresholdsRequest, ThresholdsResponse},
};

/// GET /api/v1/thresholds
pub async fn get_thresholds(State(state): State<ApiState>) -> Json<ThresholdsResponse> {
    Json(state.thresholds.current().await.into())
}

/// PUT /api/v1/thresholds
///
/// Partial update. An invalid value rejects the whole request and keeps the
/// previous thresholds. The next tick evaluates against the new values.
pub async fn put_thresholds(
    State(state): State<ApiState>,
    Json(request): Json<ThresholdsRequest>,
) -> ApiResult<Json<ThresholdsResponse>> {
    let updated = state.thresholds.apply(request.into()).await?;
    info!("thresholds changed via API: {updated:?}");
    Ok(Json(updated.into()))
}
