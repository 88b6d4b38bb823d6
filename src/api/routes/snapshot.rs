//! Latest snapshot as JSON

use axum::{Json, extract::State};

use crate::{
    Snapshot,
    api::{ApiError, ApiResult, state::ApiState},
};

/// GET /api/v1/snapshot
///
/// 404 until the first successful tick
pub async fn get_snapshot(State(state): State<ApiState>) -> ApiResult<Json<Snapshot>> {
    state
        .reader
        .read_snapshot()
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no data yet".to_string()))
}
