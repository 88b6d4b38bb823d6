//! Plain-text health report

use axum::extract::State;

use crate::{api::state::ApiState, report};

/// GET /sys_health
pub async fn sys_health(State(state): State<ApiState>) -> String {
    let snapshot = state.reader.read_snapshot().await;
    report::render(snapshot.as_ref())
}
