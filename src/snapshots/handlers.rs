use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{
    CompareQuery, SaveSnapshotRequest, SavedSnapshotResponse, SnapshotDetails,
    UpdateSnapshotRequest, UpdatedSnapshotResponse,
};
use super::repo_types::SnapshotSummary;
use super::services::{compare, Comparison};
use crate::{calc::report::build_report, error::reject, state::AppState};

pub fn snapshot_routes() -> Router<AppState> {
    Router::new()
        .route("/snapshots", get(list_snapshots).post(save_snapshot))
        .route("/snapshots/compare", get(compare_snapshots))
        .route(
            "/snapshots/:id",
            get(get_snapshot).put(update_snapshot).delete(delete_snapshot),
        )
}

#[instrument(skip(state))]
pub async fn list_snapshots(
    State(state): State<AppState>,
) -> Result<Json<Vec<SnapshotSummary>>, (StatusCode, String)> {
    let items = state.store.list().await.map_err(reject)?;
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_snapshot(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SnapshotDetails>, (StatusCode, String)> {
    let snapshot = state.store.get_snapshot(id).await.map_err(reject)?;
    let report = build_report(&snapshot.record, &state.config.calc).map_err(reject)?;
    Ok(Json(SnapshotDetails { snapshot, report }))
}

#[instrument(skip(state, body), fields(snapshot_name = %body.name))]
pub async fn save_snapshot(
    State(state): State<AppState>,
    Json(body): Json<SaveSnapshotRequest>,
) -> Result<(StatusCode, HeaderMap, Json<SavedSnapshotResponse>), (StatusCode, String)> {
    let saved = state
        .store
        .create(&body.name, &body.record)
        .await
        .map_err(reject)?;
    let id = saved.id;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/snapshots/{}", id).parse() {
        headers.insert(header::LOCATION, location);
    }

    info!(snapshot_id = id, "snapshot created");
    Ok((
        StatusCode::CREATED,
        headers,
        Json(SavedSnapshotResponse {
            id,
            created_at: saved.created_at,
        }),
    ))
}

#[instrument(skip(state, body))]
pub async fn update_snapshot(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateSnapshotRequest>,
) -> Result<Json<UpdatedSnapshotResponse>, (StatusCode, String)> {
    let revision = state
        .store
        .update(id, body.revision, &body.record)
        .await
        .map_err(reject)?;
    Ok(Json(UpdatedSnapshotResponse { id, revision }))
}

#[instrument(skip(state))]
pub async fn delete_snapshot(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.store.delete(id).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn compare_snapshots(
    State(state): State<AppState>,
    Query(q): Query<CompareQuery>,
) -> Result<Json<Comparison>, (StatusCode, String)> {
    let cmp = compare(state.store.as_ref(), &state.config.calc, q.left, q.right)
        .await
        .map_err(reject)?;
    Ok(Json(cmp))
}
