use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::db::Database;
use crate::error::StoreError;
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// Map a store error to a response.
///
/// Validation, not-found and conflict messages are safe to show and are
/// returned as the body. Persistence failures are logged server-side and
/// the client only sees a generic message.
fn store_error(e: StoreError) -> (StatusCode, String) {
    match e {
        StoreError::Validation(msg) => {
            tracing::warn!("Validation error: {}", msg);
            (StatusCode::BAD_REQUEST, msg)
        }
        e @ StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, e.to_string()),
        StoreError::Conflict(msg) => {
            tracing::warn!("Conflict: {}", msg);
            (StatusCode::CONFLICT, msg)
        }
        StoreError::Transport(err) => {
            tracing::error!("Internal error: {:#}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Categories
// ============================================================

pub async fn list_categories(
    State(db): State<Database>,
) -> Result<Json<Vec<Category>>, (StatusCode, String)> {
    db.list_categories().map(Json).map_err(store_error)
}

pub async fn create_category(
    State(db): State<Database>,
    Json(input): Json<CreateCategoryInput>,
) -> Result<(StatusCode, Json<Category>), (StatusCode, String)> {
    db.create_category(input)
        .map(|c| (StatusCode::CREATED, Json(c)))
        .map_err(store_error)
}

pub async fn update_category(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCategoryInput>,
) -> Result<Json<Category>, (StatusCode, String)> {
    db.update_category(id, input)
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| store_error(StoreError::not_found("Category", id)))
}

pub async fn delete_category(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_category(id).map_err(store_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(store_error(StoreError::not_found("Category", id)))
    }
}

// ============================================================
// Goals
// ============================================================

/// Goals in board order, narrowed by `?categories=A,B&owner=X&q=text`.
pub async fn list_goals(
    State(db): State<Database>,
    Query(query): Query<GoalQuery>,
) -> Result<Json<Vec<Goal>>, (StatusCode, String)> {
    let filter = GoalFilter::from(query);
    let mut goals = db.list_goals().map_err(store_error)?;
    goals.retain(|g| filter.matches(g));
    Ok(Json(goals))
}

pub async fn get_goal(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Goal>, (StatusCode, String)> {
    db.get_goal(id)
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| store_error(StoreError::not_found("Goal", id)))
}

pub async fn create_goal(
    State(db): State<Database>,
    Json(input): Json<GoalInput>,
) -> Result<(StatusCode, Json<Goal>), (StatusCode, String)> {
    db.create_goal(input)
        .map(|g| (StatusCode::CREATED, Json(g)))
        .map_err(store_error)
}

pub async fn update_goal(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<GoalInput>,
) -> Result<Json<Goal>, (StatusCode, String)> {
    db.update_goal(id, input)
        .map_err(store_error)?
        .map(Json)
        .ok_or_else(|| store_error(StoreError::not_found("Goal", id)))
}

pub async fn delete_goal(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_goal(id).map_err(store_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(store_error(StoreError::not_found("Goal", id)))
    }
}

pub async fn reorder_goals(
    State(db): State<Database>,
    Json(input): Json<ReorderInput>,
) -> Result<StatusCode, (StatusCode, String)> {
    db.reorder_goals(&input.goals).map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Board
// ============================================================

/// Totals over all goals and over the goals the query selects.
pub async fn summary(
    State(db): State<Database>,
    Query(query): Query<GoalQuery>,
) -> Result<Json<BoardSummary>, (StatusCode, String)> {
    let filter = GoalFilter::from(query);
    let goals = db.list_goals().map_err(store_error)?;
    let visible = filter.apply(&goals);
    Ok(Json(BoardSummary::compute(&goals, &visible)))
}

pub async fn owners(
    State(db): State<Database>,
) -> Result<Json<Vec<String>>, (StatusCode, String)> {
    db.owners().map(Json).map_err(store_error)
}
