use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{Game, GamePatch, NewGame},
    services::{GameSelector, ListQuery, Page, Recommendation},
};

use super::AppState;

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub message: &'static str,
    pub game: Game,
}

/// Turns a body rejection into a 400 with axum's explanation
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::InvalidInput(rejection.body_text()))
}

/// Same as [`json_body`] for the query string
fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> AppResult<T> {
    params
        .map(|Query(params)| params)
        .map_err(|rejection| AppError::InvalidInput(rejection.body_text()))
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// List games with optional `filterBy`, `sortBy`, `sortOrder`, `page` and `pageSize`
pub async fn list_games(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> AppResult<Json<Page<Game>>> {
    let query = query_params(query)?;
    let page = state.catalog.list(&query).await?;

    tracing::info!(
        request_id = %request_id,
        filter_by = query.filter_by.as_deref().unwrap_or(""),
        sort_by = query.sort_by.as_deref().unwrap_or(""),
        count = page.count,
        returned = page.results.len(),
        "Listed games"
    );

    Ok(Json(page))
}

/// Fetch one game by `id` or `name`
pub async fn get_game(
    State(state): State<AppState>,
    selector: Result<Query<GameSelector>, QueryRejection>,
) -> AppResult<Json<Game>> {
    let selector = query_params(selector)?;
    let game = state.catalog.find(&selector).await?;
    Ok(Json(game))
}

/// Games most similar to the one selected by `id` or `name`
pub async fn recommend_games(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    selector: Result<Query<GameSelector>, QueryRejection>,
) -> AppResult<Json<Recommendation>> {
    let selector = query_params(selector)?;
    tracing::info!(
        request_id = %request_id,
        id = ?selector.id,
        name = ?selector.name,
        "Processing recommendation request"
    );

    let recommendation = state.catalog.recommend(&selector).await?;
    Ok(Json(recommendation))
}

/// Create a new game
pub async fn create_game(
    State(state): State<AppState>,
    payload: Result<Json<NewGame>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Game>)> {
    let game = state.catalog.create(json_body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(game)))
}

/// Partially update the game selected by `id` or `name`
pub async fn update_game(
    State(state): State<AppState>,
    selector: Result<Query<GameSelector>, QueryRejection>,
    payload: Result<Json<GamePatch>, JsonRejection>,
) -> AppResult<Json<UpdateResponse>> {
    let selector = query_params(selector)?;
    let patch = json_body(payload)?;
    let game = state.catalog.update(&selector, patch).await?;

    Ok(Json(UpdateResponse {
        message: "Game updated successfully",
        game,
    }))
}

/// Delete the game selected by `id` or `name`
pub async fn delete_game(
    State(state): State<AppState>,
    selector: Result<Query<GameSelector>, QueryRejection>,
) -> AppResult<StatusCode> {
    let selector = query_params(selector)?;
    state.catalog.delete(&selector).await?;
    Ok(StatusCode::NO_CONTENT)
}
