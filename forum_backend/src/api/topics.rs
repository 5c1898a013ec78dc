use super::{ApiError, ApiResult, AppState, StatusResponse};
use crate::auth::AuthUser;
use crate::topics::{CreateCommentInput, CreateTopicInput, TopicContentInput, TopicView};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct ListTopicsParams {
    #[serde(default)]
    page: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TopicListResponse {
    topic: Vec<TopicView>,
}

/// Unparsable pages fall back to the first one; pages below 1 clamp to 1.
pub(crate) fn parse_page(raw: Option<&str>) -> usize {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .map(|page| page.max(1))
        .and_then(|page| usize::try_from(page).ok())
        .unwrap_or(1)
}

pub(crate) async fn list_topics(
    State(state): State<AppState>,
    params: Result<Query<ListTopicsParams>, QueryRejection>,
) -> ApiResult<TopicListResponse> {
    let Query(params) = params?;
    let page = parse_page(params.page.as_deref());
    let topics = state.topics.list_topics(page)?;
    Ok(Json(TopicListResponse { topic: topics }))
}

pub(crate) async fn create_topic(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateTopicInput>, JsonRejection>,
) -> ApiResult<StatusResponse> {
    let Json(input) = payload?;
    state.topics.create_topic(&user, input)?;
    Ok(Json(StatusResponse::ok()))
}

pub(crate) async fn get_topic(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<TopicView> {
    let Path(id) = id?;
    Ok(Json(state.topics.get_topic(id)?))
}

pub(crate) async fn create_comment(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CreateCommentInput>, JsonRejection>,
) -> ApiResult<StatusResponse> {
    let Path(id) = id?;
    let Json(input) = payload?;
    state.topics.add_comment(&user, id, input)?;
    Ok(Json(StatusResponse::ok()))
}

pub(crate) async fn append_topic(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TopicContentInput>, JsonRejection>,
) -> ApiResult<StatusResponse> {
    let Path(id) = id?;
    let Json(input) = payload?;
    state.topics.append_topic(&user, id, input)?;
    Ok(Json(StatusResponse::ok()))
}

pub(crate) async fn edit_topic(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TopicContentInput>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Path(id) = id?;
    let Json(input) = payload?;
    state.topics.edit_topic(&user, id, input)?;
    Ok(Json(StatusResponse::ok()))
}
