use super::{ApiResult, AppState};
use crate::auth::AuthUser;
use crate::database::models::NotificationRecord;
use crate::database::repositories::NotificationRepository;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct NotificationListResponse {
    notifications: Vec<NotificationRecord>,
}

pub(crate) async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<NotificationListResponse> {
    let notifications = state
        .database
        .with_repositories(|repos| repos.notifications().list_for_recipient(user.id))?;
    Ok(Json(NotificationListResponse { notifications }))
}
