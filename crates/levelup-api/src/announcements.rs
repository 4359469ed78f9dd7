use axum::{Extension, Json, extract::State, http::HeaderMap};
use tracing::info;

use levelup_types::api::{
    AnnouncementView, Claims, Notification, NotificationsResponse, PostAnnouncementRequest,
};

use crate::error::ApiError;
use crate::middleware::claims_from_headers;
use crate::state::AppState;

/// POST /announcements — founder broadcast, everyone else gets 403.
pub async fn post_announcement(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PostAnnouncementRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if claims.email != state.config.founder_email || state.config.founder_email.is_empty() {
        return Err(ApiError::Forbidden);
    }
    let body = req.message.trim().to_string();
    if body.is_empty() {
        return Err(ApiError::BadRequest("Message cannot be empty"));
    }

    // Run blocking DB work off the async runtime
    let db_state = state.clone();
    tokio::task::spawn_blocking(move || db_state.db.insert_founder_message(&body))
        .await
        .map_err(ApiError::internal)??;
    info!("founder posted an announcement");
    Ok(Json(serde_json::json!({ "message": "Message posted successfully!" })))
}

/// GET /announcements — latest five, public.
pub async fn list_announcements(
    State(state): State<AppState>,
) -> Result<Json<Vec<AnnouncementView>>, ApiError> {
    let db_state = state.clone();
    let rows = tokio::task::spawn_blocking(move || db_state.db.latest_founder_messages(5))
        .await
        .map_err(ApiError::internal)??;

    let views = rows
        .into_iter()
        .map(|m| AnnouncementView {
            message: m.body,
            timestamp: m.created_at,
        })
        .collect();
    Ok(Json(views))
}

/// GET /notifications — merged feed: founder messages, answers to the
/// caller's questions, trending worksheet downloads. Anonymous callers get
/// an empty feed rather than a 401, so this sits on the public router and
/// reads the token itself.
pub async fn notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let Some(claims) = claims_from_headers(&headers, &state.config.jwt_secret) else {
        return Ok(Json(NotificationsResponse {
            notifications: vec![],
            unread_count: 0,
        }));
    };

    // Run blocking DB queries off the async runtime
    let db_state = state.clone();
    let user_id = claims.sub;
    let (founder, replies, downloads) = tokio::task::spawn_blocking(move || {
        let founder = db_state.db.latest_founder_messages(5)?;
        let replies = db_state.db.answers_to_user_questions(user_id, 5)?;
        let downloads = db_state.db.recent_logs_by_type("Worksheet", 5)?;
        Ok::<_, anyhow::Error>((founder, replies, downloads))
    })
    .await
    .map_err(ApiError::internal)??;

    let mut notifications = Vec::new();
    for msg in founder {
        notifications.push(Notification {
            message: format!("Founder Message: {}", msg.body),
        });
    }
    for reply in replies {
        notifications.push(Notification {
            message: format!("Reply from {}: {}", reply.responder_email, reply.body),
        });
    }
    for log in downloads {
        if let Some(name) = log.resource_name {
            notifications.push(Notification {
                message: format!("Trending: {} has been downloaded frequently!", name),
            });
        }
    }

    let unread_count = notifications.len();
    Ok(Json(NotificationsResponse {
        notifications,
        unread_count,
    }))
}
