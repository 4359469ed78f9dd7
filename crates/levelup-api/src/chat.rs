use axum::{
    Extension, Json,
    extract::{Path, State},
};

use levelup_types::api::{ChatMessageView, Claims, SendChatRequest};
use levelup_types::models::DEFAULT_PICTURE;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /chat/messages
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendChatRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.room.trim().is_empty() || req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Room and message are required"));
    }

    // Run blocking DB work off the async runtime
    let db_state = state.clone();
    let user_id = claims.sub;
    let username = claims.name.clone();
    tokio::task::spawn_blocking(move || {
        // A stale token can outlive its account; report that instead of
        // tripping the user_id foreign key.
        if db_state.db.get_user_by_id(user_id)?.is_none() {
            return Err(ApiError::NotFound("User not found"));
        }
        db_state
            .db
            .insert_chat_message(user_id, &username, &req.room, &req.message)?;
        Ok(())
    })
    .await
    .map_err(ApiError::internal)??;

    Ok(Json(serde_json::json!({ "message": "Message sent successfully" })))
}

/// GET /chat/rooms/{room}/messages — full chronological history.
pub async fn room_messages(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<Vec<ChatMessageView>>, ApiError> {
    // Run blocking DB query off the async runtime
    let db_state = state.clone();
    let rows = tokio::task::spawn_blocking(move || db_state.db.get_room_messages(&room))
        .await
        .map_err(ApiError::internal)??;

    let views = rows
        .into_iter()
        .map(|m| ChatMessageView {
            username: m.username,
            message: m.body,
            timestamp: m.created_at,
            profile_picture: m.author_picture.unwrap_or_else(|| DEFAULT_PICTURE.to_string()),
        })
        .collect();

    Ok(Json(views))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;

    fn claims_for(sub: i64) -> Claims {
        Claims {
            sub,
            email: "a@example.com".into(),
            name: "Alice".into(),
            admin: false,
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        }
    }

    #[tokio::test]
    async fn stale_tokens_cannot_post_chat_messages() {
        let state = test_state();

        let res = send_message(
            State(state),
            Extension(claims_for(999)),
            Json(SendChatRequest { room: "math".into(), message: "hi".into() }),
        )
        .await;
        assert!(matches!(res, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn sent_messages_show_up_in_the_room_history() {
        let state = test_state();
        let user = state
            .db
            .upsert_oauth_user("s1", "a@example.com", "Alice", Some("a.png"))
            .unwrap();

        send_message(
            State(state.clone()),
            Extension(claims_for(user.id)),
            Json(SendChatRequest { room: "math".into(), message: "hello".into() }),
        )
        .await
        .unwrap();

        let history = room_messages(State(state), Path("math".into())).await.unwrap();
        assert_eq!(history.0.len(), 1);
        assert_eq!(history.0[0].message, "hello");
        assert_eq!(history.0[0].profile_picture, "a.png");
    }
}
