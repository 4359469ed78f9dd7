use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State};
use tracing::info;

use levelup_types::api::{Claims, ProfileResponse, UpdateProfileRequest, UserStatusRequest};
use levelup_types::models::DEFAULT_PICTURE;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ProfileResponse>, ApiError> {
    // Run blocking DB work off the async runtime
    let db_state = state.clone();
    let user = tokio::task::spawn_blocking(move || db_state.db.get_user_by_id(claims.sub))
        .await
        .map_err(ApiError::internal)??
        .ok_or(ApiError::NotFound("User not found"))?;

    Ok(Json(ProfileResponse {
        name: user.name,
        email: user.email,
        picture: user.picture.unwrap_or_else(|| DEFAULT_PICTURE.to_string()),
    }))
}

/// POST /profile — currently only a password can be set.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Argon2 is deliberately slow; hash off the async runtime too.
    let db_state = state.clone();
    let user_id = claims.sub;
    let email = tokio::task::spawn_blocking(move || -> Result<String, ApiError> {
        let user = db_state
            .db
            .get_user_by_id(user_id)?
            .ok_or(ApiError::NotFound("User not found"))?;

        if let Some(password) = req.password.as_deref().filter(|p| !p.is_empty()) {
            let salt = SaltString::generate(&mut OsRng);
            let hash = Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map_err(ApiError::internal)?
                .to_string();
            db_state.db.set_user_password(user.id, &hash)?;
        }
        Ok(user.email)
    })
    .await
    .map_err(ApiError::internal)??;

    info!("user {} updated their profile", email);
    Ok(Json(serde_json::json!({ "success": true })))
}

/// DELETE /account — reassigns owned rows to the sentinel, then deletes.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Run blocking multi-table transaction off the async runtime
    let db_state = state.clone();
    let user_id = claims.sub;
    let email = tokio::task::spawn_blocking(move || -> Result<String, ApiError> {
        let user = db_state
            .db
            .get_user_by_id(user_id)?
            .ok_or(ApiError::NotFound("User not found"))?;
        db_state.db.delete_account(user.id)?;
        Ok(user.email)
    })
    .await
    .map_err(ApiError::internal)??;

    info!("user {} deleted their account", email);
    Ok(Json(serde_json::json!({ "success": true })))
}

/// GET /profile/id
pub async fn get_user_id(
    Extension(claims): Extension<Claims>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "user_id": claims.sub }))
}

/// GET /users/pictures — avatars of all active users.
pub async fn get_active_pictures(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let db_state = state.clone();
    let pictures = tokio::task::spawn_blocking(move || db_state.db.active_user_pictures())
        .await
        .map_err(ApiError::internal)??;

    Ok(Json(serde_json::json!({ "pictures": pictures })))
}

/// POST /admin/users/status
pub async fn update_user_status(
    State(state): State<AppState>,
    Json(req): Json<UserStatusRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let db_state = state.clone();
    let updated =
        tokio::task::spawn_blocking(move || db_state.db.set_user_active(req.user_id, req.active))
            .await
            .map_err(ApiError::internal)??;
    if !updated {
        return Err(ApiError::NotFound("User not found"));
    }
    Ok(Json(serde_json::json!({ "message": "Status updated successfully" })))
}
