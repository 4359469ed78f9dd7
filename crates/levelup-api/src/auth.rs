use axum::{
    Json,
    extract::{Query, State},
    response::Redirect,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use levelup_db::models::UserRow;
use levelup_types::api::{CallbackQuery, Claims, LoginQuery, LoginResponse, TokenLoginRequest};

use crate::error::ApiError;
use crate::oauth::{self, ProviderUser};
use crate::state::AppState;

/// GET /auth/login — kick off the provider redirect. The `next` hint rides
/// along inside the signed CSRF state.
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Redirect, ApiError> {
    let csrf = oauth::encode_state(&state.config.jwt_secret, query.next)?;
    let url = state.oauth.authorize_url(&csrf);
    Ok(Redirect::to(&url))
}

/// GET /auth/callback — the provider sends the browser back here with a code.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<LoginResponse>, ApiError> {
    // State signature failure means the request did not originate from our
    // login redirect.
    oauth::decode_state(&state.config.jwt_secret, &query.state)
        .map_err(|_| ApiError::BadRequest("Invalid OAuth state"))?;

    let provider_user = state
        .oauth
        .exchange_code(&query.code)
        .await
        .map_err(|_| ApiError::BadRequest("Authentication failed"))?;

    let response = login_user(&state, provider_user).await?;
    Ok(Json(response))
}

/// POST /auth/token — one-tap sign-in: the frontend hands us a raw provider
/// ID token.
pub async fn token_login(
    State(state): State<AppState>,
    Json(req): Json<TokenLoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let provider_user = state
        .oauth
        .verify_id_token(&req.id_token)
        .await
        .map_err(|_| ApiError::Unauthorized)?;

    let response = login_user(&state, provider_user).await?;
    Ok(Json(response))
}

async fn login_user(state: &AppState, provider_user: ProviderUser) -> Result<LoginResponse, ApiError> {
    let name = provider_user.name.unwrap_or_else(|| "User".to_string());

    // Run blocking DB upsert off the async runtime
    let db_state = state.clone();
    let subject = provider_user.sub.clone();
    let email = provider_user.email.clone();
    let upsert_name = name.clone();
    let picture = provider_user.picture.clone();
    let user = tokio::task::spawn_blocking(move || {
        db_state
            .db
            .upsert_oauth_user(&subject, &email, &upsert_name, picture.as_deref())
    })
    .await
    .map_err(ApiError::internal)??;

    let admin = state.config.is_admin(&user.email);
    let token = create_token(&state.config.jwt_secret, &user, admin)?;

    info!("login for {} (admin: {})", user.email, admin);

    Ok(LoginResponse {
        user_id: user.id,
        email: user.email,
        name: user.name,
        picture: user.picture,
        admin,
        token,
    })
}

fn create_token(secret: &str, user: &UserRow, admin: bool) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        admin,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
