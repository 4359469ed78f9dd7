use axum::{
    extract::Request,
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use levelup_types::api::Claims;

use crate::error::ApiError;

/// Extract and validate JWT from Authorization header.
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let secret =
        std::env::var("LEVELUP_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());

    let claims = claims_from_headers(req.headers(), &secret).ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Layered after `require_auth` on admin routes.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or(ApiError::Unauthorized)?;

    if !claims.admin {
        return Err(ApiError::Forbidden);
    }
    Ok(next.run(req).await)
}

/// Best-effort claim extraction for routes that degrade gracefully for
/// anonymous callers (the notification feed).
pub fn claims_from_headers(headers: &HeaderMap, secret: &str) -> Option<Claims> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?;
    let token = auth_header.strip_prefix("Bearer ")?;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, routing::get};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use tower::ServiceExt;

    fn make_token(secret: &str, exp_offset: i64, admin: bool) -> String {
        let claims = Claims {
            sub: 1,
            email: "a@example.com".into(),
            name: "Alice".into(),
            admin,
            exp: (chrono::Utc::now().timestamp() + exp_offset) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn round_trips_a_valid_bearer_token() {
        let token = make_token("secret", 3600, false);
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());

        let claims = claims_from_headers(&headers, "secret").unwrap();
        assert_eq!(claims.sub, 1);
        assert_eq!(claims.email, "a@example.com");
    }

    #[test]
    fn rejects_bad_secret_missing_prefix_and_expired_tokens() {
        let token = make_token("secret", 3600, false);
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
        assert!(claims_from_headers(&headers, "other-secret").is_none());

        let mut bare = HeaderMap::new();
        bare.insert(header::AUTHORIZATION, token.parse().unwrap());
        assert!(claims_from_headers(&bare, "secret").is_none());

        let expired = make_token("secret", -3600, false);
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, format!("Bearer {expired}").parse().unwrap());
        assert!(claims_from_headers(&headers, "secret").is_none());
    }

    fn admin_router() -> Router {
        // Same layering order as the server's admin routes.
        Router::new()
            .route("/admin/ping", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(require_admin))
            .layer(axum::middleware::from_fn(require_auth))
    }

    fn ping(token: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/admin/ping");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn admin_routes_reject_anonymous_and_non_admin_callers() {
        // require_auth falls back to the dev secret when the env var is unset.
        let secret = "dev-secret-change-me";

        let res = admin_router().oneshot(ping(None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let user = make_token(secret, 3600, false);
        let res = admin_router().oneshot(ping(Some(&user))).await.unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let admin = make_token(secret, 3600, true);
        let res = admin_router().oneshot(ping(Some(&admin))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
