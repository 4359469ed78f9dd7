use anyhow::{Context, Result, bail};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Identity-provider endpoints. Defaults target Google's OpenID Connect
/// surface; every URL is overridable for tests and other providers.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub tokeninfo_url: String,
    /// Where the provider sends the browser back to: `{public_url}/auth/callback`.
    pub redirect_url: String,
}

impl OAuthConfig {
    pub fn from_env(public_url: &str) -> Result<Self> {
        Ok(OAuthConfig {
            client_id: std::env::var("LEVELUP_OAUTH_CLIENT_ID")
                .context("LEVELUP_OAUTH_CLIENT_ID is not set")?,
            client_secret: std::env::var("LEVELUP_OAUTH_CLIENT_SECRET")
                .context("LEVELUP_OAUTH_CLIENT_SECRET is not set")?,
            auth_url: std::env::var("LEVELUP_OAUTH_AUTH_URL")
                .unwrap_or_else(|_| "https://accounts.google.com/o/oauth2/auth".into()),
            token_url: std::env::var("LEVELUP_OAUTH_TOKEN_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".into()),
            userinfo_url: std::env::var("LEVELUP_OAUTH_USERINFO_URL")
                .unwrap_or_else(|_| "https://www.googleapis.com/oauth2/v3/userinfo".into()),
            tokeninfo_url: std::env::var("LEVELUP_OAUTH_TOKENINFO_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/tokeninfo".into()),
            redirect_url: format!("{}/auth/callback", public_url.trim_end_matches('/')),
        })
    }
}

/// Profile fields we consume from the provider.
#[derive(Debug, Deserialize)]
pub struct ProviderUser {
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    /// Present on token-info responses; must match our client id.
    #[serde(default)]
    pub aud: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// CSRF state for the redirect round-trip. Signed with the app JWT secret
/// instead of being parked in a server-side session.
#[derive(Debug, Serialize, Deserialize)]
pub struct StateClaims {
    pub next: Option<String>,
    pub jti: Uuid,
    pub exp: usize,
}

pub fn encode_state(secret: &str, next: Option<String>) -> Result<String> {
    let claims = StateClaims {
        next,
        jti: Uuid::new_v4(),
        exp: (chrono::Utc::now() + chrono::Duration::minutes(10)).timestamp() as usize,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn decode_state(secret: &str, token: &str) -> Result<StateClaims> {
    let data = decode::<StateClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

pub struct OAuthClient {
    http: reqwest::Client,
    config: OAuthConfig,
}

impl OAuthClient {
    pub fn new(http: reqwest::Client, config: OAuthConfig) -> Self {
        OAuthClient { http, config }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Provider authorize URL the browser is redirected to.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.config.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_url),
            urlencoding::encode("openid email profile"),
            urlencoding::encode(state),
        )
    }

    /// Authorization-code leg: swap the code for an access token, then fetch
    /// the user's profile.
    pub async fn exchange_code(&self, code: &str) -> Result<ProviderUser> {
        let token: TokenResponse = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
                ("redirect_uri", &self.config.redirect_url),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?
            .error_for_status()
            .context("provider rejected the authorization code")?
            .json()
            .await?;

        debug!("exchanged authorization code for access token");

        let user: ProviderUser = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await?
            .error_for_status()
            .context("userinfo fetch failed")?
            .json()
            .await?;

        Ok(user)
    }

    /// One-tap leg: let the provider validate a raw ID token, then check the
    /// audience is actually us.
    pub async fn verify_id_token(&self, id_token: &str) -> Result<ProviderUser> {
        let user: ProviderUser = self
            .http
            .get(&self.config.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await?
            .error_for_status()
            .context("provider rejected the id token")?
            .json()
            .await?;

        match user.aud.as_deref() {
            Some(aud) if aud == self.config.client_id => Ok(user),
            _ => bail!("id token audience mismatch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_and_rejects_tampering() {
        let token = encode_state("secret", Some("/chatbot".into())).unwrap();
        let claims = decode_state("secret", &token).unwrap();
        assert_eq!(claims.next.as_deref(), Some("/chatbot"));

        assert!(decode_state("other-secret", &token).is_err());
        assert!(decode_state("secret", "not-a-jwt").is_err());
    }

    #[test]
    fn authorize_url_escapes_redirect_and_scope() {
        let client = OAuthClient::new(
            reqwest::Client::new(),
            OAuthConfig {
                client_id: "cid".into(),
                client_secret: "secret".into(),
                auth_url: "https://provider/auth".into(),
                token_url: "https://provider/token".into(),
                userinfo_url: "https://provider/userinfo".into(),
                tokeninfo_url: "https://provider/tokeninfo".into(),
                redirect_url: "http://localhost:8000/auth/callback".into(),
            },
        );

        let url = client.authorize_url("abc123");
        assert!(url.starts_with("https://provider/auth?client_id=cid"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fauth%2Fcallback"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("state=abc123"));
    }
}
