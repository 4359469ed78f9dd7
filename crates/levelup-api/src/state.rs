use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use levelup_db::Database;

use crate::mail::Mailer;
use crate::oauth::{OAuthClient, OAuthConfig};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub config: Config,
    pub oauth: OAuthClient,
    pub mailer: Mailer,
}

/// Application settings, loaded once from the environment in the binary.
#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    /// Emails granted the admin dashboard.
    pub admin_emails: HashSet<String>,
    /// Single account allowed to post broadcast announcements.
    pub founder_email: String,
    /// External base URL, used for gateway return legs and upload URLs.
    pub public_url: String,
    pub storage_root: PathBuf,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub merchant_key: String,
    pub merchant_salt: String,
    pub gateway_url: String,
}

impl Config {
    /// Read `LEVELUP_*` settings, with dev-safe defaults for everything but
    /// the gateway credentials.
    pub fn from_env() -> Result<Self> {
        let jwt_secret =
            std::env::var("LEVELUP_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
        let admin_emails = std::env::var("LEVELUP_ADMIN_EMAILS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        let founder_email = std::env::var("LEVELUP_FOUNDER_EMAIL").unwrap_or_default();
        let public_url = std::env::var("LEVELUP_PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:8000".into());
        let storage_root = std::env::var("LEVELUP_STORAGE_ROOT")
            .unwrap_or_else(|_| "./storage".into())
            .into();

        let gateway = GatewayConfig {
            merchant_key: std::env::var("LEVELUP_MERCHANT_KEY")
                .context("LEVELUP_MERCHANT_KEY is not set")?,
            merchant_salt: std::env::var("LEVELUP_MERCHANT_SALT")
                .context("LEVELUP_MERCHANT_SALT is not set")?,
            gateway_url: std::env::var("LEVELUP_GATEWAY_URL")
                .unwrap_or_else(|_| "https://secure.payu.in/_payment".into()),
        };

        Ok(Config {
            jwt_secret,
            admin_emails,
            founder_email,
            public_url,
            storage_root,
            gateway,
        })
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_emails.contains(&email.to_lowercase())
    }
}

impl AppStateInner {
    pub fn new(db: Database, config: Config, oauth_config: OAuthConfig) -> AppStateInner {
        let http = reqwest::Client::new();
        let oauth = OAuthClient::new(http.clone(), oauth_config);
        let mailer = Mailer::from_env(http);
        AppStateInner {
            db,
            config,
            oauth,
            mailer,
        }
    }
}

/// Handler-test state: in-memory database, inert provider and gateway
/// endpoints.
#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    let http = reqwest::Client::new();
    let oauth = OAuthClient::new(
        http.clone(),
        OAuthConfig {
            client_id: "cid".into(),
            client_secret: "secret".into(),
            auth_url: "https://provider.invalid/auth".into(),
            token_url: "https://provider.invalid/token".into(),
            userinfo_url: "https://provider.invalid/userinfo".into(),
            tokeninfo_url: "https://provider.invalid/tokeninfo".into(),
            redirect_url: "http://localhost:8000/auth/callback".into(),
        },
    );
    Arc::new(AppStateInner {
        db: Database::open_in_memory().expect("in-memory db"),
        config: Config {
            jwt_secret: "secret".into(),
            admin_emails: HashSet::new(),
            founder_email: "founder@example.com".into(),
            public_url: "http://localhost:8000".into(),
            storage_root: "./storage".into(),
            gateway: GatewayConfig {
                merchant_key: "merchant-key".into(),
                merchant_salt: "merchant-salt".into(),
                gateway_url: "https://gateway.invalid/_payment".into(),
            },
        },
        oauth,
        mailer: Mailer::from_env(http),
    })
}
