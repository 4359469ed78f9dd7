use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use levelup_api::middleware::{require_admin, require_auth};
use levelup_api::oauth::OAuthConfig;
use levelup_api::state::{AppState, AppStateInner, Config};
use levelup_api::{
    activity, admin, announcements, auth, chat, community, payments, profile, uploads,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "levelup=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let config = Config::from_env()?;
    let oauth_config = OAuthConfig::from_env(&config.public_url)?;
    let db_path = std::env::var("LEVELUP_DB_PATH").unwrap_or_else(|_| "levelup.db".into());
    let host = std::env::var("LEVELUP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("LEVELUP_PORT")
        .unwrap_or_else(|_| "8000".into())
        .parse()?;

    // Init database
    let db = levelup_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner::new(db, config, oauth_config));

    // Routes that work without a token: sign-in legs, the gateway's return
    // redirects (the browser carries no Authorization header there), and the
    // read-only community surfaces.
    let public_routes = Router::new()
        .route("/auth/login", get(auth::login))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/token", post(auth::token_login))
        .route("/payments/success", get(payments::success_get).post(payments::success_post))
        .route("/payments/failure", get(payments::failure))
        .route("/payments/receipt/{txnid}", get(payments::receipt))
        .route("/announcements", get(announcements::list_announcements))
        .route("/notifications", get(announcements::notifications))
        .route("/questions", get(community::get_questions))
        .route("/chat/rooms/{room}/messages", get(chat::room_messages))
        .route("/users/pictures", get(profile::get_active_pictures))
        .route("/uploads/{kind}/{filename}", get(uploads::download))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/profile", get(profile::get_profile).post(profile::update_profile))
        .route("/profile/id", get(profile::get_user_id))
        .route("/account", delete(profile::delete_account))
        .route("/questions", post(community::ask_question))
        .route("/questions/{id}/answers", post(community::post_answer))
        .route("/expert-questions", post(community::ask_expert))
        .route("/community/top-contributors", get(community::top_contributors))
        .route("/community/contributions", get(community::contributions))
        .route("/community/reports", get(community::reports))
        .route("/chat/messages", post(chat::send_message))
        .route("/activity", post(activity::log_activity))
        .route("/activity/logs", get(activity::list_logs))
        .route("/activity/series", get(activity::series))
        .route("/activity/stats", get(activity::user_stats))
        .route("/activity/recent", get(activity::recent_logs))
        .route("/activity/top-users", get(activity::top_users))
        .route("/payments/checkout", post(payments::checkout))
        .route("/announcements", post(announcements::post_announcement))
        .route("/uploads/{kind}", post(uploads::upload))
        .route("/batches", get(admin::list_batches))
        .layer(middleware::from_fn(require_auth))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/batches", post(admin::create_batch))
        .route("/admin/batches/{id}", put(admin::update_batch))
        .route("/admin/batches/{id}", delete(admin::delete_batch))
        .route("/admin/email", post(admin::bulk_email))
        .route("/admin/users/status", post(profile::update_user_status))
        .route("/admin/users/{email}/activity", get(activity::user_activity))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn(require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("LevelUp server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
