use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::debug;

use levelup_db::models::ActivityEntryRow;
use levelup_db::queries::ActivityQuery;
use levelup_types::api::{
    ActivityEntry, ActivityLogsResponse, Claims, DayBreakdown, DayEntry, LogActivityRequest,
    SeriesResponse, TopUserView, UserStatsResponse,
};
use levelup_types::models::DEFAULT_SOURCE;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /activity
///
/// Flashcard generations are deduplicated: one row per
/// (user, action, resource type, resource name), refreshed in place.
pub async fn log_activity(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<LogActivityRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.action.trim().is_empty() || req.resource_type.trim().is_empty() {
        return Err(ApiError::BadRequest("Invalid activity data"));
    }
    if let Some(pdf) = req.pdf.as_deref() {
        B64.decode(pdf).map_err(|_| ApiError::BadRequest("Invalid pdf payload"))?;
    }

    // Historical client bug: the plural form must collapse onto the singular
    // so the dedup below sees one action name.
    let action = if req.action == "Generated Flashcards" {
        "Generated Flashcard".to_string()
    } else {
        req.action.clone()
    };

    // Run blocking DB work off the async runtime
    let db_state = state.clone();
    let user_id = claims.sub;
    let message = tokio::task::spawn_blocking(move || -> Result<&'static str, ApiError> {
        let user = db_state
            .db
            .get_user_by_id(user_id)?
            .ok_or(ApiError::NotFound("User not found"))?;

        if action == "Generated Flashcard" {
            if let Some(existing) = db_state.db.find_activity(
                user.id,
                &action,
                &req.resource_type,
                req.resource_name.as_deref(),
            )? {
                db_state.db.update_activity_pdf(existing, req.pdf.as_deref())?;
                debug!("refreshed flashcard log {} for user {}", existing, user.email);
                return Ok("Existing flashcard entry updated");
            }
        }

        db_state.db.insert_activity(
            user.id,
            &action,
            &req.resource_type,
            req.resource_name.as_deref(),
            req.source.as_deref().unwrap_or(DEFAULT_SOURCE),
            req.pdf.as_deref(),
        )?;
        Ok("Activity logged successfully")
    })
    .await
    .map_err(ApiError::internal)??;

    Ok(Json(serde_json::json!({ "message": message })))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// `all` or `user`.
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub search: String,
    /// Sort order: `latest` or `oldest`.
    #[serde(rename = "type", default = "default_sort")]
    pub sort: String,
    #[serde(default)]
    pub resource_type: String,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    7
}

fn default_filter() -> String {
    "all".into()
}

fn default_sort() -> String {
    "latest".into()
}

/// GET /activity/logs
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ActivityLogsResponse>, ApiError> {
    let per_page = query.per_page.clamp(1, 100);
    let page = query.page.max(1);

    let db_query = ActivityQuery {
        user_id: (query.filter == "user").then_some(claims.sub),
        search: Some(query.search.trim().to_string()).filter(|s| !s.is_empty()),
        resource_type: Some(query.resource_type.trim().to_string()).filter(|s| !s.is_empty()),
        oldest_first: query.sort == "oldest",
        page,
        per_page,
    };

    // Run blocking DB query off the async runtime
    let db_state = state.clone();
    let (rows, total) = tokio::task::spawn_blocking(move || db_state.db.list_activity(&db_query))
        .await
        .map_err(ApiError::internal)??;

    let total_pages = ((total as u32) + per_page - 1) / per_page;

    Ok(Json(ActivityLogsResponse {
        activities: rows.into_iter().map(entry_view).collect(),
        total_pages,
        current_page: page,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    #[serde(default = "default_series_filter")]
    pub filter: String,
}

fn default_series_filter() -> String {
    "daily".into()
}

/// GET /activity/series — per-day counts for the dashboard chart.
pub async fn series(
    State(state): State<AppState>,
    Query(query): Query<SeriesQuery>,
) -> Result<Json<SeriesResponse>, ApiError> {
    let days = match query.filter.as_str() {
        "daily" => 7,
        "weekly" => 28,
        _ => 30,
    };
    let since = (Utc::now() - Duration::days(days))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    let db_state = state.clone();
    let counts = tokio::task::spawn_blocking(move || db_state.db.daily_counts(&since))
        .await
        .map_err(ApiError::internal)??;

    let (labels, values) = counts.into_iter().unzip();
    Ok(Json(SeriesResponse { labels, values }))
}

/// GET /activity/stats — the calling user's last-7-day picture.
pub async fn user_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserStatsResponse>, ApiError> {
    let user_id = claims.sub;
    let start_day = Utc::now().date_naive() - Duration::days(6);
    let since = format!("{} 00:00:00", start_day.format("%Y-%m-%d"));

    // Run blocking DB queries off the async runtime
    let db_state = state.clone();
    let (total_worksheets, total_flashcards, logs) = tokio::task::spawn_blocking(move || {
        let worksheets = db_state.db.count_user_logs_by_type(user_id, "Worksheet")?;
        let flashcards = db_state.db.count_user_logs_by_type(user_id, "Flashcard")?;
        let logs = db_state.db.user_logs_since(user_id, &since)?;
        Ok::<_, anyhow::Error>((worksheets, flashcards, logs))
    })
    .await
    .map_err(ApiError::internal)??;

    let mut per_day: HashMap<String, (i64, i64)> = HashMap::new();
    let mut daily_entries: HashMap<String, Vec<DayEntry>> = HashMap::new();
    let mut resource_counts: HashMap<String, i64> = HashMap::new();

    for log in &logs {
        // Timestamps are "YYYY-MM-DD HH:MM:SS" text.
        let date = log.created_at.get(..10).unwrap_or_default().to_string();
        let time = log.created_at.get(11..19).unwrap_or_default().to_string();

        let day = per_day.entry(date.clone()).or_default();
        match log.resource_type.as_str() {
            "Worksheet" => day.0 += 1,
            "Flashcard" => day.1 += 1,
            _ => {}
        }

        if let Some(name) = &log.resource_name {
            *resource_counts.entry(name.clone()).or_default() += 1;
            daily_entries
                .entry(date)
                .or_default()
                .push(DayEntry { name: name.clone(), time });
        }
    }

    let most_downloaded = resource_counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(name, _)| name)
        .unwrap_or_else(|| "-".to_string());

    // Dense 7-day series: every day present even with zero activity.
    let weekly_data = (0..7)
        .map(|i| {
            let date = (start_day + Duration::days(i)).format("%Y-%m-%d").to_string();
            let (worksheets, flashcards) = per_day.get(&date).copied().unwrap_or_default();
            DayBreakdown { date, worksheets, flashcards }
        })
        .collect();

    Ok(Json(UserStatsResponse {
        total_worksheets,
        total_flashcards,
        most_downloaded,
        weekly_data,
        daily_entries,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_filter")]
    pub filter: String,
}

/// GET /activity/recent — last 10 logs, everyone's or just the caller's.
pub async fn recent_logs(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = (query.filter == "user").then_some(claims.sub);
    let db_state = state.clone();
    let rows = tokio::task::spawn_blocking(move || db_state.db.recent_logs(user_id, 10))
        .await
        .map_err(ApiError::internal)??;

    let logs: Vec<ActivityEntry> = rows.into_iter().map(entry_view).collect();
    Ok(Json(serde_json::json!({ "logs": logs })))
}

/// GET /activity/top-users — top 5 by raw activity count.
pub async fn top_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<TopUserView>>, ApiError> {
    let db_state = state.clone();
    let rows = tokio::task::spawn_blocking(move || db_state.db.top_users_by_activity(5))
        .await
        .map_err(ApiError::internal)??;

    let views = rows
        .into_iter()
        .map(|u| TopUserView {
            name: u.name,
            email: u.email,
            activity_count: u.activity_count,
        })
        .collect();
    Ok(Json(views))
}

/// GET /admin/users/{email}/activity — full history for one user.
pub async fn user_activity(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let db_state = state.clone();
    let logs = tokio::task::spawn_blocking(move || {
        let user = db_state
            .db
            .get_user_by_email(&email)?
            .ok_or(ApiError::NotFound("User not found"))?;
        Ok::<_, ApiError>(db_state.db.logs_for_user(user.id)?)
    })
    .await
    .map_err(ApiError::internal)??;

    let entries: Vec<serde_json::Value> = logs
        .into_iter()
        .map(|log| {
            serde_json::json!({
                "action": log.action,
                "resource_type": log.resource_type,
                "resource_name": log.resource_name.unwrap_or_else(|| "N/A".to_string()),
                "date": log.created_at,
                "source": log.source,
                "pdf": log.pdf_base64.unwrap_or_default(),
            })
        })
        .collect();

    Ok(Json(serde_json::json!({ "status": "success", "logs": entries })))
}

fn entry_view(row: ActivityEntryRow) -> ActivityEntry {
    ActivityEntry {
        user: row.author_name.unwrap_or_else(|| "Unknown User".to_string()),
        action: row.action,
        resource_type: row.resource_type,
        resource_name: row.resource_name,
        date: row.created_at,
        source: row.source,
        pdf: row.pdf_base64,
    }
}
