use axum::{
    Json,
    extract::{Path, State},
};
use chrono::NaiveDate;
use tracing::info;

use levelup_db::models::BatchRow;
use levelup_types::api::{
    BatchView, BulkEmailRequest, CreateBatchRequest, DashboardResponse, DashboardUser,
    UpdateBatchRequest,
};
use levelup_types::models::DEFAULT_PICTURE;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /admin/dashboard — platform totals plus a per-user usage table.
pub async fn dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, ApiError> {
    // Run blocking DB work off the async runtime
    let db_state = state.clone();
    let response = tokio::task::spawn_blocking(move || {
        let db = &db_state.db;
        let total_users = db.count_users()?;
        let total_worksheets = db.count_logs_by_type("Worksheet")?;
        let total_flashcards = db.count_logs_by_type("Flashcard")?;

        let mut users = Vec::new();
        for user in db.all_users()? {
            users.push(DashboardUser {
                profile_picture: user.picture.unwrap_or_else(|| DEFAULT_PICTURE.to_string()),
                worksheets_used: db.count_user_logs_by_type(user.id, "Worksheet")?,
                flashcards_used: db.count_user_logs_by_type(user.id, "Flashcard")?,
                subscription: if db.has_successful_payment(&user.email)? {
                    "Paid".to_string()
                } else {
                    "Free".to_string()
                },
                name: user.name,
                email: user.email,
            });
        }

        Ok::<_, anyhow::Error>(DashboardResponse {
            total_users,
            total_worksheets,
            total_flashcards,
            users,
        })
    })
    .await
    .map_err(ApiError::internal)??;

    Ok(Json(response))
}

fn valid_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// POST /admin/batches
pub async fn create_batch(
    State(state): State<AppState>,
    Json(req): Json<CreateBatchRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if [&req.month, &req.week, &req.name, &req.start_date, &req.end_date]
        .iter()
        .any(|f| f.trim().is_empty())
    {
        return Err(ApiError::BadRequest("All batch details are required"));
    }
    if !valid_date(&req.start_date) || !valid_date(&req.end_date) {
        return Err(ApiError::BadRequest("Dates must be YYYY-MM-DD"));
    }

    // Run blocking DB work off the async runtime
    let db_state = state.clone();
    let name = req.name.clone();
    let id = tokio::task::spawn_blocking(move || {
        db_state
            .db
            .insert_batch(&req.month, &req.week, &req.name, &req.start_date, &req.end_date)
    })
    .await
    .map_err(ApiError::internal)??;
    info!("batch {} created ({})", id, name);
    Ok(Json(serde_json::json!({ "message": "Batch added successfully", "id": id })))
}

/// GET /batches — visible to any signed-in user.
pub async fn list_batches(
    State(state): State<AppState>,
) -> Result<Json<Vec<BatchView>>, ApiError> {
    let db_state = state.clone();
    let rows = tokio::task::spawn_blocking(move || db_state.db.list_batches())
        .await
        .map_err(ApiError::internal)??;
    Ok(Json(rows.into_iter().map(batch_view).collect()))
}

/// PUT /admin/batches/{id} — partial update, absent fields keep their value.
pub async fn update_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<i64>,
    Json(req): Json<UpdateBatchRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let db_state = state.clone();
    tokio::task::spawn_blocking(move || {
        let existing = db_state
            .db
            .get_batch(batch_id)?
            .ok_or(ApiError::NotFound("Batch not found"))?;

        let start_date = req.start_date.unwrap_or(existing.start_date);
        let end_date = req.end_date.unwrap_or(existing.end_date);
        if !valid_date(&start_date) || !valid_date(&end_date) {
            return Err(ApiError::BadRequest("Dates must be YYYY-MM-DD"));
        }

        db_state.db.update_batch(
            batch_id,
            &req.month.unwrap_or(existing.month),
            &req.week.unwrap_or(existing.week),
            &req.name.unwrap_or(existing.name),
            &start_date,
            &end_date,
        )?;
        Ok(())
    })
    .await
    .map_err(ApiError::internal)??;

    Ok(Json(serde_json::json!({ "message": "Batch updated successfully" })))
}

/// DELETE /admin/batches/{id}
pub async fn delete_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let db_state = state.clone();
    let deleted = tokio::task::spawn_blocking(move || db_state.db.delete_batch(batch_id))
        .await
        .map_err(ApiError::internal)??;
    if !deleted {
        return Err(ApiError::NotFound("Batch not found"));
    }
    Ok(Json(serde_json::json!({ "message": "Batch deleted successfully" })))
}

/// POST /admin/email — bulk mail through the relay.
pub async fn bulk_email(
    State(state): State<AppState>,
    Json(req): Json<BulkEmailRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.emails.is_empty() || req.message.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Please select recipients and enter a message",
        ));
    }

    for recipient in &req.emails {
        state
            .mailer
            .send(recipient, "LevelUp announcement", &req.message)
            .await?;
    }

    info!("bulk email sent to {} recipients", req.emails.len());
    Ok(Json(serde_json::json!({ "message": "Emails sent successfully!" })))
}

fn batch_view(row: BatchRow) -> BatchView {
    BatchView {
        id: row.id,
        month: row.month,
        week: row.week,
        name: row.name,
        start_date: row.start_date,
        end_date: row.end_date,
    }
}
