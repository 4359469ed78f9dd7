use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use levelup_types::api::{
    AnswerView, AskQuestionRequest, Claims, ContributionsResponse, ContributorView,
    PostAnswerRequest, QuestionView, ReportsResponse,
};
use levelup_types::models::DEFAULT_PICTURE;

use crate::error::ApiError;
use crate::state::AppState;

/// POST /questions
pub async fn ask_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AskQuestionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let body = req.question.trim().to_string();
    if body.is_empty() {
        return Err(ApiError::BadRequest("Question cannot be empty"));
    }

    // Run blocking DB work off the async runtime
    let db_state = state.clone();
    let user_id = claims.sub;
    tokio::task::spawn_blocking(move || {
        // A stale token can outlive its account; report that instead of
        // tripping the user_id foreign key.
        if db_state.db.get_user_by_id(user_id)?.is_none() {
            return Err(ApiError::NotFound("User not found"));
        }
        db_state.db.insert_question(user_id, &body)?;
        Ok(())
    })
    .await
    .map_err(ApiError::internal)??;

    Ok(Json(serde_json::json!({ "message": "Question posted successfully" })))
}

/// POST /questions/{id}/answers
pub async fn post_answer(
    State(state): State<AppState>,
    Path(question_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PostAnswerRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let body = req.answer.trim().to_string();
    if body.is_empty() {
        return Err(ApiError::BadRequest("Answer cannot be empty"));
    }

    let db_state = state.clone();
    let user_id = claims.sub;
    let picture = tokio::task::spawn_blocking(move || {
        let user = db_state
            .db
            .get_user_by_id(user_id)?
            .ok_or(ApiError::NotFound("User not found"))?;
        if !db_state.db.question_exists(question_id)? {
            return Err(ApiError::NotFound("Question not found"));
        }
        db_state.db.insert_answer(user_id, question_id, &body)?;
        Ok(user.picture.unwrap_or_else(|| DEFAULT_PICTURE.to_string()))
    })
    .await
    .map_err(ApiError::internal)??;

    Ok(Json(serde_json::json!({
        "message": "Answer posted successfully",
        "user_picture": picture,
    })))
}

/// GET /questions — newest first, answers nested per question.
pub async fn get_questions(
    State(state): State<AppState>,
) -> Result<Json<Vec<QuestionView>>, ApiError> {
    // Run blocking DB queries off the async runtime
    let db_state = state.clone();
    let (questions, answers) = tokio::task::spawn_blocking(move || {
        let questions = db_state.db.get_questions()?;
        let answers = db_state.db.get_all_answers()?;
        Ok::<_, anyhow::Error>((questions, answers))
    })
    .await
    .map_err(ApiError::internal)??;

    // Group answers by question id (cheap in-memory work).
    let mut grouped: HashMap<i64, Vec<AnswerView>> = HashMap::new();
    for a in answers {
        grouped.entry(a.question_id).or_default().push(AnswerView {
            username: a.author_name.unwrap_or_else(|| "Unknown User".to_string()),
            user_picture: a.author_picture.unwrap_or_else(|| DEFAULT_PICTURE.to_string()),
            answer_text: a.body,
            timestamp: a.created_at,
        });
    }

    let views = questions
        .into_iter()
        .map(|q| QuestionView {
            answers: grouped.remove(&q.id).unwrap_or_default(),
            id: q.id,
            username: q.author_name.unwrap_or_else(|| "Unknown User".to_string()),
            user_picture: q.author_picture.unwrap_or_else(|| DEFAULT_PICTURE.to_string()),
            question_text: q.body,
            timestamp: q.created_at,
        })
        .collect();

    Ok(Json(views))
}

/// POST /expert-questions
pub async fn ask_expert(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AskQuestionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let body = req.question.trim().to_string();
    if body.is_empty() {
        return Err(ApiError::BadRequest("Question cannot be empty"));
    }

    let db_state = state.clone();
    let user_id = claims.sub;
    let username = claims.name.clone();
    let picture = tokio::task::spawn_blocking(move || -> Result<String, ApiError> {
        let user = db_state
            .db
            .get_user_by_id(user_id)?
            .ok_or(ApiError::NotFound("User not found"))?;
        db_state.db.insert_expert_question(user_id, &username, &body)?;
        Ok(user.picture.unwrap_or_else(|| DEFAULT_PICTURE.to_string()))
    })
    .await
    .map_err(ApiError::internal)??;

    Ok(Json(serde_json::json!({
        "message": "Expert question submitted successfully",
        "profile_picture": picture,
    })))
}

/// GET /community/top-contributors — top 5, ten points per contribution.
pub async fn top_contributors(
    State(state): State<AppState>,
) -> Result<Json<Vec<ContributorView>>, ApiError> {
    let db_state = state.clone();
    let rows = tokio::task::spawn_blocking(move || db_state.db.top_contributors(5))
        .await
        .map_err(ApiError::internal)??;

    let views = rows
        .into_iter()
        .map(|c| ContributorView {
            name: c.name,
            picture: c.picture.unwrap_or_else(|| DEFAULT_PICTURE.to_string()),
            questions: c.questions,
            answers: c.answers,
            points: c.total * 10,
        })
        .collect();
    Ok(Json(views))
}

/// GET /community/contributions — the calling user's own counts.
pub async fn contributions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ContributionsResponse>, ApiError> {
    let db_state = state.clone();
    let user_id = claims.sub;
    let response = tokio::task::spawn_blocking(move || {
        Ok::<_, anyhow::Error>(ContributionsResponse {
            chat_messages: db_state.db.count_messages_by_user(user_id)?,
            forum_posts: db_state.db.count_questions_by_user(user_id)?,
            qa_answers: db_state.db.count_answers_by_user(user_id)?,
        })
    })
    .await
    .map_err(ApiError::internal)??;

    Ok(Json(response))
}

/// GET /community/reports — platform-wide totals.
pub async fn reports(
    State(state): State<AppState>,
) -> Result<Json<ReportsResponse>, ApiError> {
    let db_state = state.clone();
    let response = tokio::task::spawn_blocking(move || {
        Ok::<_, anyhow::Error>(ReportsResponse {
            total_messages: db_state.db.count_messages()?,
            total_questions: db_state.db.count_questions()?,
            total_expert_questions: db_state.db.count_expert_questions()?,
        })
    })
    .await
    .map_err(ApiError::internal)??;

    Ok(Json(response))
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
    async fn stale_tokens_for_deleted_accounts_get_not_found() {
        let state = test_state();

        let res = ask_question(
            State(state.clone()),
            Extension(claims_for(999)),
            Json(AskQuestionRequest { question: "anyone?".into() }),
        )
        .await;
        assert!(matches!(res, Err(ApiError::NotFound(_))));

        let res = post_answer(
            State(state.clone()),
            Path(1),
            Extension(claims_for(999)),
            Json(PostAnswerRequest { answer: "me".into() }),
        )
        .await;
        assert!(matches!(res, Err(ApiError::NotFound(_))));

        let res = ask_expert(
            State(state),
            Extension(claims_for(999)),
            Json(AskQuestionRequest { question: "expert advice?".into() }),
        )
        .await;
        assert!(matches!(res, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn questions_and_answers_post_for_live_accounts() {
        let state = test_state();
        let user = state
            .db
            .upsert_oauth_user("s1", "a@example.com", "Alice", None)
            .unwrap();

        ask_question(
            State(state.clone()),
            Extension(claims_for(user.id)),
            Json(AskQuestionRequest { question: "what is a borrow?".into() }),
        )
        .await
        .unwrap();

        let questions = get_questions(State(state.clone())).await.unwrap();
        assert_eq!(questions.0.len(), 1);
        let question_id = questions.0[0].id;

        post_answer(
            State(state.clone()),
            Path(question_id),
            Extension(claims_for(user.id)),
            Json(PostAnswerRequest { answer: "a loan of a reference".into() }),
        )
        .await
        .unwrap();

        let questions = get_questions(State(state)).await.unwrap();
        assert_eq!(questions.0[0].answers.len(), 1);
    }
}
