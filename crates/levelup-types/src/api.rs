use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// JWT claims shared across levelup-api (REST middleware) and the auth
/// handlers. Canonical definition lives here in levelup-types to eliminate
/// duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Database user id.
    pub sub: i64,
    pub email: String,
    pub name: String,
    pub admin: bool,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Where the frontend wants to land after the provider round-trip.
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenLoginRequest {
    pub id_token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub admin: bool,
    pub token: String,
}

// -- Profile --

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub name: String,
    pub email: String,
    pub picture: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserStatusRequest {
    pub user_id: i64,
    pub active: bool,
}

// -- Community Q&A --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AskQuestionRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostAnswerRequest {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerView {
    pub username: String,
    pub user_picture: String,
    pub answer_text: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: i64,
    pub username: String,
    pub user_picture: String,
    pub question_text: String,
    pub timestamp: String,
    pub answers: Vec<AnswerView>,
}

#[derive(Debug, Serialize)]
pub struct ContributorView {
    pub name: String,
    pub picture: String,
    pub questions: i64,
    pub answers: i64,
    pub points: i64,
}

#[derive(Debug, Serialize)]
pub struct ContributionsResponse {
    pub chat_messages: i64,
    pub forum_posts: i64,
    pub qa_answers: i64,
}

#[derive(Debug, Serialize)]
pub struct ReportsResponse {
    pub total_messages: i64,
    pub total_questions: i64,
    pub total_expert_questions: i64,
}

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendChatRequest {
    pub room: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatMessageView {
    pub username: String,
    pub message: String,
    pub timestamp: String,
    pub profile_picture: String,
}

// -- Activity --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogActivityRequest {
    pub action: String,
    pub resource_type: String,
    pub resource_name: Option<String>,
    pub source: Option<String>,
    /// Pre-rendered artifact, base64-encoded by the client.
    pub pdf: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivityEntry {
    pub user: String,
    pub action: String,
    pub resource_type: String,
    pub resource_name: Option<String>,
    pub date: String,
    pub source: String,
    pub pdf: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivityLogsResponse {
    pub activities: Vec<ActivityEntry>,
    pub total_pages: u32,
    pub current_page: u32,
}

#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    pub labels: Vec<String>,
    pub values: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct DayBreakdown {
    pub date: String,
    pub worksheets: i64,
    pub flashcards: i64,
}

#[derive(Debug, Serialize)]
pub struct DayEntry {
    pub name: String,
    pub time: String,
}

#[derive(Debug, Serialize)]
pub struct UserStatsResponse {
    pub total_worksheets: i64,
    pub total_flashcards: i64,
    pub most_downloaded: String,
    pub weekly_data: Vec<DayBreakdown>,
    pub daily_entries: HashMap<String, Vec<DayEntry>>,
}

#[derive(Debug, Serialize)]
pub struct TopUserView {
    pub name: String,
    pub email: String,
    pub activity_count: i64,
}

// -- Payments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckoutRequest {
    pub plan: Option<String>,
    /// Gateway amounts are decimal strings ("499.00"); passed through as-is.
    pub amount: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayFields {
    pub key: String,
    pub txnid: String,
    pub amount: String,
    pub productinfo: String,
    pub firstname: String,
    pub email: String,
    pub phone: String,
    pub surl: String,
    pub furl: String,
    pub hash: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub gateway_url: String,
    pub fields: GatewayFields,
}

/// Gateway return-leg parameters. The gateway posts many fields we do not
/// care about, so unknown keys must be tolerated here.
#[derive(Debug, Deserialize)]
pub struct GatewayCallback {
    pub txnid: Option<String>,
    pub productinfo: Option<String>,
    pub amount: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub txnid: String,
    pub plan: String,
    pub amount: String,
    pub status: String,
}

// -- Announcements & notifications --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostAnnouncementRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AnnouncementView {
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct Notification {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

// -- Admin --

#[derive(Debug, Serialize)]
pub struct DashboardUser {
    pub profile_picture: String,
    pub name: String,
    pub email: String,
    pub worksheets_used: i64,
    pub flashcards_used: i64,
    pub subscription: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub total_users: i64,
    pub total_worksheets: i64,
    pub total_flashcards: i64,
    pub users: Vec<DashboardUser>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBatchRequest {
    pub month: String,
    pub week: String,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateBatchRequest {
    pub month: Option<String>,
    pub week: Option<String>,
    pub name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchView {
    pub id: i64,
    pub month: String,
    pub week: String,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkEmailRequest {
    pub emails: Vec<String>,
    pub message: String,
}

// -- Uploads --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub size: u64,
}
