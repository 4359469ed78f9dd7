//! Database row types, mapped directly from SQLite rows. Distinct from the
//! levelup-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    pub subject_id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
    pub password: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

pub struct PaymentRow {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub plan_name: String,
    pub amount: f64,
    pub txnid: String,
    pub status: String,
    pub created_at: String,
}

pub struct ChatMessageRow {
    pub username: String,
    pub body: String,
    pub created_at: String,
    pub author_picture: Option<String>,
}

pub struct QuestionRow {
    pub id: i64,
    pub body: String,
    pub created_at: String,
    pub author_name: Option<String>,
    pub author_picture: Option<String>,
}

pub struct AnswerRow {
    pub question_id: i64,
    pub body: String,
    pub created_at: String,
    pub author_name: Option<String>,
    pub author_picture: Option<String>,
}

pub struct ActivityLogRow {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub resource_type: String,
    pub resource_name: Option<String>,
    pub source: String,
    pub pdf_base64: Option<String>,
    pub created_at: String,
}

/// Activity row joined with its author's name for list views.
pub struct ActivityEntryRow {
    pub author_name: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_name: Option<String>,
    pub source: String,
    pub pdf_base64: Option<String>,
    pub created_at: String,
}

pub struct FounderMessageRow {
    pub body: String,
    pub created_at: String,
}

/// An answer posted on one of the target user's questions, with the
/// responder's email for the notification line.
pub struct AnswerNoticeRow {
    pub responder_email: String,
    pub body: String,
}

pub struct BatchRow {
    pub id: i64,
    pub month: String,
    pub week: String,
    pub name: String,
    pub start_date: String,
    pub end_date: String,
    pub created_at: String,
}

pub struct ContributorRow {
    pub name: String,
    pub picture: Option<String>,
    pub questions: i64,
    pub answers: i64,
    pub total: i64,
}

pub struct TopUserRow {
    pub name: String,
    pub email: String,
    pub activity_count: i64,
}
