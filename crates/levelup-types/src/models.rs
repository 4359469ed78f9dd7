use serde::{Deserialize, Serialize};

/// Lifecycle of a payment row. Stored as TEXT in the database and echoed
/// verbatim by the gateway callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Success => "Success",
            PaymentStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fallback avatar for users who never set a picture.
pub const DEFAULT_PICTURE: &str = "/static/images/default-user.png";

/// Artifact source recorded when the client does not say otherwise.
pub const DEFAULT_SOURCE: &str = "AI Generated";
