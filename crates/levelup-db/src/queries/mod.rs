mod activity;
mod announcements;
mod batches;
mod chat;
mod community;
mod payments;
mod users;

pub use activity::ActivityQuery;
pub use users::{SENTINEL_EMAIL, SENTINEL_NAME, SENTINEL_SUBJECT};

use anyhow::Result;

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
