use anyhow::{Result, bail};
use rusqlite::Connection;

use crate::Database;
use crate::models::UserRow;
use crate::queries::OptionalExt;

/// Sentinel account that absorbs rows owned by deleted users.
pub const SENTINEL_SUBJECT: &str = "deleted-user";
pub const SENTINEL_EMAIL: &str = "deleted-user@system.local";
pub const SENTINEL_NAME: &str = "Deleted User";

impl Database {
    /// Insert-or-update a user coming back from the identity provider.
    /// Matches on subject id or email; a returning user gets their name and
    /// picture refreshed.
    pub fn upsert_oauth_user(
        &self,
        subject_id: &str,
        email: &str,
        name: &str,
        picture: Option<&str>,
    ) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            let existing = query_user(
                conn,
                "SELECT id, subject_id, email, name, picture, password, is_active, created_at
                 FROM users WHERE subject_id = ?1 OR email = ?2",
                rusqlite::params![subject_id, email],
            )?;

            match existing {
                Some(user) => {
                    conn.execute(
                        "UPDATE users SET subject_id = ?1, name = ?2, picture = ?3 WHERE id = ?4",
                        rusqlite::params![subject_id, name, picture, user.id],
                    )?;
                    Ok(UserRow {
                        subject_id: subject_id.to_string(),
                        name: name.to_string(),
                        picture: picture.map(str::to_string),
                        ..user
                    })
                }
                None => {
                    conn.execute(
                        "INSERT INTO users (subject_id, email, name, picture) VALUES (?1, ?2, ?3, ?4)",
                        rusqlite::params![subject_id, email, name, picture],
                    )?;
                    let id = conn.last_insert_rowid();
                    query_user(
                        conn,
                        "SELECT id, subject_id, email, name, picture, password, is_active, created_at
                         FROM users WHERE id = ?1",
                        rusqlite::params![id],
                    )?
                    .ok_or_else(|| anyhow::anyhow!("user {} vanished after insert", id))
                }
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(
                conn,
                "SELECT id, subject_id, email, name, picture, password, is_active, created_at
                 FROM users WHERE email = ?1",
                rusqlite::params![email],
            )
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(
                conn,
                "SELECT id, subject_id, email, name, picture, password, is_active, created_at
                 FROM users WHERE id = ?1",
                rusqlite::params![id],
            )
        })
    }

    pub fn set_user_password(&self, user_id: i64, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2",
                rusqlite::params![password_hash, user_id],
            )?;
            Ok(())
        })
    }

    /// Returns false when the user does not exist.
    pub fn set_user_active(&self, user_id: i64, active: bool) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET is_active = ?1 WHERE id = ?2",
                rusqlite::params![active, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn active_user_pictures(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT picture FROM users WHERE is_active = 1 AND picture IS NOT NULL",
            )?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
        })
    }

    pub fn all_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, subject_id, email, name, picture, password, is_active, created_at
                 FROM users ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete an account. Everything the user owns is reassigned to the
    /// sentinel "Deleted User" record (created on demand) inside a single
    /// transaction, then the user row itself is removed.
    pub fn delete_account(&self, user_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let sentinel_id = sentinel_id(&tx)?;
            if sentinel_id == user_id {
                bail!("cannot delete the sentinel user");
            }

            for table in [
                "questions",
                "answers",
                "activity_logs",
                "messages",
                "expert_questions",
            ] {
                tx.execute(
                    &format!("UPDATE {table} SET user_id = ?1 WHERE user_id = ?2"),
                    rusqlite::params![sentinel_id, user_id],
                )?;
            }

            let deleted = tx.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![user_id])?;
            if deleted == 0 {
                bail!("user {} not found", user_id);
            }

            tx.commit()?;
            Ok(())
        })
    }
}

fn sentinel_id(conn: &Connection) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE email = ?1",
            rusqlite::params![SENTINEL_EMAIL],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO users (subject_id, email, name, is_active) VALUES (?1, ?2, ?3, 0)",
        rusqlite::params![SENTINEL_SUBJECT, SENTINEL_EMAIL, SENTINEL_NAME],
    )?;
    Ok(conn.last_insert_rowid())
}

fn query_user(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(sql)?;
    let row = stmt.query_row(params, map_user).optional()?;
    Ok(row)
}

fn map_user(row: &rusqlite::Row<'_>) -> std::result::Result<UserRow, rusqlite::Error> {
    Ok(UserRow {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        picture: row.get(4)?,
        password: row.get(5)?,
        is_active: row.get(6)?,
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_updates_existing_user_by_email() {
        let db = Database::open_in_memory().unwrap();

        let first = db
            .upsert_oauth_user("sub-1", "a@example.com", "Alice", None)
            .unwrap();
        let second = db
            .upsert_oauth_user("sub-1", "a@example.com", "Alice Smith", Some("pic.png"))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Alice Smith");
        assert_eq!(second.picture.as_deref(), Some("pic.png"));
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn delete_account_reassigns_owned_rows_to_sentinel() {
        let db = Database::open_in_memory().unwrap();
        let user = db
            .upsert_oauth_user("sub-1", "a@example.com", "Alice", None)
            .unwrap();

        db.insert_question(user.id, "what is recursion?").unwrap();
        db.insert_chat_message(user.id, &user.name, "general", "hi").unwrap();
        db.insert_activity(user.id, "Downloaded Worksheet", "Worksheet", Some("Algebra"), "AI Generated", None)
            .unwrap();

        db.delete_account(user.id).unwrap();

        assert!(db.get_user_by_email("a@example.com").unwrap().is_none());
        let sentinel = db.get_user_by_email(SENTINEL_EMAIL).unwrap().unwrap();

        // Owned rows survive under the sentinel, nothing orphans.
        assert_eq!(db.count_questions_by_user(sentinel.id).unwrap(), 1);
        assert_eq!(db.count_messages_by_user(sentinel.id).unwrap(), 1);
        let logs = db.logs_for_user(sentinel.id).unwrap();
        assert_eq!(logs.len(), 1);
    }

    #[test]
    fn set_user_active_reports_missing_users() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.set_user_active(42, false).unwrap());

        let user = db
            .upsert_oauth_user("sub-1", "a@example.com", "Alice", Some("p.png"))
            .unwrap();
        assert!(db.set_user_active(user.id, false).unwrap());
        assert!(db.active_user_pictures().unwrap().is_empty());
    }
}
