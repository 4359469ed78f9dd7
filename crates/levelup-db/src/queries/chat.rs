use anyhow::Result;

use crate::Database;
use crate::models::ChatMessageRow;

impl Database {
    pub fn insert_chat_message(
        &self,
        user_id: i64,
        username: &str,
        room: &str,
        body: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (user_id, username, room, body) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![user_id, username, room, body],
            )?;
            Ok(())
        })
    }

    /// Chronological history for one room, with each author's current
    /// picture joined in (single query, no N+1).
    pub fn get_room_messages(&self, room: &str) -> Result<Vec<ChatMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.username, m.body, m.created_at, u.picture
                 FROM messages m
                 LEFT JOIN users u ON m.user_id = u.id
                 WHERE m.room = ?1
                 ORDER BY m.created_at, m.id",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![room], |row| {
                    Ok(ChatMessageRow {
                        username: row.get(0)?,
                        body: row.get(1)?,
                        created_at: row.get(2)?,
                        author_picture: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_messages(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?)
        })
    }

    pub fn count_messages_by_user(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE user_id = ?1",
                rusqlite::params![user_id],
                |row| row.get(0),
            )?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_history_is_chronological_and_scoped_to_the_room() {
        let db = Database::open_in_memory().unwrap();
        let user = db.upsert_oauth_user("s1", "a@example.com", "Alice", Some("a.png")).unwrap();

        db.insert_chat_message(user.id, "Alice", "math", "first").unwrap();
        db.insert_chat_message(user.id, "Alice", "math", "second").unwrap();
        db.insert_chat_message(user.id, "Alice", "science", "elsewhere").unwrap();

        let history = db.get_room_messages("math").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].body, "first");
        assert_eq!(history[1].body, "second");
        assert_eq!(history[0].author_picture.as_deref(), Some("a.png"));
    }
}
