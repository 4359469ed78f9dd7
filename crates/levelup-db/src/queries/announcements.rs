use anyhow::Result;

use crate::Database;
use crate::models::{AnswerNoticeRow, FounderMessageRow};

impl Database {
    pub fn insert_founder_message(&self, body: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO founder_messages (body) VALUES (?1)",
                rusqlite::params![body],
            )?;
            Ok(())
        })
    }

    pub fn latest_founder_messages(&self, limit: u32) -> Result<Vec<FounderMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT body, created_at FROM founder_messages
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![limit], |row| {
                    Ok(FounderMessageRow {
                        body: row.get(0)?,
                        created_at: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Latest answers posted on the given user's questions, with each
    /// responder's email. Feeds the notification list.
    pub fn answers_to_user_questions(&self, user_id: i64, limit: u32) -> Result<Vec<AnswerNoticeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.email, a.body
                 FROM answers a
                 JOIN questions q ON a.question_id = q.id
                 JOIN users r ON a.user_id = r.id
                 WHERE q.user_id = ?1
                 ORDER BY a.created_at DESC, a.id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |row| {
                    Ok(AnswerNoticeRow {
                        responder_email: row.get(0)?,
                        body: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn founder_feed_is_capped_and_newest_first() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..7 {
            db.insert_founder_message(&format!("update {i}")).unwrap();
        }

        let latest = db.latest_founder_messages(5).unwrap();
        assert_eq!(latest.len(), 5);
        assert_eq!(latest[0].body, "update 6");
    }

    #[test]
    fn answer_notices_only_cover_the_asking_users_questions() {
        let db = Database::open_in_memory().unwrap();
        let asker = db.upsert_oauth_user("s1", "a@example.com", "Alice", None).unwrap();
        let other = db.upsert_oauth_user("s2", "b@example.com", "Bob", None).unwrap();

        let own = db.insert_question(asker.id, "mine").unwrap();
        let theirs = db.insert_question(other.id, "not mine").unwrap();
        db.insert_answer(other.id, own, "answering yours").unwrap();
        db.insert_answer(asker.id, theirs, "answering theirs").unwrap();

        let notices = db.answers_to_user_questions(asker.id, 5).unwrap();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].responder_email, "b@example.com");
        assert_eq!(notices[0].body, "answering yours");
    }
}
