use anyhow::Result;

use crate::Database;
use crate::models::{AnswerRow, ContributorRow, QuestionRow};

impl Database {
    pub fn insert_question(&self, user_id: i64, body: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO questions (user_id, body) VALUES (?1, ?2)",
                rusqlite::params![user_id, body],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn question_exists(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM questions WHERE id = ?1",
                rusqlite::params![id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn insert_answer(&self, user_id: i64, question_id: i64, body: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO answers (user_id, question_id, body) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, question_id, body],
            )?;
            Ok(())
        })
    }

    /// All questions, newest first, with author details joined in.
    /// Answers come from `get_all_answers`; the API groups them per question.
    pub fn get_questions(&self) -> Result<Vec<QuestionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT q.id, q.body, q.created_at, u.name, u.picture
                 FROM questions q
                 LEFT JOIN users u ON q.user_id = u.id
                 ORDER BY q.created_at DESC, q.id DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(QuestionRow {
                        id: row.get(0)?,
                        body: row.get(1)?,
                        created_at: row.get(2)?,
                        author_name: row.get(3)?,
                        author_picture: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_all_answers(&self) -> Result<Vec<AnswerRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.question_id, a.body, a.created_at, u.name, u.picture
                 FROM answers a
                 LEFT JOIN users u ON a.user_id = u.id
                 ORDER BY a.created_at, a.id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(AnswerRow {
                        question_id: row.get(0)?,
                        body: row.get(1)?,
                        created_at: row.get(2)?,
                        author_name: row.get(3)?,
                        author_picture: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_expert_question(&self, user_id: i64, username: &str, body: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO expert_questions (user_id, username, body) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, username, body],
            )?;
            Ok(())
        })
    }

    /// Top users by questions + answers. Correlated subqueries keep the two
    /// counts independent (a joined double-count would multiply them).
    pub fn top_contributors(&self, limit: u32) -> Result<Vec<ContributorRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.name, u.picture,
                        (SELECT COUNT(*) FROM questions q WHERE q.user_id = u.id) AS question_count,
                        (SELECT COUNT(*) FROM answers a WHERE a.user_id = u.id) AS answer_count
                 FROM users u
                 ORDER BY question_count + answer_count DESC, u.id
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![limit], |row| {
                    let questions: i64 = row.get(2)?;
                    let answers: i64 = row.get(3)?;
                    Ok(ContributorRow {
                        name: row.get(0)?,
                        picture: row.get(1)?,
                        questions,
                        answers,
                        total: questions + answers,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_questions(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))?)
        })
    }

    pub fn count_expert_questions(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM expert_questions", [], |row| row.get(0))?)
        })
    }

    pub fn count_questions_by_user(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM questions WHERE user_id = ?1",
                rusqlite::params![user_id],
                |row| row.get(0),
            )?)
        })
    }

    pub fn count_answers_by_user(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM answers WHERE user_id = ?1",
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
    fn top_contributors_counts_questions_and_answers_independently() {
        let db = Database::open_in_memory().unwrap();
        let alice = db.upsert_oauth_user("s1", "a@example.com", "Alice", None).unwrap();
        let bob = db.upsert_oauth_user("s2", "b@example.com", "Bob", None).unwrap();

        let q1 = db.insert_question(alice.id, "q one").unwrap();
        let q2 = db.insert_question(alice.id, "q two").unwrap();
        db.insert_answer(bob.id, q1, "a1").unwrap();
        db.insert_answer(bob.id, q2, "a2").unwrap();
        db.insert_answer(bob.id, q2, "a3").unwrap();

        let top = db.top_contributors(5).unwrap();
        assert_eq!(top[0].name, "Bob");
        assert_eq!(top[0].answers, 3);
        assert_eq!(top[0].questions, 0);
        assert_eq!(top[0].total, 3);
        assert_eq!(top[1].name, "Alice");
        assert_eq!(top[1].total, 2);
    }

    #[test]
    fn questions_come_back_newest_first_with_answers_available() {
        let db = Database::open_in_memory().unwrap();
        let user = db.upsert_oauth_user("s1", "a@example.com", "Alice", None).unwrap();

        let first = db.insert_question(user.id, "first").unwrap();
        let second = db.insert_question(user.id, "second").unwrap();
        db.insert_answer(user.id, first, "reply").unwrap();

        let questions = db.get_questions().unwrap();
        assert_eq!(questions[0].id, second);
        assert_eq!(questions[1].id, first);

        let answers = db.get_all_answers().unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].question_id, first);
    }
}
