use anyhow::Result;
use rusqlite::types::Value;

use crate::Database;
use crate::models::{ActivityEntryRow, ActivityLogRow, TopUserRow};
use crate::queries::OptionalExt;

/// Filter set for the paginated activity listing.
#[derive(Debug, Default)]
pub struct ActivityQuery {
    /// Restrict to one user (the `filter=user` mode); None means everyone.
    pub user_id: Option<i64>,
    /// Case-insensitive substring match over resource name and action.
    pub search: Option<String>,
    /// Substring match over the resource type (Worksheet/Flashcard).
    pub resource_type: Option<String>,
    pub oldest_first: bool,
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
}

impl Database {
    pub fn insert_activity(
        &self,
        user_id: i64,
        action: &str,
        resource_type: &str,
        resource_name: Option<&str>,
        source: &str,
        pdf_base64: Option<&str>,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO activity_logs (user_id, action, resource_type, resource_name, source, pdf_base64)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![user_id, action, resource_type, resource_name, source, pdf_base64],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Lookup used for the flashcard dedup rule: one log row per
    /// (user, action, resource type, resource name).
    pub fn find_activity(
        &self,
        user_id: i64,
        action: &str,
        resource_type: &str,
        resource_name: Option<&str>,
    ) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let id = conn
                .query_row(
                    "SELECT id FROM activity_logs
                     WHERE user_id = ?1 AND action = ?2 AND resource_type = ?3
                       AND resource_name IS ?4",
                    rusqlite::params![user_id, action, resource_type, resource_name],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id)
        })
    }

    pub fn update_activity_pdf(&self, id: i64, pdf_base64: Option<&str>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE activity_logs SET pdf_base64 = ?1 WHERE id = ?2",
                rusqlite::params![pdf_base64, id],
            )?;
            Ok(())
        })
    }

    /// Filtered, sorted, paginated listing plus the total row count for the
    /// same filters (the API derives total_pages from it).
    pub fn list_activity(&self, query: &ActivityQuery) -> Result<(Vec<ActivityEntryRow>, i64)> {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(user_id) = query.user_id {
            params.push(Value::Integer(user_id));
            clauses.push(format!("l.user_id = ?{}", params.len()));
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            params.push(Value::Text(format!("%{}%", search.to_lowercase())));
            let n = params.len();
            clauses.push(format!(
                "(LOWER(COALESCE(l.resource_name, '')) LIKE ?{n} OR LOWER(l.action) LIKE ?{n})"
            ));
        }
        if let Some(rt) = query.resource_type.as_deref().filter(|s| !s.is_empty()) {
            params.push(Value::Text(format!("%{}%", rt.to_lowercase())));
            clauses.push(format!("LOWER(l.resource_type) LIKE ?{}", params.len()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let order = if query.oldest_first {
            "ORDER BY l.created_at ASC, l.id ASC"
        } else {
            "ORDER BY l.created_at DESC, l.id DESC"
        };

        let per_page = query.per_page.max(1);
        // Widen before multiplying; the page number comes straight from a
        // query parameter and can be anything up to u32::MAX.
        let offset = u64::from(query.page.max(1) - 1) * u64::from(per_page);

        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM activity_logs l {where_sql}"),
                rusqlite::params_from_iter(params.iter()),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT u.name, l.action, l.resource_type, l.resource_name, l.source, l.pdf_base64, l.created_at
                 FROM activity_logs l
                 LEFT JOIN users u ON l.user_id = u.id
                 {where_sql}
                 {order}
                 LIMIT {per_page} OFFSET {offset}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), map_entry)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok((rows, total))
        })
    }

    /// Per-day log counts since the given timestamp (inclusive), oldest day
    /// first. Timestamps are `YYYY-MM-DD HH:MM:SS` text, so the comparison
    /// is lexicographic and `date()` extracts the day.
    pub fn daily_counts(&self, since: &str) -> Result<Vec<(String, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT date(created_at), COUNT(*)
                 FROM activity_logs
                 WHERE created_at >= ?1
                 GROUP BY date(created_at)
                 ORDER BY date(created_at)",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![since], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn user_logs_since(&self, user_id: i64, since: &str) -> Result<Vec<ActivityLogRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, action, resource_type, resource_name, source, pdf_base64, created_at
                 FROM activity_logs
                 WHERE user_id = ?1 AND created_at >= ?2
                 ORDER BY created_at, id",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, since], map_log)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn logs_for_user(&self, user_id: i64) -> Result<Vec<ActivityLogRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, action, resource_type, resource_name, source, pdf_base64, created_at
                 FROM activity_logs
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id], map_log)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn recent_logs(&self, user_id: Option<i64>, limit: u32) -> Result<Vec<ActivityEntryRow>> {
        self.with_conn(|conn| {
            let (sql, params) = match user_id {
                Some(id) => (
                    "SELECT u.name, l.action, l.resource_type, l.resource_name, l.source, l.pdf_base64, l.created_at
                     FROM activity_logs l
                     LEFT JOIN users u ON l.user_id = u.id
                     WHERE l.user_id = ?1
                     ORDER BY l.created_at DESC, l.id DESC
                     LIMIT ?2",
                    vec![Value::Integer(id), Value::Integer(limit as i64)],
                ),
                None => (
                    "SELECT u.name, l.action, l.resource_type, l.resource_name, l.source, l.pdf_base64, l.created_at
                     FROM activity_logs l
                     LEFT JOIN users u ON l.user_id = u.id
                     ORDER BY l.created_at DESC, l.id DESC
                     LIMIT ?1",
                    vec![Value::Integer(limit as i64)],
                ),
            };
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), map_entry)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_logs_by_type(&self, resource_type: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM activity_logs WHERE resource_type = ?1",
                rusqlite::params![resource_type],
                |row| row.get(0),
            )?)
        })
    }

    pub fn count_user_logs_by_type(&self, user_id: i64, resource_type: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM activity_logs WHERE user_id = ?1 AND resource_type = ?2",
                rusqlite::params![user_id, resource_type],
                |row| row.get(0),
            )?)
        })
    }

    /// Most active users by raw log count. Users with no activity at all are
    /// excluded, matching the inner join in the aggregate.
    pub fn top_users_by_activity(&self, limit: u32) -> Result<Vec<TopUserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.name, u.email, COUNT(l.id) AS activity_count
                 FROM users u
                 JOIN activity_logs l ON l.user_id = u.id
                 GROUP BY u.id, u.name, u.email
                 ORDER BY activity_count DESC, u.id
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![limit], |row| {
                    Ok(TopUserRow {
                        name: row.get(0)?,
                        email: row.get(1)?,
                        activity_count: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Latest logs of one resource type, for the trending-download feed.
    pub fn recent_logs_by_type(&self, resource_type: &str, limit: u32) -> Result<Vec<ActivityLogRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, action, resource_type, resource_name, source, pdf_base64, created_at
                 FROM activity_logs
                 WHERE resource_type = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![resource_type, limit], map_log)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_log(row: &rusqlite::Row<'_>) -> std::result::Result<ActivityLogRow, rusqlite::Error> {
    Ok(ActivityLogRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        action: row.get(2)?,
        resource_type: row.get(3)?,
        resource_name: row.get(4)?,
        source: row.get(5)?,
        pdf_base64: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_entry(row: &rusqlite::Row<'_>) -> std::result::Result<ActivityEntryRow, rusqlite::Error> {
    Ok(ActivityEntryRow {
        author_name: row.get(0)?,
        action: row.get(1)?,
        resource_type: row.get(2)?,
        resource_name: row.get(3)?,
        source: row.get(4)?,
        pdf_base64: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_db() -> (Database, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let alice = db.upsert_oauth_user("s1", "a@example.com", "Alice", None).unwrap().id;
        let bob = db.upsert_oauth_user("s2", "b@example.com", "Bob", None).unwrap().id;
        db.insert_activity(alice, "Downloaded Worksheet", "Worksheet", Some("Algebra Basics"), "AI Generated", None).unwrap();
        db.insert_activity(alice, "Generated Flashcard", "Flashcard", Some("Fractions"), "AI Generated", None).unwrap();
        db.insert_activity(bob, "Downloaded Worksheet", "Worksheet", Some("Geometry"), "Uploaded", None).unwrap();
        (db, alice, bob)
    }

    #[test]
    fn listing_filters_by_user_search_and_type() {
        let (db, alice, _) = seeded_db();

        let (rows, total) = db
            .list_activity(&ActivityQuery {
                user_id: Some(alice),
                page: 1,
                per_page: 10,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows.len(), 2);

        let (rows, total) = db
            .list_activity(&ActivityQuery {
                search: Some("algebra".into()),
                page: 1,
                per_page: 10,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].resource_name.as_deref(), Some("Algebra Basics"));

        let (_, total) = db
            .list_activity(&ActivityQuery {
                resource_type: Some("worksheet".into()),
                page: 1,
                per_page: 10,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 2);
    }

    #[test]
    fn pagination_reports_the_full_filtered_count() {
        let (db, alice, _) = seeded_db();
        for i in 0..5 {
            db.insert_activity(alice, "Downloaded Worksheet", "Worksheet", Some(&format!("Sheet {i}")), "AI Generated", None)
                .unwrap();
        }

        let (rows, total) = db
            .list_activity(&ActivityQuery {
                page: 2,
                per_page: 3,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 8);
        assert_eq!(rows.len(), 3);

        // A page past the end is empty but keeps the count.
        let (rows, total) = db
            .list_activity(&ActivityQuery {
                page: 10,
                per_page: 3,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 8);
        assert!(rows.is_empty());
    }

    #[test]
    fn huge_page_numbers_do_not_overflow_the_offset() {
        let (db, _, _) = seeded_db();

        let (rows, total) = db
            .list_activity(&ActivityQuery {
                page: u32::MAX,
                per_page: 100,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(total, 3);
        assert!(rows.is_empty());
    }

    #[test]
    fn flashcard_dedup_lookup_matches_exact_tuple() {
        let (db, alice, bob) = seeded_db();

        let found = db
            .find_activity(alice, "Generated Flashcard", "Flashcard", Some("Fractions"))
            .unwrap();
        assert!(found.is_some());

        // Same tuple for another user is a different row.
        assert!(db
            .find_activity(bob, "Generated Flashcard", "Flashcard", Some("Fractions"))
            .unwrap()
            .is_none());

        db.update_activity_pdf(found.unwrap(), Some("ZmFrZQ==")).unwrap();
        let logs = db.logs_for_user(alice).unwrap();
        let card = logs.iter().find(|l| l.resource_type == "Flashcard").unwrap();
        assert_eq!(card.pdf_base64.as_deref(), Some("ZmFrZQ=="));
    }

    #[test]
    fn daily_counts_group_by_day_since_cutoff() {
        let db = Database::open_in_memory().unwrap();
        let user = db.upsert_oauth_user("s1", "a@example.com", "Alice", None).unwrap().id;

        // Backdated rows via raw SQL; insert_activity always stamps now.
        db.with_conn_mut(|conn| {
            for (day, n) in [("2026-08-20", 2), ("2026-08-21", 1), ("2026-07-01", 4)] {
                for _ in 0..n {
                    conn.execute(
                        "INSERT INTO activity_logs (user_id, action, resource_type, created_at)
                         VALUES (?1, 'Downloaded Worksheet', 'Worksheet', ?2 || ' 10:00:00')",
                        rusqlite::params![user, day],
                    )?;
                }
            }
            Ok(())
        })
        .unwrap();

        let counts = db.daily_counts("2026-08-01 00:00:00").unwrap();
        assert_eq!(counts, vec![("2026-08-20".to_string(), 2), ("2026-08-21".to_string(), 1)]);
    }

    #[test]
    fn top_users_excludes_users_without_activity() {
        let (db, _, _) = seeded_db();
        db.upsert_oauth_user("s3", "c@example.com", "Cara", None).unwrap();

        let top = db.top_users_by_activity(5).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Alice");
        assert_eq!(top[0].activity_count, 2);
    }
}
