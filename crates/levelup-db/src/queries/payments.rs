use anyhow::Result;

use crate::Database;
use crate::models::PaymentRow;
use crate::queries::OptionalExt;

impl Database {
    /// Insert a Pending payment. Returns false when the transaction id is
    /// already taken (unique constraint), which the API maps to 409.
    pub fn insert_payment(
        &self,
        email: &str,
        name: &str,
        plan_name: &str,
        amount: f64,
        txnid: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let res = conn.execute(
                "INSERT INTO payments (email, name, plan_name, amount, txnid)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![email, name, plan_name, amount, txnid],
            );
            match res {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Returns false when no payment carries the given transaction id.
    pub fn set_payment_status(&self, txnid: &str, status: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE payments SET status = ?1 WHERE txnid = ?2",
                rusqlite::params![status, txnid],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_payment_by_txnid(&self, txnid: &str) -> Result<Option<PaymentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, name, plan_name, amount, txnid, status, created_at
                 FROM payments WHERE txnid = ?1",
            )?;
            let row = stmt
                .query_row(rusqlite::params![txnid], |row| {
                    Ok(PaymentRow {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        name: row.get(2)?,
                        plan_name: row.get(3)?,
                        amount: row.get(4)?,
                        txnid: row.get(5)?,
                        status: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn has_successful_payment(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM payments WHERE email = ?1 AND status = 'Success'",
                rusqlite::params![email],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_txnid_is_rejected() {
        let db = Database::open_in_memory().unwrap();

        assert!(db.insert_payment("a@example.com", "Alice", "Monthly", 499.0, "TXN1").unwrap());
        assert!(!db.insert_payment("b@example.com", "Bob", "Yearly", 999.0, "TXN1").unwrap());
    }

    #[test]
    fn status_lifecycle_pending_to_success() {
        let db = Database::open_in_memory().unwrap();
        db.insert_payment("a@example.com", "Alice", "Monthly", 499.0, "TXN1").unwrap();

        assert_eq!(db.get_payment_by_txnid("TXN1").unwrap().unwrap().status, "Pending");
        assert!(!db.has_successful_payment("a@example.com").unwrap());

        assert!(db.set_payment_status("TXN1", "Success").unwrap());
        assert!(db.has_successful_payment("a@example.com").unwrap());

        // Unknown transaction ids update nothing.
        assert!(!db.set_payment_status("TXN-missing", "Failed").unwrap());
    }
}
