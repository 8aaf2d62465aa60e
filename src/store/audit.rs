//! Upload audit log: one row per file ingestion attempt.

use crate::db::Db;
use crate::error::{PocdeskError, Result};
use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

/// Summary of one ingestion attempt
#[derive(Debug, Clone, Default)]
pub struct UploadRecord {
    pub submitter_email: String,
    pub file_name: String,
    pub candidate_count: usize,
    pub affected_count: usize,
    pub failed_count: usize,
    pub error_message: Option<String>,
}

impl UploadRecord {
    pub fn success(&self) -> bool {
        self.error_message.is_none() && self.failed_count == 0
    }
}

/// Log an upload to the audit table.
///
/// Returns the generated upload_id (UUID).
pub async fn log_upload(db: &Db, record: UploadRecord) -> Result<String> {
    let upload_id = Uuid::new_v4().to_string();
    let timestamp = Utc::now().to_rfc3339();
    let id = upload_id.clone();

    db.with_connection(move |conn| {
        conn.execute(
            r#"
            INSERT INTO upload_log (
                upload_id, timestamp, submitter_email, file_name,
                candidate_count, affected_count, failed_count, success, error_message
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                id,
                timestamp,
                record.submitter_email,
                record.file_name,
                record.candidate_count as i64,
                record.affected_count as i64,
                record.failed_count as i64,
                record.success(),
                record.error_message,
            ],
        )?;
        Ok::<(), PocdeskError>(())
    })
    .await?;

    Ok(upload_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::migrated_db;

    #[tokio::test]
    async fn test_log_upload_records_outcome() {
        let (_temp_dir, db) = migrated_db().await;

        log_upload(
            &db,
            UploadRecord {
                submitter_email: "dpr@x.com".into(),
                file_name: "companies.csv".into(),
                candidate_count: 3,
                affected_count: 2,
                failed_count: 1,
                error_message: None,
            },
        )
        .await
        .unwrap();

        let (file_name, success): (String, bool) = db
            .with_connection(|conn| {
                Ok(conn.query_row(
                    "SELECT file_name, success FROM upload_log",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(file_name, "companies.csv");
        assert!(!success);
    }
}
