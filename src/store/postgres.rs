// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, types::Json};

use super::{AcademyStore, StoreError, answer_key_not_found};
use crate::{
    grading::builder::PersistableAnswerKey,
    models::{
        answer_key::{AnswerKey, AnswerKeyHeader, AnswerKeyRow, ExamType},
        roster::RosterMember,
        submission::SubmissionRecord,
    },
};

const ANSWER_KEY_COLUMNS: &str = "id, exam_date, subject, exam_title, exam_type, instructor_id, \
     class_id, exam_description, questions, created_at, updated_at";

/// Row shape of the 'answer_keys' table.
#[derive(FromRow)]
struct AnswerKeyRecord {
    id: i64,
    exam_date: NaiveDate,
    subject: String,
    exam_title: String,
    exam_type: String,
    instructor_id: i64,
    class_id: i64,
    exam_description: String,
    questions: Json<Vec<AnswerKeyRow>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<AnswerKeyRecord> for AnswerKey {
    type Error = StoreError;

    fn try_from(record: AnswerKeyRecord) -> Result<Self, Self::Error> {
        let exam_type = record.exam_type.parse::<ExamType>().map_err(|e| {
            StoreError::Transient(format!("answer key {} has {}", record.id, e))
        })?;

        Ok(AnswerKey {
            id: record.id,
            header: AnswerKeyHeader {
                exam_date: record.exam_date,
                subject: record.subject,
                exam_title: record.exam_title,
                exam_type,
                instructor_id: record.instructor_id,
                class_id: record.class_id,
                exam_description: record.exam_description,
            },
            rows: record.questions.0,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// Postgres-backed store. Schema in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AcademyStore for PgStore {
    async fn fetch_roster(&self, class_id: i64) -> Result<Vec<RosterMember>, StoreError> {
        sqlx::query_as::<_, RosterMember>(
            r#"
            SELECT id, class_id, name, student_code, grade, section
            FROM students
            WHERE class_id = $1
            ORDER BY name, id
            "#,
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch roster for class {}: {:?}", class_id, e);
            StoreError::from(e)
        })
    }

    async fn fetch_submissions(
        &self,
        answer_key_id: i64,
    ) -> Result<Vec<SubmissionRecord>, StoreError> {
        sqlx::query_as::<_, SubmissionRecord>(
            r#"
            SELECT id, student_id, answer_key_id, score, duration_seconds, submitted_at
            FROM exam_submissions
            WHERE answer_key_id = $1
            ORDER BY submitted_at, id
            "#,
        )
        .bind(answer_key_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch submissions for answer key {}: {:?}", answer_key_id, e);
            StoreError::from(e)
        })
    }

    async fn fetch_answer_key(&self, id: i64) -> Result<AnswerKey, StoreError> {
        let record = sqlx::query_as::<_, AnswerKeyRecord>(&format!(
            "SELECT {} FROM answer_keys WHERE id = $1",
            ANSWER_KEY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch answer key {}: {:?}", id, e);
            StoreError::from(e)
        })?
        .ok_or_else(|| answer_key_not_found(id))?;

        record.try_into()
    }

    async fn list_answer_keys(&self) -> Result<Vec<AnswerKey>, StoreError> {
        let records = sqlx::query_as::<_, AnswerKeyRecord>(&format!(
            "SELECT {} FROM answer_keys ORDER BY exam_date DESC, id DESC",
            ANSWER_KEY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list answer keys: {:?}", e);
            StoreError::from(e)
        })?;

        records.into_iter().map(AnswerKey::try_from).collect()
    }

    async fn save_answer_key(&self, key: &PersistableAnswerKey) -> Result<AnswerKey, StoreError> {
        let header = key.header();

        let record = match key.id() {
            None => {
                sqlx::query_as::<_, AnswerKeyRecord>(&format!(
                    r#"
                    INSERT INTO answer_keys
                    (exam_date, subject, exam_title, exam_type, instructor_id, class_id, exam_description, questions)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    RETURNING {}
                    "#,
                    ANSWER_KEY_COLUMNS
                ))
                .bind(header.exam_date)
                .bind(&header.subject)
                .bind(&header.exam_title)
                .bind(header.exam_type.as_str())
                .bind(header.instructor_id)
                .bind(header.class_id)
                .bind(&header.exam_description)
                .bind(Json(key.rows()))
                .fetch_one(&self.pool)
                .await
            }
            Some(id) => {
                sqlx::query_as::<_, AnswerKeyRecord>(&format!(
                    r#"
                    UPDATE answer_keys SET
                        exam_date = $1, subject = $2, exam_title = $3, exam_type = $4,
                        instructor_id = $5, class_id = $6, exam_description = $7, questions = $8,
                        updated_at = NOW()
                    WHERE id = $9
                    RETURNING {}
                    "#,
                    ANSWER_KEY_COLUMNS
                ))
                .bind(header.exam_date)
                .bind(&header.subject)
                .bind(&header.exam_title)
                .bind(header.exam_type.as_str())
                .bind(header.instructor_id)
                .bind(header.class_id)
                .bind(&header.exam_description)
                .bind(Json(key.rows()))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .and_then(|record| record.ok_or(sqlx::Error::RowNotFound))
            }
        }
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => answer_key_not_found(key.id().unwrap_or_default()),
            other => {
                tracing::error!("Failed to save answer key: {:?}", other);
                StoreError::from(other)
            }
        })?;

        record.try_into()
    }

    async fn delete_answer_key(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM answer_keys WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete answer key {}: {:?}", id, e);
                StoreError::from(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(answer_key_not_found(id));
        }

        Ok(())
    }
}
