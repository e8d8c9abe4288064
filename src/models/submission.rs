// src/models/submission.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'exam_submissions' table.
/// Evidence that one student finished one answer key; the score was
/// computed by the exam-taking flow.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: i64,
    pub student_id: i64,
    pub answer_key_id: i64,
    pub score: i64,
    pub duration_seconds: i64,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}
