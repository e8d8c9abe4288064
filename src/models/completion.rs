// src/models/completion.rs

use serde::{Deserialize, Serialize};

use super::roster::RosterMember;

/// A roster member with its winning submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletedStudent {
    #[serde(flatten)]
    pub student: RosterMember,
    pub submission_id: i64,
    pub score: i64,
    pub duration_seconds: i64,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    /// round(score / total_score * 100), 0 when the key has no points.
    pub score_percentage: i64,
}

/// Derived completion report for one answer key and roster snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionStatus {
    pub answer_key_id: i64,
    pub total_score: i64,
    pub roster_size: usize,
    pub completed_count: usize,
    pub not_completed_count: usize,
    /// completed_count / roster_size, in [0, 1].
    pub completion_rate: f64,
    /// Mean of raw scores over `completed`, 0 when nobody completed.
    pub average_score: f64,
    pub completed: Vec<CompletedStudent>,
    pub not_completed: Vec<RosterMember>,
}

/// Which side of the partition a caller wants listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    Completed,
    NotCompleted,
}
