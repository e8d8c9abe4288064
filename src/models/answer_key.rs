// src/models/answer_key.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::grading::{RawRow, builder::total_score};

/// Kind of administered exam.
/// Stored as lowercase text in the `answer_keys.exam_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Regular,
    Midterm,
    Final,
    Quiz,
}

impl ExamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::Regular => "regular",
            ExamType::Midterm => "midterm",
            ExamType::Final => "final",
            ExamType::Quiz => "quiz",
        }
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regular" => Ok(ExamType::Regular),
            "midterm" => Ok(ExamType::Midterm),
            "final" => Ok(ExamType::Final),
            "quiz" => Ok(ExamType::Quiz),
            other => Err(format!("unknown exam type '{}'", other)),
        }
    }
}

/// One gradable question of an answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKeyRow {
    pub question_number: i64,
    pub correct_answer: String,
    pub score: i64,
    #[serde(default)]
    pub explanation: String,
}

/// Descriptive fields identifying one administered exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerKeyHeader {
    pub exam_date: NaiveDate,
    pub subject: String,
    pub exam_title: String,
    pub exam_type: ExamType,
    /// Owning instructor (actor id from the identity provider).
    pub instructor_id: i64,
    /// Class/section whose roster sits this exam.
    pub class_id: i64,
    #[serde(default)]
    pub exam_description: String,
}

/// A persisted answer key.
///
/// The total is never stored; it is derived from `rows` by
/// [`AnswerKey::total_score`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerKey {
    pub id: i64,
    #[serde(flatten)]
    pub header: AnswerKeyHeader,
    pub rows: Vec<AnswerKeyRow>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AnswerKey {
    pub fn total_score(&self) -> i64 {
        total_score(&self.rows)
    }
}

/// DTO for returning an answer key together with its derived total.
#[derive(Debug, Serialize)]
pub struct AnswerKeyResponse {
    #[serde(flatten)]
    pub answer_key: AnswerKey,
    pub total_score: i64,
}

impl From<AnswerKey> for AnswerKeyResponse {
    fn from(answer_key: AnswerKey) -> Self {
        let total_score = answer_key.total_score();
        Self {
            answer_key,
            total_score,
        }
    }
}

/// DTO for creating or replacing an answer key by manual entry.
///
/// `rows` are loosely typed and go through the same validation as imported
/// spreadsheet rows.
#[derive(Debug, Deserialize, Validate)]
pub struct AnswerKeyRequest {
    pub exam_date: NaiveDate,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Subject length must be between 1 and 100 characters."
    ))]
    pub subject: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Exam title length must be between 1 and 100 characters."
    ))]
    pub exam_title: String,
    pub exam_type: ExamType,
    /// Defaults to the acting user when omitted.
    pub instructor_id: Option<i64>,
    pub class_id: i64,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Exam description must be at most 5000 characters."))]
    pub exam_description: String,
    #[serde(default)]
    pub rows: Vec<RawRow>,
}

impl AnswerKeyRequest {
    /// Splits the request into its header and raw rows.
    pub fn into_parts(self, default_instructor: i64) -> (AnswerKeyHeader, Vec<RawRow>) {
        let header = AnswerKeyHeader {
            exam_date: self.exam_date,
            subject: self.subject.trim().to_string(),
            exam_title: self.exam_title.trim().to_string(),
            exam_type: self.exam_type,
            instructor_id: self.instructor_id.unwrap_or(default_instructor),
            class_id: self.class_id,
            exam_description: self.exam_description,
        };
        (header, self.rows)
    }
}
