// src/grading/validation.rs

use std::{collections::HashMap, fmt};

use serde::Serialize;
use serde_json::Value;

use super::RawRow;
use crate::models::answer_key::AnswerKeyRow;

/// Logical answer-key column. Each accepts a few header spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    QuestionNumber,
    CorrectAnswer,
    Score,
    Explanation,
}

/// Columns every row schema must declare.
pub const REQUIRED_FIELDS: [Field; 3] = [Field::QuestionNumber, Field::CorrectAnswer, Field::Score];

/// Largest score a single question may carry.
pub const MAX_ROW_SCORE: i64 = i32::MAX as i64;

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::QuestionNumber => "question",
            Field::CorrectAnswer => "answer",
            Field::Score => "score",
            Field::Explanation => "description",
        }
    }

    /// Accepted header spellings, compared after trimming and lower-casing.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::QuestionNumber => &["question", "questionnumber", "question_number", "no"],
            Field::CorrectAnswer => &["answer", "correctanswer", "correct_answer"],
            Field::Score => &["score", "points"],
            Field::Explanation => &["description", "explanation"],
        }
    }

    fn matches(self, key: &str) -> bool {
        let key = key.trim().to_lowercase();
        self.aliases().contains(&key.as_str())
    }

    fn lookup(self, row: &RawRow) -> Option<&Value> {
        row.iter().find(|(key, _)| self.matches(key)).map(|(_, value)| value)
    }
}

/// A problem found while validating answer-key rows.
/// `row` is the 1-based row position, `None` for schema problems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub row: Option<usize>,
    pub message: String,
}

impl ValidationError {
    pub fn general(message: impl Into<String>) -> Self {
        Self {
            row: None,
            message: message.into(),
        }
    }

    fn at_row(row: usize, problems: &[String]) -> Self {
        Self {
            row: Some(row),
            message: problems.join("; "),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "Row {}: {}", row, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Outcome of one validation pass. Partial success is representable:
/// `rows` holds every row that passed, `errors` one entry per failed row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub rows: Vec<AnswerKeyRow>,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when the row schema itself was rejected, so no row was examined.
    pub fn has_schema_error(&self) -> bool {
        self.errors.iter().any(|e| e.row.is_none())
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Validates candidate rows and coerces the good ones to [`AnswerKeyRow`].
///
/// The schema (first row's keys) is checked first; when a required column is
/// missing the report carries that single error and no rows. Otherwise every
/// row is checked independently and every failing row is reported.
pub fn validate_rows(rows: &[RawRow]) -> ValidationReport {
    validate_rows_at(rows, &[])
}

/// Like [`validate_rows`], but row `i` is reported as `row_numbers[i]`.
/// Rows without an entry are numbered by their position in `rows`.
pub fn validate_rows_at(rows: &[RawRow], row_numbers: &[usize]) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(first) = rows.first() else {
        return report;
    };

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .filter(|field| field.lookup(first).is_none())
        .map(|field| field.label())
        .collect();

    if !missing.is_empty() {
        report.errors.push(ValidationError::general(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
        return report;
    }

    // question number -> first row (1-based) that used it
    let mut seen: HashMap<i64, usize> = HashMap::new();

    for (index, raw) in rows.iter().enumerate() {
        let row_number = row_numbers.get(index).copied().unwrap_or(index + 1);
        let mut problems = Vec::new();

        let question_number = match parse_integer(Field::QuestionNumber.lookup(raw)) {
            Ok(n) if n > 0 => match seen.get(&n) {
                Some(first_row) => {
                    problems.push(format!(
                        "question number {} is already used by row {}",
                        n, first_row
                    ));
                    None
                }
                None => {
                    seen.insert(n, row_number);
                    Some(n)
                }
            },
            Ok(_) => {
                problems.push("question number must be a positive integer".to_string());
                None
            }
            Err(Problem::Missing) => {
                problems.push("question number is missing".to_string());
                None
            }
            Err(Problem::NotInteger(raw)) => {
                problems.push(format!("question number must be an integer (got '{}')", raw));
                None
            }
        };

        let correct_answer = text_value(Field::CorrectAnswer.lookup(raw));
        if correct_answer.is_empty() {
            problems.push("correct answer is empty".to_string());
        }

        let score = match parse_integer(Field::Score.lookup(raw)) {
            Ok(s) if s > MAX_ROW_SCORE => {
                problems.push(format!("score must be at most {}", MAX_ROW_SCORE));
                None
            }
            Ok(s) if s > 0 => Some(s),
            Ok(_) => {
                problems.push("score must be greater than zero".to_string());
                None
            }
            Err(Problem::Missing) => {
                problems.push("score is missing".to_string());
                None
            }
            Err(Problem::NotInteger(raw)) => {
                problems.push(format!("score must be an integer (got '{}')", raw));
                None
            }
        };

        match (question_number, score) {
            (Some(question_number), Some(score)) if problems.is_empty() => {
                report.rows.push(AnswerKeyRow {
                    question_number,
                    correct_answer,
                    score,
                    explanation: text_value(Field::Explanation.lookup(raw)),
                });
            }
            _ => report.errors.push(ValidationError::at_row(row_number, &problems)),
        }
    }

    tracing::debug!(
        "Validated {} rows: {} valid, {} rejected",
        rows.len(),
        report.rows.len(),
        report.errors.len()
    );

    report
}

/// Raw form of an already typed row, for re-validating edited drafts.
pub fn raw_from_row(row: &AnswerKeyRow) -> RawRow {
    let mut raw = RawRow::new();
    raw.insert("question".to_string(), Value::from(row.question_number));
    raw.insert("answer".to_string(), Value::from(row.correct_answer.clone()));
    raw.insert("score".to_string(), Value::from(row.score));
    raw.insert("description".to_string(), Value::from(row.explanation.clone()));
    raw
}

enum Problem {
    Missing,
    NotInteger(String),
}

/// Integers may arrive as JSON numbers or text; spreadsheets sometimes write
/// integral values as `5.0`, which is accepted.
fn parse_integer(value: Option<&Value>) -> Result<i64, Problem> {
    let text = match value {
        None | Some(Value::Null) => return Err(Problem::Missing),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            n.to_string()
        }
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    };

    if text.is_empty() {
        return Err(Problem::Missing);
    }

    if let Ok(i) = text.parse::<i64>() {
        return Ok(i);
    }

    match text.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(Problem::NotInteger(text)),
    }
}

fn text_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}
