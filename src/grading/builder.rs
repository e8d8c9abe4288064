// src/grading/builder.rs

use serde::Deserialize;

use super::validation::{ValidationError, raw_from_row, validate_rows};
use crate::{
    models::answer_key::{AnswerKey, AnswerKeyHeader, AnswerKeyRow},
    utils::html::clean_html,
};

/// Sum of row scores. The only source of an answer key's total.
/// Saturates at the `i64` bounds instead of overflowing.
pub fn total_score(rows: &[AnswerKeyRow]) -> i64 {
    rows.iter().fold(0i64, |total, row| total.saturating_add(row.score))
}

/// How imported rows combine with rows already on a key.
/// Always an explicit caller choice; there is no default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Discard existing rows and adopt the imported ones.
    Replace,
    /// Keep existing rows and add the imported ones after them.
    Append,
}

/// An answer key passed the persistence gate: at least one row and every row
/// valid. Only [`AnswerKeyDraft::finalize`] constructs one.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistableAnswerKey {
    id: Option<i64>,
    header: AnswerKeyHeader,
    rows: Vec<AnswerKeyRow>,
}

impl PersistableAnswerKey {
    /// `None` for a key that has never been saved.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn header(&self) -> &AnswerKeyHeader {
        &self.header
    }

    pub fn rows(&self) -> &[AnswerKeyRow] {
        &self.rows
    }

    pub fn total_score(&self) -> i64 {
        total_score(&self.rows)
    }
}

/// An answer key being edited, by hand or from an import.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerKeyDraft {
    id: Option<i64>,
    header: AnswerKeyHeader,
    rows: Vec<AnswerKeyRow>,
}

impl AnswerKeyDraft {
    pub fn new(header: AnswerKeyHeader) -> Self {
        Self {
            id: None,
            header,
            rows: Vec::new(),
        }
    }

    /// Starts editing a persisted key; finalizing updates it in place.
    pub fn from_key(key: AnswerKey) -> Self {
        Self {
            id: Some(key.id),
            header: key.header,
            rows: key.rows,
        }
    }

    pub fn header(&self) -> &AnswerKeyHeader {
        &self.header
    }

    pub fn set_header(&mut self, header: AnswerKeyHeader) {
        self.header = header;
    }

    pub fn rows(&self) -> &[AnswerKeyRow] {
        &self.rows
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut AnswerKeyRow> {
        self.rows.get_mut(index)
    }

    pub fn total_score(&self) -> i64 {
        total_score(&self.rows)
    }

    /// Appends a blank question numbered `row count + 1`.
    pub fn add_row(&mut self, default_score: i64) -> &mut AnswerKeyRow {
        let question_number = self.rows.len() as i64 + 1;
        self.rows.push(AnswerKeyRow {
            question_number,
            correct_answer: String::new(),
            score: default_score,
            explanation: String::new(),
        });
        let last = self.rows.len() - 1;
        &mut self.rows[last]
    }

    /// Removes the row at `index`. Remaining question numbers are labels and
    /// are left untouched.
    pub fn remove_row(&mut self, index: usize) -> Option<AnswerKeyRow> {
        (index < self.rows.len()).then(|| self.rows.remove(index))
    }

    pub fn replace_rows(&mut self, rows: Vec<AnswerKeyRow>) {
        self.rows = rows;
    }

    pub fn append_rows(&mut self, rows: Vec<AnswerKeyRow>) {
        self.rows.extend(rows);
    }

    pub fn merge(&mut self, rows: Vec<AnswerKeyRow>, mode: MergeMode) {
        match mode {
            MergeMode::Replace => self.replace_rows(rows),
            MergeMode::Append => self.append_rows(rows),
        }
    }

    /// Applies the persistence gate.
    ///
    /// Rows are re-validated as a whole (so an append that duplicates a
    /// question number is caught) and free text is sanitized.
    pub fn finalize(self) -> Result<PersistableAnswerKey, Vec<ValidationError>> {
        if self.rows.is_empty() {
            return Err(vec![ValidationError::general(
                "An answer key needs at least one question",
            )]);
        }

        let raw: Vec<_> = self.rows.iter().map(raw_from_row).collect();
        let report = validate_rows(&raw);
        if !report.is_valid() {
            return Err(report.errors);
        }

        let mut header = self.header;
        header.exam_description = clean_html(&header.exam_description);

        let rows = report
            .rows
            .into_iter()
            .map(|row| AnswerKeyRow {
                explanation: clean_html(&row.explanation),
                ..row
            })
            .collect();

        Ok(PersistableAnswerKey {
            id: self.id,
            header,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grading::importer, models::answer_key::ExamType};
    use chrono::NaiveDate;

    fn header() -> AnswerKeyHeader {
        AnswerKeyHeader {
            exam_date: NaiveDate::from_ymd_opt(2026, 5, 11).unwrap(),
            subject: "English".to_string(),
            exam_title: "Midterm reading".to_string(),
            exam_type: ExamType::Midterm,
            instructor_id: 3,
            class_id: 12,
            exam_description: String::new(),
        }
    }

    fn row(question_number: i64, answer: &str, score: i64) -> AnswerKeyRow {
        AnswerKeyRow {
            question_number,
            correct_answer: answer.to_string(),
            score,
            explanation: String::new(),
        }
    }

    #[test]
    fn test_total_tracks_every_row_mutation() {
        let mut draft = AnswerKeyDraft::new(header());
        assert_eq!(draft.total_score(), 0);

        draft.add_row(5);
        draft.add_row(10);
        draft.add_row(15);
        assert_eq!(draft.total_score(), 30);

        draft.remove_row(1);
        assert_eq!(draft.total_score(), 20);

        draft.row_mut(0).unwrap().score = 8;
        assert_eq!(draft.total_score(), 23);

        draft.replace_rows(vec![row(1, "A", 2)]);
        assert_eq!(draft.total_score(), 2);
    }

    #[test]
    fn test_total_of_huge_scores_saturates() {
        let rows = vec![row(1, "A", i64::MAX), row(2, "B", 1)];
        assert_eq!(total_score(&rows), i64::MAX);
    }

    #[test]
    fn test_imported_oversized_score_never_reaches_the_total() {
        let sheet = importer::import(b"question,answer,score\n1,A,9223372036854775807\n2,B,1\n")
            .unwrap();
        let report = sheet.validate();

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, Some(1));
        assert_eq!(total_score(&report.rows), 1);
    }

    #[test]
    fn test_add_row_numbers_from_row_count() {
        let mut draft = AnswerKeyDraft::new(header());
        draft.add_row(1);
        draft.add_row(1);
        draft.remove_row(0);

        let added = draft.add_row(4);
        assert_eq!(added.question_number, 2);
        assert_eq!(added.score, 4);
        assert!(added.correct_answer.is_empty());
    }

    #[test]
    fn test_remove_row_does_not_renumber() {
        let mut draft = AnswerKeyDraft::new(header());
        draft.replace_rows(vec![row(1, "A", 1), row(2, "B", 1), row(3, "C", 1)]);

        let removed = draft.remove_row(0).unwrap();
        assert_eq!(removed.question_number, 1);

        let numbers: Vec<i64> = draft.rows().iter().map(|r| r.question_number).collect();
        assert_eq!(numbers, vec![2, 3]);
        assert!(draft.remove_row(5).is_none());
    }

    #[test]
    fn test_merge_replace_and_append() {
        let mut draft = AnswerKeyDraft::new(header());
        draft.replace_rows(vec![row(1, "A", 5)]);

        let mut appended = draft.clone();
        appended.merge(vec![row(2, "B", 5)], MergeMode::Append);
        assert_eq!(appended.rows().len(), 2);
        assert_eq!(appended.total_score(), 10);

        draft.merge(vec![row(1, "D", 7)], MergeMode::Replace);
        assert_eq!(draft.rows(), &[row(1, "D", 7)]);
        assert_eq!(draft.total_score(), 7);
    }

    #[test]
    fn test_finalize_requires_a_row() {
        let errors = AnswerKeyDraft::new(header()).finalize().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row, None);
    }

    #[test]
    fn test_finalize_reports_every_invalid_row() {
        let mut draft = AnswerKeyDraft::new(header());
        draft.add_row(5).correct_answer = "A".to_string();
        draft.add_row(0);

        let errors = draft.finalize().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "Row 2: correct answer is empty; score must be greater than zero"
        );
    }

    #[test]
    fn test_finalize_catches_duplicates_from_append() {
        let mut draft = AnswerKeyDraft::new(header());
        draft.replace_rows(vec![row(1, "A", 5)]);
        draft.append_rows(vec![row(1, "B", 5)]);

        let errors = draft.finalize().unwrap_err();
        assert_eq!(errors[0].row, Some(2));
    }

    #[test]
    fn test_finalize_sanitizes_free_text() {
        let mut draft = AnswerKeyDraft::new(AnswerKeyHeader {
            exam_description: "<p>Read carefully</p><script>alert(1)</script>".to_string(),
            ..header()
        });
        draft.replace_rows(vec![AnswerKeyRow {
            explanation: "<b>see p.3</b><img src=x onerror=alert(1)>".to_string(),
            ..row(1, "A", 5)
        }]);

        let key = draft.finalize().unwrap();
        assert_eq!(key.id(), None);
        assert_eq!(key.header().exam_description, "<p>Read carefully</p>");
        assert!(!key.rows()[0].explanation.contains("onerror"));
        assert_eq!(key.total_score(), 5);
    }
}
