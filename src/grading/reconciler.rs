// src/grading/reconciler.rs

use std::collections::HashMap;

use crate::models::{
    answer_key::AnswerKey,
    completion::{CompletedStudent, CompletionStatus, StatusFilter},
    roster::{RosterFilter, RosterMember},
    submission::SubmissionRecord,
};

/// More than one submission for the same student and answer key.
/// Recovered by keeping the latest one; reported through logs only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationAnomaly {
    pub student_id: i64,
    pub answer_key_id: i64,
    pub kept_submission_id: i64,
    pub discarded_submission_id: i64,
}

/// Classifies every roster member as completed or not for `answer_key`.
///
/// Submissions for other answer keys are ignored. Duplicates resolve to the
/// latest `submitted_at`, an exact tie to the larger record id.
pub fn reconcile(
    answer_key: &AnswerKey,
    roster: &[RosterMember],
    submissions: &[SubmissionRecord],
) -> CompletionStatus {
    let (latest, anomalies) = latest_submissions(answer_key.id, submissions);

    for anomaly in &anomalies {
        tracing::warn!(
            "Duplicate submission for student {} on answer key {}: kept #{}, discarded #{}",
            anomaly.student_id,
            anomaly.answer_key_id,
            anomaly.kept_submission_id,
            anomaly.discarded_submission_id
        );
    }

    let total_score = answer_key.total_score();
    let mut completed = Vec::new();
    let mut not_completed = Vec::new();

    for member in roster {
        match latest.get(&member.id) {
            Some(record) => completed.push(CompletedStudent {
                student: member.clone(),
                submission_id: record.id,
                score: record.score,
                duration_seconds: record.duration_seconds,
                submitted_at: record.submitted_at,
                score_percentage: score_percentage(record.score, total_score),
            }),
            None => not_completed.push(member.clone()),
        }
    }

    CompletionStatus::from_partition(answer_key.id, total_score, completed, not_completed)
}

/// Winning submission per student for one answer key, plus the duplicates
/// that lost.
pub fn latest_submissions(
    answer_key_id: i64,
    submissions: &[SubmissionRecord],
) -> (HashMap<i64, &SubmissionRecord>, Vec<ReconciliationAnomaly>) {
    let mut latest: HashMap<i64, &SubmissionRecord> = HashMap::new();
    let mut anomalies = Vec::new();

    for record in submissions.iter().filter(|s| s.answer_key_id == answer_key_id) {
        match latest.get(&record.student_id).copied() {
            None => {
                latest.insert(record.student_id, record);
            }
            Some(current) => {
                let newer = (record.submitted_at, record.id) > (current.submitted_at, current.id);
                let (kept, discarded) = if newer { (record, current) } else { (current, record) };
                anomalies.push(ReconciliationAnomaly {
                    student_id: record.student_id,
                    answer_key_id,
                    kept_submission_id: kept.id,
                    discarded_submission_id: discarded.id,
                });
                latest.insert(record.student_id, kept);
            }
        }
    }

    (latest, anomalies)
}

/// round(score / total * 100), half away from zero. A key worth nothing
/// yields 0 rather than NaN or infinity.
pub fn score_percentage(score: i64, total_score: i64) -> i64 {
    if total_score <= 0 {
        return 0;
    }
    (score as f64 / total_score as f64 * 100.0).round() as i64
}

fn mean(scores: impl Iterator<Item = i64>) -> f64 {
    let (sum, count) = scores.fold((0i128, 0usize), |(sum, count), s| {
        (sum + i128::from(s), count + 1)
    });
    if count == 0 { 0.0 } else { sum as f64 / count as f64 }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

impl CompletionStatus {
    /// Builds a status from an already computed partition, deriving counts,
    /// completion rate and average score.
    pub fn from_partition(
        answer_key_id: i64,
        total_score: i64,
        completed: Vec<CompletedStudent>,
        not_completed: Vec<RosterMember>,
    ) -> Self {
        let completed_count = completed.len();
        let not_completed_count = not_completed.len();
        let roster_size = completed_count + not_completed_count;

        Self {
            answer_key_id,
            total_score,
            roster_size,
            completed_count,
            not_completed_count,
            completion_rate: ratio(completed_count, roster_size),
            average_score: mean(completed.iter().map(|c| c.score)),
            completed,
            not_completed,
        }
    }

    /// Narrows an already reconciled status to the roster members matching
    /// `filter`. Statistics are recomputed over the narrowed subset, which
    /// gives the same result as filtering the roster before reconciling.
    pub fn filtered(&self, filter: &RosterFilter) -> Self {
        let completed = self
            .completed
            .iter()
            .filter(|c| filter.matches(&c.student))
            .cloned()
            .collect();
        let not_completed = self
            .not_completed
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();

        Self::from_partition(self.answer_key_id, self.total_score, completed, not_completed)
    }

    /// Keeps only one side of the partition in the listing. Counts and
    /// statistics still describe the whole roster.
    pub fn only(mut self, status: StatusFilter) -> Self {
        match status {
            StatusFilter::Completed => self.not_completed.clear(),
            StatusFilter::NotCompleted => self.completed.clear(),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::answer_key::{AnswerKeyHeader, AnswerKeyRow, ExamType};
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    fn answer_key(id: i64, scores: &[i64]) -> AnswerKey {
        AnswerKey {
            id,
            header: AnswerKeyHeader {
                exam_date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                subject: "Science".to_string(),
                exam_title: "Final".to_string(),
                exam_type: ExamType::Final,
                instructor_id: 1,
                class_id: 5,
                exam_description: String::new(),
            },
            rows: scores
                .iter()
                .enumerate()
                .map(|(i, score)| AnswerKeyRow {
                    question_number: i as i64 + 1,
                    correct_answer: "A".to_string(),
                    score: *score,
                    explanation: String::new(),
                })
                .collect(),
            created_at: None,
            updated_at: None,
        }
    }

    fn student(id: i64, name: &str, grade: &str) -> RosterMember {
        RosterMember {
            id,
            class_id: 5,
            name: name.to_string(),
            student_code: format!("S-{:03}", id),
            grade: Some(grade.to_string()),
            section: Some("A".to_string()),
        }
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, minute, 0).unwrap()
    }

    fn submission(id: i64, student_id: i64, answer_key_id: i64, score: i64, minute: u32) -> SubmissionRecord {
        SubmissionRecord {
            id,
            student_id,
            answer_key_id,
            score,
            duration_seconds: 600 + id,
            submitted_at: at(minute),
        }
    }

    #[test]
    fn test_two_of_three_completed() {
        let key = answer_key(1, &[5, 10, 15]);
        let roster = vec![student(1, "Ahn", "2"), student(2, "Baek", "2"), student(3, "Cho", "3")];
        let submissions = vec![submission(10, 1, 1, 20, 5), submission(11, 3, 1, 25, 7)];

        let status = reconcile(&key, &roster, &submissions);

        assert_eq!(status.total_score, 30);
        assert_eq!(status.completed_count, 2);
        assert_eq!(status.not_completed_count, 1);
        assert_eq!(status.roster_size, 3);
        assert_eq!(status.average_score, 22.5);
        let percentages: Vec<i64> = status.completed.iter().map(|c| c.score_percentage).collect();
        assert_eq!(percentages, vec![67, 83]);
        assert_eq!(status.not_completed[0].id, 2);
        assert!((status.completion_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_latest_duplicate_submission_wins() {
        let key = answer_key(1, &[10]);
        let roster = vec![student(1, "Ahn", "2")];
        let submissions = vec![submission(21, 1, 1, 9, 30), submission(20, 1, 1, 4, 10)];

        let status = reconcile(&key, &roster, &submissions);

        assert_eq!(status.completed[0].submission_id, 21);
        assert_eq!(status.completed[0].score, 9);
        assert_eq!(status.completed[0].submitted_at, at(30));
    }

    #[test]
    fn test_duplicates_are_reported_as_anomalies() {
        let submissions = vec![
            submission(1, 7, 1, 3, 10),
            submission(2, 7, 1, 5, 20),
            submission(3, 7, 1, 4, 15),
        ];

        let (latest, anomalies) = latest_submissions(1, &submissions);

        assert_eq!(latest[&7].id, 2);
        assert_eq!(anomalies.len(), 2);
        assert_eq!(anomalies[0].kept_submission_id, 2);
        assert_eq!(anomalies[0].discarded_submission_id, 1);
        assert_eq!(anomalies[1].discarded_submission_id, 3);
    }

    #[test]
    fn test_exact_timestamp_tie_keeps_larger_id() {
        let submissions = vec![submission(9, 7, 1, 3, 10), submission(4, 7, 1, 5, 10)];
        let (latest, _) = latest_submissions(1, &submissions);
        assert_eq!(latest[&7].id, 9);
    }

    #[test]
    fn test_other_answer_keys_are_ignored() {
        let key = answer_key(1, &[10]);
        let roster = vec![student(1, "Ahn", "2")];
        let submissions = vec![submission(1, 1, 2, 10, 0)];

        let status = reconcile(&key, &roster, &submissions);
        assert_eq!(status.completed_count, 0);
        assert_eq!(status.not_completed_count, 1);
    }

    #[test]
    fn test_zero_total_gives_zero_percentage() {
        let key = answer_key(1, &[]);
        let roster = vec![student(1, "Ahn", "2")];
        let submissions = vec![submission(1, 1, 1, 10, 0)];

        let status = reconcile(&key, &roster, &submissions);
        assert_eq!(status.completed[0].score_percentage, 0);
        assert!(status.average_score.is_finite());
    }

    #[test]
    fn test_empty_roster_has_zero_rate_and_average() {
        let key = answer_key(1, &[10]);
        let status = reconcile(&key, &[], &[submission(1, 1, 1, 10, 0)]);

        assert_eq!(status.roster_size, 0);
        assert_eq!(status.completion_rate, 0.0);
        assert_eq!(status.average_score, 0.0);
    }

    #[test]
    fn test_partition_covers_roster_and_rate_is_bounded() {
        let key = answer_key(1, &[4, 6]);
        let roster: Vec<RosterMember> = (1..=9).map(|i| student(i, "S", "1")).collect();
        let submissions: Vec<SubmissionRecord> = (1..=9)
            .filter(|i| i % 2 == 0)
            .map(|i| submission(100 + i, i, 1, i, i as u32))
            .chain([submission(200, 4, 1, 1, 59)])
            .collect();

        let status = reconcile(&key, &roster, &submissions);

        assert_eq!(status.completed_count + status.not_completed_count, roster.len());
        assert!((0.0..=1.0).contains(&status.completion_rate));
    }

    #[test]
    fn test_filter_before_and_after_reconcile_agree() {
        let key = answer_key(1, &[10, 10]);
        let roster = vec![
            student(1, "Ahn", "2"),
            student(2, "Baek", "3"),
            student(3, "Cho", "3"),
            student(4, "Do", "3"),
        ];
        let submissions = vec![
            submission(1, 1, 1, 18, 1),
            submission(2, 2, 1, 12, 2),
            submission(3, 3, 1, 16, 3),
        ];
        let filter = RosterFilter {
            grade: Some("3".to_string()),
            ..Default::default()
        };

        let narrowed_roster: Vec<RosterMember> =
            roster.iter().filter(|m| filter.matches(m)).cloned().collect();
        let before = reconcile(&key, &narrowed_roster, &submissions);
        let after = reconcile(&key, &roster, &submissions).filtered(&filter);

        assert_eq!(before, after);
        assert_eq!(after.roster_size, 3);
        assert_eq!(after.average_score, 14.0);
        assert!((after.completion_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_only_keeps_counts_for_whole_roster() {
        let key = answer_key(1, &[10]);
        let roster = vec![student(1, "Ahn", "2"), student(2, "Baek", "2")];
        let submissions = vec![submission(1, 1, 1, 7, 1)];

        let status = reconcile(&key, &roster, &submissions).only(StatusFilter::NotCompleted);

        assert!(status.completed.is_empty());
        assert_eq!(status.not_completed.len(), 1);
        assert_eq!(status.completed_count, 1);
        assert_eq!(status.completion_rate, 0.5);
    }

    #[test]
    fn test_average_of_huge_scores_does_not_overflow() {
        let average = mean([i64::MAX, i64::MAX].into_iter());
        assert_eq!(average, i64::MAX as f64);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        assert_eq!(score_percentage(1, 8), 13);
        assert_eq!(score_percentage(1, 3), 33);
        assert_eq!(score_percentage(2, 3), 67);
        assert_eq!(score_percentage(5, 0), 0);
    }
}
