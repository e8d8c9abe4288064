// src/handlers/completion.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    grading::reconciler::reconcile,
    models::{completion::StatusFilter, roster::RosterFilter},
    state::SharedStore,
    store::AcademyStore,
};

/// Query parameters for the completion report.
#[derive(Debug, Default, Deserialize)]
pub struct CompletionParams {
    /// Name or student code substring.
    pub search: Option<String>,
    pub grade: Option<String>,
    pub section: Option<String>,
    /// Lists only one side of the partition.
    pub status: Option<StatusFilter>,
}

/// Completion report for one answer key.
///
/// * `search`, `grade` and `section` narrow the roster first, so rate and
///   average describe the filtered students.
/// * `status` only trims the listing afterwards.
pub async fn get_completion(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
    Query(params): Query<CompletionParams>,
) -> Result<impl IntoResponse, AppError> {
    // No statistics against a missing key.
    let answer_key = store.fetch_answer_key(id).await?;
    let roster = store.fetch_roster(answer_key.header.class_id).await?;
    let submissions = store.fetch_submissions(id).await?;

    let filter = RosterFilter {
        search: params.search,
        grade: params.grade,
        section: params.section,
    };
    let roster: Vec<_> = if filter.is_empty() {
        roster
    } else {
        roster.into_iter().filter(|m| filter.matches(m)).collect()
    };

    let status = reconcile(&answer_key, &roster, &submissions);

    tracing::debug!(
        "Answer key {}: {}/{} completed",
        id,
        status.completed_count,
        status.roster_size
    );

    let status = match params.status {
        Some(only) => status.only(only),
        None => status,
    };

    Ok(Json(status))
}
