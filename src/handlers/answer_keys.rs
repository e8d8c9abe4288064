// src/handlers/answer_keys.rs

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    error::AppError,
    grading::{
        builder::{AnswerKeyDraft, MergeMode, total_score},
        importer,
        template::{TEMPLATE_FILE_NAME, generate_template},
        validation::{ValidationError, validate_rows},
    },
    models::answer_key::{AnswerKeyRequest, AnswerKeyResponse, AnswerKeyRow},
    state::SharedStore,
    store::AcademyStore,
    utils::jwt::Claims,
};

/// Lists every answer key, newest exam first.
pub async fn list_answer_keys(
    State(store): State<SharedStore>,
) -> Result<impl IntoResponse, AppError> {
    let keys = store.list_answer_keys().await?;
    let keys: Vec<AnswerKeyResponse> = keys.into_iter().map(AnswerKeyResponse::from).collect();
    Ok(Json(keys))
}

pub async fn get_answer_key(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let key = store.fetch_answer_key(id).await?;
    Ok(Json(AnswerKeyResponse::from(key)))
}

/// Creates an answer key from manual entry.
///
/// * Validates the header DTO.
/// * Validates every row and reports all failures at once (422).
/// * Persists only through the builder's gate.
pub async fn create_answer_key(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AnswerKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let (header, raw_rows) = payload.into_parts(claims.actor_id()?);

    let report = validate_rows(&raw_rows);
    if !report.is_valid() {
        return Err(report.errors.into());
    }

    let mut draft = AnswerKeyDraft::new(header);
    draft.replace_rows(report.rows);
    let saved = store.save_answer_key(&draft.finalize()?).await?;

    tracing::info!(
        "Answer key {} created with {} questions ({} points)",
        saved.id,
        saved.rows.len(),
        saved.total_score()
    );

    Ok((StatusCode::CREATED, Json(AnswerKeyResponse::from(saved))))
}

/// Replaces header and rows of an existing answer key.
/// Refused once any student has submitted against it.
pub async fn update_answer_key(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
    Json(payload): Json<AnswerKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let existing = store.fetch_answer_key(id).await?;
    ensure_editable(store.as_ref(), id).await?;

    let (header, raw_rows) = payload.into_parts(existing.header.instructor_id);

    let report = validate_rows(&raw_rows);
    if !report.is_valid() {
        return Err(report.errors.into());
    }

    let mut draft = AnswerKeyDraft::from_key(existing);
    draft.set_header(header);
    draft.replace_rows(report.rows);
    let saved = store.save_answer_key(&draft.finalize()?).await?;

    tracing::info!("Answer key {} updated", saved.id);

    Ok(Json(AnswerKeyResponse::from(saved)))
}

/// Deletes an answer key by ID. Irreversible; submissions go with it.
pub async fn delete_answer_key(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    store.delete_answer_key(id).await?;
    tracing::info!("Answer key {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Serves the CSV import template.
pub async fn download_template() -> Result<impl IntoResponse, AppError> {
    let bytes = generate_template().map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", TEMPLATE_FILE_NAME),
            ),
        ],
        bytes,
    ))
}

/// DTO describing what an upload would contribute, without persisting it.
#[derive(Debug, Serialize)]
pub struct ImportPreview {
    pub headers: Vec<String>,
    pub imported_rows: usize,
    pub rows: Vec<AnswerKeyRow>,
    pub errors: Vec<ValidationError>,
    pub total_score: i64,
}

/// Parses and validates an uploaded sheet.
/// The body is the raw file content.
pub async fn preview_import(body: Bytes) -> Result<impl IntoResponse, AppError> {
    let sheet = importer::import(&body)?;
    let report = sheet.validate();

    Ok(Json(ImportPreview {
        headers: sheet.headers,
        imported_rows: sheet.rows.len(),
        total_score: total_score(&report.rows),
        rows: report.rows,
        errors: report.errors,
    }))
}

/// Query parameters of an import into an existing key.
/// `mode` has no default: the caller must choose replace or append.
#[derive(Debug, Deserialize)]
pub struct ImportParams {
    pub mode: MergeMode,
    /// Merge the valid rows even when some rows failed.
    #[serde(default)]
    pub allow_partial: bool,
}

/// Imports an uploaded sheet into an existing answer key.
///
/// * Any row error rejects the import unless `allow_partial=true`.
/// * A schema error (missing columns) always rejects it.
/// * The merged key passes the builder's gate before it is saved.
pub async fn import_rows(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
    Query(params): Query<ImportParams>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let existing = store.fetch_answer_key(id).await?;
    ensure_editable(store.as_ref(), id).await?;

    let sheet = importer::import(&body)?;
    let report = sheet.validate();

    if report.has_schema_error() || (!report.is_valid() && !params.allow_partial) {
        return Err(report.errors.into());
    }
    if !report.is_valid() {
        tracing::info!(
            "Answer key {}: merging {} valid rows, skipping {} invalid",
            id,
            report.rows.len(),
            report.errors.len()
        );
    }

    let mut draft = AnswerKeyDraft::from_key(existing);
    draft.merge(report.rows, params.mode);
    let saved = store.save_answer_key(&draft.finalize()?).await?;

    tracing::info!(
        "Answer key {} imported ({:?}), now {} questions",
        id,
        params.mode,
        saved.rows.len()
    );

    Ok(Json(AnswerKeyResponse::from(saved)))
}

/// An answer key stays editable until the first submission arrives.
async fn ensure_editable(store: &dyn AcademyStore, id: i64) -> Result<(), AppError> {
    let submissions = store.fetch_submissions(id).await?;
    if !submissions.is_empty() {
        return Err(AppError::Conflict(format!(
            "Answer key {} already has {} submissions and can no longer be edited",
            id,
            submissions.len()
        )));
    }
    Ok(())
}
