// src/store/mod.rs

//! Persistence collaborator: the managed relational store behind the
//! dashboard, seen through the handful of reads and writes grading needs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    grading::builder::PersistableAnswerKey,
    models::{answer_key::AnswerKey, roster::RosterMember, submission::SubmissionRecord},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Store failures. Callers must keep "not found" and "try again" apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Transient(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Record not found".to_string()),
            other => StoreError::Transient(other.to_string()),
        }
    }
}

#[async_trait]
pub trait AcademyStore: Send + Sync {
    /// Students of one class, in display order.
    async fn fetch_roster(&self, class_id: i64) -> Result<Vec<RosterMember>, StoreError>;

    /// Every submission recorded against one answer key, duplicates included.
    async fn fetch_submissions(&self, answer_key_id: i64)
    -> Result<Vec<SubmissionRecord>, StoreError>;

    async fn fetch_answer_key(&self, id: i64) -> Result<AnswerKey, StoreError>;

    async fn list_answer_keys(&self) -> Result<Vec<AnswerKey>, StoreError>;

    /// Inserts a key without identity, updates one that has it.
    async fn save_answer_key(&self, key: &PersistableAnswerKey) -> Result<AnswerKey, StoreError>;

    /// Irreversible. Dependent submissions go with the key.
    async fn delete_answer_key(&self, id: i64) -> Result<(), StoreError>;
}

pub(crate) fn answer_key_not_found(id: i64) -> StoreError {
    StoreError::NotFound(format!("Answer key {} not found", id))
}
