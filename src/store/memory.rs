// src/store/memory.rs

use std::{
    collections::BTreeMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;
use chrono::Utc;

use super::{AcademyStore, StoreError, answer_key_not_found};
use crate::{
    grading::builder::PersistableAnswerKey,
    models::{answer_key::AnswerKey, roster::RosterMember, submission::SubmissionRecord},
};

#[derive(Default)]
struct Tables {
    last_answer_key_id: i64,
    answer_keys: BTreeMap<i64, AnswerKey>,
    students: Vec<RosterMember>,
    submissions: Vec<SubmissionRecord>,
}

/// In-process store with the same observable behavior as [`super::PgStore`],
/// including the cascade from answer keys to their submissions.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a student to the roster of `member.class_id`.
    pub fn add_student(&self, member: RosterMember) -> Result<(), StoreError> {
        self.write()?.students.push(member);
        Ok(())
    }

    /// Records a finished attempt. No uniqueness is enforced per
    /// (student, answer key), matching the relational schema.
    pub fn add_submission(&self, record: SubmissionRecord) -> Result<(), StoreError> {
        self.write()?.submissions.push(record);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Transient("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Transient("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AcademyStore for MemoryStore {
    async fn fetch_roster(&self, class_id: i64) -> Result<Vec<RosterMember>, StoreError> {
        let mut roster: Vec<RosterMember> = self
            .read()?
            .students
            .iter()
            .filter(|s| s.class_id == class_id)
            .cloned()
            .collect();
        roster.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(roster)
    }

    async fn fetch_submissions(
        &self,
        answer_key_id: i64,
    ) -> Result<Vec<SubmissionRecord>, StoreError> {
        Ok(self
            .read()?
            .submissions
            .iter()
            .filter(|s| s.answer_key_id == answer_key_id)
            .cloned()
            .collect())
    }

    async fn fetch_answer_key(&self, id: i64) -> Result<AnswerKey, StoreError> {
        self.read()?
            .answer_keys
            .get(&id)
            .cloned()
            .ok_or_else(|| answer_key_not_found(id))
    }

    async fn list_answer_keys(&self) -> Result<Vec<AnswerKey>, StoreError> {
        let mut keys: Vec<AnswerKey> = self.read()?.answer_keys.values().cloned().collect();
        keys.sort_by(|a, b| {
            b.header
                .exam_date
                .cmp(&a.header.exam_date)
                .then(b.id.cmp(&a.id))
        });
        Ok(keys)
    }

    async fn save_answer_key(&self, key: &PersistableAnswerKey) -> Result<AnswerKey, StoreError> {
        let mut tables = self.write()?;
        let now = Utc::now();

        let saved = match key.id() {
            None => {
                tables.last_answer_key_id += 1;
                AnswerKey {
                    id: tables.last_answer_key_id,
                    header: key.header().clone(),
                    rows: key.rows().to_vec(),
                    created_at: Some(now),
                    updated_at: Some(now),
                }
            }
            Some(id) => {
                let existing = tables
                    .answer_keys
                    .get(&id)
                    .ok_or_else(|| answer_key_not_found(id))?;
                AnswerKey {
                    id,
                    header: key.header().clone(),
                    rows: key.rows().to_vec(),
                    created_at: existing.created_at,
                    updated_at: Some(now),
                }
            }
        };

        tables.answer_keys.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn delete_answer_key(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.answer_keys.remove(&id).is_none() {
            return Err(answer_key_not_found(id));
        }
        tables.submissions.retain(|s| s.answer_key_id != id);
        Ok(())
    }
}
