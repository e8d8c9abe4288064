// src/models/roster.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'students' table: one student eligible to sit an exam.
/// Owned by the roster administration screens; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct RosterMember {
    pub id: i64,
    pub class_id: i64,
    pub name: String,
    /// Externally visible student code (e.g. "S2026-014").
    pub student_code: String,
    pub grade: Option<String>,
    pub section: Option<String>,
}

/// Query-side narrowing of a roster by free text and grade/section labels.
/// Blank values are treated as "no filter".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RosterFilter {
    pub search: Option<String>,
    pub grade: Option<String>,
    pub section: Option<String>,
}

impl RosterFilter {
    pub fn is_empty(&self) -> bool {
        [&self.search, &self.grade, &self.section]
            .iter()
            .all(|v| non_blank(v).is_none())
    }

    pub fn matches(&self, member: &RosterMember) -> bool {
        if let Some(needle) = non_blank(&self.search) {
            let needle = needle.to_lowercase();
            let hit = member.name.to_lowercase().contains(&needle)
                || member.student_code.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        label_matches(&self.grade, &member.grade) && label_matches(&self.section, &member.section)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn label_matches(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match non_blank(wanted) {
        None => true,
        Some(wanted) => actual
            .as_deref()
            .is_some_and(|actual| actual.trim().eq_ignore_ascii_case(wanted)),
    }
}
