// src/grading/mod.rs

//! Answer-key ingestion and exam-completion aggregation.
//!
//! file bytes -> [`importer`] -> [`validation`] -> [`builder`] -> store,
//! and later store -> [`reconciler`] -> completion report.

pub mod builder;
pub mod importer;
pub mod reconciler;
pub mod template;
pub mod validation;

/// One loosely-typed input row: column name -> raw cell value.
pub type RawRow = serde_json::Map<String, serde_json::Value>;
