// src/models/mod.rs

pub mod answer_key;
pub mod completion;
pub mod roster;
pub mod submission;
