// src/handlers/mod.rs

pub mod answer_keys;
pub mod completion;
