// src/models/mod.rs

pub mod program;
pub mod result;
pub mod statistics;
