// src/services/mod.rs

pub mod recommender;
pub mod scorer;
pub mod statistics;
pub mod submission;
