//! Row types shared across the service. Field names match the database
//! schema exactly — the upsert contract depends on it.

pub mod job;
pub mod match_record;
pub mod resume;
