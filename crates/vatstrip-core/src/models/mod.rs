//! Data models shared across the pipeline.

pub mod config;
pub mod geometry;
pub mod plan;
pub mod token;
