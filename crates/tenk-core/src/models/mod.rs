//! Data models: the extraction contract and the pipeline configuration.

pub mod config;
pub mod report;
