//! UXLens - acquisition and normalization of UI/UX evaluation results
//!
//! Polls an evaluation backend until the analysis of a run is available,
//! normalizes the raw payload into typed page, interaction and workflow
//! results, and renders them as reports.

pub mod analysis;
pub mod api;
pub mod cli;
pub mod config;
pub mod models;
pub mod normalizer;
pub mod poller;
pub mod report;
