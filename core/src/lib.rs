//! driftwatch-core — behavioral feature pipeline and drift monitoring engine
//! for card-transaction anomaly scoring.
//!
//! The crate has two halves:
//!   1. Feature pipeline: sort transactions into per-card timelines, compute
//!      causal rolling statistics (no record ever sees its own amount or the
//!      future), normalize globally, and freeze a leading reference window.
//!   2. Monitoring engine: compare current scores and features against the
//!      frozen baseline with three independent signals (score mean, per-column
//!      KS tests, alert rate) and combine them with a quorum vote.
//!
//! All persistence goes through [`store::PipelineStore`] (SQLite). Nothing
//! else in the crate touches the database.

pub mod config;
pub mod decision;
pub mod drift;
pub mod error;
pub mod features;
pub mod metrics;
pub mod monitor;
pub mod normalizer;
pub mod reference;
pub mod schema;
pub mod store;
pub mod synthetic;
pub mod timeline;
pub mod types;
