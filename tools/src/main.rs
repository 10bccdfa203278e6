//! monitor-runner: headless end-to-end pipeline + monitoring run.
//!
//! Usage:
//!   monitor-runner --seed 42 --txns 2000 --cards 25 --db run.db
//!   monitor-runner --seed 42 --config pipeline.json
//!
//! Generates a deterministic synthetic transaction population, builds and
//! normalizes features, freezes the reference window and score baseline,
//! then runs one monitoring pass and prints the drift report. The anomaly
//! model proper is an external artifact; the runner stands in a trivial
//! scoring function so the full monitoring path can be exercised.

use anyhow::Result;
use driftwatch_core::{
    config::PipelineConfig,
    features::FeatureBuilder,
    monitor::MonitorContext,
    normalizer::Scaler,
    reference::{select_reference, ScoreBaseline},
    schema::FeatureFrame,
    store::{PipelineStore, SET_CURRENT, SET_REFERENCE},
    synthetic::{self, SyntheticConfig},
    timeline::sort_by_entity_time,
};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let txns = parse_arg(&args, "--txns", 2000usize);
    let cards = parse_arg(&args, "--cards", 25usize);
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let config = match args.windows(2).find(|w| w[0] == "--config") {
        Some(w) => PipelineConfig::from_file(Path::new(&w[1]))?,
        None => PipelineConfig::default(),
    };

    println!("driftwatch — monitor-runner");
    println!("  started: {}", chrono::Utc::now().to_rfc3339());
    println!("  seed:    {seed}");
    println!("  txns:    {txns}");
    println!("  cards:   {cards}");
    println!("  db:      {db}");
    println!();

    let mut store = PipelineStore::open(db)?;
    store.migrate()?;

    // 1. Ingest a deterministic synthetic population.
    let mut records = synthetic::generate(
        seed,
        &SyntheticConfig {
            cards,
            transactions: txns,
            ..SyntheticConfig::default()
        },
    );
    store.insert_transactions(&records)?;

    // 2. Sort into per-card timelines and build causal features.
    sort_by_entity_time(&mut records);
    let raw = FeatureBuilder::new(config.rolling_window).build(&records);

    // 3. Fit the global scaler and normalize.
    let scaler = Scaler::fit(&raw)?;
    let normalized = scaler.transform(&raw)?;
    store.save_scaler(&scaler)?;

    // 4. Freeze the reference window and the score baseline.
    let reference = select_reference(&normalized, config.reference_fraction);
    let scores = score_frame(&normalized);
    let reference_scores = &scores[..reference.n_rows()];
    let baseline = ScoreBaseline::freeze(
        reference_scores,
        config.baseline_alert_rate,
        config.threshold_percentile,
    )?;
    store.save_feature_frame(SET_REFERENCE, &reference)?;
    store.save_baseline(&baseline)?;

    // 5. Treat the full batch as "current" production traffic.
    store.save_feature_frame(SET_CURRENT, &normalized)?;
    store.save_scores(SET_CURRENT, &scores)?;

    // 6. One monitoring run.
    let context = MonitorContext::load(&store, config)?;
    let report = context.run(&store)?;
    log::info!(
        "run {} complete: {} feature verdicts, {} skipped",
        report.run_id,
        report.feature_drifts.len(),
        report.skipped_features.len()
    );

    println!("{}", serde_json::to_string_pretty(&report)?);
    println!();
    println!("DRIFT DETECTED: {}", report.drift_detected);
    Ok(())
}

/// Stand-in anomaly score: mean absolute deviation of the normalized row.
fn score_frame(frame: &FeatureFrame) -> Vec<f64> {
    frame
        .rows()
        .iter()
        .map(|row| row.iter().map(|v| v.abs()).sum::<f64>() / row.len().max(1) as f64)
        .collect()
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
