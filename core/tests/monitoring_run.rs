//! End-to-end monitoring runs: artifact loading, schema intersection,
//! degenerate-sample skipping, metrics-log appends.

use driftwatch_core::{
    config::PipelineConfig,
    error::PipelineError,
    features::FeatureBuilder,
    monitor::MonitorContext,
    normalizer::Scaler,
    reference::{select_reference, ScoreBaseline},
    schema::{FeatureFrame, FeatureSchema},
    store::{PipelineStore, SET_CURRENT, SET_REFERENCE},
    synthetic::{self, SyntheticConfig},
    timeline::sort_by_entity_time,
};

/// Stand-in black-box score: mean absolute value of the normalized row.
fn score_frame(frame: &FeatureFrame) -> Vec<f64> {
    frame
        .rows()
        .iter()
        .map(|row| row.iter().map(|v| v.abs()).sum::<f64>() / row.len() as f64)
        .collect()
}

/// Build the full pipeline from a synthetic population and persist all
/// artifacts, returning the prepared store.
fn prepared_store(seed: u64) -> PipelineStore {
    let config = PipelineConfig::default();
    let mut store = PipelineStore::in_memory().unwrap();
    store.migrate().unwrap();

    let mut records = synthetic::generate(
        seed,
        &SyntheticConfig {
            cards: 10,
            transactions: 600,
            ..SyntheticConfig::default()
        },
    );
    sort_by_entity_time(&mut records);

    let raw = FeatureBuilder::new(config.rolling_window).build(&records);
    let scaler = Scaler::fit(&raw).unwrap();
    let normalized = scaler.transform(&raw).unwrap();
    store.save_scaler(&scaler).unwrap();

    let reference = select_reference(&normalized, config.reference_fraction);
    let scores = score_frame(&normalized);
    let baseline = ScoreBaseline::freeze(
        &scores[..reference.n_rows()],
        config.baseline_alert_rate,
        config.threshold_percentile,
    )
    .unwrap();
    store.save_feature_frame(SET_REFERENCE, &reference).unwrap();
    store.save_baseline(&baseline).unwrap();

    store.save_feature_frame(SET_CURRENT, &normalized).unwrap();
    store.save_scores(SET_CURRENT, &scores).unwrap();
    store
}

/// A full run produces a report covering every shared feature column and
/// appends exactly one metrics-log row.
#[test]
fn full_run_reports_and_logs() {
    let store = prepared_store(42);
    let context = MonitorContext::load(&store, PipelineConfig::default()).unwrap();

    let report = context.run(&store).unwrap();

    assert_eq!(
        report.feature_drifts.len(),
        13,
        "all shared columns get a verdict"
    );
    assert!(report.skipped_features.is_empty());
    assert!(report.current_metrics.p99 >= report.current_metrics.p95);
    assert_eq!(store.metrics_log_count().unwrap(), 1);

    let again = context.run(&store).unwrap();
    assert_eq!(store.metrics_log_count().unwrap(), 2, "log is append-only");
    assert_ne!(report.run_id, again.run_id);
}

/// Identical current and reference windows on the same scores: signals are
/// driven by the baseline comparison only, and the verdicts are stable.
#[test]
fn run_is_deterministic_apart_from_run_id() {
    let store = prepared_store(7);
    let context = MonitorContext::load(&store, PipelineConfig::default()).unwrap();

    let a = context.run(&store).unwrap();
    let b = context.run(&store).unwrap();

    assert_eq!(a.score_drift, b.score_drift);
    assert_eq!(a.alert_drift, b.alert_drift);
    assert_eq!(a.feature_drifts, b.feature_drifts);
    assert_eq!(a.drift_detected, b.drift_detected);
}

/// A context cannot be loaded from a store missing any frozen artifact,
/// and a run aborts without scores or features — no partial report.
#[test]
fn missing_artifacts_are_fatal() {
    let empty = PipelineStore::in_memory().unwrap();
    empty.migrate().unwrap();
    assert!(matches!(
        MonitorContext::load(&empty, PipelineConfig::default()).unwrap_err(),
        PipelineError::MissingArtifact { .. }
    ));

    // Frozen artifacts present, current batch absent.
    let store = prepared_store(3);
    let context = MonitorContext::load(&store, PipelineConfig::default()).unwrap();
    let mut bare = PipelineStore::in_memory().unwrap();
    bare.migrate().unwrap();
    let err = context.run(&bare).unwrap_err();
    assert!(matches!(err, PipelineError::MissingArtifact { .. }));
    assert_eq!(bare.metrics_log_count().unwrap(), 0, "no partial report");

    // Features present but scores absent is just as fatal.
    let current = store.load_feature_frame(SET_CURRENT).unwrap();
    bare.save_feature_frame(SET_CURRENT, &current).unwrap();
    assert!(matches!(
        context.run(&bare).unwrap_err(),
        PipelineError::MissingArtifact { .. }
    ));
}

/// Columns present on only one side are intersected away — not drifted,
/// not skipped, just absent from the comparison.
#[test]
fn schema_intersection_is_symmetric() {
    let reference = FeatureFrame::with_rows(
        FeatureSchema::from_names(&["a", "b", "only_ref"]),
        vec![vec![1.0, 2.0, 3.0], vec![1.5, 2.5, 3.5], vec![0.5, 1.5, 2.5]],
    )
    .unwrap();
    let current = FeatureFrame::with_rows(
        FeatureSchema::from_names(&["b", "a", "only_cur"]),
        vec![vec![2.1, 1.1, 9.0], vec![2.4, 0.9, 9.5]],
    )
    .unwrap();

    let scaler = Scaler::fit(&reference).unwrap();
    let baseline = ScoreBaseline {
        mean: 0.0,
        std: 1.0,
        alert_rate: 0.01,
        threshold: 1.0,
    };
    let context =
        MonitorContext::new(PipelineConfig::default(), scaler, reference, baseline);

    let report = context.evaluate(&current, &[0.1, 0.2]);

    let keys: Vec<&str> = report.feature_drifts.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["a", "b"], "intersection only, sorted");
    assert!(!report.feature_drifts.contains_key("only_ref"));
    assert!(!report.feature_drifts.contains_key("only_cur"));
    assert!(report.skipped_features.is_empty());
}

/// A shared column that is empty after dropping non-finite values is
/// skipped with a diagnostic: absent from the drift map, present in the
/// skipped list, excluded from the vote.
#[test]
fn degenerate_column_is_skipped_not_voted() {
    let reference = FeatureFrame::with_rows(
        FeatureSchema::from_names(&["good", "bad"]),
        vec![vec![1.0, f64::NAN], vec![2.0, f64::NAN], vec![3.0, f64::NAN]],
    )
    .unwrap();
    let current = FeatureFrame::with_rows(
        FeatureSchema::from_names(&["good", "bad"]),
        vec![vec![1.1, 5.0], vec![2.2, 6.0]],
    )
    .unwrap();

    let scaler = Scaler::fit(&current).unwrap();
    let baseline = ScoreBaseline {
        mean: 0.0,
        std: 1.0,
        alert_rate: 0.01,
        threshold: 1.0,
    };
    let context =
        MonitorContext::new(PipelineConfig::default(), scaler, reference, baseline);

    let report = context.evaluate(&current, &[0.1, 0.2]);

    assert!(!report.feature_drifts.contains_key("bad"));
    assert_eq!(report.skipped_features, vec!["bad".to_string()]);
    assert!(report.feature_drifts.contains_key("good"));
}

/// A single finite value is just as degenerate as none: the KS test needs
/// at least two points per side, so the column is skipped, not voted.
#[test]
fn single_point_column_is_skipped_not_voted() {
    let reference = FeatureFrame::with_rows(
        FeatureSchema::from_names(&["good", "lone"]),
        vec![vec![1.0, 42.0], vec![2.0, f64::NAN], vec![3.0, f64::NAN]],
    )
    .unwrap();
    let current = FeatureFrame::with_rows(
        FeatureSchema::from_names(&["good", "lone"]),
        vec![vec![1.1, 5.0], vec![2.2, 6.0]],
    )
    .unwrap();

    let scaler = Scaler::fit(&current).unwrap();
    let baseline = ScoreBaseline {
        mean: 0.0,
        std: 1.0,
        alert_rate: 0.01,
        threshold: 1.0,
    };
    let context =
        MonitorContext::new(PipelineConfig::default(), scaler, reference, baseline);

    let report = context.evaluate(&current, &[0.1, 0.2]);

    assert!(!report.feature_drifts.contains_key("lone"));
    assert_eq!(report.skipped_features, vec!["lone".to_string()]);
    assert!(report.feature_drifts.contains_key("good"));
}

/// When the designated metrics-log feature cannot be measured, the log row
/// records null, never a fake "statistic 0, no drift" measurement; a
/// measurable feature records a real value.
#[test]
fn unmeasured_designated_feature_logs_null() {
    let store = prepared_store(11);

    let measured_ctx = MonitorContext::load(&store, PipelineConfig::default()).unwrap();
    measured_ctx.run(&store).unwrap();
    let entry = store.latest_metrics_entry().unwrap().unwrap();
    assert_eq!(entry.feature_name, "log_amt");
    assert!(entry.feature_ks_stat.is_some());
    assert!(entry.feature_drift.is_some());

    let mut config = PipelineConfig::default();
    config.designated_feature = "no_such_column".to_string();
    let unmeasured_ctx = MonitorContext::load(&store, config).unwrap();
    unmeasured_ctx.run(&store).unwrap();
    let entry = store.latest_metrics_entry().unwrap().unwrap();
    assert_eq!(entry.feature_name, "no_such_column");
    assert_eq!(entry.feature_ks_stat, None);
    assert_eq!(entry.feature_drift, None);
}
