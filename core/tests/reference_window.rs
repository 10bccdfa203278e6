//! Reference window selection and score-baseline freezing.

use driftwatch_core::{
    error::PipelineError,
    reference::{select_reference, ScoreBaseline},
    schema::{FeatureFrame, FeatureSchema},
};

fn numbered_frame(n: usize) -> FeatureFrame {
    let rows = (0..n).map(|i| vec![i as f64]).collect();
    FeatureFrame::with_rows(FeatureSchema::from_names(&["x"]), rows).unwrap()
}

/// The selector takes floor(fraction * N) leading rows, preserving order,
/// and is deterministic across repeated calls.
#[test]
fn selection_is_leading_contiguous_and_deterministic() {
    let frame = numbered_frame(103);

    let first = select_reference(&frame, 0.2);
    let second = select_reference(&frame, 0.2);

    assert_eq!(first.n_rows(), 20, "floor(0.2 * 103) = 20");
    assert_eq!(first, second, "selection must be deterministic");
    for (i, row) in first.rows().iter().enumerate() {
        assert_eq!(row[0], i as f64, "row order must be preserved");
    }
}

/// The fraction is a config parameter, not a constant.
#[test]
fn fraction_is_configurable() {
    let frame = numbered_frame(10);
    assert_eq!(select_reference(&frame, 0.5).n_rows(), 5);
    assert_eq!(select_reference(&frame, 1.0).n_rows(), 10);
    assert_eq!(select_reference(&frame, 0.0).n_rows(), 0);
}

/// Freezing a baseline captures mean/std of the reference scores, the
/// configured operating alert rate, and the percentile threshold.
#[test]
fn baseline_freeze_captures_reference_statistics() {
    let scores: Vec<f64> = (1..=100).map(|i| i as f64).collect();
    let baseline = ScoreBaseline::freeze(&scores, 0.01, 99.0).unwrap();

    assert!((baseline.mean - 50.5).abs() < 1e-9);
    assert!(baseline.std > 0.0);
    assert_eq!(baseline.alert_rate, 0.01);
    // Linear-interpolation p99 of 1..=100.
    assert!((baseline.threshold - 99.01).abs() < 1e-9);
}

/// No reference scores — no baseline.
#[test]
fn baseline_rejects_empty_scores() {
    assert!(matches!(
        ScoreBaseline::freeze(&[], 0.01, 99.0).unwrap_err(),
        PipelineError::EmptyInput(_)
    ));
}
