// Property-based tests for the merge and view logic.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use belcheck_recon::format::{fixed6, parse_diff};
use belcheck_recon::{
    Cell, Dataset, NoProgress, ReconciliationSession, ViewMode, ViewOptions,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn key_headers() -> Vec<String> {
    ["POL_NO", "RIDER_PRD_CODE", "INIT_V_CHECK", "LOA_CODE"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn key_cells(pol: &str, rider: &str) -> Vec<Cell> {
    vec![Cell::from(pol), Cell::from(rider), Cell::from("Y"), Cell::from("L1")]
}

/// (pol, rider) drawn from a small space so subject/reference keys collide often.
fn arb_key() -> impl Strategy<Value = (String, String)> {
    (r"[A-D]", r"R[1-3]")
}

/// Mostly present values, sometimes missing.
fn arb_value() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        4 => (-1000.0..1000.0f64).prop_map(Some),
        1 => Just(None),
    ]
}

fn arb_tolerance() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(0.001),
        Just(0.000001),
        Just(1.0),
        0.000001..1.0f64,
    ]
}

/// Reference rows with unique keys plus their attached values, and subject rows.
fn arb_inputs() -> impl Strategy<Value = (Vec<((String, String), f64)>, Vec<((String, String), Option<f64>)>)> {
    (
        proptest::collection::btree_map(arb_key(), -1000.0..1000.0f64, 1..8),
        proptest::collection::vec((arb_key(), arb_value()), 0..16),
    )
        .prop_map(|(reference, subject)| (reference.into_iter().collect(), subject))
}

fn build(
    reference: &[((String, String), f64)],
    subject: &[((String, String), Option<f64>)],
) -> (Dataset, Dataset, String) {
    let reference_ds = Dataset::new(
        key_headers(),
        reference.iter().map(|((p, r), _)| key_cells(p, r)).collect(),
    );
    let mut subject_headers = key_headers();
    subject_headers.push("BEL".into());
    let subject_ds = Dataset::new(
        subject_headers,
        subject
            .iter()
            .map(|((p, r), v)| {
                let mut row = key_cells(p, r);
                row.push(Cell::from(*v));
                row
            })
            .collect(),
    );
    let values = reference
        .iter()
        .map(|(_, v)| format!("{v}"))
        .collect::<Vec<_>>()
        .join("\n");
    (reference_ds, subject_ds, values)
}

fn run(
    reference: &[((String, String), f64)],
    subject: &[((String, String), Option<f64>)],
) -> ReconciliationSession {
    let (r, s, values) = build(reference, subject);
    let mut session = ReconciliationSession::default();
    session.run_comparison(&r, &s, &values, None, &mut NoProgress).unwrap();
    session
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn row_count_equals_present_subject_values((reference, subject) in arb_inputs()) {
        let session = run(&reference, &subject);
        let present = subject.iter().filter(|(_, v)| v.is_some()).count();
        prop_assert_eq!(session.table().unwrap().len(), present);
    }

    #[test]
    fn row_numbers_are_dense((reference, subject) in arb_inputs()) {
        let session = run(&reference, &subject);
        for (i, row) in session.table().unwrap().rows.iter().enumerate() {
            prop_assert_eq!(row.row, i);
        }
    }

    #[test]
    fn resolved_index_points_at_matching_reference_row((reference, subject) in arb_inputs()) {
        let session = run(&reference, &subject);
        for row in &session.table().unwrap().rows {
            let key = (row.key_text(0), row.key_text(1));
            let expected = reference.iter().position(|(k, _)| *k == key);
            prop_assert_eq!(row.index, expected);
            prop_assert_eq!(row.diff.is_none(), expected.is_none());
        }
    }

    #[test]
    fn apply_view_is_idempotent(
        (reference, subject) in arb_inputs(),
        tolerance in arb_tolerance(),
        differences in any::<bool>(),
        exclude_missing in any::<bool>(),
    ) {
        let mut session = run(&reference, &subject);
        let mode = if differences { ViewMode::Differences } else { ViewMode::All };
        let options = ViewOptions { mode, tolerance, exclude_missing };
        let first = session.apply_view(&options).unwrap().cloned();
        let second = session.apply_view(&options).unwrap().cloned();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn error_count_matches_manual_count(
        (reference, subject) in arb_inputs(),
        tolerance in arb_tolerance(),
        exclude_missing in any::<bool>(),
    ) {
        let mut session = run(&reference, &subject);
        let rows = session.table().unwrap().rows.clone();
        let options = ViewOptions { mode: ViewMode::All, tolerance, exclude_missing };
        let view = session.apply_view(&options).unwrap().unwrap();

        let mut manual = 0;
        for row in &rows {
            match parse_diff(&row.diff_text()) {
                None if exclude_missing => {}
                None => manual += 1,
                Some(d) if d.abs() > tolerance => manual += 1,
                Some(_) => {}
            }
        }
        prop_assert_eq!(view.error_count, manual);

        let missing = rows.iter().filter(|r| r.diff.is_none()).count();
        if exclude_missing {
            prop_assert_eq!(view.rows.len(), rows.len() - missing);
        } else {
            prop_assert!(view.error_count >= missing);
        }
    }

    #[test]
    fn differences_view_never_hides_an_error(
        (reference, subject) in arb_inputs(),
        tolerance in arb_tolerance(),
    ) {
        let mut session = run(&reference, &subject);
        let options = ViewOptions { mode: ViewMode::Differences, tolerance, exclude_missing: false };
        let view = session.apply_view(&options).unwrap().unwrap();
        prop_assert!(view.rows.len() >= view.error_count);
    }

    #[test]
    fn six_decimal_round_trip(v in -1.0e9..1.0e9f64) {
        let back: f64 = fixed6(v).parse().unwrap();
        prop_assert!((back - v).abs() <= 1e-6);
    }
}

// ---------------------------------------------------------------------------
// Boundary asymmetry (error uses >, differences view uses >=)
// ---------------------------------------------------------------------------

#[test]
fn boundary_row_is_in_differences_view_but_not_an_error() {
    let reference = vec![(("A".to_string(), "R1".to_string()), 1.0)];
    let subject = vec![(("A".to_string(), "R1".to_string()), Some(1.001))];
    let mut session = run(&reference, &subject);
    assert_eq!(session.table().unwrap().rows[0].diff_text(), "0.001000");

    let options = ViewOptions { mode: ViewMode::Differences, tolerance: 0.001, exclude_missing: false };
    let view = session.apply_view(&options).unwrap().unwrap();
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.error_count, 0);
}
