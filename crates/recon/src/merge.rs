//! Composite-key merge of the subject dataset against the reference dataset.
//!
//! Relational outer join on the key columns, ordered by key, restricted to
//! rows whose subject value is present. Duplicate keys expand to the
//! cartesian product of the matching rows. INDEX is resolved separately as
//! the first reference row carrying the key.

use std::collections::{BTreeMap, HashMap};

use crate::error::ReconError;
use crate::model::{Cell, ComparisonRow, ComparisonTable, CompositeKey, Dataset};
use crate::progress::ProgressSink;
use crate::schema::ResolvedSchema;

pub struct MergeInput<'a> {
    pub reference: &'a Dataset,
    pub subject: &'a Dataset,
    /// External values, one per reference row.
    pub attached: &'a [Option<f64>],
    pub schema: &'a ResolvedSchema,
    /// Position of `reference`'s first row in the unsliced dataset.
    pub index_offset: usize,
}

pub fn merge(
    input: &MergeInput<'_>,
    progress: &mut dyn ProgressSink,
) -> Result<ComparisonTable, ReconError> {
    let MergeInput { reference, subject, attached, schema, index_offset } = *input;
    debug_assert_eq!(attached.len(), reference.len());

    check_key_kinds(reference, subject, schema)?;
    let subject_values = subject_values(subject, schema.subject_value)?;

    // 1. Group both sides by composite key. BTreeMap gives key order.
    let mut reference_groups: BTreeMap<CompositeKey, Vec<usize>> = BTreeMap::new();
    for (i, row) in reference.rows().iter().enumerate() {
        reference_groups
            .entry(CompositeKey::from_row(row, &schema.reference_keys))
            .or_default()
            .push(i);
    }

    let mut subject_groups: BTreeMap<CompositeKey, Vec<usize>> = BTreeMap::new();
    for (i, row) in subject.rows().iter().enumerate() {
        subject_groups
            .entry(CompositeKey::from_row(row, &schema.subject_keys))
            .or_default()
            .push(i);
    }

    // 2. Join. Reference-only keys never survive the subject-value filter, so
    //    walking the subject groups in key order covers every output row.
    let mut joined: Vec<(CompositeKey, ComparisonRow)> = Vec::new();
    let mut unmatched = 0usize;
    for (key, subject_rows) in &subject_groups {
        let matches = reference_groups.get(key).map(Vec::as_slice).unwrap_or(&[]);
        for &s in subject_rows {
            let Some(subject_value) = subject_values[s] else {
                continue;
            };
            let keys: Vec<Cell> = schema
                .subject_keys
                .iter()
                .map(|&c| subject.cell(s, c).clone())
                .collect();

            if matches.is_empty() {
                unmatched += 1;
                joined.push((key.clone(), comparison_row(keys, subject_value, None)));
            } else {
                for &r in matches {
                    joined.push((
                        key.clone(),
                        comparison_row(keys.clone(), subject_value, attached[r]),
                    ));
                }
            }
        }
    }

    // 3. Resolve INDEX: first reference position per complete key.
    let mut first_position: HashMap<&CompositeKey, usize> = HashMap::new();
    for (key, positions) in &reference_groups {
        if key.is_complete() {
            if let Some(&first) = positions.first() {
                first_position.insert(key, first);
            }
        }
    }

    let total = joined.len();
    let mut rows = Vec::with_capacity(total);
    for (i, (key, mut row)) in joined.into_iter().enumerate() {
        if progress.is_cancelled() {
            log::info!("merge cancelled at row {i}/{total}");
            return Err(ReconError::Cancelled);
        }
        row.row = i;
        row.index = first_position.get(&key).map(|p| p + index_offset);
        rows.push(row);
        progress.report(i + 1, total);
    }

    log::info!(
        "merged {} subject rows against {} reference rows: {} output rows, {} without reference",
        subject.len(),
        reference.len(),
        rows.len(),
        unmatched
    );

    Ok(ComparisonTable {
        rows,
        key_columns: schema.key_names.clone(),
        reference_rows: reference.len(),
        subject_rows: subject.len(),
        index_offset,
        computed_at: chrono::Utc::now().to_rfc3339(),
    })
}

fn comparison_row(keys: Vec<Cell>, subject_value: f64, reference_value: Option<f64>) -> ComparisonRow {
    ComparisonRow {
        row: 0,
        index: None,
        keys,
        subject_value: Some(subject_value),
        reference_value,
        diff: reference_value.map(|r| subject_value - r),
    }
}

fn check_key_kinds(
    reference: &Dataset,
    subject: &Dataset,
    schema: &ResolvedSchema,
) -> Result<(), ReconError> {
    let pairs = schema.reference_keys.iter().zip(&schema.subject_keys);
    for ((&rc, &sc), name) in pairs.zip(&schema.key_names) {
        let reference_kind = reference.column_kind(rc);
        let subject_kind = subject.column_kind(sc);
        if !reference_kind.compatible_with(subject_kind) {
            return Err(ReconError::KeyTypeMismatch {
                column: name.clone(),
                reference: reference_kind,
                subject: subject_kind,
            });
        }
    }
    Ok(())
}

fn subject_values(subject: &Dataset, col: usize) -> Result<Vec<Option<f64>>, ReconError> {
    subject
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| match &row[col] {
            Cell::Missing => Ok(None),
            Cell::Number(n) => Ok(Some(*n)),
            Cell::Text(t) => Err(ReconError::ValueNotNumeric { row: i, value: t.clone() }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnKind;
    use crate::progress::NoProgress;

    fn schema() -> ResolvedSchema {
        ResolvedSchema {
            key_names: vec!["POL_NO".into(), "RIDER".into()],
            reference_keys: vec![0, 1],
            subject_keys: vec![0, 1],
            subject_value: 2,
        }
    }

    fn reference(rows: &[(&str, &str)]) -> Dataset {
        Dataset::new(
            vec!["POL_NO".into(), "RIDER".into()],
            rows.iter().map(|(p, r)| vec![Cell::from(*p), Cell::from(*r)]).collect(),
        )
    }

    fn subject(rows: &[(&str, &str, Option<f64>)]) -> Dataset {
        Dataset::new(
            vec!["POL_NO".into(), "RIDER".into(), "BEL".into()],
            rows.iter()
                .map(|(p, r, v)| vec![Cell::from(*p), Cell::from(*r), Cell::from(*v)])
                .collect(),
        )
    }

    fn run(reference: &Dataset, subject: &Dataset, attached: &[Option<f64>]) -> ComparisonTable {
        let schema = schema();
        let input = MergeInput { reference, subject, attached, schema: &schema, index_offset: 0 };
        merge(&input, &mut NoProgress).unwrap()
    }

    #[test]
    fn matched_row_gets_diff_and_index() {
        let r = reference(&[("A", "R1"), ("B", "R1")]);
        let s = subject(&[("B", "R1", Some(10.5))]);
        let t = run(&r, &s, &[Some(1.0), Some(10.0)]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows[0].index, Some(1));
        assert_eq!(t.rows[0].diff_text(), "0.500000");
        assert_eq!(t.rows[0].reference_text(), "10.000000");
    }

    #[test]
    fn subject_only_row_kept_with_missing_reference() {
        let r = reference(&[("A", "R1")]);
        let s = subject(&[("Z", "R9", Some(3.0))]);
        let t = run(&r, &s, &[Some(1.0)]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows[0].index, None);
        assert_eq!(t.rows[0].index_text(), "NaN");
        assert_eq!(t.rows[0].reference_text(), "");
        assert_eq!(t.rows[0].diff_text(), "NaN");
    }

    #[test]
    fn reference_only_rows_and_missing_subject_values_dropped() {
        let r = reference(&[("A", "R1"), ("B", "R1")]);
        let s = subject(&[("A", "R1", None), ("C", "R1", Some(1.0))]);
        let t = run(&r, &s, &[Some(1.0), Some(2.0)]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.rows[0].key_text(0), "C");
    }

    #[test]
    fn duplicate_keys_expand_cartesian_and_index_is_first_match() {
        let r = reference(&[("X", "R0"), ("A", "R1"), ("A", "R1")]);
        let s = subject(&[("A", "R1", Some(5.0)), ("A", "R1", Some(6.0))]);
        let t = run(&r, &s, &[None, Some(1.0), Some(2.0)]);
        assert_eq!(t.len(), 4);
        let diffs: Vec<String> = t.rows.iter().map(|r| r.diff_text()).collect();
        assert_eq!(diffs, ["4.000000", "3.000000", "5.000000", "4.000000"]);
        assert!(t.rows.iter().all(|r| r.index == Some(1)));
        let numbers: Vec<usize> = t.rows.iter().map(|r| r.row).collect();
        assert_eq!(numbers, [0, 1, 2, 3]);
    }

    #[test]
    fn output_is_ordered_by_key() {
        let r = reference(&[("A", "R1")]);
        let s = subject(&[("C", "R1", Some(1.0)), ("A", "R2", Some(1.0)), ("A", "R1", Some(1.0))]);
        let t = run(&r, &s, &[Some(1.0)]);
        let keys: Vec<String> =
            t.rows.iter().map(|r| format!("{}/{}", r.key_text(0), r.key_text(1))).collect();
        assert_eq!(keys, ["A/R1", "A/R2", "C/R1"]);
    }

    #[test]
    fn missing_keys_join_but_never_resolve_an_index() {
        let r = Dataset::new(
            vec!["POL_NO".into(), "RIDER".into()],
            vec![vec![Cell::from("A"), Cell::Missing]],
        );
        let s = Dataset::new(
            vec!["POL_NO".into(), "RIDER".into(), "BEL".into()],
            vec![vec![Cell::from("A"), Cell::Missing, Cell::from(2.0)]],
        );
        let t = run(&r, &s, &[Some(1.5)]);
        assert_eq!(t.rows[0].diff_text(), "0.500000");
        assert_eq!(t.rows[0].index, None);
    }

    #[test]
    fn index_offset_is_applied() {
        let r = reference(&[("A", "R1")]);
        let s = subject(&[("A", "R1", Some(1.0))]);
        let schema = schema();
        let input = MergeInput {
            reference: &r,
            subject: &s,
            attached: &[Some(1.0)],
            schema: &schema,
            index_offset: 40,
        };
        let t = merge(&input, &mut NoProgress).unwrap();
        assert_eq!(t.rows[0].index, Some(40));
        assert_eq!(t.index_offset, 40);
    }

    #[test]
    fn numeric_keys_match_numerically() {
        let r = Dataset::new(
            vec!["POL_NO".into(), "RIDER".into()],
            vec![vec![Cell::from(1001i64), Cell::from("R1")]],
        );
        let s = Dataset::new(
            vec!["POL_NO".into(), "RIDER".into(), "BEL".into()],
            vec![vec![Cell::from(1001.0), Cell::from("R1"), Cell::from(1.0)]],
        );
        let t = run(&r, &s, &[Some(1.0)]);
        assert_eq!(t.rows[0].index, Some(0));
        assert_eq!(t.rows[0].key_text(0), "1001");
    }

    #[test]
    fn incompatible_key_kinds_fail() {
        let r = Dataset::new(
            vec!["POL_NO".into(), "RIDER".into()],
            vec![vec![Cell::from(1i64), Cell::from("R1")]],
        );
        let s = subject(&[("1", "R1", Some(1.0))]);
        let schema = schema();
        let input = MergeInput { reference: &r, subject: &s, attached: &[None], schema: &schema, index_offset: 0 };
        let err = merge(&input, &mut NoProgress).unwrap_err();
        assert_eq!(
            err,
            ReconError::KeyTypeMismatch {
                column: "POL_NO".into(),
                reference: ColumnKind::Numeric,
                subject: ColumnKind::Text,
            }
        );
    }

    #[test]
    fn text_subject_value_fails() {
        let r = reference(&[("A", "R1")]);
        let s = Dataset::new(
            vec!["POL_NO".into(), "RIDER".into(), "BEL".into()],
            vec![vec![Cell::from("A"), Cell::from("R1"), Cell::from("n/a-ish")]],
        );
        let schema = schema();
        let input = MergeInput { reference: &r, subject: &s, attached: &[None], schema: &schema, index_offset: 0 };
        assert!(matches!(
            merge(&input, &mut NoProgress),
            Err(ReconError::ValueNotNumeric { row: 0, .. })
        ));
    }

    struct CancelAfter {
        seen: usize,
        limit: usize,
    }

    impl ProgressSink for CancelAfter {
        fn report(&mut self, current: usize, _total: usize) {
            self.seen = current;
        }

        fn is_cancelled(&self) -> bool {
            self.seen >= self.limit
        }
    }

    #[test]
    fn cancellation_is_checked_between_rows() {
        let r = reference(&[("A", "R1")]);
        let s = subject(&[("A", "R1", Some(1.0)), ("B", "R1", Some(1.0)), ("C", "R1", Some(1.0))]);
        let schema = schema();
        let input = MergeInput { reference: &r, subject: &s, attached: &[None], schema: &schema, index_offset: 0 };
        let mut sink = CancelAfter { seen: 0, limit: 2 };
        assert_eq!(merge(&input, &mut sink), Err(ReconError::Cancelled));
        assert_eq!(sink.seen, 2);
    }
}
