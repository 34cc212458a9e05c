use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::format;

// ---------------------------------------------------------------------------
// Cells + datasets
// ---------------------------------------------------------------------------

/// One cell of a loaded dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text rendering used for key columns in comparison output.
    pub fn display(&self) -> String {
        format::format_key(self)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        if n.is_nan() {
            Cell::Missing
        } else {
            Cell::Number(n)
        }
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n as f64)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Cell::Missing)
    }
}

/// Inferred type of a whole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Text,
    /// Every cell missing; joins with either kind.
    Empty,
}

impl ColumnKind {
    pub fn compatible_with(self, other: ColumnKind) -> bool {
        self == other || self == ColumnKind::Empty || other == ColumnKind::Empty
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric => write!(f, "numeric"),
            Self::Text => write!(f, "text"),
            Self::Empty => write!(f, "empty"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetRole {
    /// Receives the externally supplied values.
    Reference,
    /// Carries its own computed value column.
    Subject,
}

impl std::fmt::Display for DatasetRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reference => write!(f, "reference"),
            Self::Subject => write!(f, "subject"),
        }
    }
}

/// Ordered rows with an ordered header. Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    /// Build a dataset; short rows are padded with `Missing`, long rows truncated.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut r| {
                r.resize(width, Cell::Missing);
                r
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive lookup; first match wins.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.rows[row][col]
    }

    pub fn column_kind(&self, col: usize) -> ColumnKind {
        let mut kind = ColumnKind::Empty;
        for row in &self.rows {
            match &row[col] {
                Cell::Missing => {}
                Cell::Text(_) => return ColumnKind::Text,
                Cell::Number(_) => kind = ColumnKind::Numeric,
            }
        }
        kind
    }

    /// Rewrite every column name to upper case.
    pub fn canonicalize_columns(&mut self) {
        for c in &mut self.columns {
            *c = c.to_uppercase();
        }
    }

    /// Rows `start..=end` as a new dataset. Out-of-range bounds yield fewer rows.
    pub fn slice(&self, start: usize, end: usize) -> Dataset {
        let from = start.min(self.rows.len());
        let to = end.saturating_add(1).min(self.rows.len()).max(from);
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows[from..to].to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// Composite key
// ---------------------------------------------------------------------------

/// One typed component of a composite key.
///
/// Variant order gives the join ordering: numbers, then text, then missing last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Number(OrderedFloat<f64>),
    Text(String),
    Missing,
}

impl KeyPart {
    pub fn from_cell(cell: &Cell) -> Self {
        match cell {
            Cell::Missing => KeyPart::Missing,
            // -0.0 and 0.0 must land in the same bucket
            Cell::Number(n) if *n == 0.0 => KeyPart::Number(OrderedFloat(0.0)),
            Cell::Number(n) => KeyPart::Number(OrderedFloat(*n)),
            Cell::Text(s) => KeyPart::Text(s.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey(pub Vec<KeyPart>);

impl CompositeKey {
    pub fn from_row(row: &[Cell], key_cols: &[usize]) -> Self {
        CompositeKey(key_cols.iter().map(|&c| KeyPart::from_cell(&row[c])).collect())
    }

    /// True when no component is missing. Only complete keys compare equal
    /// under element-wise equality.
    pub fn is_complete(&self) -> bool {
        !self.0.iter().any(|p| matches!(p, KeyPart::Missing))
    }
}

// ---------------------------------------------------------------------------
// Row range
// ---------------------------------------------------------------------------

/// Inclusive reference-row range. `end: None` means "through the last row".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl RowRange {
    pub fn new(start: usize, end: Option<usize>) -> Self {
        Self { start, end }
    }
}

// ---------------------------------------------------------------------------
// Comparison output
// ---------------------------------------------------------------------------

/// One row of the comparison table. Missing numbers are `None`; sentinels only
/// appear in the `*_text` renderings.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub row: usize,
    pub index: Option<usize>,
    pub keys: Vec<Cell>,
    pub subject_value: Option<f64>,
    pub reference_value: Option<f64>,
    pub diff: Option<f64>,
}

impl ComparisonRow {
    pub fn index_text(&self) -> String {
        format::format_index(self.index)
    }

    pub fn key_text(&self, i: usize) -> String {
        self.keys.get(i).map(Cell::display).unwrap_or_default()
    }

    pub fn subject_text(&self) -> String {
        format::format_value(self.subject_value)
    }

    pub fn reference_text(&self) -> String {
        format::format_value(self.reference_value)
    }

    pub fn diff_text(&self) -> String {
        format::format_diff(self.diff)
    }

    /// |DIFF| as displayed (rounded to six decimals), or `None` when missing.
    pub fn diff_magnitude(&self) -> Option<f64> {
        format::parse_diff(&self.diff_text()).map(f64::abs)
    }
}

/// Raw merge output. Never mutated after the merge returns it.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    pub rows: Vec<ComparisonRow>,
    pub key_columns: Vec<String>,
    /// Reference rows compared (after the row range).
    pub reference_rows: usize,
    pub subject_rows: usize,
    /// Added to slice positions when resolving INDEX.
    pub index_offset: usize,
    pub computed_at: String,
}

impl ComparisonTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ds() -> Dataset {
        Dataset::new(
            vec!["pol_no".into(), "Bel".into()],
            vec![
                vec![Cell::from("A"), Cell::from(1.5)],
                vec![Cell::from("B")],
                vec![Cell::from("C"), Cell::from(2.0), Cell::from("extra")],
            ],
        )
    }

    #[test]
    fn rows_are_padded_and_truncated_to_header_width() {
        let d = ds();
        assert_eq!(d.rows()[1], vec![Cell::from("B"), Cell::Missing]);
        assert_eq!(d.rows()[2].len(), 2);
    }

    #[test]
    fn column_lookup_ignores_case() {
        let mut d = ds();
        assert_eq!(d.column_index("POL_NO"), Some(0));
        d.canonicalize_columns();
        assert_eq!(d.columns(), &["POL_NO".to_string(), "BEL".to_string()]);
    }

    #[test]
    fn column_kinds() {
        let d = ds();
        assert_eq!(d.column_kind(0), ColumnKind::Text);
        assert_eq!(d.column_kind(1), ColumnKind::Numeric);
        let empty = Dataset::new(vec!["X".into()], vec![vec![Cell::Missing]]);
        assert_eq!(empty.column_kind(0), ColumnKind::Empty);
        assert!(ColumnKind::Empty.compatible_with(ColumnKind::Text));
        assert!(!ColumnKind::Numeric.compatible_with(ColumnKind::Text));
    }

    #[test]
    fn slice_is_inclusive_and_clamped() {
        let d = ds();
        assert_eq!(d.slice(1, 1).len(), 1);
        assert_eq!(d.slice(1, 99).len(), 2);
        assert_eq!(d.slice(5, 9).len(), 0);
    }

    #[test]
    fn key_ordering_puts_missing_last() {
        let a = CompositeKey(vec![KeyPart::Number(OrderedFloat(2.0))]);
        let b = CompositeKey(vec![KeyPart::Missing]);
        assert!(a < b);
        assert!(!b.is_complete());
        assert_eq!(KeyPart::from_cell(&Cell::Number(-0.0)), KeyPart::from_cell(&Cell::Number(0.0)));
    }

    #[test]
    fn nan_cell_is_missing() {
        assert_eq!(Cell::from(f64::NAN), Cell::Missing);
        assert_eq!(Cell::from(None::<f64>), Cell::Missing);
    }
}
