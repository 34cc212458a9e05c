use crate::error::ReconError;

/// Parse a pasted block of values, one per line.
///
/// Blank lines and purely alphabetic lines (a `BEL` header, for instance) are
/// skipped, as is any line that does not parse as a number. Fails only when
/// nothing usable remains.
pub fn parse_value_list(text: &str) -> Result<Vec<f64>, ReconError> {
    let mut values = Vec::new();
    let mut skipped = 0usize;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.chars().all(char::is_alphabetic) {
            skipped += 1;
            continue;
        }
        match line.parse::<f64>() {
            Ok(v) => values.push(v),
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        log::debug!("value list: {} line(s) skipped, {} value(s) parsed", skipped, values.len());
    }

    if values.is_empty() {
        return Err(ReconError::InvalidValues(
            "no numeric values found in the value list".into(),
        ));
    }
    Ok(values)
}
