//! Frequency detection and period keys for semi-wide date columns.
//!
//! Date columns are ISO strings: `YYYY` yearly, `YYYY-MM` monthly,
//! `YYYY-MM-DD` daily, `YYYY-MM-DD_HH` hourly. Grouping a finer column into
//! a coarser period is a string-prefix truncation, which keeps the hot path
//! free of date parsing.

use besim_core::Frequency;
use polars::prelude::DataFrame;

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Which column frequency a column name encodes, if any.
pub fn column_frequency(name: &str) -> Option<Frequency> {
    let bytes = name.as_bytes();
    match bytes.len() {
        4 if all_digits(name) => Some(Frequency::Yearly),
        7 if all_digits(&name[..4]) && bytes[4] == b'-' && all_digits(&name[5..7]) => {
            Some(Frequency::Monthly)
        }
        10 if column_frequency(&name[..7]) == Some(Frequency::Monthly)
            && bytes[7] == b'-'
            && all_digits(&name[8..10]) =>
        {
            Some(Frequency::Daily)
        }
        13 if column_frequency(&name[..10]) == Some(Frequency::Daily)
            && bytes[10] == b'_'
            && all_digits(&name[11..13]) =>
        {
            Some(Frequency::Hourly)
        }
        _ => None,
    }
}

/// Detect a semi-wide frame's frequency from its date columns. `None` when
/// no date columns are present or they disagree.
pub fn detect_frequency(df: &DataFrame) -> Option<Frequency> {
    let mut detected: Option<Frequency> = None;
    for name in df.get_column_names() {
        if let Some(freq) = column_frequency(name) {
            match detected {
                None => detected = Some(freq),
                Some(existing) if existing != freq => return None,
                _ => {}
            }
        }
    }
    detected
}

/// Date columns of a frame at the given frequency, in frame order.
pub fn date_columns(df: &DataFrame, frequency: Frequency) -> Vec<String> {
    df.get_column_names()
        .iter()
        .filter(|name| column_frequency(name) == Some(frequency))
        .map(|name| name.to_string())
        .collect()
}

/// Truncate a source date column to its target period key.
pub fn period_key(column: &str, target: Frequency) -> Option<String> {
    let len = target.column_prefix_len()?;
    if column.len() < len {
        return None;
    }
    Some(column[..len].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn column_formats_map_to_frequencies() {
        assert_eq!(column_frequency("2013"), Some(Frequency::Yearly));
        assert_eq!(column_frequency("2013-01"), Some(Frequency::Monthly));
        assert_eq!(column_frequency("2013-01-15"), Some(Frequency::Daily));
        assert_eq!(column_frequency("2013-01-15_07"), Some(Frequency::Hourly));
        assert_eq!(column_frequency("VariableName"), None);
        assert_eq!(column_frequency("13-01"), None);
    }

    #[test]
    fn detection_ignores_metadata_columns() {
        let df = df![
            "VariableName" => &["a"],
            "Zone" => &["Z1"],
            "2013-01-01" => &[1.0],
            "2013-01-02" => &[2.0],
        ]
        .unwrap();
        assert_eq!(detect_frequency(&df), Some(Frequency::Daily));
    }

    #[test]
    fn mixed_date_columns_fail_detection() {
        let df = df![
            "2013-01" => &[1.0],
            "2013-01-02" => &[2.0],
        ]
        .unwrap();
        assert_eq!(detect_frequency(&df), None);
    }

    #[test]
    fn period_keys_truncate() {
        assert_eq!(
            period_key("2013-05-17", Frequency::Monthly).unwrap(),
            "2013-05"
        );
        assert_eq!(period_key("2013-05-17", Frequency::Yearly).unwrap(), "2013");
        assert_eq!(
            period_key("2013-05-17_09", Frequency::Daily).unwrap(),
            "2013-05-17"
        );
    }
}
