//! Field normalization primitives
//!
//! Pure, deterministic transforms shared by the GBIF and eBMS ingestion
//! paths: coordinate decoding, fixed-pattern date parsing, multi-valued
//! string splitting, and column-name canonicalization.

use chrono::NaiveDate;
use thiserror::Error;

/// Result type for normalization operations
pub type Result<T> = std::result::Result<T, NormalizeError>;

/// Errors raised by field normalization
///
/// Callers decide severity: optional fields degrade to `None` on these,
/// required fields propagate them.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Malformed coordinate: {0:?}")]
    MalformedCoordinate(String),

    #[error("Malformed date: {0:?} (expected pattern {1})")]
    MalformedDate(String, String),
}

/// Decode a coordinate string with a trailing hemisphere letter.
///
/// `N`/`E` yield a non-negative value, `S`/`W` a non-positive one:
/// `"41.23N"` -> `41.23`, `"8.60W"` -> `-8.60`.
pub fn parse_coordinate(raw: &str) -> Result<f64> {
    let (magnitude, hemisphere) = match raw.char_indices().last() {
        Some((idx, c)) => (&raw[..idx], c),
        None => return Err(NormalizeError::MalformedCoordinate(raw.to_string())),
    };

    let sign = match hemisphere {
        'N' | 'E' => 1.0,
        'S' | 'W' => -1.0,
        _ => return Err(NormalizeError::MalformedCoordinate(raw.to_string())),
    };

    let value: f64 = magnitude
        .trim()
        .parse()
        .map_err(|_| NormalizeError::MalformedCoordinate(raw.to_string()))?;

    Ok(sign * value)
}

/// Parse a date string against a fixed `chrono` pattern (e.g. `%d/%m/%Y`).
pub fn parse_date(raw: &str, pattern: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, pattern)
        .map_err(|_| NormalizeError::MalformedDate(raw.to_string(), pattern.to_string()))
}

/// Split a multi-valued string on `|` if present, otherwise on `/`.
///
/// `None` input yields an empty sequence. When `expected_parts` is given the
/// result is padded with empty strings or truncated to exactly that length,
/// making this a fixed-arity decomposition (e.g. a start/end time pair)
/// rather than a variable-length list.
pub fn split_multi_valued(raw: Option<&str>, expected_parts: Option<usize>) -> Vec<String> {
    let mut parts: Vec<String> = match raw {
        Some(val) if val.contains('|') => val.split('|').map(str::to_string).collect(),
        Some(val) => val.split('/').map(str::to_string).collect(),
        None => Vec::new(),
    };

    if let Some(n) = expected_parts {
        parts.resize(n, String::new());
    }

    parts
}

/// Canonicalize an arbitrary source header: lowercase, spaces to underscores.
pub fn canonicalize_column_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinate_north_east_positive() {
        assert_eq!(parse_coordinate("41.23N").unwrap(), 41.23);
        assert_eq!(parse_coordinate("8.60E").unwrap(), 8.60);
        assert_eq!(parse_coordinate("0.0N").unwrap(), 0.0);
    }

    #[test]
    fn test_parse_coordinate_south_west_negative() {
        assert_eq!(parse_coordinate("8.60W").unwrap(), -8.60);
        assert_eq!(parse_coordinate("41.23S").unwrap(), -41.23);
    }

    #[test]
    fn test_parse_coordinate_malformed() {
        assert!(matches!(
            parse_coordinate("abcN"),
            Err(NormalizeError::MalformedCoordinate(_))
        ));
        assert!(matches!(
            parse_coordinate("41.23X"),
            Err(NormalizeError::MalformedCoordinate(_))
        ));
        assert!(matches!(
            parse_coordinate(""),
            Err(NormalizeError::MalformedCoordinate(_))
        ));
        // No magnitude at all
        assert!(parse_coordinate("N").is_err());
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date("24/05/2023", "%d/%m/%Y").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 5, 24).unwrap());
    }

    #[test]
    fn test_parse_date_malformed() {
        assert!(matches!(
            parse_date("2023-05-24", "%d/%m/%Y"),
            Err(NormalizeError::MalformedDate(_, _))
        ));
        assert!(parse_date("31/02/2023", "%d/%m/%Y").is_err());
    }

    #[test]
    fn test_split_pipe_preferred_over_slash() {
        assert_eq!(
            split_multi_valued(Some("a|b/c"), None),
            vec!["a".to_string(), "b/c".to_string()]
        );
    }

    #[test]
    fn test_split_slash_fallback() {
        assert_eq!(
            split_multi_valued(Some("08:00/09:30"), Some(2)),
            vec!["08:00".to_string(), "09:30".to_string()]
        );
    }

    #[test]
    fn test_split_fixed_arity_pads() {
        assert_eq!(
            split_multi_valued(Some(""), Some(2)),
            vec![String::new(), String::new()]
        );
        assert_eq!(
            split_multi_valued(Some("08:00"), Some(2)),
            vec!["08:00".to_string(), String::new()]
        );
        assert_eq!(split_multi_valued(None, Some(2)).len(), 2);
    }

    #[test]
    fn test_split_fixed_arity_truncates() {
        assert_eq!(
            split_multi_valued(Some("a/b/c"), Some(2)),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_split_none_is_empty() {
        assert!(split_multi_valued(None, None).is_empty());
    }

    #[test]
    fn test_split_variable_arity() {
        assert_eq!(
            split_multi_valued(Some("Doe, J.|Smith, A.|Brown, K."), None),
            vec![
                "Doe, J.".to_string(),
                "Smith, A.".to_string(),
                "Brown, K.".to_string()
            ]
        );
    }

    #[test]
    fn test_canonicalize_column_name() {
        assert_eq!(canonicalize_column_name("Sample ID"), "sample_id");
        assert_eq!(
            canonicalize_column_name("Verification Status"),
            "verification_status"
        );
        assert_eq!(canonicalize_column_name("latitude"), "latitude");
    }
}
