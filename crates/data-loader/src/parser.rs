//! Field-level parsers for the raw dataset.
//!
//! Every function here works on a single cell. A malformed cell returns
//! `DataLoadError::InvalidValue`; the row decoder in [`crate::dataset`] turns
//! that into a fallback (empty list / absent value) instead of failing the row.
//!
//! List-like columns show up in three shapes depending on the dataset export:
//! - JSON: `[{"id": 28, "name": "Action"}]`
//! - Python literal: `[{'id': 28, 'name': 'Action'}]`
//! - plain comma-separated text: `Action, Adventure`

use crate::error::{DataLoadError, Result};
use serde_json::Value;

/// Parse a list-like cell into its `name` entries (or plain strings).
///
/// Empty cells and `[]` give an empty list. A bracketed cell that is neither
/// valid JSON nor a valid Python literal is an error.
pub fn parse_list_field(field: &str, raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "[]" {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        let parsed = serde_json::from_str::<Value>(trimmed)
            .or_else(|_| serde_json::from_str::<Value>(&python_literal_to_json(trimmed)))
            .map_err(|e| invalid(field, format!("{}: {}", trimmed, e)))?;

        return match parsed {
            Value::Array(items) => Ok(items.iter().filter_map(list_item_name).collect()),
            _ => Err(invalid(field, trimmed)),
        };
    }

    Ok(trimmed
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect())
}

/// Extract the display name of one list element.
fn list_item_name(item: &Value) -> Option<String> {
    match item {
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Rewrite a Python literal (single quotes, `None`, `True`, `False`) as JSON.
///
/// Only the subset used by dataset exports is supported: lists, dicts,
/// strings, numbers and the three keyword constants.
fn python_literal_to_json(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                let quote = c;
                out.push('"');
                while let Some(ch) = chars.next() {
                    match ch {
                        '\\' => match chars.next() {
                            Some('\'') => out.push('\''),
                            Some('"') => out.push_str("\\\""),
                            Some(other) => {
                                out.push('\\');
                                out.push(other);
                            }
                            None => {}
                        },
                        ch if ch == quote => break,
                        '"' => out.push_str("\\\""),
                        ch => out.push(ch),
                    }
                }
                out.push('"');
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.as_str() {
                    "None" => out.push_str("null"),
                    "True" => out.push_str("true"),
                    "False" => out.push_str("false"),
                    _ => out.push_str(&word),
                }
            }
            c => out.push(c),
        }
    }

    out
}

/// Parse an optional float cell. Non-finite values are rejected.
pub fn parse_float(field: &str, raw: &str) -> Result<Option<f32>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(invalid(field, trimmed)),
    }
}

/// Parse a non-negative count cell. Exports sometimes write counts as `123.0`.
pub fn parse_count(field: &str, raw: &str) -> Result<Option<u32>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if let Ok(v) = trimmed.parse::<u32>() {
        return Ok(Some(v));
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v <= u32::MAX as f64 && v.fract() == 0.0 => {
            Ok(Some(v as u32))
        }
        _ => Err(invalid(field, trimmed)),
    }
}

/// Parse an integer identifier cell (also tolerating the `123.0` form).
pub fn parse_id(field: &str, raw: &str) -> Result<Option<i64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(Some(v));
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            Ok(Some(v as i64))
        }
        _ => Err(invalid(field, trimmed)),
    }
}

/// Trimmed text, or `None` for blank cells and the usual null spellings.
pub fn parse_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") || trimmed == "None" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn invalid(field: &str, value: impl Into<String>) -> DataLoadError {
    DataLoadError::InvalidValue {
        field: field.to_string(),
        value: value.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_list_of_objects() {
        let raw = r#"[{"id": 28, "name": "Action"}, {"id": 12, "name": "Adventure"}]"#;
        assert_eq!(
            parse_list_field("genres", raw).unwrap(),
            vec!["Action", "Adventure"]
        );
    }

    #[test]
    fn test_parse_python_literal_list() {
        let raw = "[{'id': 1, 'name': \"Children's Film\"}, {'id': 2, 'name': 'Pixar', 'logo': None}]";
        assert_eq!(
            parse_list_field("production_companies", raw).unwrap(),
            vec!["Children's Film", "Pixar"]
        );
    }

    #[test]
    fn test_parse_list_of_plain_strings() {
        assert_eq!(
            parse_list_field("keywords", "['space', 'alien']").unwrap(),
            vec!["space", "alien"]
        );
    }

    #[test]
    fn test_parse_comma_separated() {
        assert_eq!(
            parse_list_field("genres", "Action, Science Fiction ,, Drama").unwrap(),
            vec!["Action", "Science Fiction", "Drama"]
        );
    }

    #[test]
    fn test_parse_empty_list_values() {
        assert!(parse_list_field("genres", "").unwrap().is_empty());
        assert!(parse_list_field("genres", "  []  ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_malformed_list_is_error() {
        assert!(parse_list_field("genres", "[{'name': 'Action'").is_err());
        assert!(parse_list_field("genres", "{\"name\": \"Action\"}").is_err());
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_float("vote_average", "7.5").unwrap(), Some(7.5));
        assert_eq!(parse_float("vote_average", " ").unwrap(), None);
        assert!(parse_float("vote_average", "NaN").is_err());
        assert!(parse_float("vote_average", "high").is_err());

        assert_eq!(parse_count("vote_count", "1200").unwrap(), Some(1200));
        assert_eq!(parse_count("vote_count", "1200.0").unwrap(), Some(1200));
        assert!(parse_count("vote_count", "-3").is_err());
        assert!(parse_count("vote_count", "12.5").is_err());

        assert_eq!(parse_id("id", "27205").unwrap(), Some(27205));
        assert_eq!(parse_id("id", "27205.0").unwrap(), Some(27205));
        assert!(parse_id("id", "tt1375666").is_err());
    }

    #[test]
    fn test_parse_text() {
        assert_eq!(parse_text("  Inception "), Some("Inception".to_string()));
        assert_eq!(parse_text(""), None);
        assert_eq!(parse_text("NaN"), None);
    }
}
