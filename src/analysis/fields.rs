//! Column lookup against survey headers.
//!
//! Survey exports drift between years: question text gains stray spaces,
//! non-breaking spaces and renumbering. Lookups therefore compare normalized
//! header text, and refuse to guess when more than one header fits.

use crate::error::ChartError;
use crate::models::FieldSpec;
use tracing::debug;

/// Normalize header text: NBSP to space, trim, collapse whitespace runs.
pub fn normalize_header(text: &str) -> String {
    text.replace('\u{00A0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve `spec` to exactly one header, returned verbatim.
pub fn resolve_field(headers: &[String], spec: &FieldSpec) -> Result<String, ChartError> {
    if let FieldSpec::Exact(name) = spec {
        if let Some(header) = headers.iter().find(|h| *h == name) {
            return Ok(header.clone());
        }
    }

    let matches: Vec<&String> = headers
        .iter()
        .filter(|header| header_matches(&normalize_header(header), spec))
        .collect();

    match matches.as_slice() {
        [] => Err(ChartError::ColumnNotFound {
            field: spec.to_string(),
        }),
        [single] => {
            debug!("Resolved field {} to header {:?}", spec, single);
            Ok((*single).clone())
        }
        many => Err(ChartError::AmbiguousColumn {
            field: spec.to_string(),
            candidates: many.iter().map(|h| (*h).clone()).collect(),
        }),
    }
}

fn header_matches(normalized: &str, spec: &FieldSpec) -> bool {
    match spec {
        FieldSpec::Exact(name) => normalized == normalize_header(name),
        FieldSpec::Contains(fragments) => fragments
            .iter()
            .all(|fragment| normalized.contains(&normalize_header(fragment))),
        FieldSpec::Numbered { number, question } => {
            // "6.9" must not match "6.91"
            let numbered = normalized
                .strip_prefix(normalize_header(number).as_str())
                .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_digit()));
            numbered && normalized.contains(&normalize_header(question))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(
            normalize_header("  6.9\u{00A0}What   decay\tdata  "),
            "6.9 What decay data"
        );
        assert_eq!(normalize_header(""), "");
    }

    #[test]
    fn test_exact_prefers_raw_match() {
        let hs = headers(&["Country", "Country "]);
        let resolved = resolve_field(&hs, &FieldSpec::Exact("Country".to_string())).unwrap();
        assert_eq!(resolved, "Country");
    }

    #[test]
    fn test_exact_falls_back_to_normalized() {
        let hs = headers(&["Lab\u{00A0}name", "Region"]);
        let resolved = resolve_field(&hs, &FieldSpec::Exact("Lab name".to_string())).unwrap();
        assert_eq!(resolved, "Lab\u{00A0}name");
    }

    #[test]
    fn test_numbered_question() {
        let hs = headers(&[
            "6.8 Which gamma software is used?",
            "6.9  What decay data library is used?",
            "16.9 What decay data library is used?",
        ]);
        let spec = FieldSpec::Numbered {
            number: "6.9".to_string(),
            question: "What decay data library is used?".to_string(),
        };
        assert_eq!(
            resolve_field(&hs, &spec).unwrap(),
            "6.9  What decay data library is used?"
        );
    }

    #[test]
    fn test_missing_column() {
        let hs = headers(&["Country"]);
        let err = resolve_field(&hs, &FieldSpec::Exact("Region".to_string())).unwrap_err();
        assert!(matches!(err, ChartError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_no_headers() {
        let err = resolve_field(&[], &FieldSpec::Contains(vec!["x".to_string()])).unwrap_err();
        assert!(matches!(err, ChartError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_ambiguous_contains_fails_loudly() {
        let hs = headers(&[
            "2023: What decay data library is used?",
            "2024: What decay data library is used?",
        ]);
        let spec = FieldSpec::Contains(vec!["decay data library".to_string()]);
        match resolve_field(&hs, &spec) {
            Err(ChartError::AmbiguousColumn { candidates, .. }) => {
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_contains_requires_every_fragment() {
        let hs = headers(&["6.9 What decay data library is used?", "6.9 Other notes"]);
        let spec = FieldSpec::Contains(vec![
            "6.9".to_string(),
            "What decay data library is used?".to_string(),
        ]);
        assert_eq!(
            resolve_field(&hs, &spec).unwrap(),
            "6.9 What decay data library is used?"
        );
    }
}
