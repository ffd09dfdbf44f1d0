//! Parsing and validation of `mcq-test-results` documents.
//!
//! A document is checked in full before anything is returned: every problem
//! found is collected into a single [`MarkrError::Validation`] so callers can
//! reject the import without applying any part of it.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use roxmltree::{Document, Node};

use crate::error::{MarkrError, MarkrResult};
use crate::record::{RawEntry, ResultBatch};

pub const ROOT_ELEMENT: &str = "mcq-test-results";
pub const RESULT_ELEMENT: &str = "mcq-test-result";

/// Message used when a request carries no document at all.
pub const EMPTY_REQUEST: &str = "Current request does not satisfy request parameters.";

const INCORRECT_FILE: &str = "Incorrect file detected.";

/// Parse a submitted document into one batch per test id, in order of first appearance.
pub fn parse_document(xml: &str) -> MarkrResult<Vec<ResultBatch>> {
    if xml.trim().is_empty() {
        return Err(MarkrError::Validation(EMPTY_REQUEST.into()));
    }

    let doc = Document::parse(xml).map_err(|e| invalid(&[e.to_string()]))?;
    let root = doc.root_element();
    if root.tag_name().name() != ROOT_ELEMENT {
        return Err(invalid(&[format!(
            "expected root element <{ROOT_ELEMENT}>, found <{}>",
            root.tag_name().name()
        )]));
    }

    let results: Vec<Node> = root
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == RESULT_ELEMENT)
        .collect();
    if results.is_empty() {
        return Err(invalid(&[format!(
            "<{ROOT_ELEMENT}> contains no <{RESULT_ELEMENT}> elements"
        )]));
    }

    let mut problems = Vec::new();
    let mut entries = Vec::with_capacity(results.len());
    for (index, node) in results.iter().enumerate() {
        match parse_entry(*node) {
            Ok(entry) => entries.push(entry),
            Err(errs) => problems.extend(
                errs.into_iter()
                    .map(|e| format!("{RESULT_ELEMENT} {}: {e}", index + 1)),
            ),
        }
    }
    if !problems.is_empty() {
        return Err(invalid(&problems));
    }

    Ok(group_by_test(entries))
}

fn invalid(problems: &[String]) -> MarkrError {
    MarkrError::Validation(format!("{INCORRECT_FILE} {}", problems.join(", ")))
}

fn group_by_test(entries: Vec<RawEntry>) -> Vec<ResultBatch> {
    let mut batches: Vec<ResultBatch> = Vec::new();
    for entry in entries {
        match batches.iter_mut().find(|b| b.test_id == entry.test_id) {
            Some(batch) => batch.entries.push(entry),
            None => batches.push(ResultBatch::new(entry)),
        }
    }
    batches
}

fn parse_entry(node: Node) -> Result<RawEntry, Vec<String>> {
    let mut errs = Vec::new();

    let scanned_on = match node.attribute("scanned-on") {
        Some(raw) => match parse_scan_date(raw) {
            Some(d) => Some(d),
            None => {
                errs.push(format!("scanned-on '{raw}' is not a valid date"));
                None
            }
        },
        None => {
            errs.push("missing attribute scanned-on".to_string());
            None
        }
    };

    let test_id = required_text(node, "test-id", &mut errs);
    let student_number = required_text(node, "student-number", &mut errs);
    let first_name = required_text(node, "first-name", &mut errs);
    let last_name = required_text(node, "last-name", &mut errs);

    let marks = required_child(node, "summary-marks", &mut errs).and_then(|summary| {
        let obtained = required_marks(summary, "obtained", &mut errs);
        let available = required_marks(summary, "available", &mut errs);
        obtained.zip(available)
    });

    match (scanned_on, test_id, student_number, first_name, last_name, marks) {
        (
            Some(scanned_on),
            Some(test_id),
            Some(student_number),
            Some(first_name),
            Some(last_name),
            Some((obtained_marks, available_marks)),
        ) if errs.is_empty() => Ok(RawEntry {
            test_id,
            student_number,
            first_name,
            last_name,
            obtained_marks,
            available_marks,
            scanned_on,
        }),
        _ => Err(errs),
    }
}

/// The single child element called `name`; missing or repeated is a problem.
fn required_child<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
    errs: &mut Vec<String>,
) -> Option<Node<'a, 'input>> {
    let mut matches = node
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == name);
    match (matches.next(), matches.next()) {
        (Some(el), None) => Some(el),
        (Some(_), Some(_)) => {
            errs.push(format!("duplicate element {name}"));
            None
        }
        (None, _) => {
            errs.push(format!("missing element {name}"));
            None
        }
    }
}

fn required_text(node: Node, name: &str, errs: &mut Vec<String>) -> Option<String> {
    let el = required_child(node, name, errs)?;
    let text = el.text().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        errs.push(format!("element {name} is empty"));
        return None;
    }
    Some(text.to_string())
}

fn required_marks(summary: Node, attr: &str, errs: &mut Vec<String>) -> Option<f64> {
    let Some(raw) = summary.attribute(attr) else {
        errs.push(format!("summary-marks is missing attribute {attr}"));
        return None;
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Some(v),
        _ => {
            errs.push(format!(
                "summary-marks {attr} '{raw}' is not a non-negative number"
            ));
            None
        }
    }
}

/// Accepts an RFC 3339 timestamp, a bare local timestamp, or a plain date.
/// Only the calendar date, as written, is kept.
fn parse_scan_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<mcq-test-results>
    <mcq-test-result scanned-on="2017-12-04T12:12:10+11:00">
        <first-name>KJ</first-name>
        <last-name>Alysander</last-name>
        <student-number>002299</student-number>
        <test-id>9863</test-id>
        <answer question="1" marks-available="1" marks-awarded="1">A</answer>
        <answer question="2" marks-available="1" marks-awarded="0">B</answer>
        <summary-marks available="20" obtained="13" />
    </mcq-test-result>
    <mcq-test-result scanned-on="2017-12-04T12:13:10+11:00">
        <first-name>Jane</first-name>
        <last-name>Austen</last-name>
        <student-number>521585128</student-number>
        <test-id>9863</test-id>
        <summary-marks available="20" obtained="17" />
    </mcq-test-result>
</mcq-test-results>"#;

    fn validation_message(result: MarkrResult<Vec<ResultBatch>>) -> String {
        match result {
            Err(MarkrError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_sample_document() {
        let batches = parse_document(SAMPLE).unwrap();
        assert_eq!(batches.len(), 1);

        let batch = &batches[0];
        assert_eq!(batch.test_id, "9863");
        assert_eq!(batch.scanned_on, NaiveDate::from_ymd_opt(2017, 12, 4).unwrap());
        assert_eq!(batch.entries.len(), 2);

        let first = &batch.entries[0];
        assert_eq!(first.student_number, "002299");
        assert_eq!(first.first_name, "KJ");
        assert_eq!(first.last_name, "Alysander");
        assert_eq!(first.obtained_marks, 13.0);
        assert_eq!(first.available_marks, 20.0);
    }

    #[test]
    fn test_scan_date_keeps_written_calendar_day() {
        // 08:00 at +11:00 is still the 3rd in UTC
        assert_eq!(
            parse_scan_date("2017-12-04T08:00:00+11:00"),
            NaiveDate::from_ymd_opt(2017, 12, 4)
        );
        assert_eq!(
            parse_scan_date("2023-10-01"),
            NaiveDate::from_ymd_opt(2023, 10, 1)
        );
        assert_eq!(
            parse_scan_date("2023-10-01T08:00:00"),
            NaiveDate::from_ymd_opt(2023, 10, 1)
        );
        assert_eq!(parse_scan_date("yesterday"), None);
    }

    #[test]
    fn test_groups_entries_by_test_id() {
        let xml = r#"<mcq-test-results>
  <mcq-test-result scanned-on="2023-10-01">
    <test-id>A</test-id><student-number>1</student-number>
    <first-name>a</first-name><last-name>b</last-name>
    <summary-marks obtained="1" available="2"/>
  </mcq-test-result>
  <mcq-test-result scanned-on="2023-10-02">
    <test-id>B</test-id><student-number>2</student-number>
    <first-name>c</first-name><last-name>d</last-name>
    <summary-marks obtained="1" available="2"/>
  </mcq-test-result>
  <mcq-test-result scanned-on="2023-10-03">
    <test-id>A</test-id><student-number>3</student-number>
    <first-name>e</first-name><last-name>f</last-name>
    <summary-marks obtained="1" available="2"/>
  </mcq-test-result>
</mcq-test-results>"#;

        let batches = parse_document(xml).unwrap();
        let ids: Vec<&str> = batches.iter().map(|b| b.test_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(batches[0].entries.len(), 2);
        assert_eq!(
            batches[0].scanned_on,
            NaiveDate::from_ymd_opt(2023, 10, 1).unwrap()
        );
    }

    #[test]
    fn test_empty_body_rejected() {
        assert_eq!(validation_message(parse_document("")), EMPTY_REQUEST);
        assert_eq!(validation_message(parse_document("  \n ")), EMPTY_REQUEST);
    }

    #[test]
    fn test_malformed_xml_rejected() {
        let msg = validation_message(parse_document("<invalid_xml>"));
        assert!(msg.starts_with("Incorrect file detected."));
    }

    #[test]
    fn test_wrong_root_rejected() {
        let msg = validation_message(parse_document("<results></results>"));
        assert!(msg.contains("<mcq-test-results>"));
    }

    #[test]
    fn test_no_results_rejected() {
        let msg = validation_message(parse_document("<mcq-test-results/>"));
        assert!(msg.contains("no <mcq-test-result>"));
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let xml = r#"<mcq-test-results>
  <mcq-test-result>
    <test-id>1</test-id>
    <first-name></first-name>
    <last-name>Doe</last-name>
    <summary-marks available="20"/>
  </mcq-test-result>
</mcq-test-results>"#;

        let msg = validation_message(parse_document(xml));
        assert!(msg.contains("missing attribute scanned-on"));
        assert!(msg.contains("missing element student-number"));
        assert!(msg.contains("element first-name is empty"));
        assert!(msg.contains("missing attribute obtained"));
        assert!(msg.starts_with("Incorrect file detected. mcq-test-result 1:"));
    }

    #[test]
    fn test_duplicate_elements_rejected() {
        let xml = r#"<mcq-test-results>
  <mcq-test-result scanned-on="2023-10-01">
    <test-id>1</test-id><test-id>2</test-id>
    <student-number>1</student-number><student-number>1</student-number>
    <first-name>a</first-name><last-name>b</last-name>
    <summary-marks obtained="5" available="10"/>
    <summary-marks obtained="9" available="10"/>
  </mcq-test-result>
</mcq-test-results>"#;

        let msg = validation_message(parse_document(xml));
        assert!(msg.contains("duplicate element test-id"));
        assert!(msg.contains("duplicate element student-number"));
        assert!(msg.contains("duplicate element summary-marks"));
        assert!(!msg.contains("first-name"));
    }

    #[test]
    fn test_non_numeric_marks_rejected() {
        let xml = r#"<mcq-test-results>
  <mcq-test-result scanned-on="2023-10-01">
    <test-id>1</test-id><student-number>1</student-number>
    <first-name>a</first-name><last-name>b</last-name>
    <summary-marks obtained="lots" available="-3"/>
  </mcq-test-result>
</mcq-test-results>"#;

        let msg = validation_message(parse_document(xml));
        assert!(msg.contains("obtained 'lots'"));
        assert!(msg.contains("available '-3'"));
    }

    #[test]
    fn test_one_bad_entry_rejects_whole_document() {
        let xml = SAMPLE.replace(r#"obtained="17""#, r#"obtained="NaN""#);
        let msg = validation_message(parse_document(&xml));
        assert!(msg.contains("mcq-test-result 2:"));
    }
}
