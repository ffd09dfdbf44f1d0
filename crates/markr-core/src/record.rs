use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One student's best-known result for one test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    pub obtained_marks: f64,
    pub available_marks: f64,
}

impl StudentRecord {
    pub fn new(
        student_number: String,
        first_name: String,
        last_name: String,
        obtained_marks: f64,
        available_marks: f64,
    ) -> Self {
        Self {
            student_number,
            first_name,
            last_name,
            obtained_marks,
            available_marks,
        }
    }
}

impl From<&RawEntry> for StudentRecord {
    fn from(entry: &RawEntry) -> Self {
        Self {
            student_number: entry.student_number.clone(),
            first_name: entry.first_name.clone(),
            last_name: entry.last_name.clone(),
            obtained_marks: entry.obtained_marks,
            available_marks: entry.available_marks,
        }
    }
}

/// Fields extracted from a single `mcq-test-result` element.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub test_id: String,
    pub student_number: String,
    pub first_name: String,
    pub last_name: String,
    pub obtained_marks: f64,
    pub available_marks: f64,
    pub scanned_on: NaiveDate,
}

/// All entries of one submitted document that share a test id.
#[derive(Debug, Clone)]
pub struct ResultBatch {
    pub test_id: String,
    pub scanned_on: NaiveDate,
    pub entries: Vec<RawEntry>,
}

impl ResultBatch {
    pub fn new(first: RawEntry) -> Self {
        Self {
            test_id: first.test_id.clone(),
            scanned_on: first.scanned_on,
            entries: vec![first],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub mean: f64,
    pub count: usize,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
}

impl Default for AggregateResult {
    fn default() -> Self {
        Self {
            mean: 0.0,
            count: 0,
            p25: 0.0,
            p50: 0.0,
            p75: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub test_id: String,
    pub entries_read: usize,
    pub students_stored: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "test {}: {} entries read, {} students stored",
            self.test_id, self.entries_read, self.students_stored
        )
    }
}
