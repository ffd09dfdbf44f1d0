use std::collections::BTreeMap;

use crate::record::{RawEntry, StudentRecord};

/// Fold `entries` into `existing`, keeping each student's best score.
///
/// A student seen for the first time gets a record built from the entry as-is.
/// A known student only changes when the entry's obtained marks are strictly
/// greater, in which case obtained and available marks are replaced together.
/// Names are never revised. The returned map is the complete set for the test
/// and is meant to replace what the store held.
pub fn merge(
    existing: BTreeMap<String, StudentRecord>,
    entries: &[RawEntry],
) -> BTreeMap<String, StudentRecord> {
    let mut merged = existing;
    for entry in entries {
        match merged.get_mut(&entry.student_number) {
            Some(record) => {
                if entry.obtained_marks > record.obtained_marks {
                    record.obtained_marks = entry.obtained_marks;
                    record.available_marks = entry.available_marks;
                }
            }
            None => {
                merged.insert(entry.student_number.clone(), StudentRecord::from(entry));
            }
        }
    }
    merged
}
