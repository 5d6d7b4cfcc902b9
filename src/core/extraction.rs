//! Locating date structures and dated references inside documents.

use serde_json::Value;
use smallvec::SmallVec;
use tracing::trace;

use crate::core::selector::find_selectors;
use crate::core::{DateInterval, ObjectSelector, parse_user_date};

/// Field naming the structure type of an embedded object.
pub const TYPE_FIELD: &str = "nunaliit_type";
pub const DATE_TYPE: &str = "date";
pub const REFERENCE_TYPE: &str = "reference";
pub const DATE_FIELD: &str = "date";

/// Intervals extracted from one document. Most documents carry zero to two.
pub type Intervals = SmallVec<[DateInterval; 2]>;

/// `{nunaliit_type: "date", date: <string>}`
#[must_use]
pub fn is_date_structure(value: &Value) -> bool {
    value.get(TYPE_FIELD).and_then(Value::as_str) == Some(DATE_TYPE)
        && value.get(DATE_FIELD).is_some_and(Value::is_string)
}

/// `{nunaliit_type: "reference", date: {nunaliit_type: "date", ...}}`
#[must_use]
pub fn is_dated_reference(value: &Value) -> bool {
    value.get(TYPE_FIELD).and_then(Value::as_str) == Some(REFERENCE_TYPE)
        && value
            .get(DATE_FIELD)
            .and_then(|date| date.get(TYPE_FIELD))
            .and_then(Value::as_str)
            == Some(DATE_TYPE)
}

/// Parses a date structure. Anything malformed yields `None`.
#[must_use]
pub fn parse_date_structure(value: &Value) -> Option<DateInterval> {
    if !is_date_structure(value) {
        return None;
    }
    let text = value.get(DATE_FIELD).and_then(Value::as_str)?;
    match parse_user_date(text) {
        Ok(interval) => Some(interval),
        Err(err) => {
            trace!(error = %err, "ignoring unparseable date structure");
            None
        }
    }
}

/// Every date structure found under `selectors`, resolved at `now`.
#[must_use]
pub fn date_intervals(document: &Value, selectors: &[ObjectSelector], now: i64) -> Intervals {
    let mut intervals = Intervals::new();
    for selector in selectors {
        selector.traverse(document, |value, _| {
            if let Some(interval) = parse_date_structure(value) {
                intervals.push(interval.resolved(now));
            }
        });
    }
    intervals
}

/// Every date structure anywhere in `document`, resolved at `now`.
#[must_use]
pub fn document_intervals(document: &Value, now: i64) -> Intervals {
    date_intervals(document, &[ObjectSelector::root()], now)
}

/// A dated reference found in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedReference {
    pub selector: ObjectSelector,
    pub interval: DateInterval,
}

/// Every dated reference in `document` whose date parses, resolved at `now`.
#[must_use]
pub fn dated_references(document: &Value, now: i64) -> Vec<DatedReference> {
    find_selectors(document, is_dated_reference)
        .into_iter()
        .filter_map(|selector| {
            let reference = selector.get_value(document)?;
            let interval = parse_date_structure(reference.get(DATE_FIELD)?)?;
            Some(DatedReference {
                selector,
                interval: interval.resolved(now),
            })
        })
        .collect()
}
