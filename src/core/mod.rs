pub mod date_interval;
pub mod date_parse;
pub mod document;
pub mod extraction;
pub mod selector;

pub use date_interval::{DateInterval, union_extent};
pub use date_parse::parse_user_date;
pub use document::{DOCUMENT_ID_FIELD, DeltaBuilder, Document, ModelState};
pub use extraction::{
    DatedReference, Intervals, date_intervals, dated_references, document_intervals,
    is_date_structure, is_dated_reference, parse_date_structure,
};
pub use selector::{ObjectSelector, find_selectors};
