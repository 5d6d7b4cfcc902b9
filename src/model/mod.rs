//! Document models: the in-memory source and the time-aware stages.
//!
//! Stages are created through their `create` constructors, which register
//! them on a dispatcher and return the owning `ModelHandle`.

mod dated_reference;
mod handle;
mod no_time_filter;
mod reporter;
mod source;
mod time_filter;
mod time_interval;
mod time_synchronize;
mod time_transform;
mod visibility;

pub use dated_reference::{DatedReferenceOptions, DatedReferenceTransform, ReferenceState};
pub use handle::ModelHandle;
pub use no_time_filter::NoTimeFilter;
pub use source::DocumentSource;
pub use time_filter::{TimeFilter, TimeFilterOptions};
pub use time_interval::{
    INTERVAL_LABEL, RANGE_LABEL, TimeIntervalModel, TimeReactive, current_millis,
};
pub use time_synchronize::{TimeSynchronize, TimeSynchronizeOptions};
pub use time_transform::{TIME_TRANSFORM_FIELD, TimeTag, TimeTransform, TimeTransformOptions};
