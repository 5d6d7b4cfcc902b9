//! time-models: incremental, time-aware document models.
//!
//! Documents flow from a source model through filter and transform stages.
//! Each stage keeps its own per-document state and republishes only deltas,
//! while sharing an adjustable time window through range and interval
//! parameters on a synchronous dispatch bus.

pub mod api;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod telemetry;

pub use api::{ModelCreateRequest, TimeModel, create_model};
pub use crate::core::{DateInterval, Document, ModelState, ObjectSelector};
pub use dispatch::{Dispatcher, Message, Request, Response, Topic};
pub use error::{ModelError, ModelResult};
pub use model::{
    DatedReferenceTransform, DocumentSource, ModelHandle, NoTimeFilter, TimeFilter,
    TimeReactive, TimeSynchronize, TimeTransform,
};
