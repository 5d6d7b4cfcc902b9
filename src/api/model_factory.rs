use tracing::debug;

use crate::dispatch::{Dispatcher, ModelType};
use crate::error::ModelResult;
use crate::model::{
    DatedReferenceTransform, ModelHandle, NoTimeFilter, TimeFilter, TimeSynchronize,
    TimeTransform,
};

use super::model_config::{
    ModelCreateRequest, NoTimeFilterConfig, TimeFilterConfig, TimeSynchronizeConfig,
    TransformConfig, decode_options,
};

/// A stage created from configuration.
#[derive(Clone)]
pub enum TimeModel {
    TimeFilter(ModelHandle<TimeFilter>),
    NoTimeFilter(ModelHandle<NoTimeFilter>),
    TimeTransform(ModelHandle<TimeTransform>),
    DatedReferenceTransform(ModelHandle<DatedReferenceTransform>),
    TimeSynchronize(ModelHandle<TimeSynchronize>),
}

impl TimeModel {
    #[must_use]
    pub fn model_type(&self) -> ModelType {
        match self {
            Self::TimeFilter(_) => ModelType::TimeFilter,
            Self::NoTimeFilter(_) => ModelType::NoTimeFilter,
            Self::TimeTransform(_) => ModelType::TimeTransform,
            Self::DatedReferenceTransform(_) => ModelType::DatedReferenceTransform,
            Self::TimeSynchronize(_) => ModelType::TimeSynchronize,
        }
    }

    #[must_use]
    pub fn model_id(&self) -> String {
        match self {
            Self::TimeFilter(handle) => handle.borrow().model_id().to_owned(),
            Self::NoTimeFilter(handle) => handle.borrow().model_id().to_owned(),
            Self::TimeTransform(handle) => handle.borrow().model_id().to_owned(),
            Self::DatedReferenceTransform(handle) => handle.borrow().model_id().to_owned(),
            Self::TimeSynchronize(handle) => handle.borrow().model_id().to_owned(),
        }
    }
}

/// Model types this crate can build.
pub const SUPPORTED_MODEL_TYPES: [ModelType; 5] = [
    ModelType::TimeFilter,
    ModelType::NoTimeFilter,
    ModelType::TimeTransform,
    ModelType::DatedReferenceTransform,
    ModelType::TimeSynchronize,
];

/// Builds and registers the model described by `request`.
///
/// Returns `Ok(None)` when `model_type` is not one of ours, leaving the
/// request to another factory.
pub fn create_model(
    dispatcher: &Dispatcher,
    request: &ModelCreateRequest,
) -> ModelResult<Option<TimeModel>> {
    let Some(model_type) = SUPPORTED_MODEL_TYPES
        .into_iter()
        .find(|candidate| candidate.as_str() == request.model_type)
    else {
        debug!(model_type = %request.model_type, "model type not handled here");
        return Ok(None);
    };

    let model_id = request.model_id.as_str();
    let options = &request.model_options;
    let kind = model_type.as_str();
    debug!(model_id, model_type = kind, "creating model");

    let model = match model_type {
        ModelType::TimeFilter => {
            let config: TimeFilterConfig = decode_options(kind, options)?;
            TimeModel::TimeFilter(TimeFilter::create(dispatcher, model_id, config.into_options()?))
        }
        ModelType::NoTimeFilter => {
            let config: NoTimeFilterConfig = decode_options(kind, options)?;
            TimeModel::NoTimeFilter(NoTimeFilter::create(
                dispatcher,
                model_id,
                config.source_model_id,
            ))
        }
        ModelType::TimeTransform => {
            let config: TransformConfig = decode_options(kind, options)?;
            TimeModel::TimeTransform(TimeTransform::create(
                dispatcher,
                model_id,
                config.into_time_transform_options()?,
            ))
        }
        ModelType::DatedReferenceTransform => {
            let config: TransformConfig = decode_options(kind, options)?;
            TimeModel::DatedReferenceTransform(DatedReferenceTransform::create(
                dispatcher,
                model_id,
                config.into_dated_reference_options()?,
            ))
        }
        ModelType::TimeSynchronize => {
            let config: TimeSynchronizeConfig = decode_options(kind, options)?;
            TimeModel::TimeSynchronize(TimeSynchronize::create(
                dispatcher,
                model_id,
                config.into_options()?,
            ))
        }
        ModelType::DocumentSource => return Ok(None),
    };
    Ok(Some(model))
}
