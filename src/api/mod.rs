//! Configuration-driven model creation.

mod model_config;
mod model_factory;

pub use model_config::{
    ModelCreateRequest, NoTimeFilterConfig, TimeFilterConfig, TimeSynchronizeConfig,
    TransformConfig,
};
pub use model_factory::{SUPPORTED_MODEL_TYPES, TimeModel, create_model};
