use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{DateInterval, ObjectSelector, parse_user_date};
use crate::error::{ModelError, ModelResult};
use crate::model::{
    DatedReferenceOptions, TimeFilterOptions, TimeSynchronizeOptions, TimeTransformOptions,
};

/// Request to build a model, as found in application configuration.
///
/// `model_options` is decoded according to `model_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCreateRequest {
    pub model_id: String,
    pub model_type: String,
    #[serde(default)]
    pub model_options: Value,
}

impl ModelCreateRequest {
    #[must_use]
    pub fn new(model_id: impl Into<String>, model_type: impl Into<String>, options: Value) -> Self {
        Self {
            model_id: model_id.into(),
            model_type: model_type.into(),
            model_options: options,
        }
    }

    /// Parses a request from its JSON text form.
    pub fn from_json_str(input: &str) -> ModelResult<Self> {
        let request = serde_json::from_str(input)?;
        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeFilterConfig {
    pub source_model_id: String,
    #[serde(default)]
    pub selectors: Option<Vec<String>>,
    #[serde(default)]
    pub allow_no_date: bool,
    #[serde(default)]
    pub range: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoTimeFilterConfig {
    pub source_model_id: String,
}

/// Shared by `timeTransform` and `datedReferenceTransform`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformConfig {
    pub source_model_id: String,
    #[serde(default)]
    pub range: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSynchronizeConfig {
    pub source_model_ids: Vec<String>,
}

impl TimeFilterConfig {
    pub fn into_options(self) -> ModelResult<TimeFilterOptions> {
        let mut options = TimeFilterOptions::new(self.source_model_id)
            .with_allow_no_date(self.allow_no_date);
        if let Some(selectors) = self.selectors {
            let selectors = selectors
                .iter()
                .map(|selector| ObjectSelector::parse(selector).map_err(invalid_config))
                .collect::<ModelResult<Vec<_>>>()?;
            options = options.with_selectors(selectors);
        }
        if let Some(range) = parse_range(self.range.as_deref())? {
            options = options.with_range(range);
        }
        Ok(options)
    }
}

impl TransformConfig {
    pub fn into_time_transform_options(self) -> ModelResult<TimeTransformOptions> {
        let options = TimeTransformOptions::new(self.source_model_id);
        Ok(match parse_range(self.range.as_deref())? {
            Some(range) => options.with_range(range),
            None => options,
        })
    }

    pub fn into_dated_reference_options(self) -> ModelResult<DatedReferenceOptions> {
        let options = DatedReferenceOptions::new(self.source_model_id);
        Ok(match parse_range(self.range.as_deref())? {
            Some(range) => options.with_range(range),
            None => options,
        })
    }
}

impl TimeSynchronizeConfig {
    pub fn into_options(self) -> ModelResult<TimeSynchronizeOptions> {
        if self.source_model_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(ModelError::InvalidConfig(
                "sourceModelIds must not contain empty identifiers".to_owned(),
            ));
        }
        Ok(TimeSynchronizeOptions::new(self.source_model_ids))
    }
}

/// Decodes the options object of one model type.
pub(crate) fn decode_options<T: DeserializeOwned>(
    model_type: &str,
    options: &Value,
) -> ModelResult<T> {
    serde_json::from_value(options.clone())
        .map_err(|err| ModelError::InvalidConfig(format!("{model_type} options: {err}")))
}

fn parse_range(range: Option<&str>) -> ModelResult<Option<DateInterval>> {
    range
        .map(|range| parse_user_date(range).map_err(invalid_config))
        .transpose()
}

fn invalid_config(err: ModelError) -> ModelError {
    ModelError::InvalidConfig(err.to_string())
}
