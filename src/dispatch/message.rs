use std::fmt;

use serde::Serialize;

use crate::core::{DateInterval, ModelState};

/// Routing key for handlers registered on the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    ModelGetInfo,
    ModelGetState,
    ModelStateUpdated,
    /// Dynamically named parameter event, e.g. `filter_interval_set_event`.
    Parameter(String),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelGetInfo => f.write_str("modelGetInfo"),
            Self::ModelGetState => f.write_str("modelGetState"),
            Self::ModelStateUpdated => f.write_str("modelStateUpdated"),
            Self::Parameter(event) => f.write_str(event),
        }
    }
}

/// Fire-and-forget broadcast.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Message {
    /// A model reports a change of its visible documents.
    ModelStateUpdated { model_id: String, state: ModelState },
    /// A parameter value changed; `event` is the parameter's change event.
    ParameterChanged {
        event: String,
        parameter_id: String,
        value: Option<DateInterval>,
    },
    /// Request to assign a parameter; `event` is the parameter's set event.
    SetParameter {
        event: String,
        value: Option<DateInterval>,
    },
}

impl Message {
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            Self::ModelStateUpdated { .. } => Topic::ModelStateUpdated,
            Self::ParameterChanged { event, .. } | Self::SetParameter { event, .. } => {
                Topic::Parameter(event.clone())
            }
        }
    }
}

/// Synchronous query answered by at most one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ModelGetInfo { model_id: String },
    ModelGetState { model_id: String },
    /// `event` is the parameter's get event.
    GetParameter { event: String },
}

impl Request {
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            Self::ModelGetInfo { .. } => Topic::ModelGetInfo,
            Self::ModelGetState { .. } => Topic::ModelGetState,
            Self::GetParameter { event } => Topic::Parameter(event.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    ModelInfo(ModelInfo),
    ModelState(ModelState),
    ParameterValue(Option<DateInterval>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModelType {
    DocumentSource,
    TimeFilter,
    NoTimeFilter,
    TimeTransform,
    DatedReferenceTransform,
    TimeSynchronize,
}

impl ModelType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocumentSource => "documentSource",
            Self::TimeFilter => "timeFilter",
            Self::NoTimeFilter => "noTimeFilter",
            Self::TimeTransform => "timeTransform",
            Self::DatedReferenceTransform => "datedReferenceTransform",
            Self::TimeSynchronize => "timeSynchronize",
        }
    }
}

/// Answer to `ModelGetInfo`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub model_id: String,
    pub model_type: ModelType,
    pub parameters: ModelParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<ParameterInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<ParameterInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterType {
    DateInterval,
}

/// Description of a dispatch-bound parameter and its current value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterInfo {
    pub parameter_id: String,
    #[serde(rename = "type")]
    pub parameter_type: ParameterType,
    pub name: String,
    pub label: String,
    pub set_event: String,
    pub get_event: String,
    pub change_event: String,
    pub value: Option<DateInterval>,
}
