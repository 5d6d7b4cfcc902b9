use crate::core::DateInterval;

use super::{Dispatcher, Message, ParameterInfo, ParameterType, Topic};

/// A named `dateInterval` value of a model, exposed on the dispatcher.
///
/// Event names derive from the parameter id, `{model_id}_{name}`:
/// `{parameter_id}_set_event`, `_get_event` and `_change_event`.
#[derive(Debug, Clone)]
pub struct ModelParameter {
    parameter_id: String,
    name: String,
    label: String,
    set_event: String,
    get_event: String,
    change_event: String,
    dispatcher: Dispatcher,
}

impl ModelParameter {
    #[must_use]
    pub fn new(dispatcher: &Dispatcher, model_id: &str, name: &str, label: &str) -> Self {
        let parameter_id = format!("{model_id}_{name}");
        Self {
            set_event: format!("{parameter_id}_set_event"),
            get_event: format!("{parameter_id}_get_event"),
            change_event: format!("{parameter_id}_change_event"),
            parameter_id,
            name: name.to_owned(),
            label: label.to_owned(),
            dispatcher: dispatcher.clone(),
        }
    }

    #[must_use]
    pub fn parameter_id(&self) -> &str {
        &self.parameter_id
    }

    #[must_use]
    pub fn set_event(&self) -> &str {
        &self.set_event
    }

    #[must_use]
    pub fn get_event(&self) -> &str {
        &self.get_event
    }

    #[must_use]
    pub fn change_event(&self) -> &str {
        &self.change_event
    }

    /// Topics the owning model must register to serve this parameter.
    #[must_use]
    pub fn topics(&self) -> [Topic; 2] {
        [
            Topic::Parameter(self.set_event.clone()),
            Topic::Parameter(self.get_event.clone()),
        ]
    }

    #[must_use]
    pub fn info(&self, value: Option<DateInterval>) -> ParameterInfo {
        ParameterInfo {
            parameter_id: self.parameter_id.clone(),
            parameter_type: ParameterType::DateInterval,
            name: self.name.clone(),
            label: self.label.clone(),
            set_event: self.set_event.clone(),
            get_event: self.get_event.clone(),
            change_event: self.change_event.clone(),
            value,
        }
    }

    /// Broadcasts the new value on the change event.
    pub fn send_update(&self, value: Option<DateInterval>) {
        self.dispatcher.send(Message::ParameterChanged {
            event: self.change_event.clone(),
            parameter_id: self.parameter_id.clone(),
            value,
        });
    }
}
