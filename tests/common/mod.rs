#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use time_models::core::{DateInterval, Document, ModelState};
use time_models::dispatch::{DispatchHandler, Dispatcher, Message, Request, Response, Topic};

pub fn ms(year: i32, month: u32, day: u32) -> i64 {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("valid date")
        .timestamp_millis()
}

pub fn interval(min: i64, max: i64) -> DateInterval {
    DateInterval::new(min, max).expect("valid interval")
}

pub fn date_structure(date: &str) -> Value {
    json!({ "nunaliit_type": "date", "date": date })
}

/// Document with a single date structure under `when`.
pub fn dated_doc(id: &str, date: &str) -> Document {
    Document::new(json!({ "_id": id, "when": date_structure(date) })).expect("document")
}

pub fn plain_doc(id: &str) -> Document {
    Document::new(json!({ "_id": id, "title": id })).expect("document")
}

pub fn doc(body: Value) -> Document {
    Document::new(body).expect("document")
}

pub fn ids(documents: &[Document]) -> Vec<String> {
    documents.iter().map(|doc| doc.id().to_owned()).collect()
}

/// Records the deltas broadcast by one model.
pub struct StateRecorder {
    model_id: String,
    states: Rc<RefCell<Vec<ModelState>>>,
}

impl DispatchHandler for StateRecorder {
    fn topics(&self) -> Vec<Topic> {
        vec![Topic::ModelStateUpdated]
    }

    fn handle(&mut self, message: &Message) {
        if let Message::ModelStateUpdated { model_id, state } = message {
            if *model_id == self.model_id {
                self.states.borrow_mut().push(state.clone());
            }
        }
    }

    fn respond(&self, _request: &Request) -> Option<Response> {
        None
    }
}

pub type Recorder<T> = (Rc<RefCell<dyn DispatchHandler>>, Rc<RefCell<Vec<T>>>);

/// Keep the returned handler alive for as long as recording is needed.
pub fn record_states(dispatcher: &Dispatcher, model_id: &str) -> Recorder<ModelState> {
    let states = Rc::new(RefCell::new(Vec::new()));
    let handler: Rc<RefCell<dyn DispatchHandler>> = Rc::new(RefCell::new(StateRecorder {
        model_id: model_id.to_owned(),
        states: states.clone(),
    }));
    dispatcher.register_handler(&handler);
    (handler, states)
}

/// Records `(event, value)` for parameter broadcasts on the given events.
pub struct ParameterRecorder {
    events: Vec<String>,
    log: Rc<RefCell<Vec<(String, Option<DateInterval>)>>>,
}

impl DispatchHandler for ParameterRecorder {
    fn topics(&self) -> Vec<Topic> {
        self.events
            .iter()
            .map(|event| Topic::Parameter(event.clone()))
            .collect()
    }

    fn handle(&mut self, message: &Message) {
        match message {
            Message::ParameterChanged { event, value, .. }
            | Message::SetParameter { event, value } => {
                self.log.borrow_mut().push((event.clone(), *value));
            }
            Message::ModelStateUpdated { .. } => {}
        }
    }

    fn respond(&self, _request: &Request) -> Option<Response> {
        None
    }
}

pub fn record_parameters(
    dispatcher: &Dispatcher,
    events: &[&str],
) -> Recorder<(String, Option<DateInterval>)> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let handler: Rc<RefCell<dyn DispatchHandler>> = Rc::new(RefCell::new(ParameterRecorder {
        events: events.iter().map(|event| (*event).to_owned()).collect(),
        log: log.clone(),
    }));
    dispatcher.register_handler(&handler);
    (handler, log)
}
