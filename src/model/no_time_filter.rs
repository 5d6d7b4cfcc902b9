use tracing::debug;

use crate::core::{DeltaBuilder, Document, ModelState, document_intervals};
use crate::dispatch::{
    DispatchHandler, Dispatcher, Message, ModelInfo, ModelParameters, ModelType, Request, Response,
    Topic,
};

use super::handle::ModelHandle;
use super::reporter::StateReporter;
use super::time_interval::current_millis;
use super::visibility::VisibilityTable;

/// Passes on only the documents that carry no date at all.
///
/// Has no range or interval; the time window never affects it.
#[derive(Debug)]
pub struct NoTimeFilter {
    dispatcher: Dispatcher,
    source_model_id: String,
    now: i64,
    docs: VisibilityTable,
    reporter: StateReporter,
}

impl NoTimeFilter {
    #[must_use]
    pub fn new(dispatcher: &Dispatcher, model_id: &str, source_model_id: impl Into<String>) -> Self {
        let source_model_id = source_model_id.into();
        debug!(model_id, source_model_id = %source_model_id, "no-time filter created");
        Self {
            dispatcher: dispatcher.clone(),
            source_model_id,
            now: current_millis(),
            docs: VisibilityTable::default(),
            reporter: StateReporter::new(dispatcher, model_id),
        }
    }

    /// Registers a filter and loads the current state of its source.
    pub fn create(
        dispatcher: &Dispatcher,
        model_id: &str,
        source_model_id: impl Into<String>,
    ) -> ModelHandle<Self> {
        let handle = ModelHandle::install(
            dispatcher,
            Self::new(dispatcher, model_id, source_model_id),
        );
        handle.update(|filter| {
            if let Some(state) = filter.dispatcher.model_state(&filter.source_model_id) {
                filter.source_updated(&state);
            }
        });
        handle
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        self.reporter.model_id()
    }

    #[must_use]
    pub fn source_model_id(&self) -> &str {
        &self.source_model_id
    }

    #[must_use]
    pub fn is_visible(&self, doc_id: &str) -> Option<bool> {
        self.docs.get(doc_id).map(|entry| entry.visible)
    }

    #[must_use]
    pub fn visible_documents(&self) -> Vec<Document> {
        self.docs.visible_documents()
    }

    #[must_use]
    pub fn state(&self) -> ModelState {
        ModelState::snapshot(self.docs.visible_documents(), self.reporter.loading())
    }

    #[must_use]
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            model_id: self.model_id().to_owned(),
            model_type: ModelType::NoTimeFilter,
            parameters: ModelParameters::default(),
        }
    }

    fn source_updated(&mut self, state: &ModelState) {
        self.reporter.observe_loading(state.loading);

        let mut delta = DeltaBuilder::new();
        for doc in state.added.iter().chain(&state.updated) {
            let intervals = document_intervals(doc.body(), self.now);
            let visible = intervals.is_empty();
            self.docs.upsert(doc, intervals, visible, &mut delta);
        }
        for doc in &state.removed {
            self.docs.remove(doc, &mut delta);
        }
        self.reporter.publish(delta);
    }
}

impl DispatchHandler for NoTimeFilter {
    fn topics(&self) -> Vec<Topic> {
        vec![
            Topic::ModelGetInfo,
            Topic::ModelGetState,
            Topic::ModelStateUpdated,
        ]
    }

    fn handle(&mut self, message: &Message) {
        if let Message::ModelStateUpdated { model_id, state } = message {
            if *model_id == self.source_model_id {
                self.source_updated(state);
            }
        }
    }

    fn respond(&self, request: &Request) -> Option<Response> {
        match request {
            Request::ModelGetInfo { model_id } if model_id == self.model_id() => {
                Some(Response::ModelInfo(self.info()))
            }
            Request::ModelGetState { model_id } if model_id == self.model_id() => {
                Some(Response::ModelState(self.state()))
            }
            _ => None,
        }
    }
}
