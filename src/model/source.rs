use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::core::{Document, ModelState};
use crate::dispatch::{
    DispatchHandler, Dispatcher, Message, ModelInfo, ModelParameters, ModelType, Request, Response,
    Topic,
};

use super::handle::ModelHandle;

/// In-memory document model feeding a pipeline.
///
/// Every mutation is broadcast as a `ModelStateUpdated` delta.
#[derive(Debug)]
pub struct DocumentSource {
    model_id: String,
    dispatcher: Dispatcher,
    documents: IndexMap<String, Document>,
    loading: bool,
}

impl DocumentSource {
    #[must_use]
    pub fn new(dispatcher: &Dispatcher, model_id: &str) -> Self {
        Self {
            model_id: model_id.to_owned(),
            dispatcher: dispatcher.clone(),
            documents: IndexMap::new(),
            loading: false,
        }
    }

    pub fn create(dispatcher: &Dispatcher, model_id: &str) -> ModelHandle<Self> {
        ModelHandle::install(dispatcher, Self::new(dispatcher, model_id))
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[must_use]
    pub fn get(&self, doc_id: &str) -> Option<&Document> {
        self.documents.get(doc_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn state(&self) -> ModelState {
        ModelState::snapshot(self.documents.values().cloned().collect(), self.loading)
    }

    /// Stores new documents. Known ids are replaced and reported as updated.
    pub fn add_documents(&mut self, documents: impl IntoIterator<Item = Document>) {
        let mut state = ModelState {
            loading: self.loading,
            ..ModelState::default()
        };
        for document in documents {
            match self
                .documents
                .insert(document.id().to_owned(), document.clone())
            {
                Some(_) => state.updated.push(document),
                None => state.added.push(document),
            }
        }
        self.publish(state);
    }

    /// Replaces documents. Unknown ids are stored and reported as added.
    pub fn update_documents(&mut self, documents: impl IntoIterator<Item = Document>) {
        self.add_documents(documents);
    }

    /// Drops documents by id; unknown ids are ignored.
    pub fn remove_documents<I, S>(&mut self, doc_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = ModelState {
            loading: self.loading,
            ..ModelState::default()
        };
        for doc_id in doc_ids {
            match self.documents.shift_remove(doc_id.as_ref()) {
                Some(document) => state.removed.push(document),
                None => warn!(model_id = %self.model_id, doc_id = doc_id.as_ref(), "unknown document"),
            }
        }
        self.publish(state);
    }

    pub fn set_loading(&mut self, loading: bool) {
        if self.loading == loading {
            return;
        }
        self.loading = loading;
        self.publish(ModelState {
            loading,
            ..ModelState::default()
        });
    }

    fn publish(&self, state: ModelState) {
        debug!(
            model_id = %self.model_id,
            changes = state.change_count(),
            loading = state.loading,
            "source state updated"
        );
        self.dispatcher.send(Message::ModelStateUpdated {
            model_id: self.model_id.clone(),
            state,
        });
    }
}

impl DispatchHandler for DocumentSource {
    fn topics(&self) -> Vec<Topic> {
        vec![Topic::ModelGetInfo, Topic::ModelGetState]
    }

    fn handle(&mut self, _message: &Message) {}

    fn respond(&self, request: &Request) -> Option<Response> {
        match request {
            Request::ModelGetInfo { model_id } if *model_id == self.model_id => {
                Some(Response::ModelInfo(ModelInfo {
                    model_id: self.model_id.clone(),
                    model_type: ModelType::DocumentSource,
                    parameters: ModelParameters::default(),
                }))
            }
            Request::ModelGetState { model_id } if *model_id == self.model_id => {
                Some(Response::ModelState(self.state()))
            }
            _ => None,
        }
    }
}
