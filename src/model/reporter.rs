use tracing::debug;

use crate::core::DeltaBuilder;
use crate::dispatch::{Dispatcher, Message};

/// Publishes a stage's deltas as `ModelStateUpdated` broadcasts.
///
/// Empty deltas are dropped unless the loading flag changed since the last
/// publication.
#[derive(Debug)]
pub(crate) struct StateReporter {
    model_id: String,
    dispatcher: Dispatcher,
    loading: bool,
    reported_loading: bool,
}

impl StateReporter {
    pub(crate) fn new(dispatcher: &Dispatcher, model_id: &str) -> Self {
        Self {
            model_id: model_id.to_owned(),
            dispatcher: dispatcher.clone(),
            loading: false,
            reported_loading: false,
        }
    }

    pub(crate) fn model_id(&self) -> &str {
        &self.model_id
    }

    pub(crate) fn loading(&self) -> bool {
        self.loading
    }

    /// Adopts the upstream loading flag.
    pub(crate) fn observe_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Returns `true` when a broadcast was queued.
    pub(crate) fn publish(&mut self, delta: DeltaBuilder) -> bool {
        if delta.is_empty() && self.loading == self.reported_loading {
            return false;
        }
        self.reported_loading = self.loading;

        let state = delta.finish(self.loading);
        debug!(
            model_id = %self.model_id,
            added = state.added.len(),
            updated = state.updated.len(),
            removed = state.removed.len(),
            loading = state.loading,
            "publishing state update"
        );
        self.dispatcher.send(Message::ModelStateUpdated {
            model_id: self.model_id.clone(),
            state,
        });
        true
    }
}
