use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::core::{
    DateInterval, DeltaBuilder, Document, ModelState, ObjectSelector, dated_references,
    union_extent,
};
use crate::dispatch::{DispatchHandler, Dispatcher, Message, ModelType, Request, Response, Topic};

use super::handle::ModelHandle;
use super::reporter::StateReporter;
use super::time_interval::{TimeIntervalModel, TimeReactive};

/// Construction options of a `DatedReferenceTransform`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatedReferenceOptions {
    pub source_model_id: String,
    pub range: Option<DateInterval>,
    pub now: Option<i64>,
}

impl DatedReferenceOptions {
    #[must_use]
    pub fn new(source_model_id: impl Into<String>) -> Self {
        Self {
            source_model_id: source_model_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_range(mut self, range: DateInterval) -> Self {
        self.range = Some(range);
        self
    }

    #[must_use]
    pub fn with_now(mut self, now: i64) -> Self {
        self.now = Some(now);
        self
    }
}

/// A dated reference inside a tracked document and its last visibility.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceState {
    pub interval: DateInterval,
    pub selector: ObjectSelector,
    pub visible: bool,
}

#[derive(Debug, Clone)]
struct RedactedEntry {
    doc: Document,
    source: Document,
    references: Vec<ReferenceState>,
}

/// Replaces with `null` every dated reference whose date misses the current
/// interval.
#[derive(Debug)]
pub struct DatedReferenceTransform {
    time: TimeIntervalModel,
    dispatcher: Dispatcher,
    source_model_id: String,
    docs: IndexMap<String, RedactedEntry>,
    reporter: StateReporter,
}

impl DatedReferenceTransform {
    #[must_use]
    pub fn new(dispatcher: &Dispatcher, model_id: &str, options: DatedReferenceOptions) -> Self {
        Self {
            time: TimeIntervalModel::new(
                dispatcher,
                model_id,
                ModelType::DatedReferenceTransform,
                options.range,
                options.now,
            ),
            dispatcher: dispatcher.clone(),
            source_model_id: options.source_model_id,
            docs: IndexMap::new(),
            reporter: StateReporter::new(dispatcher, model_id),
        }
    }

    /// Registers a transform and loads the current state of its source.
    pub fn create(
        dispatcher: &Dispatcher,
        model_id: &str,
        options: DatedReferenceOptions,
    ) -> ModelHandle<Self> {
        let handle = ModelHandle::install(dispatcher, Self::new(dispatcher, model_id, options));
        handle.update(|transform| {
            if let Some(state) = transform.dispatcher.model_state(&transform.source_model_id) {
                transform.source_updated(&state);
            }
        });
        handle
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        self.time.model_id()
    }

    #[must_use]
    pub fn source_model_id(&self) -> &str {
        &self.source_model_id
    }

    /// Redacted version of a tracked document.
    #[must_use]
    pub fn document(&self, doc_id: &str) -> Option<&Document> {
        self.docs.get(doc_id).map(|entry| &entry.doc)
    }

    #[must_use]
    pub fn references(&self, doc_id: &str) -> Option<&[ReferenceState]> {
        self.docs
            .get(doc_id)
            .map(|entry| entry.references.as_slice())
    }

    #[must_use]
    pub fn state(&self) -> ModelState {
        let documents = self.docs.values().map(|entry| entry.doc.clone()).collect();
        ModelState::snapshot(documents, self.reporter.loading())
    }

    fn reference_states(&self, source: &Document) -> Vec<ReferenceState> {
        let now = self.time.now();
        let filter = self.time.interval();
        dated_references(source.body(), now)
            .into_iter()
            .map(|reference| ReferenceState {
                visible: filter.is_some_and(|filter| filter.intersects_with(reference.interval, now)),
                interval: reference.interval,
                selector: reference.selector,
            })
            .collect()
    }

    fn source_updated(&mut self, state: &ModelState) {
        self.reporter.observe_loading(state.loading);

        let mut delta = DeltaBuilder::new();
        for source in state.added.iter().chain(&state.updated) {
            let references = self.reference_states(source);
            let doc = redacted(source, &references);
            let entry = RedactedEntry {
                doc: doc.clone(),
                source: source.clone(),
                references,
            };
            match self.docs.insert(source.id().to_owned(), entry) {
                None => delta.add(doc),
                Some(previous) if previous.doc == doc => {}
                Some(_) => delta.update(doc),
            }
        }
        for source in &state.removed {
            if self.docs.shift_remove(source.id()).is_some() {
                delta.remove(source.clone());
            }
        }
        self.reporter.publish(delta);

        let extent = union_extent(
            self.docs
                .values()
                .flat_map(|entry| entry.references.iter().map(|reference| &reference.interval)),
            self.time.now(),
        );
        self.refresh_auto_range(extent);
    }
}

/// Deep copy of `source` with every invisible reference set to `null`.
fn redacted(source: &Document, references: &[ReferenceState]) -> Document {
    if references.iter().all(|reference| reference.visible) {
        return source.clone();
    }
    let mut body = source.body().clone();
    for reference in references.iter().filter(|reference| !reference.visible) {
        reference.selector.set_value(&mut body, Value::Null);
    }
    source.derive(body)
}

impl TimeReactive for DatedReferenceTransform {
    fn time_model(&self) -> &TimeIntervalModel {
        &self.time
    }

    fn time_model_mut(&mut self) -> &mut TimeIntervalModel {
        &mut self.time
    }

    fn on_interval_changed(&mut self) {
        let now = self.time.now();
        let filter = self.time.interval();
        debug!(model_id = %self.time.model_id(), ?filter, "re-evaluating dated references");

        let mut delta = DeltaBuilder::new();
        for entry in self.docs.values_mut() {
            let mut flipped = false;
            for reference in &mut entry.references {
                let visible =
                    filter.is_some_and(|filter| filter.intersects_with(reference.interval, now));
                if visible != reference.visible {
                    reference.visible = visible;
                    flipped = true;
                }
            }
            if flipped {
                entry.doc = redacted(&entry.source, &entry.references);
                delta.update(entry.doc.clone());
            }
        }
        self.reporter.publish(delta);
    }
}

impl DispatchHandler for DatedReferenceTransform {
    fn topics(&self) -> Vec<Topic> {
        let mut topics = self.time.topics();
        topics.push(Topic::ModelGetState);
        topics.push(Topic::ModelStateUpdated);
        topics
    }

    fn handle(&mut self, message: &Message) {
        if self.apply_parameter(message) {
            return;
        }
        if let Message::ModelStateUpdated { model_id, state } = message {
            if *model_id == self.source_model_id {
                self.source_updated(state);
            }
        }
    }

    fn respond(&self, request: &Request) -> Option<Response> {
        match request {
            Request::ModelGetState { model_id } if model_id == self.time.model_id() => {
                Some(Response::ModelState(self.state()))
            }
            _ => self.time.respond(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{ReferenceState, redacted};
    use crate::core::{DateInterval, Document, ObjectSelector};

    #[test]
    fn only_invisible_references_are_nulled() {
        let source = Document::new(json!({
            "_id": "a",
            "refs": [{ "doc": "x" }, { "doc": "y" }]
        }))
        .expect("document");
        let references = [
            ReferenceState {
                interval: DateInterval::instant(0),
                selector: ObjectSelector::new(["refs", "0"]),
                visible: true,
            },
            ReferenceState {
                interval: DateInterval::instant(9),
                selector: ObjectSelector::new(["refs", "1"]),
                visible: false,
            },
        ];
        let doc = redacted(&source, &references);
        assert_eq!(doc.body()["refs"][0], json!({ "doc": "x" }));
        assert_eq!(doc.body()["refs"][1], Value::Null);
        assert_eq!(source.body()["refs"][1], json!({ "doc": "y" }));
    }

    #[test]
    fn fully_visible_documents_share_the_source_body() {
        let source = Document::new(json!({ "_id": "a" })).expect("document");
        assert!(redacted(&source, &[]).shares_body_with(&source));
    }
}
