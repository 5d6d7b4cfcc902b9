use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::core::{
    DateInterval, DeltaBuilder, Document, Intervals, ModelState, document_intervals, union_extent,
};
use crate::dispatch::{DispatchHandler, Dispatcher, Message, ModelType, Request, Response, Topic};

use super::handle::ModelHandle;
use super::reporter::StateReporter;
use super::time_interval::{TimeIntervalModel, TimeReactive};

/// Top-level field added to every document passing through a `TimeTransform`.
pub const TIME_TRANSFORM_FIELD: &str = "_n2TimeTransform";

/// Summary of how a document's dates relate to the current interval.
///
/// Sizes are in milliseconds. Everything stays zero when there is no
/// interval, and `filter_interval_size` stays zero unless some date meets it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeTag {
    pub intersects: bool,
    pub interval_size: i64,
    pub intersection_size: i64,
    pub filter_interval_size: i64,
}

impl TimeTag {
    #[must_use]
    pub fn compute(intervals: &[DateInterval], filter: Option<DateInterval>, now: i64) -> Self {
        let Some(filter) = filter else {
            return Self::default();
        };

        let mut tag = Self::default();
        for interval in intervals {
            tag.interval_size += interval.size(now);
            if let Some(intersection) = interval.intersection(filter, now) {
                tag.intersects = true;
                tag.intersection_size += intersection.size(now);
            }
        }
        if tag.intersects {
            tag.filter_interval_size = filter.size(now);
        }
        tag
    }

    /// Reads the tag back from a transformed document body.
    #[must_use]
    pub fn from_document(body: &Value) -> Option<Self> {
        serde_json::from_value(body.get(TIME_TRANSFORM_FIELD)?.clone()).ok()
    }

    fn to_value(self) -> Value {
        json!({
            "intersects": self.intersects,
            "intervalSize": self.interval_size,
            "intersectionSize": self.intersection_size,
            "filterIntervalSize": self.filter_interval_size,
        })
    }
}

/// Construction options of a `TimeTransform`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeTransformOptions {
    pub source_model_id: String,
    pub range: Option<DateInterval>,
    pub now: Option<i64>,
}

impl TimeTransformOptions {
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

#[derive(Debug, Clone)]
struct TaggedEntry {
    doc: Document,
    source: Document,
    intervals: Intervals,
    tag: TimeTag,
}

/// Passes every document on, tagged with a `TimeTag` under
/// `_n2TimeTransform`.
#[derive(Debug)]
pub struct TimeTransform {
    time: TimeIntervalModel,
    dispatcher: Dispatcher,
    source_model_id: String,
    docs: IndexMap<String, TaggedEntry>,
    reporter: StateReporter,
}

impl TimeTransform {
    #[must_use]
    pub fn new(dispatcher: &Dispatcher, model_id: &str, options: TimeTransformOptions) -> Self {
        Self {
            time: TimeIntervalModel::new(
                dispatcher,
                model_id,
                ModelType::TimeTransform,
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
        options: TimeTransformOptions,
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

    /// Current tag of a tracked document.
    #[must_use]
    pub fn tag(&self, doc_id: &str) -> Option<TimeTag> {
        self.docs.get(doc_id).map(|entry| entry.tag)
    }

    /// Tagged version of a tracked document.
    #[must_use]
    pub fn document(&self, doc_id: &str) -> Option<&Document> {
        self.docs.get(doc_id).map(|entry| &entry.doc)
    }

    #[must_use]
    pub fn state(&self) -> ModelState {
        let documents = self.docs.values().map(|entry| entry.doc.clone()).collect();
        ModelState::snapshot(documents, self.reporter.loading())
    }

    fn source_updated(&mut self, state: &ModelState) {
        self.reporter.observe_loading(state.loading);
        let now = self.time.now();
        let filter = self.time.interval();

        let mut delta = DeltaBuilder::new();
        for source in state.added.iter().chain(&state.updated) {
            let intervals = document_intervals(source.body(), now);
            let tag = TimeTag::compute(&intervals, filter, now);
            let doc = tagged(source, tag);
            let entry = TaggedEntry {
                doc: doc.clone(),
                source: source.clone(),
                intervals,
                tag,
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
            self.docs.values().flat_map(|entry| entry.intervals.iter()),
            now,
        );
        self.refresh_auto_range(extent);
    }
}

fn tagged(source: &Document, tag: TimeTag) -> Document {
    let mut body = source.body().clone();
    if let Value::Object(fields) = &mut body {
        fields.insert(TIME_TRANSFORM_FIELD.to_owned(), tag.to_value());
    }
    source.derive(body)
}

impl TimeReactive for TimeTransform {
    fn time_model(&self) -> &TimeIntervalModel {
        &self.time
    }

    fn time_model_mut(&mut self) -> &mut TimeIntervalModel {
        &mut self.time
    }

    fn on_interval_changed(&mut self) {
        let now = self.time.now();
        let filter = self.time.interval();
        debug!(model_id = %self.time.model_id(), ?filter, "re-tagging documents");

        let mut delta = DeltaBuilder::new();
        for entry in self.docs.values_mut() {
            let tag = TimeTag::compute(&entry.intervals, filter, now);
            if tag == entry.tag {
                continue;
            }
            entry.tag = tag;
            entry.doc = tagged(&entry.source, tag);
            delta.update(entry.doc.clone());
        }
        self.reporter.publish(delta);
    }
}

impl DispatchHandler for TimeTransform {
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
    use super::TimeTag;
    use crate::core::DateInterval;

    fn interval(min: i64, max: i64) -> DateInterval {
        DateInterval::new(min, max).expect("interval")
    }

    #[test]
    fn tag_sums_sizes_and_intersections() {
        let dates = [interval(0, 10), interval(20, 30), interval(100, 110)];
        let tag = TimeTag::compute(&dates, Some(interval(5, 25)), 0);
        assert_eq!(
            tag,
            TimeTag {
                intersects: true,
                interval_size: 30,
                intersection_size: 10,
                filter_interval_size: 20,
            }
        );
    }

    #[test]
    fn tag_without_intersection_reports_no_filter_size() {
        let tag = TimeTag::compute(&[interval(0, 10)], Some(interval(50, 60)), 0);
        assert!(!tag.intersects);
        assert_eq!(tag.interval_size, 10);
        assert_eq!(tag.filter_interval_size, 0);
        assert_eq!(TimeTag::compute(&[interval(0, 10)], None, 0), TimeTag::default());
    }
}
