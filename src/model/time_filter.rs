use tracing::debug;

use crate::core::{DateInterval, DeltaBuilder, Document, ModelState, ObjectSelector, date_intervals};
use crate::dispatch::{DispatchHandler, Dispatcher, Message, ModelType, Request, Response, Topic};

use super::handle::ModelHandle;
use super::reporter::StateReporter;
use super::time_interval::{TimeIntervalModel, TimeReactive};
use super::visibility::VisibilityTable;

/// Construction options of a `TimeFilter`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeFilterOptions {
    pub source_model_id: String,
    /// Subtrees searched for date structures. Defaults to the whole document.
    pub selectors: Vec<ObjectSelector>,
    /// Lets documents without any date through.
    pub allow_no_date: bool,
    /// Pins range and interval; disables the automatic range.
    pub range: Option<DateInterval>,
    /// Overrides the instant used to resolve ongoing intervals.
    pub now: Option<i64>,
}

impl TimeFilterOptions {
    #[must_use]
    pub fn new(source_model_id: impl Into<String>) -> Self {
        Self {
            source_model_id: source_model_id.into(),
            selectors: vec![ObjectSelector::root()],
            allow_no_date: false,
            range: None,
            now: None,
        }
    }

    #[must_use]
    pub fn with_selectors(mut self, selectors: Vec<ObjectSelector>) -> Self {
        self.selectors = selectors;
        self
    }

    #[must_use]
    pub fn with_allow_no_date(mut self, allow_no_date: bool) -> Self {
        self.allow_no_date = allow_no_date;
        self
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

/// Passes on the documents whose dates meet the current interval.
#[derive(Debug)]
pub struct TimeFilter {
    time: TimeIntervalModel,
    dispatcher: Dispatcher,
    source_model_id: String,
    selectors: Vec<ObjectSelector>,
    allow_no_date: bool,
    docs: VisibilityTable,
    reporter: StateReporter,
}

impl TimeFilter {
    /// Builds an unregistered filter. See `TimeFilter::create`.
    #[must_use]
    pub fn new(dispatcher: &Dispatcher, model_id: &str, options: TimeFilterOptions) -> Self {
        let selectors = if options.selectors.is_empty() {
            vec![ObjectSelector::root()]
        } else {
            options.selectors
        };
        Self {
            time: TimeIntervalModel::new(
                dispatcher,
                model_id,
                ModelType::TimeFilter,
                options.range,
                options.now,
            ),
            dispatcher: dispatcher.clone(),
            source_model_id: options.source_model_id,
            selectors,
            allow_no_date: options.allow_no_date,
            docs: VisibilityTable::default(),
            reporter: StateReporter::new(dispatcher, model_id),
        }
    }

    /// Registers a filter and loads the current state of its source.
    pub fn create(
        dispatcher: &Dispatcher,
        model_id: &str,
        options: TimeFilterOptions,
    ) -> ModelHandle<Self> {
        let handle = ModelHandle::install(dispatcher, Self::new(dispatcher, model_id, options));
        handle.update(Self::load_source);
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

    #[must_use]
    pub fn selectors(&self) -> &[ObjectSelector] {
        &self.selectors
    }

    #[must_use]
    pub fn allow_no_date(&self) -> bool {
        self.allow_no_date
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.reporter.loading()
    }

    /// Visibility of a tracked document, `None` when unknown.
    #[must_use]
    pub fn is_visible(&self, doc_id: &str) -> Option<bool> {
        self.docs.get(doc_id).map(|entry| entry.visible)
    }

    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn visible_documents(&self) -> Vec<Document> {
        self.docs.visible_documents()
    }

    #[must_use]
    pub fn state(&self) -> ModelState {
        ModelState::snapshot(self.docs.visible_documents(), self.reporter.loading())
    }

    fn load_source(&mut self) {
        if let Some(state) = self.dispatcher.model_state(&self.source_model_id) {
            self.source_updated(&state);
        }
    }

    fn source_updated(&mut self, state: &ModelState) {
        self.reporter.observe_loading(state.loading);
        let now = self.time.now();
        let filter = self.time.interval();

        let mut delta = DeltaBuilder::new();
        for doc in state.added.iter().chain(&state.updated) {
            let intervals = date_intervals(doc.body(), &self.selectors, now);
            let visible = passes(&intervals, filter, self.allow_no_date, now);
            self.docs.upsert(doc, intervals, visible, &mut delta);
        }
        for doc in &state.removed {
            self.docs.remove(doc, &mut delta);
        }
        self.reporter.publish(delta);

        let extent = self.docs.extent(now);
        self.refresh_auto_range(extent);
    }
}

/// Dated documents pass when one of their intervals meets `filter`; undated
/// ones pass only with `allow_no_date`.
fn passes(
    intervals: &[DateInterval],
    filter: Option<DateInterval>,
    allow_no_date: bool,
    now: i64,
) -> bool {
    if intervals.is_empty() {
        return allow_no_date;
    }
    filter.is_some_and(|filter| {
        intervals
            .iter()
            .any(|interval| interval.intersects_with(filter, now))
    })
}

impl TimeReactive for TimeFilter {
    fn time_model(&self) -> &TimeIntervalModel {
        &self.time
    }

    fn time_model_mut(&mut self) -> &mut TimeIntervalModel {
        &mut self.time
    }

    fn on_interval_changed(&mut self) {
        let now = self.time.now();
        let filter = self.time.interval();
        let allow_no_date = self.allow_no_date;
        debug!(model_id = %self.time.model_id(), ?filter, "re-evaluating visibility");

        let mut delta = DeltaBuilder::new();
        self.docs.revisit(
            |intervals| passes(intervals, filter, allow_no_date, now),
            &mut delta,
        );
        self.reporter.publish(delta);
    }
}

impl DispatchHandler for TimeFilter {
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
