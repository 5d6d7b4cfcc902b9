use tracing::{debug, warn};

use crate::core::{DateInterval, union_extent};
use crate::dispatch::{
    DispatchHandler, Dispatcher, Message, ModelInfo, ModelParameter, ModelParameters, ModelType,
    Request, Response, Topic,
};

use super::handle::ModelHandle;
use super::time_interval::{INTERVAL_LABEL, RANGE_LABEL, current_millis};

/// Construction options of a `TimeSynchronize`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSynchronizeOptions {
    pub source_model_ids: Vec<String>,
    pub now: Option<i64>,
}

impl TimeSynchronizeOptions {
    #[must_use]
    pub fn new<I, S>(source_model_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source_model_ids: source_model_ids.into_iter().map(Into::into).collect(),
            now: None,
        }
    }

    #[must_use]
    pub fn with_now(mut self, now: i64) -> Self {
        self.now = Some(now);
        self
    }
}

/// Parameter events of one synchronized model, as advertised by it.
#[derive(Debug, Clone, PartialEq)]
struct Upstream {
    model_id: String,
    range_change_event: Option<String>,
    interval_set_event: Option<String>,
    range: Option<DateInterval>,
}

impl Upstream {
    fn discover(dispatcher: &Dispatcher, model_id: &str) -> Self {
        let mut upstream = Self {
            model_id: model_id.to_owned(),
            range_change_event: None,
            interval_set_event: None,
            range: None,
        };
        let Some(info) = dispatcher.model_info(model_id) else {
            warn!(model_id, "synchronized model did not answer info request");
            return upstream;
        };
        if let Some(range) = info.parameters.range {
            upstream.range_change_event = Some(range.change_event);
            upstream.range = range.value;
        }
        if let Some(interval) = info.parameters.interval {
            upstream.interval_set_event = Some(interval.set_event);
        }
        upstream
    }
}

/// Merges the ranges of several time models and drives their intervals.
///
/// Carries no documents. Its range is the union of the upstream ranges and is
/// read-only; its interval is clamped to that range and pushed to every
/// upstream whenever it changes.
#[derive(Debug)]
pub struct TimeSynchronize {
    model_id: String,
    dispatcher: Dispatcher,
    now: i64,
    upstreams: Vec<Upstream>,
    range: Option<DateInterval>,
    interval: Option<DateInterval>,
    range_parameter: ModelParameter,
    interval_parameter: ModelParameter,
}

impl TimeSynchronize {
    /// Builds an unregistered synchronizer, reading the parameters of every
    /// upstream model. See `TimeSynchronize::create`.
    #[must_use]
    pub fn new(dispatcher: &Dispatcher, model_id: &str, options: TimeSynchronizeOptions) -> Self {
        let upstreams: Vec<Upstream> = options
            .source_model_ids
            .iter()
            .map(|source| Upstream::discover(dispatcher, source))
            .collect();
        debug!(model_id, upstreams = upstreams.len(), "time synchronizer created");
        Self {
            model_id: model_id.to_owned(),
            dispatcher: dispatcher.clone(),
            now: options.now.unwrap_or_else(current_millis),
            upstreams,
            range: None,
            interval: None,
            range_parameter: ModelParameter::new(dispatcher, model_id, "range", RANGE_LABEL),
            interval_parameter: ModelParameter::new(
                dispatcher,
                model_id,
                "interval",
                INTERVAL_LABEL,
            ),
        }
    }

    /// Registers a synchronizer and publishes the initial merged range.
    pub fn create(
        dispatcher: &Dispatcher,
        model_id: &str,
        options: TimeSynchronizeOptions,
    ) -> ModelHandle<Self> {
        let handle = ModelHandle::install(dispatcher, Self::new(dispatcher, model_id, options));
        handle.update(Self::recompute_range);
        handle
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[must_use]
    pub fn source_model_ids(&self) -> Vec<&str> {
        self.upstreams
            .iter()
            .map(|upstream| upstream.model_id.as_str())
            .collect()
    }

    #[must_use]
    pub fn range(&self) -> Option<DateInterval> {
        self.range
    }

    /// Effective interval: the explicit one, else the merged range.
    #[must_use]
    pub fn interval(&self) -> Option<DateInterval> {
        self.interval.or(self.range)
    }

    #[must_use]
    pub fn range_parameter(&self) -> &ModelParameter {
        &self.range_parameter
    }

    #[must_use]
    pub fn interval_parameter(&self) -> &ModelParameter {
        &self.interval_parameter
    }

    #[must_use]
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            model_id: self.model_id.clone(),
            model_type: ModelType::TimeSynchronize,
            parameters: ModelParameters {
                range: Some(self.range_parameter.info(self.range)),
                interval: Some(self.interval_parameter.info(self.interval())),
            },
        }
    }

    /// Clamps `interval` to the merged range; on an effective change pushes
    /// it to every upstream and broadcasts it.
    pub fn set_interval(&mut self, interval: Option<DateInterval>) {
        let previous = self.interval();
        self.interval = interval;
        self.constrain_interval();
        if self.interval() != previous {
            self.report_interval();
        }
    }

    fn recompute_range(&mut self) {
        let merged = union_extent(
            self.upstreams
                .iter()
                .filter_map(|upstream| upstream.range.as_ref()),
            self.now,
        );
        if merged == self.range {
            return;
        }

        debug!(model_id = %self.model_id, range = ?merged, "merged range changed");
        let previous = self.interval();
        self.range = merged;
        self.constrain_interval();
        self.range_parameter.send_update(self.range);
        if self.interval() != previous {
            self.report_interval();
        }
    }

    fn constrain_interval(&mut self) {
        self.interval = match (self.interval, self.range) {
            (Some(interval), Some(range)) => interval.intersection(range, self.now),
            _ => None,
        };
    }

    fn report_interval(&self) {
        let interval = self.interval();
        debug!(model_id = %self.model_id, ?interval, "pushing interval to synchronized models");
        for upstream in &self.upstreams {
            if let Some(event) = &upstream.interval_set_event {
                self.dispatcher.set_parameter(event, interval);
            }
        }
        self.interval_parameter.send_update(interval);
    }

    fn upstream_range_changed(&mut self, event: &str, range: Option<DateInterval>) {
        let mut matched = false;
        for upstream in &mut self.upstreams {
            if upstream.range_change_event.as_deref() == Some(event) {
                upstream.range = range;
                matched = true;
            }
        }
        if matched {
            self.recompute_range();
        }
    }
}

impl DispatchHandler for TimeSynchronize {
    fn topics(&self) -> Vec<Topic> {
        let mut topics = vec![
            Topic::ModelGetInfo,
            Topic::Parameter(self.range_parameter.get_event().to_owned()),
            Topic::Parameter(self.interval_parameter.get_event().to_owned()),
            Topic::Parameter(self.interval_parameter.set_event().to_owned()),
        ];
        for upstream in &self.upstreams {
            if let Some(event) = &upstream.range_change_event {
                let topic = Topic::Parameter(event.clone());
                if !topics.contains(&topic) {
                    topics.push(topic);
                }
            }
        }
        topics
    }

    fn handle(&mut self, message: &Message) {
        match message {
            Message::SetParameter { event, value }
                if event == self.interval_parameter.set_event() =>
            {
                self.set_interval(*value);
            }
            Message::ParameterChanged { event, value, .. } => {
                self.upstream_range_changed(event, *value);
            }
            _ => {}
        }
    }

    fn respond(&self, request: &Request) -> Option<Response> {
        match request {
            Request::ModelGetInfo { model_id } if *model_id == self.model_id => {
                Some(Response::ModelInfo(self.info()))
            }
            Request::GetParameter { event } if event == self.range_parameter.get_event() => {
                Some(Response::ParameterValue(self.range))
            }
            Request::GetParameter { event } if event == self.interval_parameter.get_event() => {
                Some(Response::ParameterValue(self.interval()))
            }
            _ => None,
        }
    }
}
