use tracing::debug;

use crate::core::DateInterval;
use crate::dispatch::{
    Dispatcher, Message, ModelInfo, ModelParameter, ModelParameters, ModelType, Request, Response,
    Topic,
};

pub const RANGE_LABEL: &str = "Range";
pub const INTERVAL_LABEL: &str = "Interval";

/// Current wall-clock time in epoch milliseconds.
#[must_use]
pub fn current_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Range and interval state shared by every time-aware stage.
///
/// `range` is the overall extent, `interval` the selected window. Without an
/// explicit interval the effective interval is the range itself.
#[derive(Debug)]
pub struct TimeIntervalModel {
    model_id: String,
    model_type: ModelType,
    now: i64,
    auto_range: bool,
    range: Option<DateInterval>,
    interval: Option<DateInterval>,
    range_parameter: ModelParameter,
    interval_parameter: ModelParameter,
}

/// What a range replacement requires from the owning stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RangeChange {
    Unchanged,
    /// The explicit interval still fits.
    IntervalKept,
    /// The explicit interval must be replaced by this value.
    ConstrainInterval(Option<DateInterval>),
    /// No explicit interval: the effective interval moved with the range.
    IntervalFollowed,
}

impl TimeIntervalModel {
    /// A configured `range` pins both range and interval and disables the
    /// automatic range. `now` defaults to the current time.
    #[must_use]
    pub fn new(
        dispatcher: &Dispatcher,
        model_id: &str,
        model_type: ModelType,
        range: Option<DateInterval>,
        now: Option<i64>,
    ) -> Self {
        let now = now.unwrap_or_else(current_millis);
        let range = range.map(|range| range.resolved(now));
        debug!(
            model_id,
            model_type = model_type.as_str(),
            auto_range = range.is_none(),
            "time interval model created"
        );
        Self {
            model_id: model_id.to_owned(),
            model_type,
            now,
            auto_range: range.is_none(),
            range,
            interval: range,
            range_parameter: ModelParameter::new(dispatcher, model_id, "range", RANGE_LABEL),
            interval_parameter: ModelParameter::new(
                dispatcher,
                model_id,
                "interval",
                INTERVAL_LABEL,
            ),
        }
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    #[must_use]
    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    /// Instant used to resolve ongoing intervals.
    #[must_use]
    pub fn now(&self) -> i64 {
        self.now
    }

    #[must_use]
    pub fn auto_range(&self) -> bool {
        self.auto_range
    }

    #[must_use]
    pub fn range(&self) -> Option<DateInterval> {
        self.range
    }

    /// Effective interval: the explicit one, else the range.
    #[must_use]
    pub fn interval(&self) -> Option<DateInterval> {
        self.interval.or(self.range)
    }

    #[must_use]
    pub fn explicit_interval(&self) -> Option<DateInterval> {
        self.interval
    }

    #[must_use]
    pub fn range_parameter(&self) -> &ModelParameter {
        &self.range_parameter
    }

    #[must_use]
    pub fn interval_parameter(&self) -> &ModelParameter {
        &self.interval_parameter
    }

    /// `ModelGetInfo` plus the set and get events of both parameters.
    #[must_use]
    pub fn topics(&self) -> Vec<Topic> {
        let mut topics = vec![Topic::ModelGetInfo];
        topics.extend(self.range_parameter.topics());
        topics.extend(self.interval_parameter.topics());
        topics
    }

    #[must_use]
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            model_id: self.model_id.clone(),
            model_type: self.model_type,
            parameters: ModelParameters {
                range: Some(self.range_parameter.info(self.range)),
                interval: Some(self.interval_parameter.info(self.interval())),
            },
        }
    }

    /// Answers `ModelGetInfo` for this model and the parameter get events.
    #[must_use]
    pub fn respond(&self, request: &Request) -> Option<Response> {
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

    pub(crate) fn replace_range(&mut self, range: Option<DateInterval>) -> RangeChange {
        let range = range.map(|range| range.resolved(self.now));
        if range == self.range {
            return RangeChange::Unchanged;
        }

        debug!(model_id = %self.model_id, ?range, "range changed");
        self.range = range;
        self.range_parameter.send_update(range);

        match (self.interval, range) {
            (Some(interval), Some(range)) => {
                if range.contains(interval, self.now) {
                    RangeChange::IntervalKept
                } else {
                    RangeChange::ConstrainInterval(range.intersection(interval, self.now))
                }
            }
            (Some(_), None) => RangeChange::ConstrainInterval(None),
            (None, _) => {
                self.interval_parameter.send_update(self.interval());
                RangeChange::IntervalFollowed
            }
        }
    }

    /// Returns `true` when the effective interval changed.
    pub(crate) fn replace_interval(&mut self, interval: Option<DateInterval>) -> bool {
        let previous = self.interval();
        self.interval = interval.map(|interval| interval.resolved(self.now));
        let current = self.interval();
        if previous == current {
            return false;
        }

        debug!(model_id = %self.model_id, interval = ?current, "interval changed");
        self.interval_parameter.send_update(current);
        true
    }
}

/// A stage reacting to changes of its effective interval.
///
/// Implementors supply the shared state and the reaction; range and interval
/// assignments are provided and always end in `on_interval_changed` when the
/// effective interval moved.
pub trait TimeReactive {
    fn time_model(&self) -> &TimeIntervalModel;

    fn time_model_mut(&mut self) -> &mut TimeIntervalModel;

    /// Recomputes whatever depends on the effective interval.
    fn on_interval_changed(&mut self);

    /// Installs a new range, constraining the explicit interval to it.
    fn set_range(&mut self, range: Option<DateInterval>) {
        match self.time_model_mut().replace_range(range) {
            RangeChange::Unchanged | RangeChange::IntervalKept => {}
            RangeChange::ConstrainInterval(interval) => self.set_interval(interval),
            RangeChange::IntervalFollowed => self.on_interval_changed(),
        }
    }

    fn set_interval(&mut self, interval: Option<DateInterval>) {
        if self.time_model_mut().replace_interval(interval) {
            self.on_interval_changed();
        }
    }

    /// Replaces the range with `extent` unless the range was configured.
    fn refresh_auto_range(&mut self, extent: Option<DateInterval>) {
        if self.time_model().auto_range() {
            self.set_range(extent);
        }
    }

    /// Applies `SetParameter` messages addressed to the range or interval.
    /// Returns `false` for any other message.
    fn apply_parameter(&mut self, message: &Message) -> bool {
        let Message::SetParameter { event, value } = message else {
            return false;
        };
        if event == self.time_model().range_parameter().set_event() {
            self.set_range(*value);
            true
        } else if event == self.time_model().interval_parameter().set_event() {
            self.set_interval(*value);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{TimeIntervalModel, TimeReactive};
    use crate::core::DateInterval;
    use crate::dispatch::{DispatchHandler, Dispatcher, Message, ModelType, Request, Response, Topic};

    struct Stage {
        time: TimeIntervalModel,
        hook_calls: usize,
    }

    impl TimeReactive for Stage {
        fn time_model(&self) -> &TimeIntervalModel {
            &self.time
        }

        fn time_model_mut(&mut self) -> &mut TimeIntervalModel {
            &mut self.time
        }

        fn on_interval_changed(&mut self) {
            self.hook_calls += 1;
        }
    }

    struct ChangeLog {
        events: Rc<RefCell<Vec<(String, Option<DateInterval>)>>>,
    }

    impl DispatchHandler for ChangeLog {
        fn topics(&self) -> Vec<Topic> {
            vec![
                Topic::Parameter("stage_range_change_event".to_owned()),
                Topic::Parameter("stage_interval_change_event".to_owned()),
            ]
        }

        fn handle(&mut self, message: &Message) {
            if let Message::ParameterChanged { event, value, .. } = message {
                self.events.borrow_mut().push((event.clone(), *value));
            }
        }

        fn respond(&self, _request: &Request) -> Option<Response> {
            None
        }
    }

    fn interval(min: i64, max: i64) -> DateInterval {
        DateInterval::new(min, max).expect("interval")
    }

    fn stage(dispatcher: &Dispatcher, range: Option<DateInterval>) -> Stage {
        Stage {
            time: TimeIntervalModel::new(dispatcher, "stage", ModelType::TimeFilter, range, Some(1_000)),
            hook_calls: 0,
        }
    }

    fn change_log(
        dispatcher: &Dispatcher,
    ) -> (
        Rc<RefCell<dyn DispatchHandler>>,
        Rc<RefCell<Vec<(String, Option<DateInterval>)>>>,
    ) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let handler: Rc<RefCell<dyn DispatchHandler>> = Rc::new(RefCell::new(ChangeLog {
            events: events.clone(),
        }));
        dispatcher.register_handler(&handler);
        (handler, events)
    }

    #[test]
    fn configured_range_is_resolved_and_pins_interval() {
        let dispatcher = Dispatcher::new();
        let stage = stage(&dispatcher, Some(DateInterval::ongoing(100, 100)));
        assert!(!stage.time.auto_range());
        assert_eq!(stage.time.range(), Some(interval(100, 1_000)));
        assert_eq!(stage.time.explicit_interval(), Some(interval(100, 1_000)));
    }

    #[test]
    fn range_change_without_interval_moves_effective_interval() {
        let dispatcher = Dispatcher::new();
        let (_log, events) = change_log(&dispatcher);
        let mut stage = stage(&dispatcher, None);

        stage.set_range(Some(interval(0, 10)));
        stage.set_range(Some(interval(0, 10)));

        assert_eq!(stage.hook_calls, 1);
        assert_eq!(stage.time.interval(), Some(interval(0, 10)));
        assert_eq!(
            *events.borrow(),
            vec![
                ("stage_range_change_event".to_owned(), Some(interval(0, 10))),
                ("stage_interval_change_event".to_owned(), Some(interval(0, 10))),
            ]
        );
    }

    #[test]
    fn shrinking_range_constrains_explicit_interval() {
        let dispatcher = Dispatcher::new();
        let mut stage = stage(&dispatcher, None);
        stage.set_range(Some(interval(0, 100)));
        stage.set_interval(Some(interval(40, 90)));
        assert_eq!(stage.hook_calls, 2);

        stage.set_range(Some(interval(0, 60)));
        assert_eq!(stage.time.interval(), Some(interval(40, 60)));
        assert_eq!(stage.hook_calls, 3);

        stage.set_range(Some(interval(0, 80)));
        assert_eq!(stage.time.interval(), Some(interval(40, 60)));
        assert_eq!(stage.hook_calls, 3);

        stage.set_range(None);
        assert_eq!(stage.time.interval(), None);
        assert_eq!(stage.hook_calls, 4);
    }

    #[test]
    fn interval_equal_to_range_is_not_a_change() {
        let dispatcher = Dispatcher::new();
        let mut stage = stage(&dispatcher, Some(interval(0, 10)));
        stage.set_interval(None);
        assert_eq!(stage.hook_calls, 0);
        stage.set_interval(Some(interval(0, 10)));
        assert_eq!(stage.hook_calls, 0);
    }

    #[test]
    fn parameter_messages_route_to_setters() {
        let dispatcher = Dispatcher::new();
        let mut stage = stage(&dispatcher, None);
        let applied = stage.apply_parameter(&Message::SetParameter {
            event: "stage_interval_set_event".to_owned(),
            value: Some(interval(3, 4)),
        });
        assert!(applied);
        assert_eq!(stage.time.interval(), Some(interval(3, 4)));
        assert!(!stage.apply_parameter(&Message::SetParameter {
            event: "other_interval_set_event".to_owned(),
            value: None,
        }));
        assert_eq!(
            stage.time.respond(&Request::GetParameter {
                event: "stage_interval_get_event".to_owned()
            }),
            Some(Response::ParameterValue(Some(interval(3, 4))))
        );
    }

    #[test]
    fn ongoing_setters_resolve_at_the_stage_clock() {
        let dispatcher = Dispatcher::new();
        let mut stage = stage(&dispatcher, None);

        stage.set_range(Some(DateInterval::ongoing(100, 100)));
        assert_eq!(stage.time.range(), Some(interval(100, 1_000)));

        stage.set_interval(Some(DateInterval::ongoing(200, 200)));
        assert_eq!(stage.time.explicit_interval(), Some(interval(200, 1_000)));
        assert_eq!(stage.hook_calls, 2);
    }
}
