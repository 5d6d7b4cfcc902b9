mod common;

use serde_json::json;
use time_models::core::DateInterval;
use time_models::dispatch::{Dispatcher, Message};
use time_models::model::{DocumentSource, TimeFilter, TimeFilterOptions};

use common::{dated_doc, doc, ids, interval, ms, record_parameters, record_states};

fn year_2010() -> DateInterval {
    interval(ms(2010, 1, 1), ms(2011, 1, 1) - 1)
}

#[test]
fn delta_reaching_a_borrowed_stage_is_delivered_once_released() {
    let dispatcher = Dispatcher::new();
    let source = DocumentSource::create(&dispatcher, "docs");
    let filter = TimeFilter::create(
        &dispatcher,
        "filter",
        TimeFilterOptions::new("docs").with_range(year_2010()),
    );

    {
        let _held = filter.borrow();
        source.update(|source| source.add_documents([dated_doc("a", "2010-05")]));
        assert_eq!(dispatcher.held(), 1);
    }

    assert_eq!(source.borrow().len(), 1);
    assert_eq!(filter.borrow().tracked_count(), 1);
    assert_eq!(dispatcher.held(), 0);
    let state = dispatcher.model_state("filter").expect("filter answers");
    assert_eq!(ids(&state.added), vec!["a"]);
}

#[test]
fn held_deltas_keep_their_order() {
    let dispatcher = Dispatcher::new();
    let source = DocumentSource::create(&dispatcher, "docs");
    let filter = TimeFilter::create(
        &dispatcher,
        "filter",
        TimeFilterOptions::new("docs").with_range(year_2010()),
    );
    let (_recorder, states) = record_states(&dispatcher, "filter");

    {
        let _held = filter.borrow();
        source.update(|source| source.add_documents([dated_doc("a", "2010-05")]));
        source.update(|source| {
            source.update_documents([doc(json!({
                "_id": "a",
                "title": "renamed",
                "when": { "nunaliit_type": "date", "date": "2010-06" }
            }))]);
        });
        source.update(|source| source.add_documents([dated_doc("b", "2010-07")]));
        assert_eq!(dispatcher.held(), 3);
        assert!(states.borrow().is_empty());
    }

    // Any later traffic on the bus releases the backlog first.
    dispatcher.set_parameter("unrelated_set_event", None);

    let states = states.borrow();
    assert_eq!(states.len(), 3);
    assert_eq!(ids(&states[0].added), vec!["a"]);
    assert_eq!(ids(&states[1].updated), vec!["a"]);
    assert_eq!(states[1].updated[0].body()["title"], json!("renamed"));
    assert_eq!(ids(&states[2].added), vec!["b"]);
    assert_eq!(dispatcher.held(), 0);
}

#[test]
fn backlog_of_a_dropped_stage_is_discarded() {
    let dispatcher = Dispatcher::new();
    let source = DocumentSource::create(&dispatcher, "docs");
    let filter = TimeFilter::create(&dispatcher, "filter", TimeFilterOptions::new("docs"));

    {
        let _held = filter.borrow();
        source.update(|source| source.add_documents([dated_doc("a", "2010")]));
    }
    assert_eq!(dispatcher.held(), 1);
    drop(filter);

    dispatcher.set_parameter("unrelated_set_event", None);
    assert_eq!(dispatcher.held(), 0);
}

#[test]
fn topics_of_dropped_stages_are_forgotten() {
    let dispatcher = Dispatcher::new();
    let (recorder, _log) = record_parameters(&dispatcher, &["filter_interval_change_event"]);
    let baseline = dispatcher.topic_count();

    let filter = TimeFilter::create(
        &dispatcher,
        "filter",
        TimeFilterOptions::new("docs").with_range(year_2010()),
    );
    assert!(dispatcher.topic_count() > baseline);
    drop(filter);

    dispatcher.set_parameter("filter_interval_set_event", None);
    dispatcher.set_parameter("filter_range_set_event", None);
    assert!(dispatcher.parameter_value("filter_interval_get_event").is_none());
    assert!(dispatcher.parameter_value("filter_range_get_event").is_none());
    assert!(dispatcher.model_info("filter").is_none());
    assert!(dispatcher.model_state("filter").is_none());

    // Nothing was sent on ModelStateUpdated, so that topic is still listed.
    assert_eq!(dispatcher.topic_count(), baseline + 1);

    drop(recorder);
    dispatcher.send(Message::ParameterChanged {
        event: "filter_interval_change_event".to_owned(),
        parameter_id: "filter_interval".to_owned(),
        value: None,
    });
    assert_eq!(dispatcher.topic_count(), 1);
}
