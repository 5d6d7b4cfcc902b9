mod common;

use serde_json::json;
use time_models::dispatch::Dispatcher;
use time_models::model::{
    DocumentSource, TIME_TRANSFORM_FIELD, TimeFilter, TimeFilterOptions, TimeReactive, TimeTag,
    TimeTransform, TimeTransformOptions,
};

use common::{dated_doc, doc, ids, interval, ms, plain_doc, record_states};

const DAY: i64 = 86_400_000;

#[test]
fn every_document_passes_with_a_tag() {
    let dispatcher = Dispatcher::new();
    let source = DocumentSource::create(&dispatcher, "docs");
    let transform = TimeTransform::create(
        &dispatcher,
        "tagged",
        TimeTransformOptions::new("docs").with_range(interval(ms(2010, 1, 1), ms(2010, 1, 11))),
    );
    let (_recorder, states) = record_states(&dispatcher, "tagged");

    source.update(|source| {
        source.add_documents([dated_doc("inside", "2010-01-05"), plain_doc("undated")]);
    });

    let states = states.borrow();
    assert_eq!(ids(&states[0].added), vec!["inside", "undated"]);

    let inside = TimeTag::from_document(states[0].added[0].body()).expect("tag");
    assert_eq!(
        inside,
        TimeTag {
            intersects: true,
            interval_size: DAY - 1,
            intersection_size: DAY - 1,
            filter_interval_size: 10 * DAY,
        }
    );
    let undated = TimeTag::from_document(states[0].added[1].body()).expect("tag");
    assert_eq!(undated, TimeTag::default());
    assert_eq!(transform.borrow().tag("undated"), Some(TimeTag::default()));
}

#[test]
fn tag_is_serialized_in_camel_case() {
    let dispatcher = Dispatcher::new();
    let source = DocumentSource::create(&dispatcher, "docs");
    let transform = TimeTransform::create(
        &dispatcher,
        "tagged",
        TimeTransformOptions::new("docs").with_range(interval(0, 10)),
    );
    source.update(|source| source.add_documents([plain_doc("a")]));

    let transform = transform.borrow();
    let body = transform.document("a").expect("tracked").body();
    assert_eq!(
        body[TIME_TRANSFORM_FIELD],
        json!({
            "intersects": false,
            "intervalSize": 0,
            "intersectionSize": 0,
            "filterIntervalSize": 0
        })
    );
    assert_eq!(body["title"], json!("a"));
}

#[test]
fn interval_change_republishes_only_changed_tags() {
    let dispatcher = Dispatcher::new();
    let source = DocumentSource::create(&dispatcher, "docs");
    let transform = TimeTransform::create(
        &dispatcher,
        "tagged",
        TimeTransformOptions::new("docs").with_range(interval(ms(2010, 1, 1), ms(2010, 12, 31))),
    );
    let (_recorder, states) = record_states(&dispatcher, "tagged");
    source.update(|source| {
        source.add_documents([
            dated_doc("march", "2010-03"),
            dated_doc("october", "2010-10"),
            plain_doc("undated"),
        ]);
    });

    transform.update(|transform| {
        transform.set_interval(Some(interval(ms(2010, 9, 1), ms(2010, 12, 31))));
    });

    let states = states.borrow();
    assert_eq!(states.len(), 2);
    // October keeps `intersects` but its filter size changed; March stops
    // intersecting; the undated document is untouched.
    assert_eq!(ids(&states[1].updated), vec!["march", "october"]);
    let march = TimeTag::from_document(states[1].updated[0].body()).expect("tag");
    assert!(!march.intersects);
    assert_eq!(march.filter_interval_size, 0);
}

#[test]
fn unchanged_updates_are_not_republished() {
    let dispatcher = Dispatcher::new();
    let source = DocumentSource::create(&dispatcher, "docs");
    let _transform = TimeTransform::create(&dispatcher, "tagged", TimeTransformOptions::new("docs"));
    let (_recorder, states) = record_states(&dispatcher, "tagged");

    source.update(|source| source.add_documents([dated_doc("a", "2010")]));
    let published = states.borrow().len();
    source.update(|source| source.update_documents([dated_doc("a", "2010")]));
    assert_eq!(states.borrow().len(), published);

    source.update(|source| {
        source.update_documents([doc(json!({
            "_id": "a",
            "title": "changed",
            "when": { "nunaliit_type": "date", "date": "2010" }
        }))]);
    });
    let states = states.borrow();
    assert_eq!(states.len(), published + 1);
    assert_eq!(ids(&states[published].updated), vec!["a"]);
}

#[test]
fn removal_republishes_the_upstream_document() {
    let dispatcher = Dispatcher::new();
    let source = DocumentSource::create(&dispatcher, "docs");
    let transform = TimeTransform::create(&dispatcher, "tagged", TimeTransformOptions::new("docs"));
    let (_recorder, states) = record_states(&dispatcher, "tagged");

    source.update(|source| source.add_documents([dated_doc("a", "2010")]));
    source.update(|source| source.remove_documents(["a"]));

    let states = states.borrow();
    let removal = states.last().expect("removal");
    assert_eq!(removal.removed, vec![dated_doc("a", "2010")]);
    assert!(removal.removed[0].body().get(TIME_TRANSFORM_FIELD).is_none());
    assert!(transform.borrow().tag("a").is_none());
    assert_eq!(transform.borrow().time_model().range(), None);
}

#[test]
fn auto_range_follows_the_tagged_documents() {
    let dispatcher = Dispatcher::new();
    let source = DocumentSource::create(&dispatcher, "docs");
    let transform = TimeTransform::create(&dispatcher, "tagged", TimeTransformOptions::new("docs"));

    source.update(|source| source.add_documents([dated_doc("a", "2010"), dated_doc("b", "2011")]));

    let transform = transform.borrow();
    assert_eq!(
        transform.time_model().range(),
        Some(interval(ms(2010, 1, 1), ms(2012, 1, 1) - 1))
    );
    let tag = transform.tag("a").expect("tag");
    assert!(tag.intersects);
    assert_eq!(tag.filter_interval_size, ms(2012, 1, 1) - 1 - ms(2010, 1, 1));
}

#[test]
fn stages_chain_through_the_bus() {
    let dispatcher = Dispatcher::new();
    let source = DocumentSource::create(&dispatcher, "docs");
    let filter = TimeFilter::create(
        &dispatcher,
        "filter",
        TimeFilterOptions::new("docs").with_range(interval(ms(2010, 1, 1), ms(2010, 12, 31))),
    );
    let _transform = TimeTransform::create(
        &dispatcher,
        "tagged",
        TimeTransformOptions::new("filter").with_range(interval(ms(2010, 1, 1), ms(2010, 12, 31))),
    );
    let (_recorder, states) = record_states(&dispatcher, "tagged");

    source.update(|source| source.add_documents([dated_doc("a", "2010-04"), dated_doc("b", "2009")]));
    filter.update(|filter| filter.set_interval(Some(interval(ms(2010, 6, 1), ms(2010, 12, 31)))));

    let states = states.borrow();
    assert_eq!(ids(&states[0].added), vec!["a"]);
    assert_eq!(ids(&states[1].removed), vec!["a"]);
}
