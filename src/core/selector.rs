use std::fmt;

use serde_json::Value;

use crate::error::{ModelError, ModelResult};

/// Path from the root of a JSON document to one of its values.
///
/// Segments address object keys, or array positions when the value at that
/// point is an array. The empty path selects the document itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ObjectSelector {
    segments: Vec<String>,
}

impl ObjectSelector {
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a dotted path such as `nunaliit_dates.0.date`.
    ///
    /// The empty string is the root selector.
    pub fn parse(path: &str) -> ModelResult<Self> {
        let path = path.trim();
        if path.is_empty() {
            return Ok(Self::root());
        }

        let segments: Vec<String> = path.split('.').map(str::to_owned).collect();
        if segments.iter().any(String::is_empty) {
            return Err(ModelError::InvalidSelector(path.to_owned()));
        }
        Ok(Self { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    #[must_use]
    pub fn get_value<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(document, |value, segment| step(value, segment))
    }

    pub fn get_value_mut<'a>(&self, document: &'a mut Value) -> Option<&'a mut Value> {
        self.segments
            .iter()
            .try_fold(document, |value, segment| step_mut(value, segment))
    }

    /// Replaces the value at this path. Returns `false` when the path does
    /// not exist in `document`.
    pub fn set_value(&self, document: &mut Value, replacement: Value) -> bool {
        match self.get_value_mut(document) {
            Some(slot) => {
                *slot = replacement;
                true
            }
            None => false,
        }
    }

    /// Visits the selected value and every value nested below it, depth first,
    /// parents before children.
    pub fn traverse<F>(&self, document: &Value, mut visit: F)
    where
        F: FnMut(&Value, &ObjectSelector),
    {
        if let Some(start) = self.get_value(document) {
            walk(start, self.clone(), &mut visit);
        }
    }
}

impl fmt::Display for ObjectSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Selectors of every value in `document` accepted by `predicate`, in
/// depth-first order. Matching values are searched further.
pub fn find_selectors<P>(document: &Value, mut predicate: P) -> Vec<ObjectSelector>
where
    P: FnMut(&Value) -> bool,
{
    let mut found = Vec::new();
    ObjectSelector::root().traverse(document, |value, selector| {
        if predicate(value) {
            found.push(selector.clone());
        }
    });
    found
}

fn walk<F>(value: &Value, selector: ObjectSelector, visit: &mut F)
where
    F: FnMut(&Value, &ObjectSelector),
{
    visit(value, &selector);
    match value {
        Value::Object(fields) => {
            for (key, child) in fields {
                walk(child, selector.child(key.as_str()), visit);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                walk(child, selector.child(index.to_string()), visit);
            }
        }
        _ => {}
    }
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(fields) => fields.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn step_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(fields) => fields.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{ObjectSelector, find_selectors};

    #[test]
    fn parse_splits_dotted_path() {
        let selector = ObjectSelector::parse("a.b.0").expect("selector");
        assert_eq!(selector.segments(), ["a", "b", "0"]);
        assert_eq!(selector.to_string(), "a.b.0");
        assert!(ObjectSelector::parse("").expect("root").is_root());
        assert!(ObjectSelector::parse("a..b").is_err());
    }

    #[test]
    fn get_and_set_walk_objects_and_arrays() {
        let mut doc = json!({ "a": { "list": [1, { "x": true }] } });
        let selector = ObjectSelector::new(["a", "list", "1", "x"]);
        assert_eq!(selector.get_value(&doc), Some(&Value::Bool(true)));

        assert!(selector.set_value(&mut doc, Value::Null));
        assert_eq!(doc, json!({ "a": { "list": [1, { "x": null }] } }));

        let missing = ObjectSelector::new(["a", "list", "7"]);
        assert!(!missing.set_value(&mut doc, Value::Null));
    }

    #[test]
    fn traverse_visits_subtree_only() {
        let doc = json!({ "keep": { "n": 1 }, "skip": { "n": 2 } });
        let mut seen = Vec::new();
        ObjectSelector::new(["keep"]).traverse(&doc, |value, selector| {
            seen.push((selector.to_string(), value.clone()));
        });
        assert_eq!(
            seen,
            vec![
                ("keep".to_owned(), json!({ "n": 1 })),
                ("keep.n".to_owned(), json!(1)),
            ]
        );
    }

    #[test]
    fn find_selectors_reports_every_match() {
        let doc = json!({ "refs": [{ "t": "r" }, { "t": "x" }, { "t": "r" }] });
        let found = find_selectors(&doc, |value| value.get("t") == Some(&json!("r")));
        let paths: Vec<String> = found.iter().map(ToString::to_string).collect();
        assert_eq!(paths, vec!["refs.0", "refs.2"]);
    }
}
