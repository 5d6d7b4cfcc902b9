use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{ModelError, ModelResult};

/// Field holding the document identifier.
pub const DOCUMENT_ID_FIELD: &str = "_id";

/// Opaque JSON document with a stable string identifier.
///
/// Bodies are shared between clones; stages derive new documents instead of
/// mutating the ones they receive.
#[derive(Debug, Clone)]
pub struct Document {
    id: Rc<str>,
    body: Rc<Value>,
}

impl Document {
    /// Wraps a JSON object carrying a string `_id`.
    pub fn new(body: Value) -> ModelResult<Self> {
        let id = match &body {
            Value::Object(fields) => match fields.get(DOCUMENT_ID_FIELD) {
                Some(Value::String(id)) => Rc::<str>::from(id.as_str()),
                Some(_) => {
                    return Err(ModelError::InvalidDocument(
                        "`_id` must be a string".to_owned(),
                    ));
                }
                None => {
                    return Err(ModelError::InvalidDocument(
                        "document has no `_id`".to_owned(),
                    ));
                }
            },
            _ => {
                return Err(ModelError::InvalidDocument(
                    "document must be a JSON object".to_owned(),
                ));
            }
        };

        Ok(Self {
            id,
            body: Rc::new(body),
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Builds a derived document sharing this identifier.
    ///
    /// The caller keeps the `_id` field intact.
    #[must_use]
    pub(crate) fn derive(&self, body: Value) -> Self {
        Self {
            id: Rc::clone(&self.id),
            body: Rc::new(body),
        }
    }

    /// `true` when both handles point at the same body allocation.
    #[must_use]
    pub fn shares_body_with(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && (self.shares_body_with(other) || self.body == other.body)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}

/// Delta describing a change in the documents a model makes visible.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelState {
    pub added: Vec<Document>,
    pub updated: Vec<Document>,
    pub removed: Vec<Document>,
    pub loading: bool,
}

impl ModelState {
    /// A full-state snapshot: every document reported as added.
    #[must_use]
    pub fn snapshot(documents: Vec<Document>, loading: bool) -> Self {
        Self {
            added: documents,
            updated: Vec::new(),
            removed: Vec::new(),
            loading,
        }
    }

    /// `true` when no document changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    #[must_use]
    pub fn change_count(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }
}

/// Collects one outgoing delta, keeping only the net effect per document.
///
/// A document never ends up in both `added` and `removed`.
#[derive(Debug, Default)]
pub struct DeltaBuilder {
    added: IndexMap<Rc<str>, Document>,
    updated: IndexMap<Rc<str>, Document>,
    removed: IndexMap<Rc<str>, Document>,
}

impl DeltaBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, document: Document) {
        let id = Rc::clone(&document.id);
        if self.removed.shift_remove(&id).is_some() || self.updated.contains_key(&id) {
            self.updated.insert(id, document);
        } else {
            self.added.insert(id, document);
        }
    }

    pub fn update(&mut self, document: Document) {
        let id = Rc::clone(&document.id);
        if let Some(slot) = self.added.get_mut(&id) {
            *slot = document;
        } else {
            self.removed.shift_remove(&id);
            self.updated.insert(id, document);
        }
    }

    pub fn remove(&mut self, document: Document) {
        let id = Rc::clone(&document.id);
        if self.added.shift_remove(&id).is_some() {
            return;
        }
        self.updated.shift_remove(&id);
        self.removed.insert(id, document);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    #[must_use]
    pub fn finish(self, loading: bool) -> ModelState {
        ModelState {
            added: self.added.into_values().collect(),
            updated: self.updated.into_values().collect(),
            removed: self.removed.into_values().collect(),
            loading,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{DeltaBuilder, Document};

    fn doc(id: &str, rev: u32) -> Document {
        Document::new(json!({ "_id": id, "rev": rev })).expect("document")
    }

    #[test]
    fn document_requires_string_id() {
        assert!(Document::new(json!({ "_id": 5 })).is_err());
        assert!(Document::new(json!({ "name": "x" })).is_err());
        assert!(Document::new(json!(["_id"])).is_err());
        assert_eq!(doc("a", 1).id(), "a");
    }

    #[test]
    fn remove_after_add_cancels_out() {
        let mut delta = DeltaBuilder::new();
        delta.add(doc("a", 1));
        delta.remove(doc("a", 1));
        assert!(delta.is_empty());
    }

    #[test]
    fn update_after_add_stays_an_addition() {
        let mut delta = DeltaBuilder::new();
        delta.add(doc("a", 1));
        delta.update(doc("a", 2));
        let state = delta.finish(false);
        assert_eq!(state.added, vec![doc("a", 2)]);
        assert!(state.updated.is_empty());
    }

    #[test]
    fn add_after_remove_becomes_update() {
        let mut delta = DeltaBuilder::new();
        delta.remove(doc("a", 1));
        delta.add(doc("a", 2));
        let state = delta.finish(true);
        assert!(state.added.is_empty());
        assert!(state.removed.is_empty());
        assert_eq!(state.updated, vec![doc("a", 2)]);
        assert!(state.loading);
    }

    #[test]
    fn remove_after_update_reports_removal_only() {
        let mut delta = DeltaBuilder::new();
        delta.update(doc("a", 2));
        delta.remove(doc("a", 2));
        let state = delta.finish(false);
        assert!(state.updated.is_empty());
        assert_eq!(state.removed, vec![doc("a", 2)]);
    }
}
