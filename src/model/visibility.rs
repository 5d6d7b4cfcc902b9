use indexmap::IndexMap;

use crate::core::{DateInterval, DeltaBuilder, Document, Intervals, union_extent};

#[derive(Debug, Clone)]
pub(crate) struct FilterEntry {
    pub(crate) doc: Document,
    pub(crate) intervals: Intervals,
    pub(crate) visible: bool,
}

/// Documents tracked by a filtering stage, in arrival order.
///
/// Every mutation records the visible consequence in a `DeltaBuilder`.
#[derive(Debug, Default)]
pub(crate) struct VisibilityTable {
    entries: IndexMap<String, FilterEntry>,
}

impl VisibilityTable {
    /// Inserts or replaces a document.
    pub(crate) fn upsert(
        &mut self,
        doc: &Document,
        intervals: Intervals,
        visible: bool,
        delta: &mut DeltaBuilder,
    ) {
        let previous = self.entries.insert(
            doc.id().to_owned(),
            FilterEntry {
                doc: doc.clone(),
                intervals,
                visible,
            },
        );
        match (previous.map(|entry| entry.visible), visible) {
            (None | Some(false), true) => delta.add(doc.clone()),
            (Some(true), true) => delta.update(doc.clone()),
            (Some(true), false) => delta.remove(doc.clone()),
            (None | Some(false), false) => {}
        }
    }

    /// Forgets a document; reports `doc` as removed if it was visible.
    pub(crate) fn remove(&mut self, doc: &Document, delta: &mut DeltaBuilder) {
        if let Some(entry) = self.entries.shift_remove(doc.id()) {
            if entry.visible {
                delta.remove(doc.clone());
            }
        }
    }

    /// Re-evaluates every document and records visibility flips.
    pub(crate) fn revisit<F>(&mut self, mut is_visible: F, delta: &mut DeltaBuilder)
    where
        F: FnMut(&Intervals) -> bool,
    {
        for entry in self.entries.values_mut() {
            let visible = is_visible(&entry.intervals);
            if visible == entry.visible {
                continue;
            }
            entry.visible = visible;
            if visible {
                delta.add(entry.doc.clone());
            } else {
                delta.remove(entry.doc.clone());
            }
        }
    }

    pub(crate) fn get(&self, id: &str) -> Option<&FilterEntry> {
        self.entries.get(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn visible_documents(&self) -> Vec<Document> {
        self.entries
            .values()
            .filter(|entry| entry.visible)
            .map(|entry| entry.doc.clone())
            .collect()
    }

    /// Union of every tracked interval.
    pub(crate) fn extent(&self, now: i64) -> Option<DateInterval> {
        union_extent(
            self.entries.values().flat_map(|entry| entry.intervals.iter()),
            now,
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::VisibilityTable;
    use crate::core::{DateInterval, DeltaBuilder, Document, Intervals};

    fn doc(id: &str) -> Document {
        Document::new(json!({ "_id": id })).expect("document")
    }

    #[test]
    fn hidden_documents_are_tracked_but_not_reported() {
        let mut table = VisibilityTable::default();
        let mut delta = DeltaBuilder::new();
        table.upsert(&doc("a"), Intervals::new(), false, &mut delta);
        assert!(delta.is_empty());
        assert_eq!(table.len(), 1);

        table.remove(&doc("a"), &mut delta);
        assert!(delta.is_empty());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn revisit_reports_only_flips() {
        let mut table = VisibilityTable::default();
        let mut setup = DeltaBuilder::new();
        let early: Intervals = [DateInterval::instant(5)].into_iter().collect();
        let late: Intervals = [DateInterval::instant(50)].into_iter().collect();
        table.upsert(&doc("early"), early, true, &mut setup);
        table.upsert(&doc("late"), late, false, &mut setup);

        let mut delta = DeltaBuilder::new();
        table.revisit(|intervals| intervals[0].min() > 10, &mut delta);
        let state = delta.finish(false);
        assert_eq!(state.added, vec![doc("late")]);
        assert_eq!(state.removed, vec![doc("early")]);
        assert_eq!(table.extent(0), DateInterval::new(5, 50).ok());
    }
}
