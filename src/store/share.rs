//! Named field bags with write stamps, marks, and an attached deck.

use super::clock::Clock;
use super::value::{FieldBag, Value};
use crate::binding::Named;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle on a [`Share`]. The engine is single-threaded and
/// cooperative, so interior mutability is enough.
pub type ShareRef = Rc<RefCell<Share>>;

/// A checkpoint against a share: the clock value when it was last
/// refreshed and a deep snapshot of the fields at that instant.
///
/// Marks are created empty the first time a staleness need is resolved
/// for a tag, and refreshed by the marker installed on the guarded frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    /// Clock value at the last refresh, `None` until first refreshed.
    pub stamp: Option<f64>,
    /// Field snapshot taken at the last refresh.
    pub data: Option<FieldBag>,
}

/// Append-only queue of heterogeneous entries attached to a share.
///
/// Consumers keep their own cursors (plain indices) and drain entries in
/// push order exactly once each; pushing never blocks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    entries: Vec<Value>,
}

impl Deck {
    /// Append an entry.
    pub fn push(&mut self, entry: impl Into<Value>) {
        self.entries.push(entry.into());
    }

    /// Number of entries ever pushed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries pushed at or after `cursor`, in push order.
    pub fn since(&self, cursor: usize) -> &[Value] {
        &self.entries[cursor.min(self.entries.len())..]
    }

    /// All entries, in push order.
    pub fn entries(&self) -> &[Value] {
        &self.entries
    }
}

/// A named, ordered field bag in the store.
///
/// Every field mutation stamps the share with the store clock's current
/// value, even when the written value equals the old one: mutation, not
/// value inequality, is what stamps track.
///
/// # Example
///
/// ```rust
/// use reflex::store::Store;
/// use reflex::fields;
///
/// let mut store = Store::new("test");
/// let heading = store.create("pose.heading");
///
/// store.advance_stamp(0.125);
/// heading.borrow_mut().update(fields! { "value" => 0.0 });
/// assert_eq!(heading.borrow().stamp(), Some(0.125));
/// ```
#[derive(Clone, Debug)]
pub struct Share {
    name: String,
    fields: FieldBag,
    stamp: Option<f64>,
    marks: HashMap<String, Mark>,
    deck: Deck,
    clock: Clock,
}

impl Share {
    pub(crate) fn new(name: impl Into<String>, clock: Clock) -> Self {
        Self {
            name: name.into(),
            fields: FieldBag::new(),
            stamp: None,
            marks: HashMap::new(),
            deck: Deck::default(),
            clock,
        }
    }

    /// Dotted path name, unique within the owning store.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clock value at the last field mutation, `None` until first write.
    pub fn stamp(&self) -> Option<f64> {
        self.stamp
    }

    /// The fields in insertion order.
    pub fn fields(&self) -> &FieldBag {
        &self.fields
    }

    /// Read one field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Merge the given fields in and stamp the share.
    pub fn update<I, K, V>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in fields {
            self.fields.insert(name.into(), value.into());
        }
        self.stamp_now();
    }

    /// Write one field and stamp the share.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
        self.stamp_now();
    }

    /// Initialize fields that are not already present. Stamps the share
    /// only when something was actually written.
    pub fn init<I, K, V>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut wrote = false;
        for (name, value) in fields {
            let name = name.into();
            if !self.fields.contains_key(&name) {
                self.fields.insert(name, value.into());
                wrote = true;
            }
        }
        if wrote {
            self.stamp_now();
        }
    }

    /// Append an entry to the deck and stamp the share.
    pub fn push(&mut self, entry: impl Into<Value>) {
        self.deck.push(entry);
        self.stamp_now();
    }

    /// The attached deck.
    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    /// Return-or-create the mark for `tag`. A fresh mark is empty: it
    /// records nothing until first refreshed.
    pub fn mark(&mut self, tag: &str) -> &mut Mark {
        self.marks.entry(tag.to_string()).or_default()
    }

    /// Look up the mark for `tag` without creating it.
    pub fn get_mark(&self, tag: &str) -> Option<&Mark> {
        self.marks.get(tag)
    }

    /// Refresh the mark for `tag`: stamp it with the clock's current
    /// value and snapshot the fields. The snapshot is deep and
    /// independent of later field mutations.
    pub fn update_mark(&mut self, tag: &str) {
        let stamp = self.clock.now();
        let data = self.fields.clone();
        let mark = self.marks.entry(tag.to_string()).or_default();
        mark.stamp = Some(stamp);
        mark.data = Some(data);
    }

    /// True iff the share was written at or after the mark for `tag` was
    /// refreshed. `>=` rather than `>` so a write landing on the same
    /// tick as the mark still counts. False while the mark is unset.
    pub fn updated_since(&self, tag: &str) -> bool {
        let mark_stamp = self.marks.get(tag).and_then(|m| m.stamp);
        matches!((self.stamp, mark_stamp), (Some(s), Some(m)) if s >= m)
    }

    /// True iff some field differs from the snapshot recorded for `tag`,
    /// or exists only in the share (a newly added field counts as
    /// changed). Short-circuits on the first difference. False while the
    /// mark holds no snapshot.
    pub fn changed_since(&self, tag: &str) -> bool {
        let Some(data) = self.marks.get(tag).and_then(|m| m.data.as_ref()) else {
            return false;
        };
        self.fields
            .iter()
            .any(|(field, value)| data.get(field) != Some(value))
    }

    fn stamp_now(&mut self) {
        self.stamp = Some(self.clock.now());
    }
}

impl Named for Share {
    fn name(&self) -> &str {
        &self.name
    }
}
