//! One output sink bound to tagged projections of shares.

use crate::binding::Link;
use crate::logging::error::LogError;
use crate::logging::rule::Rule;
use crate::store::{Clock, FieldBag, Share, ShareRef, Store, Value};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::trace;

/// A tagged projection: one share observed under a caller-chosen tag,
/// optionally narrowed to an explicit field list.
#[derive(Clone, Debug)]
pub struct Loggee {
    tag: String,
    share: Link<Share>,
    fields: Option<Vec<String>>,
}

impl Loggee {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn share(&self) -> &Link<Share> {
        &self.share
    }

    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }
}

/// One derived output column: a projected field of one loggee, bound to
/// its resolved share.
#[derive(Clone, Debug)]
struct Column {
    tag: String,
    field: String,
    header: String,
    share: ShareRef,
}

/// A log: a rule, an ordered set of loggee projections, and the sink
/// they are written to.
///
/// The sink's first line is `<kind>\t<RuleName>\t<name>`, the second the
/// column header; both are written exactly once per sink lifetime,
/// before any data row. Every data row starts with a `_time` column
/// holding the clock value at fire time in `%0.4f` form.
pub struct Log {
    name: String,
    rule: Rule,
    loggees: Vec<Loggee>,
    columns: Vec<Column>,
    lasts: HashMap<String, FieldBag>,
    streaks: HashMap<(String, String), usize>,
    decks: HashMap<String, usize>,
    stamp: Option<f64>,
    clock: Option<Clock>,
    path: PathBuf,
    file: Option<BufWriter<std::fs::File>>,
    headed: bool,
}

impl Log {
    pub fn new(name: impl Into<String>, rule: Rule) -> Self {
        Self {
            name: name.into(),
            rule,
            loggees: Vec::new(),
            columns: Vec::new(),
            lasts: HashMap::new(),
            streaks: HashMap::new(),
            decks: HashMap::new(),
            stamp: None,
            clock: None,
            path: PathBuf::new(),
            file: None,
            headed: false,
        }
    }

    /// Start assembling a log fluently.
    pub fn builder() -> super::builder::LogBuilder {
        super::builder::LogBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule(&self) -> Rule {
        self.rule
    }

    /// Clock value at the last fire that wrote at least one row.
    pub fn stamp(&self) -> Option<f64> {
        self.stamp
    }

    /// Sink path, empty until the owning logger first opens the log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn loggees(&self) -> &[Loggee] {
        &self.loggees
    }

    /// Project `share` under `tag`, columns taken from the share's own
    /// field order at prepare time.
    pub fn add_loggee(&mut self, tag: &str, share: &str) {
        self.loggees.push(Loggee {
            tag: tag.to_string(),
            share: Link::deferred(share),
            fields: None,
        });
    }

    /// Project `share` under `tag`, narrowed to `fields` in the given
    /// order.
    pub fn add_loggee_fields(&mut self, tag: &str, share: &str, fields: &[&str]) {
        self.loggees.push(Loggee {
            tag: tag.to_string(),
            share: Link::deferred(share),
            fields: Some(fields.iter().map(|f| f.to_string()).collect()),
        });
    }

    /// Bind every loggee's share link through the store (creating shares
    /// lazily) and capture the store's clock for row stamping.
    pub fn resolve(&mut self, store: &mut Store) {
        for loggee in &mut self.loggees {
            if let Link::Deferred(name) = &loggee.share {
                loggee.share = Link::Resolved(store.create(name));
            }
        }
        self.clock = Some(store.clock());
    }

    /// Derive the output columns and re-seed per-open rule state.
    ///
    /// Columns come one per projected field, in allow-list order when
    /// given, else the share's current field order. A field named
    /// `value` heads its column with the bare tag, any other field with
    /// `tag.field`. Deck projections must carry an allow-list: the
    /// share's transient field order says nothing about queue entries.
    /// The change rule's `lasts` cache re-seeds from current values;
    /// streak and deck cursors are left alone so draining resumes where
    /// it left off across re-opens.
    pub fn prepare(&mut self) -> Result<(), LogError> {
        let mut columns = Vec::new();
        for loggee in &self.loggees {
            let Some(share) = loggee.share.handle() else {
                return Err(LogError::Unresolved {
                    log: self.name.clone(),
                    tag: loggee.tag.clone(),
                });
            };
            let fields: Vec<String> = match &loggee.fields {
                Some(fields) => fields.clone(),
                None if self.rule == Rule::Deck => {
                    return Err(LogError::FieldsRequired {
                        log: self.name.clone(),
                        tag: loggee.tag.clone(),
                    });
                }
                None => share.borrow().fields().keys().cloned().collect(),
            };
            for field in fields {
                let header = if field == "value" {
                    loggee.tag.clone()
                } else {
                    format!("{}.{}", loggee.tag, field)
                };
                columns.push(Column {
                    tag: loggee.tag.clone(),
                    field,
                    header,
                    share: share.clone(),
                });
            }
        }
        self.columns = columns;

        if self.rule == Rule::Change {
            self.lasts.clear();
            self.refresh_lasts();
        }

        self.write_head()
    }

    /// Apply the rule once: decide whether to write, and write.
    pub fn fire(&mut self) -> Result<(), LogError> {
        if self.file.is_none() {
            return Err(LogError::NotOpen {
                log: self.name.clone(),
            });
        }
        trace!(log = %self.name, rule = %self.rule, "log fired");
        match self.rule {
            Rule::Always => self.write_row(),
            Rule::Never => Ok(()),
            Rule::Once => {
                if self.stamp.is_none() {
                    self.write_row()
                } else {
                    Ok(())
                }
            }
            Rule::Update => {
                if self.due_update() {
                    self.write_row()
                } else {
                    Ok(())
                }
            }
            Rule::Change => {
                if self.due_change() {
                    self.write_row()?;
                    self.refresh_lasts();
                }
                Ok(())
            }
            Rule::Streak => self.write_streak(),
            Rule::Deck => self.write_deck(),
        }
    }

    /// Flush buffered rows through to the sink.
    pub fn flush(&mut self) -> Result<(), LogError> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }

    /// The derived column headers, in output order.
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.header.as_str()).collect()
    }

    pub(crate) fn open(&mut self, dir: &Path) -> Result<(), LogError> {
        if self.path.as_os_str().is_empty() {
            self.path = dir.join(&self.name).with_extension("txt");
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.file = Some(BufWriter::new(file));
        Ok(())
    }

    pub(crate) fn close(&mut self) -> Result<(), LogError> {
        self.flush()?;
        self.file = None;
        Ok(())
    }

    fn write_head(&mut self) -> Result<(), LogError> {
        if self.headed || self.file.is_none() {
            return Ok(());
        }
        let mut head = format!("text\t{}\t{}\n_time", self.rule.title(), self.name);
        for column in &self.columns {
            head.push('\t');
            head.push_str(&column.header);
        }
        head.push('\n');
        self.write(&head)?;
        self.headed = true;
        Ok(())
    }

    fn now(&self) -> f64 {
        self.clock.as_ref().map(Clock::now).unwrap_or_default()
    }

    /// One row of current values: `_time` then every column, numeric
    /// fields as `%0.4f`, non-numeric values as raw text, missing fields
    /// as empty columns.
    fn write_row(&mut self) -> Result<(), LogError> {
        let now = self.now();
        let mut line = format!("{now:.4}");
        for column in &self.columns {
            line.push('\t');
            let share = column.share.borrow();
            if let Some(value) = share.get(&column.field) {
                match value.as_f64() {
                    Some(number) => line.push_str(&format!("{number:.4}")),
                    None => line.push_str(&value.to_string()),
                }
            }
        }
        line.push('\n');
        self.write(&line)?;
        self.stamp = Some(now);
        Ok(())
    }

    /// Any bound share written strictly after the last fire that wrote;
    /// a first fire is always due.
    fn due_update(&self) -> bool {
        let Some(last) = self.stamp else {
            return true;
        };
        self.loggees
            .iter()
            .filter_map(|l| l.share.handle())
            .any(|share| matches!(share.borrow().stamp(), Some(stamp) if stamp > last))
    }

    /// Any projected field differing from the cached last row; a first
    /// fire is always due.
    fn due_change(&self) -> bool {
        if self.stamp.is_none() {
            return true;
        }
        self.columns.iter().any(|column| {
            let share = column.share.borrow();
            let last = self
                .lasts
                .get(&column.tag)
                .and_then(|bag| bag.get(&column.field));
            share.get(&column.field) != last
        })
    }

    fn refresh_lasts(&mut self) {
        for column in &self.columns {
            let share = column.share.borrow();
            let last = self.lasts.entry(column.tag.clone()).or_default();
            match share.get(&column.field) {
                Some(value) => {
                    last.insert(column.field.clone(), value.clone());
                }
                None => {
                    last.shift_remove(&column.field);
                }
            }
        }
    }

    /// Raw-text rows, one per column in projection order: a list-valued
    /// field emits one row per element appended since its cursor, a
    /// scalar field emits its current value every fire. Every emitted
    /// row is stamped with the clock at fire time.
    fn write_streak(&mut self) -> Result<(), LogError> {
        let now = self.now();
        let mut lines = Vec::new();
        let mut cursors = Vec::new();
        for (index, column) in self.columns.iter().enumerate() {
            let share = column.share.borrow();
            match share.get(&column.field) {
                Some(Value::List(items)) => {
                    let key = (column.tag.clone(), column.field.clone());
                    let cursor = self.streaks.get(&key).copied().unwrap_or(0).min(items.len());
                    for item in &items[cursor..] {
                        lines.push(self.raw_row(now, index, Some(item)));
                    }
                    cursors.push((key, items.len()));
                }
                value => lines.push(self.raw_row(now, index, value)),
            }
        }
        for (key, len) in cursors {
            self.streaks.insert(key, len);
        }
        self.write_lines(now, lines)
    }

    /// Raw-text rows draining each projected deck from its cursor: one
    /// row per field-bag entry (requested fields, missing ones empty),
    /// stamped with the clock at fire time, not push time. Entries
    /// without field-bag shape are drained but not written.
    fn write_deck(&mut self) -> Result<(), LogError> {
        let now = self.now();
        let mut lines = Vec::new();
        let mut cursors = Vec::new();
        for loggee in &self.loggees {
            let Some(share) = loggee.share.handle() else {
                continue;
            };
            let share = share.borrow();
            let deck = share.deck();
            let cursor = self
                .decks
                .get(&loggee.tag)
                .copied()
                .unwrap_or(0)
                .min(deck.len());
            for entry in deck.since(cursor) {
                let Some(bag) = entry.as_bag() else {
                    continue;
                };
                let mut line = format!("{now:.4}");
                for column in &self.columns {
                    line.push('\t');
                    if column.tag == loggee.tag {
                        if let Some(value) = bag.get(&column.field) {
                            line.push_str(&value.to_string());
                        }
                    }
                }
                line.push('\n');
                lines.push(line);
            }
            cursors.push((loggee.tag.clone(), deck.len()));
        }
        for (tag, len) in cursors {
            self.decks.insert(tag, len);
        }
        self.write_lines(now, lines)
    }

    fn raw_row(&self, now: f64, index: usize, value: Option<&Value>) -> String {
        let mut line = format!("{now:.4}");
        for position in 0..self.columns.len() {
            line.push('\t');
            if position == index {
                if let Some(value) = value {
                    line.push_str(&value.to_string());
                }
            }
        }
        line.push('\n');
        line
    }

    fn write_lines(&mut self, now: f64, lines: Vec<String>) -> Result<(), LogError> {
        if lines.is_empty() {
            return Ok(());
        }
        for line in &lines {
            self.write(line)?;
        }
        self.stamp = Some(now);
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<(), LogError> {
        match self.file.as_mut() {
            Some(file) => {
                file.write_all(text.as_bytes())?;
                Ok(())
            }
            None => Err(LogError::NotOpen {
                log: self.name.clone(),
            }),
        }
    }
}
