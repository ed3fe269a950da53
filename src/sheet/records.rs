use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};

use super::columns::{ColumnKind, ColumnRegistry};

/// A single cell value. The default is the empty text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
}

impl Default for Value {
    fn default() -> Self {
        Value::Text(String::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Text(s) if s.is_empty())
    }

    /// Interprets edit text for a column of the given kind.
    pub fn coerce(text: &str, kind: ColumnKind) -> Value {
        if text.is_empty() {
            return Value::default();
        }
        match kind {
            ColumnKind::Number => match text.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Value::Number(n),
                _ => Value::Text(text.to_string()),
            },
            ColumnKind::Text => Value::Text(text.to_string()),
        }
    }

    /// Numbers compare numerically, text lexicographically, numbers before text.
    /// NaN orders after every other number, so this is a total order.
    pub fn natural_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.total_cmp(b),
            },
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Number(_), Value::Text(_)) => Ordering::Less,
            (Value::Text(_), Value::Number(_)) => Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: usize,
    values: HashMap<String, Value>,
}

impl Record {
    /// A record holding the default value for every registry column.
    pub fn empty(id: usize, columns: &ColumnRegistry) -> Self {
        let values = columns
            .keys()
            .map(|k| (k.to_string(), Value::default()))
            .collect();
        Record { id, values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.values()
    }

    fn set(&mut self, key: &str, value: Value) {
        if let Some(slot) = self.values.get_mut(key) {
            *slot = value;
        }
    }

    fn reconcile(&mut self, columns: &ColumnRegistry) {
        self.values.retain(|k, _| columns.contains(k));
        for key in columns.keys() {
            self.values
                .entry(key.to_string())
                .or_insert_with(Value::default);
        }
    }
}

/// Real records ordered by id. Ids are always exactly `1..=len`.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    /// Builds a store from raw rows. Ids are assigned in input order and
    /// every row is reconciled against the registry.
    pub fn from_rows(rows: Vec<HashMap<String, Value>>, columns: &ColumnRegistry) -> Self {
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(idx, values)| {
                let mut record = Record { id: idx + 1, values };
                record.reconcile(columns);
                record
            })
            .collect();
        RecordStore { records }
    }

    pub fn get(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn by_id(&self, id: usize) -> Option<&Record> {
        // Dense ids make the position lookup exact
        id.checked_sub(1).and_then(|idx| self.records.get(idx))
    }

    /// Sets `key` on the record with `id`. An id past the end materializes a
    /// new record at `len + 1`, so ids stay dense. Returns the id written to,
    /// or `None` when `key` is not a registry column.
    pub fn upsert_at_id(
        &mut self,
        id: usize,
        key: &str,
        value: Value,
        columns: &ColumnRegistry,
    ) -> Option<usize> {
        if !columns.contains(key) {
            trace!("Ignoring write to unknown column {key}");
            return None;
        }
        if id >= 1 && id <= self.records.len() {
            self.records[id - 1].set(key, value);
            debug!("Updated record {id} column {key}");
            Some(id)
        } else {
            let new_id = self.records.len() + 1;
            let mut record = Record::empty(new_id, columns);
            record.set(key, value);
            self.records.push(record);
            debug!("Materialized record {new_id} (requested id {id}) column {key}");
            Some(new_id)
        }
    }

    /// Removes the record with `id` and renumbers the survivors to `1..=len`.
    pub fn delete_by_id(&mut self, id: usize) -> Option<Record> {
        if id == 0 || id > self.records.len() {
            return None;
        }
        let removed = self.records.remove(id - 1);
        for (idx, record) in self.records.iter_mut().enumerate() {
            record.id = idx + 1;
        }
        debug!("Deleted record {id}, {} records left", self.records.len());
        Some(removed)
    }

    pub fn reconcile_columns(&mut self, columns: &ColumnRegistry) {
        for record in self.records.iter_mut() {
            record.reconcile(columns);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::columns::Column;

    fn registry() -> ColumnRegistry {
        ColumnRegistry::new(vec![
            Column::new("name", "Name"),
            Column::new("status", "Status"),
            Column::new("value", "Value").numeric(),
        ])
    }

    fn store(n: usize, columns: &ColumnRegistry) -> RecordStore {
        let rows = (1..=n)
            .map(|i| {
                HashMap::from([
                    ("name".to_string(), Value::from(format!("row {i}"))),
                    ("value".to_string(), Value::from(i as f64)),
                ])
            })
            .collect();
        RecordStore::from_rows(rows, columns)
    }

    fn ids(store: &RecordStore) -> Vec<usize> {
        store.get().iter().map(|r| r.id).collect()
    }

    #[test]
    fn rows_are_reconciled_on_load() {
        let reg = registry();
        let mut row = HashMap::new();
        row.insert("stray".to_string(), Value::from("x"));
        let s = RecordStore::from_rows(vec![row], &reg);
        let mut keys: Vec<&str> = s.get()[0].keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["name", "status", "value"]);
    }

    #[test]
    fn delete_renumbers_densely() {
        let reg = registry();
        let mut s = store(5, &reg);
        let removed = s.delete_by_id(3).unwrap();
        assert_eq!(removed.get("name"), Some(&Value::from("row 3")));
        assert_eq!(ids(&s), vec![1, 2, 3, 4]);
        assert_eq!(s.by_id(3).unwrap().get("name"), Some(&Value::from("row 4")));
        assert_eq!(s.by_id(4).unwrap().get("name"), Some(&Value::from("row 5")));
    }

    #[test]
    fn delete_out_of_range_is_noop() {
        let reg = registry();
        let mut s = store(2, &reg);
        assert!(s.delete_by_id(0).is_none());
        assert!(s.delete_by_id(3).is_none());
        assert_eq!(ids(&s), vec![1, 2]);
    }

    #[test]
    fn upsert_existing_touches_only_one_field() {
        let reg = registry();
        let mut s = store(3, &reg);
        let before = s.by_id(2).unwrap().clone();
        assert_eq!(s.upsert_at_id(2, "status", Value::from("Complete"), &reg), Some(2));
        let after = s.by_id(2).unwrap();
        assert_eq!(after.get("status"), Some(&Value::from("Complete")));
        assert_eq!(after.get("name"), before.get("name"));
        assert_eq!(after.get("value"), before.get("value"));
    }

    #[test]
    fn upsert_past_end_materializes_next_id() {
        let reg = registry();
        let mut s = store(3, &reg);
        assert_eq!(s.upsert_at_id(10, "name", Value::from("fresh"), &reg), Some(4));
        assert_eq!(ids(&s), vec![1, 2, 3, 4]);
        let rec = s.by_id(4).unwrap();
        assert_eq!(rec.get("name"), Some(&Value::from("fresh")));
        assert!(rec.get("status").unwrap().is_empty());
    }

    #[test]
    fn upsert_unknown_column_is_noop() {
        let reg = registry();
        let mut s = store(1, &reg);
        assert_eq!(s.upsert_at_id(1, "ghost", Value::from("x"), &reg), None);
        assert_eq!(s.upsert_at_id(5, "ghost", Value::from("x"), &reg), None);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn reconcile_tracks_registry() {
        let mut reg = registry();
        let mut s = store(2, &reg);
        let added = reg.add_column("New Column");
        s.reconcile_columns(&reg);
        assert!(s.get().iter().all(|r| r.get(&added.key) == Some(&Value::default())));
        reg.remove_column("status");
        s.reconcile_columns(&reg);
        for r in s.get() {
            let mut keys: Vec<&str> = r.keys().collect();
            keys.sort();
            let mut expected: Vec<&str> = reg.keys().collect();
            expected.sort();
            assert_eq!(keys, expected);
        }
    }

    #[test]
    fn coercion_follows_column_kind() {
        assert_eq!(Value::coerce("42", ColumnKind::Number), Value::Number(42.0));
        assert_eq!(Value::coerce(" 2.5 ", ColumnKind::Number), Value::Number(2.5));
        assert_eq!(Value::coerce("abc", ColumnKind::Number), Value::from("abc"));
        assert_eq!(Value::coerce("42", ColumnKind::Text), Value::from("42"));
        assert!(Value::coerce("", ColumnKind::Number).is_empty());
        assert_eq!(Value::coerce("NaN", ColumnKind::Number), Value::from("NaN"));
        assert_eq!(Value::coerce("inf", ColumnKind::Number), Value::from("inf"));
    }

    #[test]
    fn natural_ordering() {
        assert_eq!(Value::from(2.0).natural_cmp(&Value::from(10.0)), Ordering::Less);
        assert_eq!(Value::from("b").natural_cmp(&Value::from("a")), Ordering::Greater);
        assert_eq!(Value::from(99.0).natural_cmp(&Value::from("a")), Ordering::Less);
        assert_eq!(Value::from(6200000.0).to_string(), "6200000");
    }

    #[test]
    fn nan_orders_after_every_number() {
        let nan = Value::from(f64::NAN);
        assert_eq!(nan.natural_cmp(&Value::from(f64::INFINITY)), Ordering::Greater);
        assert_eq!(Value::from(-1.0).natural_cmp(&nan), Ordering::Less);
        assert_eq!(nan.natural_cmp(&Value::from(f64::NAN)), Ordering::Equal);
        assert_eq!(nan.natural_cmp(&Value::from("a")), Ordering::Less);
    }
}
