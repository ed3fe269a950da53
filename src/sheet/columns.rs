use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// How committed edit text is interpreted for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnKind {
    #[default]
    Text,
    Number,
}

/// Styling metadata for the renderer. The engine never looks at it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayHint {
    pub class: String,
    pub icon: String,
    pub width: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub key: String,
    pub label: String,
    pub visible: bool,
    pub sortable: bool,
    pub kind: ColumnKind,
    pub hint: DisplayHint,
}

impl Column {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Column {
            key: key.into(),
            label: label.into(),
            visible: true,
            sortable: true,
            kind: ColumnKind::Text,
            hint: DisplayHint::default(),
        }
    }

    pub fn numeric(mut self) -> Self {
        self.kind = ColumnKind::Number;
        self
    }

    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    pub fn with_hint(mut self, hint: DisplayHint) -> Self {
        self.hint = hint;
        self
    }
}

/// Ordered set of column definitions. Keys are unique at all times.
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    columns: Vec<Column>,
    // Millisecond stamp of the last generated key, keeps generated keys strictly increasing
    last_stamp: u128,
}

impl ColumnRegistry {
    pub fn new(columns: Vec<Column>) -> Self {
        let mut registry = ColumnRegistry::default();
        for column in columns {
            if registry.contains(&column.key) {
                warn!("Dropping duplicate column key \"{}\"", column.key);
                continue;
            }
            registry.columns.push(column);
        }
        registry
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.key.as_str())
    }

    /// Appends a visible, sortable text column under a freshly generated key.
    /// Records are not touched here, the caller reconciles them.
    pub fn add_column(&mut self, label: impl Into<String>) -> Column {
        let key = self.generate_key();
        let column = Column::new(key, label);
        debug!("Adding column {} \"{}\"", column.key, column.label);
        self.columns.push(column.clone());
        column
    }

    pub fn remove_column(&mut self, key: &str) -> Option<Column> {
        let pos = self.columns.iter().position(|c| c.key == key)?;
        let removed = self.columns.remove(pos);
        debug!("Removed column {} at position {}", removed.key, pos);
        Some(removed)
    }

    /// Flips visibility and returns the new state, `None` for an unknown key.
    pub fn toggle_visibility(&mut self, key: &str) -> Option<bool> {
        let column = self.columns.iter_mut().find(|c| c.key == key)?;
        column.visible = !column.visible;
        Some(column.visible)
    }

    pub fn visible_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.visible).collect()
    }

    fn generate_key(&mut self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let mut stamp = std::cmp::max(now, self.last_stamp + 1);
        // A column loaded from file may already carry a key of the same shape
        while self.contains(&format!("column_{stamp}")) {
            stamp += 1;
        }
        self.last_stamp = stamp;
        format!("column_{stamp}")
    }
}
