use rayon::prelude::*;
use std::cmp::Ordering;
use tracing::trace;

use super::columns::{Column, ColumnRegistry};
use super::records::{Record, RecordStore};

/// Key of the column the status filter compares against.
pub const STATUS_KEY: &str = "status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(String),
}

impl StatusFilter {
    fn accepts(&self, record: &Record) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => {
                let status = record
                    .get(STATUS_KEY)
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                status.to_lowercase() == wanted.to_lowercase()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewParams {
    pub search: String,
    pub sort: Option<SortSpec>,
    pub filter: StatusFilter,
    pub requested_rows: usize,
}

impl Default for ViewParams {
    fn default() -> Self {
        ViewParams {
            search: String::new(),
            sort: None,
            filter: StatusFilter::All,
            requested_rows: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    pub record: Record,
    pub padding: bool,
}

impl DisplayRow {
    pub fn id(&self) -> usize {
        self.record.id
    }
}

/// The derived sequence of rows plus the visible column projection.
#[derive(Debug, Clone, Default)]
pub struct View {
    pub rows: Vec<DisplayRow>,
    pub columns: Vec<Column>,
}

impl View {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, idx: usize) -> Option<&DisplayRow> {
        self.rows.get(idx)
    }

    pub fn column_position(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.key == key)
    }
}

/// Pads, searches, sorts and status-filters the records, in that order.
pub fn build_view(records: &RecordStore, columns: &ColumnRegistry, params: &ViewParams) -> View {
    let mut rows: Vec<DisplayRow> = records
        .get()
        .iter()
        .map(|r| DisplayRow {
            record: r.clone(),
            padding: false,
        })
        .collect();

    for id in records.len() + 1..=params.requested_rows {
        rows.push(DisplayRow {
            record: Record::empty(id, columns),
            padding: true,
        });
    }

    if !params.search.is_empty() {
        rows = search_rows(rows, &params.search);
    }

    if let Some(spec) = &params.sort
        && columns.get(&spec.column).is_some_and(|c| c.sortable)
    {
        rows = sort_rows(rows, spec);
    }

    if params.filter != StatusFilter::All {
        rows.retain(|row| params.filter.accepts(&row.record));
    }

    trace!(
        "Built view: {} rows from {} records, requested {}",
        rows.len(),
        records.len(),
        params.requested_rows
    );

    View {
        rows,
        columns: columns.visible_columns().into_iter().cloned().collect(),
    }
}

fn search_rows(rows: Vec<DisplayRow>, term: &str) -> Vec<DisplayRow> {
    let term = term.to_lowercase();
    rows.into_par_iter()
        .filter(|row| {
            row.record
                .values()
                .any(|v| v.to_string().to_lowercase().contains(&term))
        })
        .collect()
}

// Rows with an empty value for the sort column keep their prior order at the end
fn sort_rows(rows: Vec<DisplayRow>, spec: &SortSpec) -> Vec<DisplayRow> {
    let (mut filled, empty): (Vec<DisplayRow>, Vec<DisplayRow>) = rows
        .into_iter()
        .partition(|row| row.record.get(&spec.column).is_some_and(|v| !v.is_empty()));

    filled.sort_by(|a, b| {
        let ord = match (a.record.get(&spec.column), b.record.get(&spec.column)) {
            (Some(x), Some(y)) => x.natural_cmp(y),
            _ => Ordering::Equal,
        };
        match spec.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    filled.extend(empty);
    filled
}
