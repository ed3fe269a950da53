use std::collections::HashMap;
use tracing::{debug, trace};

use super::columns::{Column, ColumnRegistry};
use super::records::{Record, RecordStore, Value};
use super::selection::{EditState, Interaction, NavKey, Phase, Selection};
use super::view::{SortDirection, SortSpec, StatusFilter, View, ViewParams, build_view};

/// Label given to columns created through `AddColumnButtonClick`.
pub const NEW_COLUMN_LABEL: &str = "New Column";

/// User intent forwarded by the rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    CellClick { row: usize, column: String },
    CellDoubleClick { row: usize, column: String },
    RowHeaderClick(usize),
    ColumnHeaderClick(String),
    SortClick(String),
    KeyPress(NavKey),
    EditInput(String),
    AddRowButtonClick,
    AddColumnButtonClick,
    ToggleColumnVisibility(String),
    TabSelected(StatusFilter),
    SearchInput(String),
    ExportClick,
}

/// What an applied intent changed, for the caller to report on.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SelectionChanged,
    EditStarted { row: usize, column: String },
    EditUpdated,
    CellCommitted { id: usize, column: String, materialized: bool },
    EditCancelled,
    RowAdded { requested_rows: usize },
    RowDeleted { id: Option<usize>, requested_rows: usize },
    ColumnAdded(String),
    ColumnDeleted(String),
    VisibilityToggled { column: String, visible: bool },
    Sorted(SortSpec),
    FilterChanged(StatusFilter),
    SearchChanged(String),
    ExportReady(ExportSnapshot),
}

/// Fully materialized data handed to the export collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSnapshot {
    pub columns: Vec<Column>,
    pub rows: Vec<Record>,
}

/// One editing session over a table. The only writer of its records and columns.
#[derive(Debug, Clone)]
pub struct Sheet {
    columns: ColumnRegistry,
    records: RecordStore,
    params: ViewParams,
    view: View,
    interaction: Interaction,
}

impl Sheet {
    pub fn new(
        columns: Vec<Column>,
        rows: Vec<HashMap<String, Value>>,
        requested_rows: usize,
    ) -> Self {
        let columns = ColumnRegistry::new(columns);
        let records = RecordStore::from_rows(rows, &columns);
        let params = ViewParams {
            requested_rows: std::cmp::max(1, requested_rows),
            ..ViewParams::default()
        };
        let mut sheet = Sheet {
            columns,
            records,
            params,
            view: View::default(),
            interaction: Interaction::default(),
        };
        sheet.refresh();
        sheet
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn params(&self) -> &ViewParams {
        &self.params
    }

    pub fn requested_rows(&self) -> usize {
        self.params.requested_rows
    }

    pub fn selection(&self) -> &Selection {
        self.interaction.selection()
    }

    pub fn editing(&self) -> Option<&EditState> {
        self.interaction.editing()
    }

    pub fn phase(&self) -> Phase {
        self.interaction.phase()
    }

    pub fn apply(&mut self, intent: Intent) -> Option<Effect> {
        trace!("Apply {intent:?} in phase {:?}", self.phase());
        match intent {
            Intent::CellClick { row, column } => self.cell_click(row, &column),
            Intent::CellDoubleClick { row, column } => self.begin_edit(row, &column),
            Intent::RowHeaderClick(row) => self.row_header_click(row),
            Intent::ColumnHeaderClick(key) => self.column_header_click(&key),
            Intent::SortClick(key) => self.sort(&key),
            Intent::KeyPress(key) => self.key_press(key),
            Intent::EditInput(text) => self.set_edit_value(text),
            Intent::AddRowButtonClick => Some(self.add_row()),
            Intent::AddColumnButtonClick => Some(self.add_column(NEW_COLUMN_LABEL)),
            Intent::ToggleColumnVisibility(key) => self.toggle_column_visibility(&key),
            Intent::TabSelected(filter) => Some(self.set_filter(filter)),
            Intent::SearchInput(term) => Some(self.set_search(term)),
            Intent::ExportClick => Some(Effect::ExportReady(self.export_snapshot())),
        }
    }

    pub fn cell_click(&mut self, row: usize, column: &str) -> Option<Effect> {
        let row = self.clamp_row(row)?;
        self.view.column_position(column)?;
        self.interaction.select_cell(row, column);
        Some(Effect::SelectionChanged)
    }

    pub fn row_header_click(&mut self, row: usize) -> Option<Effect> {
        let row = self.clamp_row(row)?;
        self.interaction.select_row(row);
        Some(Effect::SelectionChanged)
    }

    pub fn column_header_click(&mut self, key: &str) -> Option<Effect> {
        self.view.column_position(key)?;
        self.interaction.select_column(key);
        Some(Effect::SelectionChanged)
    }

    /// Copies the display row's current value into the edit buffer.
    pub fn begin_edit(&mut self, row: usize, column: &str) -> Option<Effect> {
        let row = self.clamp_row(row)?;
        self.view.column_position(column)?;
        let display = self.view.row(row)?;
        let buffer = display
            .record
            .get(column)
            .map(|v| v.to_string())
            .unwrap_or_default();
        let row_id = display.id();
        debug!("Editing row {row} (id {row_id}) column {column}");
        self.interaction.start_edit(row, column, row_id, buffer);
        Some(Effect::EditStarted {
            row,
            column: column.to_string(),
        })
    }

    pub fn set_edit_value(&mut self, text: String) -> Option<Effect> {
        self.interaction
            .set_buffer(text)
            .then_some(Effect::EditUpdated)
    }

    /// Writes the pending buffer to the record the edited row carried.
    pub fn commit_edit(&mut self) -> Option<Effect> {
        let edit = self.interaction.finish_edit()?;
        let kind = self.columns.get(&edit.column)?.kind;
        let value = Value::coerce(&edit.buffer, kind);
        let materialized = edit.row_id > self.records.len();
        let id = self
            .records
            .upsert_at_id(edit.row_id, &edit.column, value, &self.columns)?;
        self.refresh();
        Some(Effect::CellCommitted {
            id,
            column: edit.column,
            materialized,
        })
    }

    pub fn cancel_edit(&mut self) -> Option<Effect> {
        self.interaction.finish_edit()?;
        Some(Effect::EditCancelled)
    }

    pub fn delete_selected_row(&mut self) -> Option<Effect> {
        let row = self.interaction.selected_row()?;
        let id = self
            .view
            .row(row)
            .map(|r| r.id())
            .filter(|&id| id <= self.records.len())
            .and_then(|id| self.records.delete_by_id(id).map(|_| id));
        self.params.requested_rows = std::cmp::max(1, self.params.requested_rows - 1);
        self.interaction.clear();
        self.refresh();
        Some(Effect::RowDeleted {
            id,
            requested_rows: self.params.requested_rows,
        })
    }

    pub fn delete_selected_column(&mut self) -> Option<Effect> {
        let key = self.interaction.selected_column()?.to_string();
        self.interaction.clear();
        self.columns.remove_column(&key)?;
        self.records.reconcile_columns(&self.columns);
        if self.params.sort.as_ref().is_some_and(|s| s.column == key) {
            self.params.sort = None;
        }
        self.refresh();
        Some(Effect::ColumnDeleted(key))
    }

    pub fn add_row(&mut self) -> Effect {
        self.params.requested_rows += 1;
        self.refresh();
        Effect::RowAdded {
            requested_rows: self.params.requested_rows,
        }
    }

    pub fn add_column(&mut self, label: &str) -> Effect {
        let column = self.columns.add_column(label);
        self.records.reconcile_columns(&self.columns);
        self.refresh();
        Effect::ColumnAdded(column.key)
    }

    pub fn toggle_column_visibility(&mut self, key: &str) -> Option<Effect> {
        let visible = self.columns.toggle_visibility(key)?;
        self.refresh();
        Some(Effect::VisibilityToggled {
            column: key.to_string(),
            visible,
        })
    }

    /// Ascending on a new column, then flips between ascending and descending.
    pub fn sort(&mut self, key: &str) -> Option<Effect> {
        if !self.columns.get(key)?.sortable {
            trace!("Column {key} is not sortable");
            return None;
        }
        let direction = match &self.params.sort {
            Some(spec) if spec.column == key => spec.direction.flipped(),
            _ => SortDirection::Asc,
        };
        let spec = SortSpec {
            column: key.to_string(),
            direction,
        };
        self.params.sort = Some(spec.clone());
        self.refresh();
        Some(Effect::Sorted(spec))
    }

    pub fn set_search(&mut self, term: String) -> Effect {
        self.params.search = term.clone();
        self.refresh();
        Effect::SearchChanged(term)
    }

    pub fn set_filter(&mut self, filter: StatusFilter) -> Effect {
        self.params.filter = filter.clone();
        self.refresh();
        Effect::FilterChanged(filter)
    }

    pub fn key_press(&mut self, key: NavKey) -> Option<Effect> {
        match (self.phase(), key) {
            (Phase::Editing, NavKey::Enter) => self.commit_edit(),
            (Phase::Editing, NavKey::Escape) => self.cancel_edit(),
            (Phase::Editing, _) => None,
            (Phase::Idle, _) => None,
            (Phase::Selected, NavKey::Escape) => {
                self.interaction.clear();
                Some(Effect::SelectionChanged)
            }
            (Phase::Selected, NavKey::Delete) => match self.interaction.selection() {
                Selection::Row(_) => self.delete_selected_row(),
                Selection::Column(_) => self.delete_selected_column(),
                _ => None,
            },
            (Phase::Selected, NavKey::Enter) => {
                let (row, column) = self.interaction.selected_cell()?;
                let column = column.to_string();
                self.begin_edit(row, &column)
            }
            (Phase::Selected, nav) => self
                .interaction
                .move_cell(nav, &self.view)
                .then_some(Effect::SelectionChanged),
        }
    }

    /// Visible columns and the current view without padding rows.
    pub fn export_snapshot(&self) -> ExportSnapshot {
        ExportSnapshot {
            columns: self.view.columns.clone(),
            rows: self
                .view
                .rows
                .iter()
                .filter(|r| !r.padding)
                .map(|r| r.record.clone())
                .collect(),
        }
    }

    fn clamp_row(&self, row: usize) -> Option<usize> {
        if self.view.is_empty() {
            None
        } else {
            Some(std::cmp::min(row, self.view.len() - 1))
        }
    }

    fn refresh(&mut self) {
        self.view = build_view(&self.records, &self.columns, &self.params);
        self.interaction.revalidate(&self.view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    fn seeded() -> Sheet {
        Sheet::new(seed::initial_columns(), seed::initial_rows(), 25)
    }

    fn ids(sheet: &Sheet) -> Vec<usize> {
        sheet.records().get().iter().map(|r| r.id).collect()
    }

    fn key_sets_match(sheet: &Sheet) -> bool {
        let mut expected: Vec<&str> = sheet.columns().keys().collect();
        expected.sort();
        sheet.records().get().iter().all(|r| {
            let mut keys: Vec<&str> = r.keys().collect();
            keys.sort();
            keys == expected
        })
    }

    #[test]
    fn add_row_only_grows_the_view() {
        let mut sheet = seeded();
        let before = sheet.records().get().to_vec();
        for _ in 0..5 {
            sheet.apply(Intent::AddRowButtonClick);
        }
        assert_eq!(sheet.requested_rows(), 30);
        assert_eq!(sheet.view().len(), 30);
        assert_eq!(sheet.records().get(), before.as_slice());
    }

    #[test]
    fn edit_commit_updates_one_field() {
        let mut sheet = seeded();
        let before = sheet.records().by_id(2).unwrap().clone();
        sheet.apply(Intent::CellDoubleClick {
            row: 1,
            column: "status".to_string(),
        });
        assert_eq!(sheet.editing().unwrap().buffer, "Need to start");
        sheet.apply(Intent::EditInput("Complete".to_string()));
        let effect = sheet.apply(Intent::KeyPress(NavKey::Enter));
        assert_eq!(
            effect,
            Some(Effect::CellCommitted {
                id: 2,
                column: "status".to_string(),
                materialized: false
            })
        );
        assert_eq!(sheet.phase(), Phase::Idle);
        let after = sheet.records().by_id(2).unwrap();
        assert_eq!(after.get("status"), Some(&Value::from("Complete")));
        for key in sheet.columns().keys().filter(|k| *k != "status") {
            assert_eq!(after.get(key), before.get(key));
        }
    }

    #[test]
    fn delete_row_renumbers_and_shrinks_request() {
        let mut sheet = seeded();
        sheet.apply(Intent::RowHeaderClick(2));
        let effect = sheet.apply(Intent::KeyPress(NavKey::Delete));
        assert_eq!(
            effect,
            Some(Effect::RowDeleted {
                id: Some(3),
                requested_rows: 24
            })
        );
        assert_eq!(ids(&sheet), vec![1, 2, 3, 4]);
        assert_eq!(
            sheet.records().by_id(3).unwrap().get("submitter"),
            Some(&Value::from("Emily Green"))
        );
        assert_eq!(
            sheet.records().by_id(4).unwrap().get("submitter"),
            Some(&Value::from("Jessica Brown"))
        );
        assert_eq!(sheet.phase(), Phase::Idle);
    }

    #[test]
    fn deleting_padding_row_only_shrinks_request() {
        let mut sheet = seeded();
        sheet.row_header_click(20);
        let effect = sheet.delete_selected_row();
        assert_eq!(
            effect,
            Some(Effect::RowDeleted {
                id: None,
                requested_rows: 24
            })
        );
        assert_eq!(sheet.records().len(), 5);
        assert_eq!(sheet.view().len(), 24);
    }

    #[test]
    fn requested_rows_never_drop_below_one() {
        let mut sheet = Sheet::new(seed::initial_columns(), Vec::new(), 1);
        sheet.row_header_click(0);
        sheet.delete_selected_row();
        assert_eq!(sheet.requested_rows(), 1);
        assert_eq!(sheet.view().len(), 1);
    }

    #[test]
    fn ids_stay_dense_through_mixed_operations() {
        let mut sheet = seeded();
        let script = [0usize, 3, 1, 0, 7];
        for (step, row) in script.into_iter().enumerate() {
            sheet.begin_edit(row, "jobRequest");
            sheet.set_edit_value(format!("step {step}"));
            sheet.commit_edit();
            sheet.row_header_click(step % 3);
            sheet.delete_selected_row();
            sheet.add_row();
            let n = sheet.records().len();
            assert_eq!(ids(&sheet), (1..=n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn editing_padding_row_materializes_next_dense_id() {
        let mut sheet = seeded();
        sheet.begin_edit(12, "jobRequest");
        assert_eq!(sheet.editing().unwrap().row_id, 13);
        sheet.set_edit_value("Fresh task".to_string());
        let effect = sheet.commit_edit();
        assert_eq!(
            effect,
            Some(Effect::CellCommitted {
                id: 6,
                column: "jobRequest".to_string(),
                materialized: true
            })
        );
        assert_eq!(sheet.records().len(), 6);
        assert_eq!(sheet.view().len(), 25);
        assert!(!sheet.view().rows[5].padding);
    }

    #[test]
    fn commit_under_sort_targets_carried_id() {
        let mut sheet = seeded();
        sheet.sort("submitter");
        // Sorted by submitter: Aisha(1), Emily(4), Irfan(2), Jessica(5), Mark(3)
        assert_eq!(sheet.view().rows[1].id(), 4);
        sheet.begin_edit(1, "assigned");
        sheet.set_edit_value("Someone Else".to_string());
        sheet.commit_edit();
        assert_eq!(
            sheet.records().by_id(4).unwrap().get("assigned"),
            Some(&Value::from("Someone Else"))
        );
        assert_eq!(
            sheet.records().by_id(2).unwrap().get("assigned"),
            Some(&Value::from("Tejas Pandey"))
        );
    }

    #[test]
    fn numeric_column_edit_is_coerced() {
        let mut sheet = seeded();
        sheet.begin_edit(0, "estValue");
        assert_eq!(sheet.editing().unwrap().buffer, "6200000");
        sheet.set_edit_value("1250".to_string());
        sheet.commit_edit();
        assert_eq!(
            sheet.records().by_id(1).unwrap().get("estValue"),
            Some(&Value::Number(1250.0))
        );
    }

    #[test]
    fn cancel_leaves_records_alone() {
        let mut sheet = seeded();
        let before = sheet.records().get().to_vec();
        sheet.begin_edit(0, "status");
        sheet.set_edit_value("Blocked".to_string());
        assert_eq!(sheet.key_press(NavKey::Escape), Some(Effect::EditCancelled));
        assert_eq!(sheet.records().get(), before.as_slice());
        assert_eq!(sheet.phase(), Phase::Idle);
        assert_eq!(sheet.commit_edit(), None);
    }

    #[test]
    fn add_then_delete_column_restores_key_sets() {
        let mut sheet = seeded();
        let before: Vec<Vec<String>> = sheet
            .records()
            .get()
            .iter()
            .map(|r| {
                let mut k: Vec<String> = r.keys().map(String::from).collect();
                k.sort();
                k
            })
            .collect();
        let Some(Effect::ColumnAdded(key)) = sheet.apply(Intent::AddColumnButtonClick) else {
            panic!("column was not added");
        };
        assert!(key_sets_match(&sheet));
        assert_eq!(sheet.view().columns.last().unwrap().label, NEW_COLUMN_LABEL);
        sheet.apply(Intent::ColumnHeaderClick(key.clone()));
        assert_eq!(
            sheet.apply(Intent::KeyPress(NavKey::Delete)),
            Some(Effect::ColumnDeleted(key))
        );
        assert!(key_sets_match(&sheet));
        let after: Vec<Vec<String>> = sheet
            .records()
            .get()
            .iter()
            .map(|r| {
                let mut k: Vec<String> = r.keys().map(String::from).collect();
                k.sort();
                k
            })
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn deleting_sorted_column_clears_sort() {
        let mut sheet = seeded();
        sheet.sort("submitter");
        sheet.column_header_click("submitter");
        sheet.delete_selected_column();
        assert!(sheet.params().sort.is_none());
        assert!(!sheet.columns().contains("submitter"));
    }

    #[test]
    fn sort_toggles_between_two_states() {
        let mut sheet = seeded();
        let directions: Vec<SortDirection> = (0..3)
            .filter_map(|_| match sheet.apply(Intent::SortClick("status".to_string())) {
                Some(Effect::Sorted(spec)) => Some(spec.direction),
                _ => None,
            })
            .collect();
        assert_eq!(
            directions,
            vec![SortDirection::Asc, SortDirection::Desc, SortDirection::Asc]
        );
        sheet.sort("jobRequest");
        assert_eq!(sheet.params().sort.as_ref().unwrap().direction, SortDirection::Asc);
    }

    #[test]
    fn unsortable_and_unknown_columns_are_ignored() {
        let mut sheet = seeded();
        assert_eq!(sheet.sort("priority"), None);
        assert_eq!(sheet.sort("nope"), None);
        assert!(sheet.params().sort.is_none());
    }

    #[test]
    fn status_tab_filters_case_insensitively() {
        let mut sheet = seeded();
        sheet.sort("jobRequest");
        // Row 1 of the sorted view is "Finalize user testing ..." (In-process)
        sheet.begin_edit(1, "status");
        sheet.set_edit_value("complete".to_string());
        sheet.commit_edit();
        sheet.apply(Intent::TabSelected(StatusFilter::Only("Complete".to_string())));
        let rows: Vec<String> = sheet
            .view()
            .rows
            .iter()
            .map(|r| r.record.get("jobRequest").unwrap().to_string())
            .collect();
        assert_eq!(
            rows,
            vec![
                "Design new features for the website",
                "Finalize user testing feedback for app redesign",
            ]
        );
        sheet.apply(Intent::TabSelected(StatusFilter::All));
        assert_eq!(sheet.view().len(), 25);
    }

    #[test]
    fn search_does_not_touch_the_store() {
        let mut sheet = seeded();
        let before = sheet.records().get().to_vec();
        sheet.apply(Intent::SearchInput("patel".to_string()));
        let first: Vec<usize> = sheet.view().rows.iter().map(|r| r.id()).collect();
        sheet.apply(Intent::SearchInput("patel".to_string()));
        let second: Vec<usize> = sheet.view().rows.iter().map(|r| r.id()).collect();
        assert_eq!(first, vec![1]);
        assert_eq!(first, second);
        assert_eq!(sheet.records().get(), before.as_slice());
    }

    #[test]
    fn hiding_a_column_drops_its_cell_selection() {
        let mut sheet = seeded();
        sheet.cell_click(0, "url");
        sheet.toggle_column_visibility("url");
        assert_eq!(sheet.phase(), Phase::Idle);
        assert_eq!(sheet.view().columns.len(), 8);
        assert_eq!(sheet.toggle_column_visibility("missing"), None);
    }

    #[test]
    fn keyboard_walks_the_state_machine() {
        let mut sheet = seeded();
        assert_eq!(sheet.key_press(NavKey::Down), None);
        sheet.cell_click(0, "jobRequest");
        sheet.key_press(NavKey::Down);
        sheet.key_press(NavKey::Right);
        assert_eq!(
            sheet.selection(),
            &Selection::Cell {
                row: 1,
                column: "submitted".to_string()
            }
        );
        sheet.key_press(NavKey::Enter);
        assert_eq!(sheet.phase(), Phase::Editing);
        assert_eq!(sheet.key_press(NavKey::Down), None);
        sheet.key_press(NavKey::Enter);
        assert_eq!(sheet.phase(), Phase::Idle);
        sheet.cell_click(99, "jobRequest");
        assert_eq!(
            sheet.selection(),
            &Selection::Cell {
                row: 24,
                column: "jobRequest".to_string()
            }
        );
        sheet.key_press(NavKey::Delete);
        assert_eq!(sheet.records().len(), 5);
        sheet.key_press(NavKey::Escape);
        assert_eq!(sheet.phase(), Phase::Idle);
    }

    #[test]
    fn clicks_on_empty_view_do_nothing() {
        let mut sheet = seeded();
        sheet.set_search("no such text anywhere".to_string());
        assert!(sheet.view().is_empty());
        assert_eq!(sheet.cell_click(0, "status"), None);
        assert_eq!(sheet.row_header_click(0), None);
        assert_eq!(sheet.begin_edit(0, "status"), None);
    }

    #[test]
    fn export_snapshot_skips_padding_and_hidden_columns() {
        let mut sheet = seeded();
        sheet.toggle_column_visibility("url");
        let Some(Effect::ExportReady(snapshot)) = sheet.apply(Intent::ExportClick) else {
            panic!("no snapshot");
        };
        assert_eq!(snapshot.rows.len(), 5);
        assert_eq!(snapshot.columns.len(), 8);
        assert!(snapshot.columns.iter().all(|c| c.key != "url"));
    }
}
