use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::domain::{CMDMode, HELP_TEXT, Message, SheetConfig, SheetError};
use crate::export::Exporter;
use crate::inputter::{InputResult, Inputter};
use crate::notify::{Notifier, Severity, StatusLine};
use crate::seed::STATUSES;
use crate::sheet::{
    Effect, Intent, NavKey, Phase, Selection, Sheet, SortDirection, StatusFilter, Value,
};
use crate::ui::{COLUMN_WIDTH_MARGIN, TABLE_CHROME_HEIGHT};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
    COLUMNMENU,
}

#[derive(Clone, Debug, Default)]
pub struct ColumnView {
    pub key: String,
    pub name: String,
    pub class: String,
    pub width: usize,
    pub sort: Option<SortDirection>,
    pub selected: bool,
    pub data: Vec<String>,
}

pub struct UIData {
    pub name: String,
    pub table: Vec<ColumnView>,
    pub index: ColumnView,
    pub padding: Vec<bool>,
    pub nrows: usize,
    pub nrecords: usize,
    pub requested_rows: usize,
    pub selected_row: Option<usize>, // Relative to the rendered window
    pub selected_column: Option<usize>,
    pub row_selected: bool,
    pub editing: bool,
    pub show_popup: bool,
    pub popup_message: String,
    pub show_column_menu: bool,
    pub column_menu: Vec<(String, bool)>,
    pub menu_cursor: usize,
    pub tabs: Vec<String>,
    pub active_tab: usize,
    pub search_term: String,
    pub layout: UILayout,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub status_severity: Severity,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            table: Vec::new(),
            index: ColumnView::default(),
            padding: Vec::new(),
            nrows: 0,
            nrecords: 0,
            requested_rows: 0,
            selected_row: None,
            selected_column: None,
            row_selected: false,
            editing: false,
            show_popup: false,
            popup_message: String::new(),
            show_column_menu: false,
            column_menu: Vec::new(),
            menu_cursor: 0,
            tabs: Vec::new(),
            active_tab: 0,
            search_term: String::new(),
            layout: UILayout::default(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            status_severity: Severity::Info,
            last_status_message_update: Instant::now(),
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_height: std::cmp::max(1, ui_height.saturating_sub(TABLE_CHROME_HEIGHT)),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: SheetConfig,
    pub status: Status,
    name: String,
    modus: Modus,
    previous_modus: Modus,
    sheet: Sheet,
    tabs: Vec<StatusFilter>,
    active_tab: usize,
    offset_row: usize,
    menu_cursor: usize,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    notifier: StatusLine,
    exporter: Box<dyn Exporter>,
}

impl Model {
    pub fn init(
        config: &SheetConfig,
        name: impl Into<String>,
        sheet: Sheet,
        exporter: Box<dyn Exporter>,
        ui_width: usize,
        ui_height: usize,
    ) -> Self {
        let mut tabs = vec![StatusFilter::All];
        tabs.extend(STATUSES.iter().map(|s| StatusFilter::Only(s.to_string())));

        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            name: name.into(),
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            sheet,
            tabs,
            active_tab: 0,
            offset_row: 0,
            menu_cursor: 0,
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            notifier: StatusLine::default(),
            exporter,
        };
        if model.sheet.records().is_empty() {
            model.notify(Severity::Info, "No records yet. Press Enter on a cell to start.");
        } else {
            model.notify(Severity::Info, "Welcome! Press ? for help.");
        }
        model.update_table_data();
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), SheetError> {
        if let Some(msg) = message {
            trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => self.navigate(NavKey::Up),
                    Message::MoveDown => self.navigate(NavKey::Down),
                    Message::MoveLeft => self.navigate(NavKey::Left),
                    Message::MoveRight => self.navigate(NavKey::Right),
                    Message::MovePageUp => self.jump_rows(-(self.uilayout.table_height as isize)),
                    Message::MovePageDown => self.jump_rows(self.uilayout.table_height as isize),
                    Message::MoveBeginning => self.jump_rows(isize::MIN),
                    Message::MoveEnd => self.jump_rows(isize::MAX),
                    Message::Enter => self.enter(),
                    Message::Exit => self.dispatch(Intent::KeyPress(NavKey::Escape)),
                    Message::Delete => self.dispatch(Intent::KeyPress(NavKey::Delete)),
                    Message::SelectRow => self.select_current_row(),
                    Message::SelectColumn => self.select_current_column(),
                    Message::Sort => self.sort_current_column(),
                    Message::AddRow => self.dispatch(Intent::AddRowButtonClick),
                    Message::AddColumn => self.dispatch(Intent::AddColumnButtonClick),
                    Message::ColumnMenu => self.open_column_menu(),
                    Message::NextTab => self.cycle_tab(1),
                    Message::PrevTab => self.cycle_tab(-1),
                    Message::Search => self.enter_cmd_mode(CMDMode::Search),
                    Message::Export => self.dispatch(Intent::ExportClick),
                    Message::CopyCell => self.copy_table_cell(),
                    Message::CopyRow => self.copy_table_row(),
                    Message::Help => self.show_help(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Intent(intent) => self.dispatch(intent),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Enter | Message::Help => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::COLUMNMENU => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => self.move_menu_cursor(-1),
                    Message::MoveDown => self.move_menu_cursor(1),
                    Message::Enter => self.toggle_menu_column(),
                    Message::Exit | Message::ColumnMenu => self.exit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::CMDINPUT => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }
        self.update_table_data();
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn dispatch(&mut self, intent: Intent) {
        match self.sheet.apply(intent) {
            Some(effect) => self.report(effect),
            None => trace!("Intent had no effect"),
        }
    }

    fn report(&mut self, effect: Effect) {
        debug!("Effect: {:?}", effect);
        match effect {
            Effect::RowAdded { .. } => self.notify(Severity::Success, "New row added!"),
            Effect::ColumnAdded(_) => self.notify(Severity::Success, "New column added!"),
            Effect::RowDeleted { id: Some(id), .. } => {
                self.notify(Severity::Success, format!("Row {id} deleted"))
            }
            Effect::RowDeleted { id: None, .. } => {
                self.notify(Severity::Info, "Empty row removed")
            }
            Effect::ColumnDeleted(key) => {
                self.notify(Severity::Success, format!("Column {key} deleted"))
            }
            Effect::CellCommitted {
                id, materialized, ..
            } => {
                if materialized {
                    self.notify(Severity::Success, format!("Row {id} created"));
                } else {
                    self.notify(Severity::Info, format!("Row {id} updated"));
                }
            }
            Effect::VisibilityToggled { column, visible } => {
                let label = self.column_label(&column);
                let state = if visible { "visible" } else { "hidden" };
                self.notify(Severity::Info, format!("{label} is {state}"));
            }
            Effect::Sorted(spec) => {
                let label = self.column_label(&spec.column);
                let dir = match spec.direction {
                    SortDirection::Asc => "ascending",
                    SortDirection::Desc => "descending",
                };
                self.notify(Severity::Info, format!("Sorted by {label} {dir}"));
            }
            Effect::FilterChanged(StatusFilter::All) => {
                self.notify(Severity::Info, "Showing all rows")
            }
            Effect::FilterChanged(StatusFilter::Only(status)) => {
                let n = self.sheet.view().len();
                self.notify(Severity::Info, format!("{n} rows with status {status}"));
            }
            Effect::ExportReady(snapshot) => {
                info!(
                    "Exporting {} rows x {} columns",
                    snapshot.rows.len(),
                    snapshot.columns.len()
                );
                self.exporter.export(snapshot);
                self.notify(Severity::Success, "Data exported successfully!");
            }
            Effect::EditStarted { .. }
            | Effect::EditUpdated
            | Effect::EditCancelled
            | Effect::SearchChanged(_)
            | Effect::SelectionChanged => {}
        }
    }

    fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        self.notifier.notify(severity, &message.into());
    }

    fn column_label(&self, key: &str) -> String {
        self.sheet
            .columns()
            .get(key)
            .map(|c| c.label.clone())
            .unwrap_or_else(|| key.to_string())
    }

    fn first_visible_column(&self) -> Option<String> {
        self.sheet.view().columns.first().map(|c| c.key.clone())
    }

    // Row and column the keyboard cursor is on, whatever kind of selection is active
    fn cursor(&self) -> Option<(usize, String)> {
        if let Some(edit) = self.sheet.editing() {
            return Some((edit.row, edit.column.clone()));
        }
        match self.sheet.selection() {
            Selection::Cell { row, column } => Some((*row, column.clone())),
            Selection::Row(row) => Some((*row, self.first_visible_column()?)),
            Selection::Column(key) => Some((self.offset_row, key.clone())),
            Selection::Idle => None,
        }
    }

    fn navigate(&mut self, key: NavKey) {
        match self.sheet.selection().clone() {
            Selection::Idle => {
                if let Some(column) = self.first_visible_column() {
                    self.dispatch(Intent::CellClick {
                        row: self.offset_row,
                        column,
                    });
                }
            }
            Selection::Row(row) => {
                let next = match key {
                    NavKey::Up => row.saturating_sub(1),
                    NavKey::Down => row + 1,
                    _ => row,
                };
                self.dispatch(Intent::RowHeaderClick(next));
            }
            Selection::Column(current) => {
                let columns = &self.sheet.view().columns;
                let pos = columns.iter().position(|c| c.key == current).unwrap_or(0);
                let next = match key {
                    NavKey::Left => pos.saturating_sub(1),
                    NavKey::Right => std::cmp::min(pos + 1, columns.len().saturating_sub(1)),
                    _ => pos,
                };
                if let Some(column) = columns.get(next).map(|c| c.key.clone()) {
                    self.dispatch(Intent::ColumnHeaderClick(column));
                }
            }
            Selection::Cell { .. } => self.dispatch(Intent::KeyPress(key)),
        }
    }

    fn jump_rows(&mut self, delta: isize) {
        let Some((row, column)) = self.cursor() else {
            return;
        };
        let target = row.saturating_add_signed(delta);
        self.dispatch(Intent::CellClick {
            row: target,
            column,
        });
    }

    fn enter(&mut self) {
        if self.sheet.phase() != Phase::Selected {
            return;
        }
        self.dispatch(Intent::KeyPress(NavKey::Enter));
        if let Some(edit) = self.sheet.editing() {
            let buffer = edit.buffer.clone();
            self.enter_cmd_mode(CMDMode::EditCell);
            self.input.set(&buffer);
            self.last_input = self.input.get();
        }
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::POPUP | Modus::COLUMNMENU => {
                trace!("Closing {:?}", self.modus);
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
            }
            Modus::TABLE | Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    fn open_column_menu(&mut self) {
        if self.sheet.columns().is_empty() {
            self.notify(Severity::Info, "There are no columns");
            return;
        }
        self.previous_modus = self.modus;
        self.modus = Modus::COLUMNMENU;
        self.menu_cursor = std::cmp::min(
            self.menu_cursor,
            self.sheet.columns().len().saturating_sub(1),
        );
    }

    fn move_menu_cursor(&mut self, step: isize) {
        let max = self.sheet.columns().len().saturating_sub(1);
        self.menu_cursor = std::cmp::min(self.menu_cursor.saturating_add_signed(step), max);
    }

    fn toggle_menu_column(&mut self) {
        if let Some(column) = self.sheet.columns().columns().get(self.menu_cursor) {
            let key = column.key.clone();
            self.dispatch(Intent::ToggleColumnVisibility(key));
        }
    }

    fn cycle_tab(&mut self, step: isize) {
        let n = self.tabs.len() as isize;
        self.active_tab = (self.active_tab as isize + step).rem_euclid(n) as usize;
        let filter = self.tabs[self.active_tab].clone();
        self.dispatch(Intent::TabSelected(filter));
    }

    fn select_current_row(&mut self) {
        let row = self.cursor().map(|(row, _)| row).unwrap_or(self.offset_row);
        self.dispatch(Intent::RowHeaderClick(row));
    }

    fn select_current_column(&mut self) {
        let column = match self.cursor() {
            Some((_, column)) => Some(column),
            None => self.first_visible_column(),
        };
        if let Some(column) = column {
            self.dispatch(Intent::ColumnHeaderClick(column));
        }
    }

    fn sort_current_column(&mut self) {
        let Some((_, column)) = self.cursor() else {
            self.notify(Severity::Info, "Select a cell to sort by its column");
            return;
        };
        if self.sheet.columns().get(&column).is_some_and(|c| !c.sortable) {
            let label = self.column_label(&column);
            self.notify(Severity::Warning, format!("{label} cannot be sorted"));
            return;
        }
        self.dispatch(Intent::SortClick(column));
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {:?}", mode);
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;
        self.input.clear();
        if mode == CMDMode::Search {
            let term = self.sheet.params().search.clone();
            self.input.set(&term);
        }
        self.last_input = self.input.get();
    }

    fn leave_cmd_mode(&mut self) {
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;
        self.cmd_mode = None;
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if !self.active_cmdinput {
            return;
        }
        self.last_input = self.input.read(key);
        let input = self.last_input.clone();
        match self.cmd_mode {
            Some(CMDMode::Search) => {
                self.dispatch(Intent::SearchInput(input.input.clone()));
                if input.finished {
                    self.leave_cmd_mode();
                    if !input.canceled && !input.input.is_empty() {
                        let n = self.sheet.view().len();
                        self.notify(Severity::Info, format!("Found {n} rows"));
                    }
                }
            }
            Some(CMDMode::EditCell) => {
                if !input.finished {
                    self.dispatch(Intent::EditInput(input.input));
                    return;
                }
                let cell = self.cursor();
                let nav = if input.canceled {
                    NavKey::Escape
                } else {
                    NavKey::Enter
                };
                self.dispatch(Intent::KeyPress(nav));
                self.leave_cmd_mode();
                // Keep the keyboard cursor where the edit happened
                if let Some((row, column)) = cell {
                    self.dispatch(Intent::CellClick { row, column });
                }
            }
            None => self.leave_cmd_mode(),
        }
    }

    fn copy_table_cell(&mut self) {
        let Some((row, column)) = self.cursor() else {
            return;
        };
        let Some(cell) = self
            .sheet
            .view()
            .row(row)
            .and_then(|r| r.record.get(&column))
            .map(|v| v.to_string())
        else {
            return;
        };
        trace!("Cell content: {}", cell);
        self.copy_to_clipboard(cell);
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.chars().any(|c| c == '"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_wrapping || needs_escaping {
            out = format!("\"{out}\"");
        }
        out
    }

    fn row_as_csv(&self, row: usize) -> Option<String> {
        let view = self.sheet.view();
        let record = &view.row(row)?.record;
        let content = view
            .columns
            .iter()
            .map(|c| {
                let value = record.get(&c.key).cloned().unwrap_or_default();
                Model::wrap_cell_content(&value.to_string())
            })
            .collect::<Vec<String>>();
        Some(content.join(","))
    }

    fn copy_table_row(&mut self) {
        let Some((row, _)) = self.cursor() else {
            return;
        };
        if let Some(line) = self.row_as_csv(row) {
            self.copy_to_clipboard(line);
        }
    }

    fn copy_to_clipboard(&mut self, text: String) {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => warn!("Clipboard unavailable: {:?}", e),
            }
        }
        let result = match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.set_text(text).map_err(|e| format!("{e:?}")),
            None => Err("no clipboard".to_string()),
        };
        match result {
            Ok(_) => self.notify(Severity::Success, "Copied to clipboard"),
            Err(e) => {
                trace!("Error copying to clipboard: {}", e);
                self.notify(Severity::Warning, "Could not access the clipboard");
            }
        }
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
    }

    // -------------------- Rendering data ---------------------- //

    fn get_visible_name(name: &str, width: usize) -> String {
        if width < 3 {
            return String::new();
        }
        if name.chars().count() > width {
            let mut reduced: String = name.chars().take(width - 3).collect();
            reduced.push_str("...");
            reduced
        } else {
            name.to_string()
        }
    }

    fn display_value(value: Option<&Value>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    fn update_table_data(&mut self) {
        let height = self.uilayout.table_height;
        let nrows = self.sheet.view().len();

        // Scroll so the cursor row stays inside the window
        if let Some((row, _)) = self.cursor() {
            if row < self.offset_row {
                self.offset_row = row;
            } else if row >= self.offset_row + height {
                self.offset_row = row + 1 - height;
            }
        }
        self.offset_row = std::cmp::min(self.offset_row, nrows.saturating_sub(height));

        let rbegin = self.offset_row;
        let rend = std::cmp::min(rbegin + height, nrows);

        let view = self.sheet.view();
        let rows = &view.rows[rbegin..rend];
        let sort = self.sheet.params().sort.clone();
        let selected_column_key = match self.sheet.selection() {
            Selection::Column(key) => Some(key.clone()),
            _ => None,
        };

        let mut table = Vec::with_capacity(view.columns.len());
        for column in view.columns.iter() {
            let data: Vec<String> = rows
                .iter()
                .map(|r| Model::display_value(r.record.get(&column.key)))
                .collect();
            let content_width = data
                .iter()
                .map(|s| s.chars().count())
                .chain(std::iter::once(column.label.chars().count() + 2))
                .max()
                .unwrap_or(0)
                + COLUMN_WIDTH_MARGIN;
            let width = match column.hint.width {
                Some(w) => w as usize,
                None => std::cmp::min(content_width, self.config.max_column_width),
            };
            table.push(ColumnView {
                key: column.key.clone(),
                name: Model::get_visible_name(&column.label, width),
                class: column.hint.class.clone(),
                width,
                sort: sort
                    .as_ref()
                    .filter(|s| s.column == column.key)
                    .map(|s| s.direction),
                selected: selected_column_key.as_deref() == Some(column.key.as_str()),
                data,
            });
        }

        let index_data: Vec<String> = rows.iter().map(|r| r.id().to_string()).collect();
        let index = ColumnView {
            key: String::new(),
            name: "#".to_string(),
            class: String::new(),
            width: index_data
                .iter()
                .map(|s| s.len())
                .max()
                .unwrap_or(1)
                .max(2),
            sort: None,
            selected: false,
            data: index_data,
        };

        let cursor = self.cursor();
        let selected_row = cursor
            .as_ref()
            .filter(|_| !matches!(self.sheet.selection(), Selection::Column(_)))
            .and_then(|(row, _)| row.checked_sub(rbegin))
            .filter(|&r| r < rend - rbegin);
        let selected_column = cursor
            .as_ref()
            .filter(|_| !matches!(self.sheet.selection(), Selection::Row(_)))
            .and_then(|(_, key)| view.column_position(key));

        let status = self.notifier.latest();
        self.uidata = UIData {
            name: self.name.clone(),
            table,
            index,
            padding: rows.iter().map(|r| r.padding).collect(),
            nrows,
            nrecords: self.sheet.records().len(),
            requested_rows: self.sheet.requested_rows(),
            selected_row,
            selected_column,
            row_selected: matches!(self.sheet.selection(), Selection::Row(_)),
            editing: self.sheet.phase() == Phase::Editing,
            show_popup: self.modus == Modus::POPUP,
            popup_message: HELP_TEXT.to_string(),
            show_column_menu: self.modus == Modus::COLUMNMENU,
            column_menu: self
                .sheet
                .columns()
                .columns()
                .iter()
                .map(|c| (c.label.clone(), c.visible))
                .collect(),
            menu_cursor: self.menu_cursor,
            tabs: self
                .tabs
                .iter()
                .map(|t| match t {
                    StatusFilter::All => "All".to_string(),
                    StatusFilter::Only(s) => s.clone(),
                })
                .collect(),
            active_tab: self.active_tab,
            search_term: self.sheet.params().search.clone(),
            layout: self.uilayout.clone(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: status.map(|n| n.message.clone()).unwrap_or_default(),
            status_severity: status.map(|n| n.severity).unwrap_or(Severity::Info),
            last_status_message_update: status.map(|n| n.created).unwrap_or_else(Instant::now),
        };
    }
}
