use tracing::trace;

use super::view::View;

/// Keys the cell interaction state machine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Escape,
    Delete,
}

/// At most one thing is selected at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Idle,
    Cell { row: usize, column: String },
    Row(usize),
    Column(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditState {
    pub row: usize,
    pub column: String,
    // Id carried by the display row when editing started
    pub row_id: usize,
    pub buffer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Selected,
    Editing,
}

#[derive(Debug, Clone, Default)]
pub struct Interaction {
    selection: Selection,
    editing: Option<EditState>,
}

impl Interaction {
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn editing(&self) -> Option<&EditState> {
        self.editing.as_ref()
    }

    pub fn phase(&self) -> Phase {
        if self.editing.is_some() {
            Phase::Editing
        } else if self.selection == Selection::Idle {
            Phase::Idle
        } else {
            Phase::Selected
        }
    }

    pub fn selected_row(&self) -> Option<usize> {
        match self.selection {
            Selection::Row(row) => Some(row),
            _ => None,
        }
    }

    pub fn selected_column(&self) -> Option<&str> {
        match &self.selection {
            Selection::Column(key) => Some(key),
            _ => None,
        }
    }

    pub fn selected_cell(&self) -> Option<(usize, &str)> {
        match &self.selection {
            Selection::Cell { row, column } => Some((*row, column)),
            _ => None,
        }
    }

    pub fn select_cell(&mut self, row: usize, column: impl Into<String>) {
        self.editing = None;
        self.selection = Selection::Cell {
            row,
            column: column.into(),
        };
    }

    pub fn select_row(&mut self, row: usize) {
        self.editing = None;
        self.selection = Selection::Row(row);
    }

    pub fn select_column(&mut self, key: impl Into<String>) {
        self.editing = None;
        self.selection = Selection::Column(key.into());
    }

    pub fn clear(&mut self) {
        self.editing = None;
        self.selection = Selection::Idle;
    }

    /// Enters edit mode on a cell. The edited cell becomes the selection.
    pub fn start_edit(&mut self, row: usize, column: &str, row_id: usize, buffer: String) {
        self.selection = Selection::Cell {
            row,
            column: column.to_string(),
        };
        self.editing = Some(EditState {
            row,
            column: column.to_string(),
            row_id,
            buffer,
        });
    }

    pub fn set_buffer(&mut self, text: String) -> bool {
        match self.editing.as_mut() {
            Some(edit) => {
                edit.buffer = text;
                true
            }
            None => false,
        }
    }

    /// Ends edit mode and returns to Idle, handing back the edit if there was one.
    pub fn finish_edit(&mut self) -> Option<EditState> {
        let edit = self.editing.take()?;
        self.selection = Selection::Idle;
        Some(edit)
    }

    /// Moves a cell selection by one step, clamped to the view bounds.
    pub fn move_cell(&mut self, key: NavKey, view: &View) -> bool {
        let Selection::Cell { row, column } = &self.selection else {
            return false;
        };
        if view.is_empty() || view.columns.is_empty() {
            return false;
        }
        let max_row = view.len() - 1;
        let col_idx = view.column_position(column).unwrap_or(0);
        let max_col = view.columns.len() - 1;

        let (new_row, new_col) = match key {
            NavKey::Up => (row.saturating_sub(1), col_idx),
            NavKey::Down => (std::cmp::min(row + 1, max_row), col_idx),
            NavKey::Left => (*row, col_idx.saturating_sub(1)),
            NavKey::Right => (*row, std::cmp::min(col_idx + 1, max_col)),
            _ => return false,
        };
        let new_row = std::cmp::min(new_row, max_row);
        let new_column = view.columns[new_col].key.clone();
        trace!("Cell selection {row}:{column} -> {new_row}:{new_column}");
        let moved = new_row != *row || new_column != *column;
        self.selection = Selection::Cell {
            row: new_row,
            column: new_column,
        };
        moved
    }

    /// Brings the state back in line with a freshly built view.
    pub fn revalidate(&mut self, view: &View) {
        if let Some(edit) = &self.editing
            && (edit.row >= view.len() || view.column_position(&edit.column).is_none())
        {
            trace!("Dropping edit of {}:{}", edit.row, edit.column);
            self.editing = None;
        }
        let keep = match &mut self.selection {
            Selection::Idle => true,
            Selection::Cell { row, column } => {
                if view.is_empty() || view.column_position(column).is_none() {
                    false
                } else {
                    *row = std::cmp::min(*row, view.len() - 1);
                    true
                }
            }
            Selection::Row(row) => *row < view.len(),
            Selection::Column(key) => view.column_position(key).is_some(),
        };
        if !keep {
            trace!("Clearing stale selection {:?}", self.selection);
            self.selection = Selection::Idle;
        }
    }
}
