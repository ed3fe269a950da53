use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use rust_xlsxwriter::XlsxError;
use std::io::Error;
use std::path::PathBuf;

use crate::seed::INITIAL_ROWS;
use crate::sheet::Intent;

#[derive(Debug)]
pub enum SheetError {
    IoError(Error),
    PolarsError(PolarsError),
    XlsxError(XlsxError),
    LoadingFailed(String),
    InvalidPath(String),
    LoggingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl From<Error> for SheetError {
    fn from(err: Error) -> Self {
        SheetError::IoError(err)
    }
}

impl From<PolarsError> for SheetError {
    fn from(err: PolarsError) -> Self {
        SheetError::PolarsError(err)
    }
}

impl From<XlsxError> for SheetError {
    fn from(err: XlsxError) -> Self {
        SheetError::XlsxError(err)
    }
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct SheetConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub requested_rows: usize,
    pub export_dir: PathBuf,
    pub export_filename: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        SheetConfig {
            event_poll_time: 100,
            max_column_width: 40,
            requested_rows: INITIAL_ROWS,
            export_dir: PathBuf::from("."),
            export_filename: "spreadsheet.xlsx".to_string(),
        }
    }
}

/// What the command line is currently collecting input for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    EditCell,
    Search,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Enter,
    Exit,
    Delete,
    SelectRow,
    SelectColumn,
    Sort,
    AddRow,
    AddColumn,
    ColumnMenu,
    NextTab,
    PrevTab,
    Search,
    Export,
    CopyCell,
    CopyRow,
    Help,
    Resize(usize, usize),
    RawKey(KeyEvent),
    Intent(Intent),
}

pub const HELP_TEXT: &str = "\
Navigation
  Arrows / hjkl move the cell cursor
  PgUp / PgDn   move a page up / down
  Home / End    first / last row

Editing
  Enter         edit the selected cell, Enter again to save
  Esc           cancel the edit or clear the selection
  r / c         select the row / column of the current cell
  Del / x       delete the selected row or column
  a / A         add a row / add a column

View
  s             sort by the current column (asc / desc)
  /             search all columns
  Tab / S-Tab   next / previous status tab
  v             show or hide columns

Other
  y / Y         copy cell / row to the clipboard
  e             export to spreadsheet.xlsx
  ?             this help
  q / Ctrl-c    quit";
