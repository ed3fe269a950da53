use rust_xlsxwriter::{Workbook, Worksheet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, error, info};

use crate::domain::SheetError;
use crate::sheet::{ExportSnapshot, Value};

pub const SHEET_NAME: &str = "Sheet1";

/// Takes a snapshot and produces a file out of band. The caller does not wait.
pub trait Exporter {
    fn export(&self, snapshot: ExportSnapshot);
}

/// Writes one worksheet with a label header row and one row per record.
pub fn to_xlsx(snapshot: &ExportSnapshot) -> Result<Vec<u8>, SheetError> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name(SHEET_NAME)?;

    for (c, column) in snapshot.columns.iter().enumerate() {
        worksheet.write_string(0, c as u16, &column.label)?;
    }

    for (r, record) in snapshot.rows.iter().enumerate() {
        let row = (r + 1) as u32;
        for (c, column) in snapshot.columns.iter().enumerate() {
            match record.get(&column.key) {
                Some(Value::Number(n)) => {
                    worksheet.write_number(row, c as u16, *n)?;
                }
                Some(Value::Text(s)) if !s.is_empty() => {
                    worksheet.write_string(row, c as u16, s)?;
                }
                _ => {}
            }
        }
    }

    workbook.push_worksheet(worksheet);
    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}

#[derive(Debug, Clone)]
pub struct XlsxExporter {
    path: PathBuf,
    sequence: Arc<AtomicUsize>,
}

impl XlsxExporter {
    pub fn new(dir: PathBuf, filename: &str) -> Self {
        Self {
            path: dir.join(filename),
            sequence: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    // Every export gets its own scratch file next to the target
    fn scratch_path(&self) -> PathBuf {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed);
        let name = self
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("export");
        self.path
            .with_file_name(format!(".{name}.{}.{n}.tmp", std::process::id()))
    }

    /// Writes the workbook to `scratch` and renames it over `path`.
    fn write(path: &Path, scratch: &Path, snapshot: &ExportSnapshot) -> Result<usize, SheetError> {
        let buffer = to_xlsx(snapshot)?;
        fs::write(scratch, &buffer)?;
        if let Err(e) = fs::rename(scratch, path) {
            let _ = fs::remove_file(scratch);
            return Err(e.into());
        }
        Ok(buffer.len())
    }
}

impl Exporter for XlsxExporter {
    fn export(&self, snapshot: ExportSnapshot) {
        let path = self.path.clone();
        let scratch = self.scratch_path();
        debug!("Exporting through {:?}", scratch);
        rayon::spawn(move || match Self::write(&path, &scratch, &snapshot) {
            Ok(size) => info!(
                "Exported {} rows to {:?} ({size} bytes)",
                snapshot.rows.len(),
                path
            ),
            Err(e) => error!("Export to {:?} failed: {:?}", path, e),
        });
    }
}
