use polars::prelude::*;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::domain::SheetError;
use crate::sheet::{Column as SheetColumn, Value};

#[derive(Debug, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// Columns and rows read from a data file, ready to seed a sheet.
pub struct LoadedTable {
    pub name: String,
    pub columns: Vec<SheetColumn>,
    pub rows: Vec<HashMap<String, Value>>,
}

// One converted file column
struct ColumnData {
    column: SheetColumn,
    data: Vec<Value>,
}

pub fn load_table(path: PathBuf) -> Result<LoadedTable, SheetError> {
    let file_info = get_file_info(path)?;
    debug!("Loading {:?}", file_info);
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };

    let start_time = Instant::now();
    let df = frame.collect()?;

    // Each column is converted in its own rayon task
    let converted: Result<Vec<ColumnData>, PolarsError> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let columns = converted?;

    let nrows = df.height();
    let mut rows: Vec<HashMap<String, Value>> = (0..nrows).map(|_| HashMap::new()).collect();
    for c in columns.iter() {
        for (row, value) in rows.iter_mut().zip(c.data.iter()) {
            row.insert(c.column.key.clone(), value.clone());
        }
    }

    info!(
        "Loaded {} rows x {} columns ({} bytes) in {}ms",
        nrows,
        columns.len(),
        file_info.file_size,
        start_time.elapsed().as_millis()
    );

    let name = file_info
        .path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("???")
        .to_string();

    Ok(LoadedTable {
        name,
        columns: columns.into_iter().map(|c| c.column).collect(),
        rows,
    })
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<ColumnData, PolarsError> {
    let original_dtype = df.column(col_name)?.dtype().clone();
    let numeric = is_numeric_type(&original_dtype);

    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;
    let mut data = Vec::with_capacity(series.len());
    for value in series.into_iter() {
        let value = match value {
            Some(s) if numeric => s
                .parse::<f64>()
                .map(Value::Number)
                .unwrap_or_else(|_| Value::from(s)),
            Some(s) => Value::from(s.replace("\r\n", " ").replace('\n', " ")),
            None => Value::default(),
        };
        data.push(value);
    }

    let mut column = SheetColumn::new(col_name, col_name);
    if numeric {
        column = column.numeric();
    }
    Ok(ColumnData { column, data })
}

fn is_numeric_type(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn detect_file_type(path: &Path) -> Result<FileType, SheetError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(SheetError::UnknownFileType),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, SheetError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SheetError::FileNotFound,
        ErrorKind::PermissionDenied => SheetError::PermissionDenied,
        _ => SheetError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(SheetError::LoadingFailed("Not a file!".into()));
    }

    let file_size = metadata.len();
    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size,
        file_type,
    })
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}
