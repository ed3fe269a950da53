use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

mod controller;
mod domain;
mod export;
mod inputter;
mod loader;
mod logging;
mod model;
mod notify;
mod seed;
mod sheet;
mod ui;

use controller::Controller;
use domain::{SheetConfig, SheetError};
use export::XlsxExporter;
use model::{Model, Status};
use sheet::Sheet;
use ui::TableUI;

/// Edit tabular task data in the terminal
#[derive(Parser, Debug)]
#[command(name = "tasksheet", version, about)]
struct Args {
    /// CSV, parquet or arrow file to start from, instead of the built-in tasks
    #[arg(value_name = "FILE")]
    file: Option<String>,

    /// Number of rows the table is padded to
    #[arg(long, value_name = "N")]
    rows: Option<usize>,

    /// Directory the spreadsheet export is written to
    #[arg(long, value_name = "DIR", default_value = ".")]
    export_dir: String,

    #[arg(long, value_name = "PATH", default_value = "tasksheet.log")]
    log_file: String,

    #[arg(long, value_name = "N")]
    max_column_width: Option<usize>,

    /// Event poll interval in milliseconds
    #[arg(long, value_name = "MS")]
    poll_ms: Option<u64>,
}

fn expand_path(path: &str) -> Result<PathBuf, SheetError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| SheetError::InvalidPath(format!("{path}: {e}")))
}

fn build_config(args: &Args) -> Result<SheetConfig, SheetError> {
    let mut config = SheetConfig::default().with_export_dir(expand_path(&args.export_dir)?);
    if let Some(rows) = args.rows {
        config = config.with_requested_rows(rows);
    }
    if let Some(width) = args.max_column_width {
        config = config.with_max_column_width(width);
    }
    if let Some(poll) = args.poll_ms {
        config = config.with_event_poll_time(poll);
    }
    Ok(config)
}

fn build_sheet(file: Option<&str>, config: &SheetConfig) -> Result<(String, Sheet), SheetError> {
    match file {
        Some(file) => {
            let table = loader::load_table(expand_path(file)?)?;
            let rows = std::cmp::max(config.requested_rows, table.rows.len());
            Ok((table.name, Sheet::new(table.columns, table.rows, rows)))
        }
        None => Ok((
            "Tasks".to_string(),
            Sheet::new(
                seed::initial_columns(),
                seed::initial_rows(),
                config.requested_rows,
            ),
        )),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let result = run(&args);
    ratatui::restore();
    match result {
        Err(e) => {
            error!("Terminated with {:?}", e);
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: &Args) -> Result<(), SheetError> {
    logging::init(&expand_path(&args.log_file)?)?;
    let config = build_config(args)?;
    info!("Starting with {:?}", config);

    let (name, sheet) = build_sheet(args.file.as_deref(), &config)?;
    let exporter = XlsxExporter::new(config.export_dir.clone(), &config.export_filename);

    let mut terminal = ratatui::init();
    let size = terminal.size()?;
    let mut model = Model::init(
        &config,
        name,
        sheet,
        Box::new(exporter),
        size.width as usize,
        size.height as usize,
    );
    let mut ui = TableUI::new(&config);
    let controller = Controller::new(&config);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    info!("Bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_values_reach_the_config() {
        let args = Args::parse_from([
            "tasksheet",
            "--rows",
            "40",
            "--poll-ms",
            "50",
            "--export-dir",
            "/tmp",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.requested_rows, 40);
        assert_eq!(config.event_poll_time, 50);
        assert_eq!(config.export_dir, PathBuf::from("/tmp"));
        assert_eq!(config.max_column_width, SheetConfig::default().max_column_width);
    }

    #[test]
    fn seeded_sheet_without_file() {
        let (name, sheet) = build_sheet(None, &SheetConfig::default()).unwrap();
        assert_eq!(name, "Tasks");
        assert_eq!(sheet.records().len(), 5);
        assert_eq!(sheet.view().len(), seed::INITIAL_ROWS);
    }

    #[test]
    fn loaded_file_raises_row_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("many.csv");
        let mut content = String::from("task\n");
        for i in 0..30 {
            content.push_str(&format!("t{i}\n"));
        }
        std::fs::write(&path, content).unwrap();
        let (name, sheet) =
            build_sheet(path.to_str(), &SheetConfig::default()).unwrap();
        assert_eq!(name, "many.csv");
        assert_eq!(sheet.view().len(), 30);
    }

    #[test]
    fn unknown_variable_is_an_invalid_path() {
        assert!(matches!(
            expand_path("$TASKSHEET_SURELY_UNSET_VAR/x"),
            Err(SheetError::InvalidPath(_))
        ));
    }
}
