//! Tracing setup. The terminal belongs to the TUI, so everything goes to a
//! log file. Filtering follows `RUST_LOG`, e.g. `RUST_LOG=tasksheet=trace`.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::SheetError;

/// Appends to `log_file`, creating it and its directory when missing.
pub fn file_appender(log_file: &Path) -> Result<RollingFileAppender, SheetError> {
    let name = log_file
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| SheetError::InvalidPath(format!("{log_file:?} has no file name")))?;
    let dir = match log_file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .map_err(|e| SheetError::LoggingFailed(e.to_string()))
}

pub fn init(log_file: &Path) -> Result<(), SheetError> {
    let appender = file_appender(log_file)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| SheetError::LoggingFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn appender_writes_to_the_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("tasksheet.log");
        let mut appender = file_appender(&path).unwrap();
        appender.write_all(b"hello\n").unwrap();
        appender.flush().unwrap();
        drop(appender);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn directory_is_not_a_log_file() {
        assert!(matches!(
            file_appender(Path::new("/")),
            Err(SheetError::InvalidPath(_))
        ));
    }
}
