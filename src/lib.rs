pub mod api;
pub mod core;

use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("Cannot open log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Logger already installed: {0}")]
    AlreadyInstalled(#[from] log::SetLoggerError),
}

/// 日志追加写入 `log_file`，级别默认 info，可用 `RUST_LOG` 覆盖
pub fn init_logging(log_file: &Path) -> Result<(), LogInitError> {
    let file = open_log_file(log_file)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .format(|buf, record| {
            let timestamp = chrono::Local::now().format(LOG_TIMESTAMP_FORMAT);
            writeln!(
                buf,
                "{}",
                log_line(&timestamp, record.target(), record.level(), record.args())
            )
        })
        .try_init()?;
    Ok(())
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// `{timestamp} - {target} - {LEVEL} - {message}`
fn log_line(
    timestamp: &dyn Display,
    target: &str,
    level: log::Level,
    message: &dyn Display,
) -> String {
    format!("{} - {} - {} - {}", timestamp, target, level, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_log_line_format() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_milli_opt(3, 4, 5, 6)
            .unwrap();
        let line = log_line(
            &ts.format(LOG_TIMESTAMP_FORMAT),
            "randochrontendo::core::publish::fanout",
            log::Level::Error,
            &"❌ Cohost post failed: timeout",
        );
        assert_eq!(
            line,
            "2024-01-02 03:04:05,006 - randochrontendo::core::publish::fanout - ERROR - ❌ Cohost post failed: timeout"
        );
    }

    #[test]
    fn test_log_file_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("randochrontendo.log");

        writeln!(open_log_file(&path).unwrap(), "first run").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second run").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first run\nsecond run\n");
    }

    #[test]
    fn test_second_init_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("randochrontendo.log");

        assert!(init_logging(&path).is_ok());
        assert!(matches!(
            init_logging(&path),
            Err(LogInitError::AlreadyInstalled(_))
        ));

        log::info!("🧪 logger installed");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(" - INFO - 🧪 logger installed"));
    }
}
