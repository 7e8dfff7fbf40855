use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

const LOG_FILE_PREFIX: &str = "hourswasted";
const LOG_DIR: &str = "logs";
const KEPT_LOG_FILES: usize = 5;

/// Used for the files when neither `--log-filter` nor `RUST_LOG` is given. Checkpoints are logged
/// at info, so a day of tracking stays readable.
const DEFAULT_FILE_LEVEL: LevelFilter = LevelFilter::INFO;

fn crate_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::new(format!("{}={level}", env!("CARGO_PKG_NAME").replace('-', "_")))
}

/// Logs go into daily files under `<app_dir>/logs`, away from the terminal where the shell and
/// the running total live. `console` mirrors everything down to trace onto stderr.
pub fn enable_logging(app_dir: &Path, file_level: Option<LevelFilter>, console: bool) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(KEPT_LOG_FILES)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(app_dir.join(LOG_DIR))?;

    let file_filter = match file_level {
        Some(level) => crate_filter(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| crate_filter(DEFAULT_FILE_LEVEL)),
    };
    let file_layer = fmt::layer()
        .with_writer(appender)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(file_filter);

    let console_layer = console.then(|| {
        fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(crate_filter(LevelFilter::TRACE))
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()?;
    Ok(())
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .compact()
        .init()
});
