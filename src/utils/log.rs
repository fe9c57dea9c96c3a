use std::fs::File;
use std::io::stderr;
use std::path::PathBuf;
use std::sync::{LazyLock, Mutex};

use chrono::Local;
use miette::{Context, IntoDiagnostic};
use tracing::level_filters::LevelFilter;
use tracing::{Level, warn};
use tracing_appender::non_blocking;
use tracing_subscriber::reload;
use tracing_subscriber::{
    EnvFilter, Layer, fmt, layer::SubscriberExt, reload::Handle, util::SubscriberInitExt,
};

pub trait LogHandle: Send + Sync {
    fn set_filter(&self, new_filter: EnvFilter) -> miette::Result<()>;
}

impl<S> LogHandle for Handle<EnvFilter, S>
where
    S: tracing::Subscriber + Send + Sync + 'static,
{
    fn set_filter(&self, new_filter: EnvFilter) -> miette::Result<()> {
        self.modify(|current| *current = new_filter)
            .into_diagnostic()
    }
}

pub struct LogHandles {
    console_handle: Mutex<Box<dyn LogHandle>>,
    file_handle: Mutex<Box<dyn LogHandle>>,
    log_file: Option<PathBuf>,
}

fn open_log_file() -> miette::Result<(PathBuf, File)> {
    let log_dir = std::env::temp_dir().join("teoriat_logs");
    std::fs::create_dir_all(&log_dir)
        .into_diagnostic()
        .with_context(|| format!("Creating log directory {}", log_dir.display()))?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let path = log_dir.join(format!("teoriat_{timestamp}.log"));
    let file = File::create(&path)
        .into_diagnostic()
        .with_context(|| format!("Creating log file {}", path.display()))?;
    Ok((path, file))
}

static LOG_HANDLES: LazyLock<LogHandles> = LazyLock::new(|| {
    #[cfg(feature = "dev-tools")]
    color_backtrace::install();

    // Console Layer with its own reloadable filter
    let console_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    let (console_filter, console_handle) = reload::Layer::new(console_filter);
    let console_layer = fmt::layer()
        .without_time()
        .with_writer(stderr)
        .with_filter(console_filter);

    // File Layer with its own reloadable filter (initially off)
    let file_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::OFF.into())
        .from_env_lossy();
    let (file_filter, file_handle) = reload::Layer::new(file_filter);

    // A log file we cannot create only costs us the file layer.
    let (log_file, file_layer) = match open_log_file() {
        Ok((path, file)) => {
            let (non_blocking_writer, guard) = non_blocking(file);
            std::mem::forget(guard); // Keep the guard alive.
            let layer = fmt::layer()
                .with_writer(non_blocking_writer)
                .with_ansi(false) // No colors in file
                .with_filter(file_filter);
            (Ok(path), Some(layer))
        }
        Err(e) => (Err(e), None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    let log_file = match log_file {
        Ok(path) => Some(path),
        Err(e) => {
            warn!("File logging unavailable: {e:?}");
            None
        }
    };

    LogHandles {
        console_handle: Mutex::new(Box::new(console_handle)),
        file_handle: Mutex::new(Box::new(file_handle)),
        log_file,
    }
});

fn with_handle(
    handle: &Mutex<Box<dyn LogHandle>>,
    new_filter: EnvFilter,
) -> miette::Result<()> {
    handle
        .lock()
        .map_err(|_| miette::miette!("Log handle lock poisoned"))?
        .set_filter(new_filter)
}

pub fn set_log_level(level: Level) -> miette::Result<()> {
    let new_filter = EnvFilter::new(level.to_string());
    with_handle(&LOG_HANDLES.console_handle, new_filter)
        .with_context(|| format!("Failed to modify log filter to level: {level}"))
}

pub fn toggle_file_logging(enable: bool) -> miette::Result<()> {
    let Some(path) = &LOG_HANDLES.log_file else {
        miette::bail!("File logging is unavailable");
    };
    let new_filter = if enable {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("off")
    };
    with_handle(&LOG_HANDLES.file_handle, new_filter).context("Failed to modify log filter")?;
    if enable {
        tracing::info!("Logging to {}", path.display());
    }
    Ok(())
}

/// Initialize tracing and backtrace
pub fn init() {
    LazyLock::force(&LOG_HANDLES);
    #[cfg(feature = "parallel")]
    {
        tracing::debug!("Scoring candidates on {} threads", rayon::current_num_threads());
    }
    #[cfg(not(feature = "parallel"))]
    {
        tracing::debug!("Scoring candidates sequentially");
    }
}
