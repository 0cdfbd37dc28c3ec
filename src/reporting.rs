//! Utilities for logging and error reporting.

use std::{path::PathBuf, str::FromStr};

use eyre::Context;
use tracing_appender::{
    non_blocking::{NonBlockingBuilder, WorkerGuard},
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt};

use crate::fs;

/// Options for writing to log file.
#[derive(Clone)]
struct LogFileOptions {
    /// The directory to store the log files in.
    /// Will be created if it doesn't yet exist.
    pub directory: PathBuf,
    /// How often to rotate the log files
    pub rotation: Rotation,
}

#[derive(Clone)]
struct ReportWriterOptions {
    /// Whether to write to stdout.
    stdout: bool,
    /// Whether to write to stderr.
    stderr: bool,
    /// Whether to write to the log file.
    log_file: Option<LogFileOptions>,
}

/// Implements [std::io::Write] to write `tracing`/panic messages to
/// multiple outputs.
struct ReportWriter {
    stdout: bool,
    stderr: bool,
    log_file_writer: Option<RollingFileAppender>,
}

impl ReportWriter {
    /// Try creating a new [`ReportWriter`].
    fn try_new(options: &ReportWriterOptions) -> eyre::Result<Self> {
        let log_file_writer = if let Some(log_file_options) = &options.log_file {
            if !log_file_options.directory.exists() {
                fs::create_dir_if_not_exists(&log_file_options.directory)
                    .wrap_err("Unable to create log file directory")?;
            }
            let appender = RollingFileAppender::new(
                log_file_options.rotation.clone(),
                log_file_options.directory.clone(),
                "start-line.log",
            );

            Some(appender)
        } else {
            None
        };

        Ok(Self {
            stdout: options.stdout,
            stderr: options.stderr,
            log_file_writer,
        })
    }
}

impl std::io::Write for ReportWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut retval: usize = buf.len();

        if self.stdout || self.stderr {
            let out_str = String::from_utf8_lossy(buf);
            if self.stdout {
                print!("{}", out_str);
            }

            if self.stderr {
                eprint!("{}", out_str);
            }
        }

        if let Some(writer) = &mut self.log_file_writer {
            retval = usize::min(retval, writer.write(buf)?);
        }

        Ok(retval)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if self.stdout {
            std::io::stdout().flush()?;
        }

        if self.stderr {
            std::io::stderr().flush()?;
        }

        if let Some(writer) = &mut self.log_file_writer {
            writer.flush()?;
        }

        Ok(())
    }
}

impl Drop for ReportWriter {
    fn drop(&mut self) {
        use std::io::Write;
        let _ = self.write("\n".as_bytes());
    }
}

/// Guard which flushes buffered log messages when dropped.
pub struct ReportingGuard {
    _writer: WorkerGuard,
}

/// Options for [`setup_logging()`].
pub struct Options {
    /// Directory where application data is stored, log files are written to
    /// the `log` subdirectory.
    pub data_dir: PathBuf,
    /// How often the log files are rotated.
    pub log_rotation: Rotation,
}

impl Options {
    fn log_dir(&self) -> PathBuf {
        self.data_dir.join("log")
    }
}

/// Install the `eyre` error and panic report hooks.
pub fn setup_error_hooks() -> eyre::Result<()> {
    let (eyre_panic_hook, eyre_hook) = color_eyre::config::HookBuilder::new().into_hooks();
    let eyre_panic_hook = eyre_panic_hook.into_panic_hook();
    eyre::set_hook(eyre_hook.into_eyre_hook())?;
    std::panic::set_hook(Box::new(move |panic_info| {
        eyre_panic_hook(panic_info);
    }));
    Ok(())
}

/// Set up logging to stdout and a rolling log file in
/// [`Options::data_dir`]`/log`.
pub fn setup_logging(options: &Options) -> eyre::Result<ReportingGuard> {
    let log_dir = options.log_dir();

    let report_writer = ReportWriter::try_new(&ReportWriterOptions {
        stdout: true,
        stderr: false,
        log_file: Some(LogFileOptions {
            directory: log_dir,
            rotation: options.log_rotation.clone(),
        }),
    })?;

    let (non_blocking_writer, report_writer_guard) = NonBlockingBuilder::default()
        .buffered_lines_limit(1000)
        .lossy(false)
        .finish(report_writer);

    let rust_log_env: String =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "warn,start_line=debug".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(non_blocking_writer);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(tracing_subscriber::EnvFilter::from_str(rust_log_env.as_str()).unwrap_or_default())
        .with(tracing_error::ErrorLayer::default())
        .init();

    Ok(ReportingGuard {
        _writer: report_writer_guard,
    })
}
