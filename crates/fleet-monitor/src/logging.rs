use crate::config::Config;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, EnvFilter};

/// Keeps the log file handle alive for the lifetime of the process.
pub struct LogGuard {
    #[allow(dead_code)]
    file: Option<Arc<Mutex<File>>>,
}

struct FileWriter {
    file: Arc<Mutex<File>>,
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.lock() {
            Ok(mut file) => file.write(buf),
            Err(_) => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.lock() {
            Ok(mut file) => file.flush(),
            Err(_) => Ok(()),
        }
    }
}

/// The terminal UI owns stdout, so events go to `--log-file` when given,
/// to stdout only when `FLEET_LOG_STDOUT` is set, and nowhere otherwise.
pub fn init_logging(config: &Config) -> LogGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file = match config.log_file.as_deref().map(open_log_file).transpose() {
        Ok(file) => file.map(|file| Arc::new(Mutex::new(file))),
        Err(err) => {
            eprintln!("log_file_error: {err}");
            None
        }
    };

    let writer = match (&file, config.log_stdout) {
        (Some(file), _) => {
            let file = file.clone();
            BoxMakeWriter::new(move || FileWriter { file: file.clone() })
        }
        (None, true) => BoxMakeWriter::new(io::stdout),
        (None, false) => BoxMakeWriter::new(io::sink),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .try_init();
    LogGuard { file }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
