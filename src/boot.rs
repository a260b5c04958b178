use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::io::{self, Write};

/// Environment variable naming a log file, used when `--log-file` is absent.
pub const LOG_FILE_ENV: &str = "SERIAL_CHAT_LOG_FILE";

/// Initialize logging.
///
/// Stdout belongs to the console, so logs go to stderr unless a file is given
/// via `--log-file` or `SERIAL_CHAT_LOG_FILE`. `RUST_LOG` overrides the level.
pub fn init_logger(log_file: Option<&str>) {
    let log_file = log_file
        .map(str::to_string)
        .or_else(|| std::env::var(LOG_FILE_ENV).ok());

    if let Some(path) = log_file {
        if let Err(err) = init_file_logger(&path) {
            eprintln!("Failed to initialize file logger at '{path}': {err}");
            init_stderr_logger();
        }
    } else {
        init_stderr_logger();
    }
}

fn init_stderr_logger() {
    let mut builder = Builder::new();
    builder
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .target(Target::Stderr)
        .filter_level(LevelFilter::Warn)
        .parse_default_env();
    if let Err(err) = builder.try_init() {
        eprintln!("Logger already initialized: {err}");
    }
}

fn init_file_logger(path: &str) -> io::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} {} [{}] - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(file)))
        .filter_level(LevelFilter::Debug)
        .parse_default_env();
    builder
        .try_init()
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;

    log::info!("File logger initialized at {path}");
    Ok(())
}
