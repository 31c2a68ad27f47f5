use std::fs::OpenOptions;
use std::path::Path;

use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Installs the global logger: stderr always, plus an append-only file when
/// `log_file` is given.
pub fn init(level: LevelFilter, log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        loggers.push(WriteLogger::new(level, Config::default(), file));
    }

    CombinedLogger::init(loggers)?;
    Ok(())
}
