use std::fs::File;
use std::io;

use anyhow::Result;
use simplelog::{Config, SimpleLogger, WriteLogger};

use salmon_rules::config::PlayConfig;
use salmon_rules::play::GameDriver;

fn init_logging(config: &PlayConfig) {
    // A log file that cannot be created just means no file logging.
    if let Some(path) = &config.log_file {
        if let Ok(file) = File::create(path) {
            let _ = WriteLogger::init(config.log_level, Config::default(), file);
            log::info!("Logger initialized.");
            return;
        }
    }
    let _ = SimpleLogger::init(config.log_level, Config::default());
}

fn main() -> Result<()> {
    let config = PlayConfig::from_args(std::env::args().skip(1))?;
    init_logging(&config);

    let mut driver = GameDriver::new(config)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    driver.run(stdin.lock(), stdout.lock())?;
    Ok(())
}
