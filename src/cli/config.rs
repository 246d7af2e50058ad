//! Show the effective configuration.

use crate::config::Config;
use crate::error::Error;

/// Run the config command.
pub fn run() -> Result<(), Error> {
    let cwd = std::env::current_dir()?;
    let (config, source) = Config::load(&cwd)?;

    println!("Source: {}", source);
    println!();
    let rendered = toml::to_string_pretty(&config).map_err(|e| Error::Config(e.to_string()))?;
    print!("{}", rendered);
    Ok(())
}
