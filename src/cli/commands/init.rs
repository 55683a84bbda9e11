//! Init command - write default configuration and create data directories.

use crate::cli::Output;
use crate::config::Settings;

pub fn run_init(settings: &Settings) -> anyhow::Result<()> {
    let config_path = Settings::default_config_path();

    if config_path.exists() {
        Output::info("Configuration file already exists");
    } else {
        settings.save()?;
        Output::success("Wrote default configuration");
    }

    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    Output::kv("Config", &config_path.display().to_string());
    Output::kv("Data dir", &settings.data_dir().display().to_string());
    Output::kv("Database", &settings.sqlite_path().display().to_string());

    Output::info("Run 'klipp doctor' to verify system requirements");

    Ok(())
}
