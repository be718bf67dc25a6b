use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config/budget_import.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Import {
    pub parallel: bool,
    pub threads: Option<usize>,
}

impl Default for Import {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub import: Import,
}

#[derive(Debug, Parser)]
#[command(name = "budget-import", about = "Validate and convert a budget workbook")]
pub struct Args {
    /// Workbook to import (.xlsx).
    #[arg(required_unless_present = "schema")]
    pub workbook: Option<PathBuf>,
    /// Optional config file path (TOML).
    #[arg(long)]
    pub config: Option<String>,
    /// Write the converted records to this file as JSON.
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Stop after the structural validation.
    #[arg(long)]
    pub validate_only: bool,
    /// Print the required tables and columns as JSON and exit.
    #[arg(long)]
    pub schema: bool,
    /// Override the log level.
    #[arg(long)]
    pub level: Option<String>,
}

impl Settings {
    /// Layers the config file, `BUDGET_IMPORT_*` variables and CLI overrides.
    pub fn load(args: &Args) -> Result<Settings> {
        let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
        let mut builder = config::Config::builder();
        builder = builder.add_source(config::File::with_name(config_path).required(false));
        builder = builder.add_source(config::Environment::with_prefix("BUDGET_IMPORT").separator("__"));
        let mut settings: Settings = builder.build()?.try_deserialize()?;

        if let Some(level) = &args.level {
            settings.app.level = level.clone();
        }

        Ok(settings)
    }
}
