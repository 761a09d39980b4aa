use std::{fs, path::Path};

use anyhow::{bail, Context};
use client_core::ReportSettings;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "covid_safe.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_url: String,
    pub data_version: Option<String>,
    pub selection_db_url: String,
    pub multiplier: f64,
    pub target_percent: f64,
    pub summary_group_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_url: "http://127.0.0.1:8080".into(),
            data_version: None,
            selection_db_url: default_selection_db_url(),
            multiplier: 5.0,
            target_percent: 50.0,
            summary_group_size: 20,
        }
    }
}

/// Keys accepted in `covid_safe.toml`; all optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    data_url: Option<String>,
    data_version: Option<String>,
    selection_db_url: Option<String>,
    multiplier: Option<f64>,
    target_percent: Option<f64>,
    summary_group_size: Option<u32>,
}

impl Settings {
    pub fn report_settings(&self) -> ReportSettings {
        ReportSettings {
            multiplier: self.multiplier,
            target_percent: self.target_percent,
            summary_group_size: self.summary_group_size,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.multiplier.is_finite() && self.multiplier > 0.0) {
            bail!("multiplier must be positive, got {}", self.multiplier);
        }
        if !(self.target_percent > 0.0 && self.target_percent < 100.0) {
            bail!(
                "target percent must be between 0 and 100, got {}",
                self.target_percent
            );
        }
        if self.summary_group_size == 0 {
            bail!("summary group size must be at least 1");
        }
        Ok(())
    }

    fn apply_file(&mut self, raw: &str) -> anyhow::Result<()> {
        let file: FileSettings = toml::from_str(raw).context("invalid settings file")?;
        if let Some(v) = file.data_url {
            self.data_url = v;
        }
        if let Some(v) = file.data_version {
            self.data_version = Some(v);
        }
        if let Some(v) = file.selection_db_url {
            self.selection_db_url = normalize_database_url(&v);
        }
        if let Some(v) = file.multiplier {
            self.multiplier = v;
        }
        if let Some(v) = file.target_percent {
            self.target_percent = v;
        }
        if let Some(v) = file.summary_group_size {
            self.summary_group_size = v;
        }
        Ok(())
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("COVID_SAFE_DATA_URL") {
            self.data_url = v;
        }
        if let Some(v) = var("APP__DATA_URL") {
            self.data_url = v;
        }
        if let Some(v) = var("APP__DATA_VERSION") {
            self.data_version = Some(v).filter(|v| !v.is_empty());
        }
        if let Some(v) = var("APP__SELECTION_DB_URL") {
            self.selection_db_url = normalize_database_url(&v);
        }
        if let Some(v) = parsed_var(&var, "APP__MULTIPLIER") {
            self.multiplier = v;
        }
        if let Some(v) = parsed_var(&var, "APP__TARGET_PERCENT") {
            self.target_percent = v;
        }
        if let Some(v) = parsed_var(&var, "APP__SUMMARY_GROUP_SIZE") {
            self.summary_group_size = v;
        }
    }
}

/// Defaults, then the settings file (if present), then the environment.
pub fn load_settings(config_path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(config_path) {
        Ok(raw) => settings
            .apply_file(&raw)
            .with_context(|| format!("failed to load '{}'", config_path.display()))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read '{}'", config_path.display()));
        }
    }

    settings.apply_env(|name| std::env::var(name).ok());
    Ok(settings)
}

fn parsed_var<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    let raw = var(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "config: ignoring unparsable value");
            None
        }
    }
}

fn default_selection_db_url() -> String {
    dirs::data_local_dir()
        .map(|dir| dir.join("covid_safe").join("selection.db"))
        .map(|path| normalize_database_url(&path.to_string_lossy()))
        .unwrap_or_else(|| "sqlite://./data/selection.db".into())
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return default_selection_db_url();
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}
