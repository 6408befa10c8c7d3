use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use session_core::Latency;

pub const SETTINGS_FILE: &str = "fitlog.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub auth_delay_ms: u64,
    pub lookup_delay_ms: u64,
    pub seed_demo_user: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/fitlog.db".into(),
            auth_delay_ms: 500,
            lookup_delay_ms: 300,
            seed_demo_user: true,
        }
    }
}

impl Settings {
    pub fn latency(&self) -> Latency {
        Latency {
            auth: Duration::from_millis(self.auth_delay_ms),
            lookup: Duration::from_millis(self.lookup_delay_ms),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    database_url: Option<String>,
    auth_delay_ms: Option<u64>,
    lookup_delay_ms: Option<u64>,
    seed_demo_user: Option<bool>,
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    apply_file(&mut settings, Path::new(SETTINGS_FILE));
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, path: &Path) {
    let Ok(raw) = fs::read_to_string(path) else {
        return;
    };
    let file_cfg = match toml::from_str::<FileSettings>(&raw) {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable settings file");
            return;
        }
    };

    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.auth_delay_ms {
        settings.auth_delay_ms = v;
    }
    if let Some(v) = file_cfg.lookup_delay_ms {
        settings.lookup_delay_ms = v;
    }
    if let Some(v) = file_cfg.seed_demo_user {
        settings.seed_demo_user = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("FITLOG_DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = var("APP__AUTH_DELAY_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.auth_delay_ms = parsed;
        }
    }
    if let Some(v) = var("APP__LOOKUP_DELAY_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.lookup_delay_ms = parsed;
        }
    }

    if let Some(v) = var("APP__SEED_DEMO_USER") {
        match v.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => settings.seed_demo_user = true,
            "0" | "false" | "no" => settings.seed_demo_user = false,
            _ => {}
        }
    }
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
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

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
