use std::{fs, path::Path};

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub admin_ids: Vec<i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/events.db".into(),
            admin_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    database_url: Option<String>,
    admin_ids: Option<Vec<i64>>,
}

/// Defaults, then the TOML file (if present), then environment
/// overrides. Nothing here is fatal except an unreadable explicit
/// config path.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let file = match path {
        Some(path) => Some(fs::read_to_string(path).map_err(|err| {
            anyhow::anyhow!("failed to read config file '{}': {err}", path.display())
        })?),
        None => fs::read_to_string("eventbot.toml").ok(),
    };
    if let Some(raw) = file {
        let file_cfg: FileSettings = toml::from_str(&raw)?;
        if let Some(v) = file_cfg.database_url {
            settings.database_url = v;
        }
        if let Some(v) = file_cfg.admin_ids {
            settings.admin_ids = v;
        }
    }

    if let Ok(v) = std::env::var("EVENTBOT_DATABASE_URL") {
        settings.database_url = v;
    }
    if let Ok(v) = std::env::var("EVENTBOT_ADMIN_IDS") {
        settings.admin_ids = v
            .split(',')
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect();
    }

    settings.database_url = normalize_database_url(&settings.database_url);
    Ok(settings)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}
