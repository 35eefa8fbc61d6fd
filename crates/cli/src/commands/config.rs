use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use aura_core::config::{AppConfig, LoadOptions};
use toml::Value;

/// Effective configuration with the source of each value: a CLI override, an
/// environment variable, the config file, or the built-in default.
pub fn run(options: LoadOptions) -> String {
    let config_file_path = detect_config_path(options.config_path.as_deref());
    let overrides = options.overrides.clone();

    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str], overridden: bool| {
        if overridden {
            return "cli flag".to_string();
        }
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let entries = [
        (
            "database.url",
            config.database.url.clone(),
            source("database.url", &["AURA_DATABASE_URL"], overrides.database_url.is_some()),
        ),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            source("database.max_connections", &["AURA_DATABASE_MAX_CONNECTIONS"], false),
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            source("database.timeout_secs", &["AURA_DATABASE_TIMEOUT_SECS"], false),
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            source("server.bind_address", &["AURA_SERVER_BIND_ADDRESS"], false),
        ),
        (
            "server.port",
            config.server.port.to_string(),
            source("server.port", &["AURA_SERVER_PORT"], overrides.server_port.is_some()),
        ),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            source("server.graceful_shutdown_secs", &["AURA_SERVER_GRACEFUL_SHUTDOWN_SECS"], false),
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            source(
                "logging.level",
                &["AURA_LOGGING_LEVEL", "AURA_LOG_LEVEL"],
                overrides.log_level.is_some(),
            ),
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            source("logging.format", &["AURA_LOGGING_FORMAT", "AURA_LOG_FORMAT"], false),
        ),
        (
            "training.learning_rate",
            config.training.learning_rate.to_string(),
            source(
                "training.learning_rate",
                &["AURA_TRAINING_LEARNING_RATE"],
                overrides.learning_rate.is_some(),
            ),
        ),
        (
            "training.epochs",
            config.training.epochs.to_string(),
            source("training.epochs", &["AURA_TRAINING_EPOCHS"], overrides.epochs.is_some()),
        ),
        (
            "recommend.status_log_limit",
            config.recommend.status_log_limit.to_string(),
            source("recommend.status_log_limit", &["AURA_RECOMMEND_STATUS_LOG_LIMIT"], false),
        ),
    ];

    let mut lines =
        vec!["effective config (source precedence: cli > env > file > default):".to_string()];
    lines.extend(entries.into_iter().map(|(key, value, source)| render_line(key, &value, source)));
    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("aura.toml"), PathBuf::from("config/aura.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
