pub mod config;
pub mod doctor;
pub mod migrate;
pub mod recommend;
pub mod seed;
pub mod status;
pub mod train;

use aura_core::config::{AppConfig, LoadOptions};
use aura_core::ml::service::RecommendationEngine;
use aura_db::{
    connect_with_config, migrations, DbPool, SqlEventLog, SqlModelStore, SqlTrainingLogStore,
};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

pub type SqlEngine = RecommendationEngine<SqlEventLog, SqlModelStore, SqlTrainingLogStore>;

/// `(error_class, message, exit_code)` carried out of a command's async block.
pub(crate) type Failure = (&'static str, String, u8);

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::reported(command, "ok", message, None)
    }

    /// Falls back to a `serialization` failure (exit 7) when `data` cannot be
    /// represented as JSON, rather than reporting success without it.
    pub fn success_with(command: &str, message: impl Into<String>, data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self::reported(command, "ok", message, Some(value)),
            Err(error) => Self::failure(
                command,
                "serialization",
                format!("failed to serialize command output: {error}"),
                7,
            ),
        }
    }

    /// Completed without doing work, e.g. training over an empty action log.
    pub fn skipped(command: &str, message: impl Into<String>) -> Self {
        Self::reported(command, "skipped", message, None)
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    fn reported(
        command: &str,
        status: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: status.to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    fn from_failure(command: &str, (error_class, message, exit_code): Failure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\
             \"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Loads config and builds a single-threaded runtime, the preamble every
/// database-backed command shares.
pub(crate) fn prepare(
    command: &str,
    options: LoadOptions,
) -> Result<(AppConfig, Runtime), CommandResult> {
    let config = AppConfig::load(options).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })?;

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        })?;

    Ok((config, runtime))
}

/// Connects and applies pending migrations.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, Failure> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

pub(crate) fn engine(pool: &DbPool, config: &AppConfig) -> SqlEngine {
    RecommendationEngine::new(
        SqlEventLog::new(pool.clone()),
        SqlModelStore::new(pool.clone()),
        SqlTrainingLogStore::new(pool.clone()),
    )
    .with_hyperparameters(config.training.hyperparameters())
}
