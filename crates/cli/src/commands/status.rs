use aura_core::config::LoadOptions;
use aura_core::errors::ApplicationError;
use aura_core::ml::log::TrainingLogEntry;
use aura_core::ml::model::ModelParameters;
use serde::Serialize;

use crate::commands::{engine, open_database, prepare, CommandResult};

#[derive(Debug, Serialize)]
struct StatusSnapshot {
    weights: ModelParameters,
    logs: Vec<TrainingLogEntry>,
}

/// Live parameters plus the newest `limit` training-log entries. `None` uses
/// the configured status limit.
pub fn run(options: LoadOptions, limit: Option<u32>) -> CommandResult {
    let (config, runtime) = match prepare("status", options) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };
    let limit = limit.unwrap_or(config.recommend.status_log_limit);

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let engine = engine(&pool, &config);
        let snapshot = async {
            let weights = engine.current_parameters().await?;
            let logs = engine.training_log(limit).await?;
            Ok::<_, ApplicationError>(StatusSnapshot { weights, logs })
        }
        .await
        .map_err(|error| ("query", error.to_string(), 6u8));
        pool.close().await;
        snapshot
    });

    match result {
        Ok(snapshot) => {
            let message = match snapshot.logs.first() {
                Some(latest) => format!(
                    "accuracy {:.1}%, last run {} ({})",
                    snapshot.weights.accuracy,
                    latest.status.as_str(),
                    latest.message
                ),
                None => "no training runs recorded yet".to_string(),
            };
            CommandResult::success_with("status", message, snapshot)
        }
        Err(failure) => CommandResult::from_failure("status", failure),
    }
}
