use aura_core::config::LoadOptions;
use aura_core::ml::service::{TrainingOutcome, TrainingReport};

use crate::commands::{engine, open_database, prepare, CommandResult, Failure};

pub fn run(options: LoadOptions) -> CommandResult {
    let (config, runtime) = match prepare("train", options) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let outcome = engine(&pool, &config).train().await;
        pool.close().await;
        Ok::<_, Failure>(outcome)
    });

    match result {
        Ok(TrainingOutcome::Trained { accuracy, weights, sample_count }) => {
            let message = format!("trained on {sample_count} samples, accuracy {accuracy:.1}%");
            let report = TrainingReport::from(TrainingOutcome::Trained {
                accuracy,
                weights,
                sample_count,
            });
            CommandResult::success_with("train", message, report)
        }
        Ok(TrainingOutcome::Skipped { message }) => CommandResult::skipped("train", message),
        Ok(TrainingOutcome::Failed { error }) => {
            CommandResult::failure("train", "training", error, 6)
        }
        Err(failure) => CommandResult::from_failure("train", failure),
    }
}
