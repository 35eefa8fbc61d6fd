use aura_core::config::LoadOptions;
use aura_core::domain::action::UserId;
use aura_db::{ProductRepository, SqlProductRepository};

use crate::commands::{engine, open_database, prepare, CommandResult};

pub fn run(options: LoadOptions, user_id: &str, top: Option<usize>) -> CommandResult {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return CommandResult::failure("recommend", "invalid_input", "userId is required", 2);
    }

    let (config, runtime) = match prepare("recommend", options) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let ranked = async {
            let catalog = SqlProductRepository::new(pool.clone()).list().await?;
            engine(&pool, &config).recommend(&UserId(user_id.to_string()), &catalog).await
        }
        .await
        .map_err(|error| ("query", error.to_string(), 6u8));
        pool.close().await;
        ranked
    });

    match result {
        Ok(mut ranked) => {
            if let Some(top) = top {
                ranked.truncate(top);
            }
            let message = match ranked.first() {
                Some(best) => format!(
                    "{} products ranked for `{user_id}`, top pick {} at {}%",
                    ranked.len(),
                    best.name,
                    best.probability_percent
                ),
                None => format!("catalog is empty, nothing to rank for `{user_id}`"),
            };
            CommandResult::success_with("recommend", message, ranked)
        }
        Err(failure) => CommandResult::from_failure("recommend", failure),
    }
}
