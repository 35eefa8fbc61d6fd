use aura_core::config::LoadOptions;
use aura_db::DemoSeedDataset;

use crate::commands::{open_database, prepare, CommandResult};

pub fn run(options: LoadOptions, seed: u64) -> CommandResult {
    let (config, runtime) = match prepare("seed", options) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let loaded = DemoSeedDataset::load(&pool, seed)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8));
        pool.close().await;
        loaded
    });

    match result {
        Ok(loaded) => {
            let history = if loaded.actions_inserted == 0 {
                "action log already populated, history left untouched".to_string()
            } else {
                format!("{} browsing actions recorded (seed {seed})", loaded.actions_inserted)
            };
            let message = format!(
                "demo storefront loaded: {} products, {} accounts, {history}",
                loaded.products, loaded.users
            );
            CommandResult::success_with("seed", message, loaded)
        }
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}
