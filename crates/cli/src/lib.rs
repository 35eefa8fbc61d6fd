pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use aura_core::config::{ConfigOverrides, LoadOptions};
use aura_db::fixtures::DEFAULT_SEED;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "aura",
    about = "Aura recommendation operator CLI",
    long_about = "Prepare the Aura database, load the demo storefront, retrain the purchase \
                  model, and inspect rankings.",
    after_help = "Examples:\n  aura migrate\n  aura seed --seed 7\n  aura train\n  \
                  aura recommend --user user3 --top 3\n  aura doctor --json"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Path to an aura.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override database.url")]
    database_url: Option<String>,
    #[arg(long, global = true, help = "Override training.learning_rate")]
    learning_rate: Option<f64>,
    #[arg(long, global = true, help = "Override training.epochs")]
    epochs: Option<usize>,
}

impl GlobalArgs {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                learning_rate: self.learning_rate,
                epochs: self.epochs,
                ..ConfigOverrides::default()
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo catalog, accounts, and a reproducible browsing history")]
    Seed {
        #[arg(long, default_value_t = DEFAULT_SEED, help = "Random seed for the browsing history")]
        seed: u64,
    },
    #[command(about = "Retrain the purchase model from the full action log")]
    Train,
    #[command(about = "Show live model parameters and recent training runs")]
    Status {
        #[arg(long, help = "Number of training-log entries to include")]
        limit: Option<u32>,
    },
    #[command(about = "Rank the catalog for one user")]
    Recommend {
        #[arg(long = "user", help = "User id whose actions drive the ranking")]
        user_id: String,
        #[arg(long, help = "Only print the first N products")]
        top: Option<usize>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution"
    )]
    Config,
    #[command(about = "Validate config, DB connectivity, and model readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.global.load_options();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(options),
        Command::Seed { seed } => commands::seed::run(options, seed),
        Command::Train => commands::train::run(options),
        Command::Status { limit } => commands::status::run(options, limit),
        Command::Recommend { user_id, top } => commands::recommend::run(options, &user_id, top),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Doctor { json } => {
            let (passed, output) = commands::doctor::run(options, json);
            commands::CommandResult { exit_code: if passed { 0 } else { 1 }, output }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn global_overrides_reach_load_options() {
        let cli = Cli::parse_from([
            "aura",
            "train",
            "--database-url",
            "sqlite://demo.db",
            "--epochs",
            "250",
        ]);

        assert!(matches!(cli.command, Command::Train));
        let options = cli.global.load_options();
        assert_eq!(options.overrides.database_url.as_deref(), Some("sqlite://demo.db"));
        assert_eq!(options.overrides.epochs, Some(250));
        assert!(!options.require_file);
    }

    #[test]
    fn recommend_requires_user_flag() {
        assert!(Cli::try_parse_from(["aura", "recommend"]).is_err());

        let cli = Cli::parse_from(["aura", "recommend", "--user", "user3", "--top", "2"]);
        match cli.command {
            Command::Recommend { user_id, top } => {
                assert_eq!(user_id, "user3");
                assert_eq!(top, Some(2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
