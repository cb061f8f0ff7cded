use clap::Parser;
use dependency_check_notifier::app::{self, EXIT_CONFIG_ERROR};
use dependency_check_notifier::args::Args;
use dependency_check_notifier::discord::{DiscordWebhook, DryRun, Notifier};
use dependency_check_notifier::errors::*;
use dependency_check_notifier::settings::Settings;
use env_logger::Env;
use std::process;

#[tokio::main]
async fn main() {
    // variables that are already set take precedence
    let dotenv = dotenvy::dotenv();

    // clap exits with 2 on usage errors as well
    let args = Args::parse();

    // quiet is only known once the settings are valid, so this is always printed
    let settings = match Settings::from_args(args) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            process::exit(EXIT_CONFIG_ERROR);
        }
    };

    if !settings.quiet {
        let log_level = match settings.verbose {
            0 => "info",
            _ => "debug",
        };
        env_logger::init_from_env(Env::default().default_filter_or(log_level));
    }

    if let Ok(path) = dotenv {
        debug!("Loaded environment from {:?}", path);
    }
    debug!("Using settings: {:?}", settings);

    let result = run(&settings).await;
    process::exit(app::exit_code(&settings, &result));
}

async fn run(settings: &Settings) -> Result<app::RunSummary> {
    let notifier: Option<Box<dyn Notifier>> = if settings.dry_run {
        Some(Box::new(DryRun))
    } else if let Some(url) = &settings.webhook_url {
        Some(Box::new(DiscordWebhook::new(url)?))
    } else {
        None
    };

    app::run_notifier(settings, notifier.as_deref()).await
}
