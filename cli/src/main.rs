mod app;
mod cli;
mod commands;
mod logging;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, info};

use playground_core::client::{CompletionProvider, OllamaClient};
use playground_core::config::{get_default_config_file, PlaygroundConfig, APP_NAME};
use playground_core::models::ModelDirectory;
use playground_history::{FileHistoryStore, HistoryStore, InMemoryHistoryStore, SessionController};

use crate::app::{App, Interrupts, PromptOutcome};
use crate::cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_default_config_file(APP_NAME)?,
    };
    let config = PlaygroundConfig::load_layered(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .merge(&args.overrides());

    logging::init_logging(config.log_level());
    debug!(config_path = %config_path.display(), "Configuration loaded");

    if args.show_config {
        output::print_config(&config, &config_path);
        return Ok(());
    }

    if args.ephemeral {
        info!("Using in-memory session store");
        run(InMemoryHistoryStore::new(), &args, &config).await
    } else {
        let dir = config.history_dir()?;
        let store = FileHistoryStore::open(dir.clone())
            .await
            .with_context(|| format!("Failed to open history directory {}", dir.display()))?;
        info!(dir = %dir.display(), "Using file session store");
        run(store, &args, &config).await
    }
}

async fn run<S: HistoryStore>(store: S, args: &Args, config: &PlaygroundConfig) -> Result<()> {
    let mut controller = SessionController::new(store);
    if let Some(id) = &config.autosave_session {
        controller = controller.with_autosave(id.clone());
    }

    if !args.delete.is_empty() {
        let removed = controller.delete(&args.delete).await?;
        output::success(&format!("Deleted {} session(s).", removed));
        return Ok(());
    }

    if args.list_sessions {
        let ids: Vec<String> = controller.list_sessions().await?.into_iter().collect();
        if ids.is_empty() {
            output::info("No chat sessions available.");
        } else {
            output::print_list("Chat Sessions", &ids, None);
        }
        return Ok(());
    }

    let provider: Arc<dyn CompletionProvider> = Arc::new(OllamaClient::from_config(config)?);
    let models = ModelDirectory::with_ttl(provider.clone(), config.model_cache_ttl());

    let mut app = App::new(
        controller,
        provider,
        models,
        config.default_model.clone(),
        Interrupts::install(),
    );

    if args.list_models {
        let names = app.refresh_models().await;
        if !names.is_empty() {
            output::print_list("Models", &names, app.model());
        }
        return Ok(());
    }

    if let Some(prompt) = &args.prompt {
        app.start(args.session.as_deref()).await;
        let outcome = app.run_single_query(prompt, args.save_as.as_deref()).await;
        if outcome != PromptOutcome::Completed {
            std::process::exit(1);
        }
    } else if args.interactive || args.session.is_some() {
        app.start(args.session.as_deref()).await;
        app.run_interactive().await?;
    } else {
        output::print_usage_instructions();
    }

    Ok(())
}
