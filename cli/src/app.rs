use anyhow::{Context, Result};
use colored::*;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{MultiSelect, Select};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use playground_core::client::CompletionProvider;
use playground_core::errors::{PlaygroundError, PlaygroundResult};
use playground_core::models::ModelDirectory;
use playground_core::types::ConversationTurn;
use playground_history::{HistoryStore, SessionController};

use crate::commands::Command;
use crate::output;

/// How a prompt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    Completed,
    Failed,
    Cancelled,
    NoModel,
}

/// Routes Ctrl-C to the generation in flight; when idle, Ctrl-C exits
#[derive(Debug, Clone, Default)]
pub struct Interrupts {
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl Interrupts {
    pub fn install() -> Self {
        let interrupts = Self::default();
        let handle = interrupts.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !handle.cancel_current() {
                    println!();
                    std::process::exit(130);
                }
            }
        });
        interrupts
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.slot() = Some(token.clone());
        token
    }

    fn end(&self) {
        *self.slot() = None;
    }

    fn cancel_current(&self) -> bool {
        match self.slot().take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// The terminal front end: model selection, the active chat, and session actions
pub struct App<S: HistoryStore> {
    controller: SessionController<S>,
    provider: Arc<dyn CompletionProvider>,
    models: ModelDirectory,
    model: Option<String>,
    preferred_model: Option<String>,
    interrupts: Interrupts,
}

impl<S: HistoryStore> App<S> {
    pub fn new(
        controller: SessionController<S>,
        provider: Arc<dyn CompletionProvider>,
        models: ModelDirectory,
        preferred_model: Option<String>,
        interrupts: Interrupts,
    ) -> Self {
        Self {
            controller,
            provider,
            models,
            model: None,
            preferred_model,
            interrupts,
        }
    }

    pub fn controller(&self) -> &SessionController<S> {
        &self.controller
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Resume or start the chat and pick a model
    pub async fn start(&mut self, session: Option<&str>) {
        let turns = self.controller.start_or_resume(session).await;
        if !turns.is_empty() {
            output::render_history(turns);
        }
        self.refresh_models().await;
    }

    /// Fetch the model list (cached) and keep the current choice valid
    pub async fn refresh_models(&mut self) -> Vec<String> {
        let listing = self.models.fetch_models().await;
        if let Some(warning) = &listing.warning {
            output::warning(warning);
        }

        if listing.names.is_empty() {
            if listing.warning.is_none() {
                output::warning(
                    "No models found. Please ensure Ollama is running and models are installed.",
                );
            }
            self.model = None;
            return listing.names;
        }

        let keep_current = self
            .model
            .as_ref()
            .is_some_and(|m| listing.names.contains(m));
        if !keep_current {
            self.model = match &self.preferred_model {
                Some(preferred) if listing.names.contains(preferred) => Some(preferred.clone()),
                Some(preferred) => {
                    output::warning(&format!(
                        "Model '{}' is not available, using '{}'",
                        preferred, listing.names[0]
                    ));
                    Some(listing.names[0].clone())
                }
                None => Some(listing.names[0].clone()),
            };
            debug!(model = ?self.model, "Selected model");
        }
        listing.names
    }

    /// Send a prompt and stream the reply. The user turn is kept even when the
    /// reply fails; the assistant turn is only added for a complete reply.
    pub async fn on_user_prompt(&mut self, prompt: &str) -> PromptOutcome {
        let Some(model) = self.model.clone() else {
            output::info("Please select a model to begin (see /models).");
            return PromptOutcome::NoModel;
        };

        if let Err(e) = self
            .controller
            .append_turn(ConversationTurn::user(prompt))
            .await
        {
            output::error(&format!("Failed to record prompt: {}", e));
        }

        let spinner = new_spinner();
        let cancel = self.interrupts.begin();
        let result = self.stream_reply(&model, prompt, cancel, &spinner).await;
        self.interrupts.end();
        spinner.finish_and_clear();

        match result {
            Ok(reply) => {
                println!();
                info!(model = %model, reply_len = reply.len(), "Reply complete");
                if let Err(e) = self
                    .controller
                    .append_turn(ConversationTurn::assistant(reply))
                    .await
                {
                    output::error(&format!("Failed to autosave session: {}", e));
                }
                PromptOutcome::Completed
            }
            Err(PlaygroundError::Cancelled) => {
                println!();
                output::warning("Generation stopped; the partial reply was discarded.");
                PromptOutcome::Cancelled
            }
            Err(e) => {
                println!();
                output::error(&format!("An error occurred: {}", e));
                PromptOutcome::Failed
            }
        }
    }

    async fn stream_reply(
        &self,
        model: &str,
        prompt: &str,
        cancel: CancellationToken,
        spinner: &ProgressBar,
    ) -> PlaygroundResult<String> {
        let mut stream = self.provider.stream_generate(model, prompt, cancel).await?;
        let mut reply = String::new();

        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            if reply.is_empty() {
                spinner.finish_and_clear();
                output::begin_assistant_reply();
            }
            output::print_fragment(&fragment);
            reply.push_str(&fragment);
        }
        Ok(reply)
    }

    /// Run one command. Returns false when the user asked to leave.
    pub async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Prompt(prompt) => {
                self.on_user_prompt(&prompt).await;
            }
            Command::Models { refresh } => {
                if refresh {
                    self.models.invalidate();
                }
                let names = self.refresh_models().await;
                if !names.is_empty() {
                    output::print_list("Models", &names, self.model.as_deref());
                }
            }
            Command::SelectModel(name) => self.select_model(name).await,
            Command::Sessions => match self.controller.list_sessions().await {
                Ok(ids) if ids.is_empty() => output::info("No chat sessions available."),
                Ok(ids) => {
                    let ids: Vec<String> = ids.into_iter().collect();
                    output::print_list("Chat Sessions", &ids, self.controller.active_id());
                }
                Err(e) => output::error(&format!("Failed to list sessions: {}", e)),
            },
            Command::Load(id) => self.load_session(id).await,
            Command::Save(id) => self.save_session(id).await,
            Command::Delete(ids) => self.delete_sessions(ids).await,
            Command::Clear => {
                self.controller.clear();
                output::success("Started a new chat.");
            }
            Command::History => output::render_history(self.controller.turns()),
            Command::Help => output::print_interactive_help(),
            Command::Exit => return false,
            Command::Unknown(input) => {
                output::warning(&format!("Unknown command '{}'. Type /help for commands.", input));
            }
        }
        true
    }

    async fn select_model(&mut self, name: String) {
        let names = self.refresh_models().await;
        if names.contains(&name) {
            output::success(&format!("Using model '{}'.", name));
            self.model = Some(name);
        } else {
            output::warning(&format!("Model '{}' is not available.", name));
        }
    }

    async fn load_session(&mut self, id: Option<String>) {
        let ids: Vec<String> = match self.controller.list_sessions().await {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                output::error(&format!("Failed to list sessions: {}", e));
                return;
            }
        };
        if ids.is_empty() {
            output::info("No chat sessions available.");
            return;
        }

        let id = match id {
            Some(id) => id,
            None => match pick_session(&ids) {
                Some(id) => id,
                None => return,
            },
        };
        if !ids.contains(&id) {
            output::warning(&format!("No saved session named '{}'.", id));
            return;
        }

        let turns = self.controller.start_or_resume(Some(&id)).await;
        output::render_history(turns);
        output::success(&format!("Session '{}' loaded.", id));
    }

    async fn save_session(&mut self, id: Option<String>) {
        let Some(id) = id.or_else(|| self.controller.active_id().map(str::to_string)) else {
            output::warning("Please enter a session name.");
            return;
        };
        match self.controller.save_as(&id).await {
            Ok(()) => output::success(&format!("Session '{}' saved!", id)),
            Err(e) => output::error(&format!("Failed to save session '{}': {}", id, e)),
        }
    }

    async fn delete_sessions(&mut self, ids: Vec<String>) {
        let ids = if ids.is_empty() {
            let available: Vec<String> = match self.controller.list_sessions().await {
                Ok(ids) => ids.into_iter().collect(),
                Err(e) => {
                    output::error(&format!("Failed to list sessions: {}", e));
                    return;
                }
            };
            if available.is_empty() {
                output::info("No chat sessions available.");
                return;
            }
            pick_sessions(&available)
        } else {
            ids
        };
        if ids.is_empty() {
            return;
        }

        let was_active = self.controller.active_id().map(str::to_string);
        match self.controller.delete(&ids).await {
            Ok(removed) => {
                output::success(&format!("Deleted {} session(s).", removed));
                if was_active.is_some() && self.controller.active_id().is_none() {
                    output::info("The current chat was deleted; starting a new one.");
                }
            }
            Err(e) => output::error(&format!("Failed to delete sessions: {}", e)),
        }
    }

    /// Answer one prompt, optionally saving the exchange
    pub async fn run_single_query(
        &mut self,
        prompt: &str,
        save_as: Option<&str>,
    ) -> PromptOutcome {
        let outcome = self.on_user_prompt(prompt).await;
        if outcome == PromptOutcome::Completed {
            if let Some(id) = save_as {
                self.save_session(Some(id.to_string())).await;
            }
        }
        outcome
    }

    /// Runs an interactive chat until the user leaves or stdin closes
    pub async fn run_interactive(&mut self) -> Result<()> {
        println!("Starting interactive chat.");
        println!("Type /help for commands, 'exit' or 'quit' to end the session.");
        if let Some(model) = &self.model {
            println!("Model: {}", model.cyan());
        }
        println!();

        loop {
            print!("{}: ", "You".green().bold());
            io::stdout().flush().context("Failed to flush stdout")?;

            let mut input = String::new();
            let read = io::stdin()
                .read_line(&mut input)
                .context("Failed to read input")?;
            if read == 0 {
                println!();
                break;
            }

            let Some(command) = Command::parse(&input) else {
                continue;
            };
            if !self.handle(command).await {
                println!("Exiting chat session.");
                break;
            }
            println!(); // Add spacing between interactions
        }

        Ok(())
    }
}

fn new_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Waiting for the model...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

fn pick_session(ids: &[String]) -> Option<String> {
    match Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Load Chat Session")
        .items(ids)
        .default(0)
        .interact_opt()
    {
        Ok(choice) => choice.map(|i| ids[i].clone()),
        Err(e) => {
            output::error(&format!("Session picker failed: {}", e));
            None
        }
    }
}

fn pick_sessions(ids: &[String]) -> Vec<String> {
    match MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Select Sessions to Delete")
        .items(ids)
        .interact_opt()
    {
        Ok(Some(chosen)) => chosen.into_iter().map(|i| ids[i].clone()).collect(),
        Ok(None) => Vec::new(),
        Err(e) => {
            output::error(&format!("Session picker failed: {}", e));
            Vec::new()
        }
    }
}
