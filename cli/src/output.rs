use colored::*;
use std::io::{self, Write};
use std::path::Path;

use playground_core::config::PlaygroundConfig;
use playground_core::types::{ConversationTurn, Role};

fn role_label(role: Role) -> ColoredString {
    match role {
        Role::User => "You".green().bold(),
        Role::Assistant => "Assistant".blue().bold(),
    }
}

/// Print one turn of the transcript
pub fn print_turn(turn: &ConversationTurn) {
    println!("{}: {}", role_label(turn.role), turn.content);
}

/// Print the whole transcript, oldest first
pub fn render_history(turns: &[ConversationTurn]) {
    if turns.is_empty() {
        info("No messages yet.");
        return;
    }
    for turn in turns {
        print_turn(turn);
        println!();
    }
}

/// Start an assistant reply that will be filled in fragment by fragment
pub fn begin_assistant_reply() {
    print!("{}: ", role_label(Role::Assistant));
    let _ = io::stdout().flush();
}

pub fn print_fragment(fragment: &str) {
    print!("{}", fragment);
    let _ = io::stdout().flush();
}

pub fn info(message: &str) {
    println!("{}", message.cyan());
}

pub fn success(message: &str) {
    println!("{}", message.green());
}

pub fn warning(message: &str) {
    eprintln!("{} {}", "Warning:".yellow().bold(), message.yellow());
}

pub fn error(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}

pub fn print_list(title: &str, items: &[String], selected: Option<&str>) {
    println!("{}", title.cyan().bold());
    for item in items {
        if Some(item.as_str()) == selected {
            println!("  {} {}", "*".green(), item.green());
        } else {
            println!("    {}", item);
        }
    }
}

/// Show usage instructions when no prompt or action is provided
pub fn print_usage_instructions() {
    println!("{}", "Usage:".yellow().bold());
    println!("  {}", "playground \"your prompt\"".green().bold());
    println!("    Send a single prompt and stream the answer");
    println!();
    println!("  {}", "playground -i [--session NAME]".green().bold());
    println!("    Start an interactive chat, optionally resuming a saved session");
    println!();
    println!("{}", "Options:".cyan());
    println!("  --list-sessions          List saved sessions");
    println!("  --delete <NAME>...       Delete saved sessions");
    println!("  --list-models            List models on the provider");
    println!("  --help                   Show all options");
    println!();
}

/// Commands available inside the interactive chat
pub fn print_interactive_help() {
    println!("{}", "Commands:".cyan().bold());
    let rows = [
        ("/models [refresh]", "List available models"),
        ("/model <name>", "Switch model"),
        ("/sessions", "List saved sessions"),
        ("/load [name]", "Load a saved session"),
        ("/save <name>", "Save this chat as a session"),
        ("/delete [name]", "Delete a saved session"),
        ("/clear", "Start over with an empty chat"),
        ("/history", "Show the current chat"),
        ("exit | quit", "Leave"),
    ];
    for (command, description) in rows {
        println!("  {:<20} {}", command.green(), description);
    }
    println!("  Press Ctrl-C while a reply is streaming to stop it.");
    println!();
}

pub fn print_config(config: &PlaygroundConfig, config_path: &Path) {
    println!(
        "{} ({})",
        "Current Configuration".cyan().bold(),
        config_path.display()
    );
    println!("  {}: {}", "API URL".blue(), config.api_base_url());
    println!(
        "  {}: {}",
        "Default Model".blue(),
        config
            .default_model
            .as_deref()
            .map_or("First available".yellow().to_string(), |m| m.to_string())
    );
    let history_dir = config
        .history_dir()
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|e| format!("unavailable ({})", e));
    println!("  {}: {}", "History Directory".blue(), history_dir);
    println!(
        "  {}: {}s",
        "Model Cache TTL".blue(),
        config.model_cache_ttl().as_secs()
    );
    println!("  {}: {}", "Log Level".blue(), config.log_level());
    println!(
        "  {}: {}",
        "Autosave Session".blue(),
        config
            .autosave_session
            .as_deref()
            .map_or("Disabled".yellow().to_string(), |s| s.green().to_string())
    );
}
