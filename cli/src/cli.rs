use clap::Parser;
use playground_core::config::PlaygroundConfig;
use std::path::PathBuf;

/// Chat with models served by a local Ollama instance, with named sessions saved to disk
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Send a single prompt and print the streamed answer
    #[arg(index = 1)] // Positional argument
    pub prompt: Option<String>,

    /// Enter interactive chat mode
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Resume this saved session before chatting
    #[arg(short, long)]
    pub session: Option<String>,

    /// Save the conversation under this name after a single prompt
    #[arg(long)]
    pub save_as: Option<String>,

    /// Model to use (defaults to the configured model, then the first one available)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Base URL of the completion provider API
    #[arg(long)]
    pub api_url: Option<String>,

    /// Directory holding session files
    #[arg(long)]
    pub history_dir: Option<PathBuf>,

    /// Save every assistant reply under this session and resume it on startup
    #[arg(long)]
    pub autosave: Option<String>,

    /// Keep sessions in memory only; nothing is written to disk
    #[arg(long, default_value_t = false)]
    pub ephemeral: bool,

    /// List saved sessions and exit
    #[arg(long, default_value_t = false)]
    pub list_sessions: bool,

    /// List available models and exit
    #[arg(long, default_value_t = false)]
    pub list_models: bool,

    /// Delete the named sessions and exit
    #[arg(long, num_args = 1..)]
    pub delete: Vec<String>,

    /// Path to the configuration file
    #[arg(short, long, env = "PLAYGROUND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show the effective configuration and exit
    #[arg(long, default_value_t = false)]
    pub show_config: bool,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Command-line settings as a config layer, merged last
    pub fn overrides(&self) -> PlaygroundConfig {
        PlaygroundConfig {
            api_base_url: self.api_url.clone(),
            default_model: self.model.clone(),
            history_dir: self.history_dir.clone(),
            autosave_session: self.autosave.clone(),
            log_level: self.verbose.then(|| "debug".to_string()),
            ..PlaygroundConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_only_set_given_flags() {
        let args = Args::parse_from(["playground", "--model", "llama3", "-v"]);
        let overrides = args.overrides();
        assert_eq!(overrides.default_model.as_deref(), Some("llama3"));
        assert_eq!(overrides.log_level.as_deref(), Some("debug"));
        assert_eq!(overrides.api_base_url, None);
        assert_eq!(overrides.history_dir, None);
    }

    #[test]
    fn test_delete_takes_several_ids() {
        let args = Args::parse_from(["playground", "--delete", "a", "b"]);
        assert_eq!(args.delete, vec!["a", "b"]);
        assert!(args.prompt.is_none());
    }
}
