//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments, resolves configuration and the
//! stored session, and dispatches to the chat UI or a one-shot command.

pub mod ask;
pub mod login;

use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::warn;

use crate::api::{Backend, HttpClient};
use crate::cli::ask::run_ask;
use crate::cli::login::{run_login, run_logout};
use crate::core::config::{Config, BASE_URL_ENV};
use crate::core::controller::{Controller, GenerationKind};
use crate::core::keyring::TokenStore;
use crate::core::session::Session;
use crate::ui::chat_loop::{run_chat, ChatOptions};
use crate::utils::logging::init_file_logging;

pub const TOKEN_ENV: &str = "JERRY_TOKEN";

#[derive(Parser, Debug)]
#[command(name = "jerry")]
#[command(version)]
#[command(about = "A terminal chat client for text answers and image generation")]
#[command(
    long_about = "Jerry is a full-screen terminal chat client. Prompts are sent to the \
configured backend, either for a text answer or for a generated image.\n\n\
Environment Variables:\n\
  JERRY_BASE_URL    Backend root URL (overrides the config file)\n\
  JERRY_TOKEN       Bearer token to use instead of the stored one\n\n\
Controls:\n\
  Enter             Ask (or save an edited message)\n\
  Ctrl+G            Generate an image from the prompt\n\
  Ctrl+T            Tools menu\n\
  Ctrl+E            Edit your last message\n\
  Up/Down/PgUp/PgDn Scroll the conversation\n\
  Ctrl+L            Sign out\n\
  Ctrl+C            Quit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Backend root URL
    #[arg(short = 'b', long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Write diagnostics to the given file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<String>,

    /// Never touch the system keyring; use JERRY_TOKEN or sign in per run
    #[arg(long, global = true)]
    pub env_only: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Ask a single question and print the answer
    Ask {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Generate an image and print its reference
    Image {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Sign in and remember the token
    Login {
        /// Email address (prompted for when omitted)
        #[arg(long, conflicts_with = "google")]
        email: Option<String>,
        /// Sign in with a Google access token instead of a password
        #[arg(long, value_name = "TOKEN_ID")]
        google: Option<String>,
    },
    /// Forget the stored token
    Logout,
    /// Set a configuration value (base-url, request-timeout, keyring)
    Set {
        key: String,
        value: Option<String>,
    },
    /// Reset a configuration value to its default
    Unset { key: String },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

/// Token from the environment when present, otherwise whatever the store holds.
pub fn initial_session(store: &TokenStore, env_token: Option<&str>) -> Session {
    if let Some(token) = env_token.filter(|token| !token.trim().is_empty()) {
        return Session::with_token(token.trim());
    }
    match store.load() {
        Ok(Some(token)) => Session::with_token(token),
        Ok(None) => Session::anonymous(),
        Err(err) => {
            warn!(recoverable = err.is_recoverable(), error = %err, "starting signed out");
            Session::anonymous()
        }
    }
}

fn build_backend(config: &Config, base_url: &str) -> Result<Arc<dyn Backend>, Box<dyn Error>> {
    let client = HttpClient::with_timeout(base_url, config.request_timeout())?;
    Ok(Arc::new(client))
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    if let Some(path) = args.log.as_deref() {
        init_file_logging(path)?;
    }

    let mut config = Config::load()?;

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Set { key, value } => {
            match value {
                Some(value) => {
                    if let Err(e) = config.set(&key, &value) {
                        eprintln!("❌ {e}");
                        std::process::exit(1);
                    }
                    config.save()?;
                    println!("✅ Set {key} to: {value}");
                }
                None => config.print_all(),
            }
            Ok(())
        }
        Commands::Unset { key } => {
            if let Err(e) = config.unset(&key) {
                eprintln!("❌ {e}");
                std::process::exit(1);
            }
            config.save()?;
            println!("✅ Unset {key}");
            Ok(())
        }
        command => {
            let env_base_url = std::env::var(BASE_URL_ENV).ok();
            let base_url = config.resolve_base_url(args.base_url.as_deref(), env_base_url.as_deref());
            let backend = build_backend(&config, &base_url)?;
            let store = TokenStore::new_with_keyring(!args.env_only && config.keyring_enabled());
            let env_token = std::env::var(TOKEN_ENV).ok();

            match command {
                Commands::Login { email, google } => {
                    run_login(backend.as_ref(), &store, email, google).await
                }
                Commands::Logout => run_logout(&store),
                Commands::Ask { prompt } => {
                    let session = initial_session(&store, env_token.as_deref());
                    run_ask(backend.as_ref(), session, GenerationKind::Text, prompt).await
                }
                Commands::Image { prompt } => {
                    let session = initial_session(&store, env_token.as_deref());
                    run_ask(backend.as_ref(), session, GenerationKind::Image, prompt).await
                }
                _ => {
                    let session = initial_session(&store, env_token.as_deref());
                    run_chat(ChatOptions {
                        backend,
                        store,
                        controller: Controller::new(session),
                    })
                    .await
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_chat() {
        let args = Args::try_parse_from(["jerry"]).expect("parses");
        assert_eq!(args.command, None);
        assert!(!args.env_only);
    }

    #[test]
    fn ask_collects_words_and_global_flags() {
        let args = Args::try_parse_from([
            "jerry",
            "--base-url",
            "http://example.test",
            "ask",
            "what",
            "is",
            "2+2",
        ])
        .expect("parses");
        assert_eq!(args.base_url.as_deref(), Some("http://example.test"));
        assert_eq!(
            args.command,
            Some(Commands::Ask {
                prompt: vec!["what".to_string(), "is".to_string(), "2+2".to_string()]
            })
        );
    }

    #[test]
    fn login_accepts_email_or_google_but_not_both() {
        let args = Args::try_parse_from(["jerry", "login", "--google", "g-1"]).expect("parses");
        assert_eq!(
            args.command,
            Some(Commands::Login {
                email: None,
                google: Some("g-1".to_string())
            })
        );
        assert!(
            Args::try_parse_from(["jerry", "login", "--email", "a@b.c", "--google", "g"]).is_err()
        );
    }

    #[test]
    fn env_token_wins_over_store() {
        let store = TokenStore::new_with_keyring(false);
        store.store("stored").expect("store");
        assert_eq!(initial_session(&store, Some(" env ")).token(), Some("env"));
        assert_eq!(initial_session(&store, Some("  ")).token(), Some("stored"));
        assert_eq!(initial_session(&store, None).token(), Some("stored"));
    }

    #[test]
    fn empty_store_starts_anonymous() {
        let store = TokenStore::new_with_keyring(false);
        assert!(!initial_session(&store, None).is_authenticated());
    }
}
