mod chat;
mod cli;
mod commands;
mod config;
mod i18n;
mod permissions;
#[cfg(test)]
mod test_helpers;
mod twitch;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use twitch_irc::message::ServerMessage;

use chat::Outbox;
use cli::{Cli, Commands};
use commands::{Blacklist, CommandDispatcher, CommandRegistry, DispatchOutcome, HelpCommand};
use config::Config;
use i18n::Localizer;
use permissions::GrantTable;
use twitch::{HelixClient, TwitchClient, deliver_outbound, to_chat_message};

/// The main entry point for the application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default subscriber");

    match &cli.command {
        Some(Commands::Start { channel }) => {
            start_bot(&cli, channel.clone()).await?;
        }
        Some(Commands::GenEnv { path }) => {
            generate_env_file(path)?;
        }
        Some(Commands::ListCommands) => {
            list_commands(cli.prefix.as_deref().unwrap_or("!"))?;
        }
        None => {
            // Default to start command if no subcommand is specified
            start_bot(&cli, None).await?;
        }
    }

    Ok(())
}

/// Build the command registry
///
/// Every feature module registers its declarations here, once, before the
/// registry is shared.
fn build_registry() -> Result<CommandRegistry> {
    let mut registry = CommandRegistry::new();
    HelpCommand::register(&mut registry)?;

    for keyword in registry.duplicate_keywords() {
        warn!(
            "Keyword {} is claimed by more than one command, the first registered wins",
            keyword
        );
    }

    info!("Registered {} commands", registry.len());
    Ok(registry)
}

/// Start the bot with the given configuration
async fn start_bot(cli: &Cli, channel_override: Option<String>) -> Result<()> {
    info!("Loading configuration");
    let mut config = Config::from_env(cli.config.as_deref())?;

    if let Some(channel) = channel_override {
        config.channel_name = channel;
    }
    if let Some(prefix) = &cli.prefix {
        config.command_prefix = prefix.clone();
    }

    info!("Starting ratbot");
    info!("Connecting to channel: {}", config.channel_name);

    let data_dir = Path::new(&config.data_dir);
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir)?;
    }

    // Reply templates
    let mut localizer = Localizer::new(&config.locale)?;
    if let Some(dir) = &config.locale_dir {
        localizer.load_dir(Path::new(dir)).await?;
    }

    // Permissions and blacklist are fixed for the life of the process
    let permissions_path = config.get_permissions_path();
    info!("Loading permission grants from {}", permissions_path);
    let grants = GrantTable::load(Path::new(&permissions_path)).await?;
    let blacklist = Blacklist::new(&config.blacklist);
    if blacklist.is_empty() {
        info!("Dispatch blacklist is empty");
    } else {
        info!("Dispatch blacklist has {} entries", blacklist.len());
    }

    let registry = Arc::new(build_registry()?);

    // Replies are queued here and delivered by a separate task
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let outbox = Outbox::new(Arc::new(localizer), &config.locale, outbound_tx);

    let dispatcher = CommandDispatcher::new(
        registry,
        Arc::new(grants),
        Arc::new(blacklist),
        outbox,
        config.command_prefix.clone(),
        config.moderation_channel.clone(),
    );

    let (incoming_messages, client) = TwitchClient::new(&config);
    let helix = HelixClient::new(&config.client_id, &config.oauth_token, &config.bot_username)?;
    tokio::spawn(deliver_outbound(client.clone(), helix, outbound_rx));

    client.join_channel(&config.channel_name)?;
    if config.moderation_channel != config.channel_name {
        client.join_channel(&config.moderation_channel)?;
    }
    info!("Joined channel: {}", config.channel_name);

    let channel_name = config.channel_name.clone();
    tokio::spawn(async move {
        let mut incoming_messages = incoming_messages;
        info!("Waiting for messages...");

        while let Some(msg) = incoming_messages.recv().await {
            match &msg {
                ServerMessage::Privmsg(_) | ServerMessage::Whisper(_) => {
                    let Some(chat_message) = to_chat_message(&msg) else {
                        continue;
                    };
                    info!(
                        "[CHAT {}] {}: {}",
                        chat_message.timestamp(),
                        chat_message.sender.nickname,
                        chat_message.text
                    );

                    match dispatcher.handle_message(chat_message) {
                        DispatchOutcome::Ignored => {}
                        outcome => debug!("Dispatch outcome: {:?}", outcome),
                    }
                }
                ServerMessage::Join(join) => {
                    info!("[JOIN] {} joined {}", join.user_login, join.channel_login);
                }
                ServerMessage::Part(part) => {
                    info!("[PART] {} left {}", part.user_login, part.channel_login);
                }
                ServerMessage::Notice(notice) => {
                    info!("[NOTICE] Channel {}: {}", channel_name, notice.message_text);
                }
                _ => {
                    debug!("Received other message type: {:?}", msg);
                }
            }
        }

        error!("Twitch connection closed");
    });

    info!("Bot is now running. Press Ctrl+C to exit.");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    Ok(())
}

/// Print every registered command with its usage and example
fn list_commands(prefix: &str) -> Result<()> {
    let registry = build_registry()?;

    for declaration in registry.declarations() {
        let category = declaration
            .category()
            .map(|category| category.to_string())
            .unwrap_or_else(|| "uncategorized".to_string());

        println!(
            "{}{}  {}",
            prefix.green(),
            declaration.usage_description(None).bold(),
            format!("({})", category).dimmed()
        );
        if !declaration.description().is_empty() {
            println!("    {}", declaration.description());
        }
        if declaration.example().is_some() {
            println!("    Example: {}{}", prefix, declaration.example_description(None));
        }
        if declaration.keywords().len() > 1 {
            println!("    Aliases: {}", declaration.keywords()[1..].join(", "));
        }
        if let Some(permission) = declaration.permission() {
            println!("    Requires: {}", permission.to_string().yellow());
        }
    }

    for keyword in registry.duplicate_keywords() {
        println!(
            "{} keyword {} is claimed by more than one command",
            "warning:".yellow().bold(),
            keyword
        );
    }

    Ok(())
}

/// Generate a sample .env file
fn generate_env_file(path: &str) -> Result<()> {
    info!("Generating sample .env file at {}", path);

    let contents = r#"# Your Twitch client ID (get one from Twitch Developer Dashboard)
TWITCH_CLIENT_ID=your_client_id_here
# OAuth token for the bot account (needs chat:read, chat:edit and user:manage:whispers)
TWITCH_OAUTH_TOKEN=your_token_here
# The channel to join
TWITCH_CHANNEL=channel_name
# The bot's username
TWITCH_BOT_USERNAME=your_bot_username
# Optional: prefix that marks a command
# COMMAND_PREFIX=!
# Optional: comma-separated nicknames/accounts reported when they use dispatch commands
# DISPATCH_BLACKLIST=
# Optional: channel that receives blacklist warnings (defaults to TWITCH_CHANNEL)
# MODERATION_CHANNEL=
# Optional: reply locale and a directory of extra <locale>.json tables
# LOCALE=en
# LOCALE_DIR=./locales
# Optional: Data directory; permission grants are read from permissions.txt here
# DATA_DIR=./data
"#;

    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;

    info!("Sample .env file generated successfully!");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_registry_has_help() {
        let registry = build_registry().unwrap();
        assert!(registry.find("help").is_some());
        assert!(registry.duplicate_keywords().is_empty());
    }

    #[test]
    fn test_generate_env_file() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join(".env.example");
        generate_env_file(path.to_str().unwrap())?;

        let contents = std::fs::read_to_string(&path)?;
        assert!(contents.contains("TWITCH_OAUTH_TOKEN="));
        assert!(contents.contains("DISPATCH_BLACKLIST"));
        Ok(())
    }
}
