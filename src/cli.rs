use clap::{Parser, Subcommand};

/// Command-dispatch core for a rescue-coordination chat bot
#[derive(Parser, Debug)]
#[command(name = "ratbot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Command-dispatch core for a rescue-coordination chat bot", long_about = None)]
pub struct Cli {
    /// Sets a custom .env file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Enable debug mode
    #[arg(short, long)]
    pub debug: bool,

    /// The command prefix for the bot (overrides COMMAND_PREFIX)
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the bot
    Start {
        /// Channel to join (overrides config file)
        #[arg(short, long)]
        channel: Option<String>,
    },

    /// Generate a sample .env file
    GenEnv {
        /// Path to output the sample .env file
        #[arg(default_value = ".env.example")]
        path: String,
    },

    /// Print every registered command with its usage and example
    ListCommands,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_prefix_override() {
        let cli = Cli::parse_from(["ratbot", "--prefix", "?", "list-commands"]);
        assert_eq!(cli.prefix.as_deref(), Some("?"));
        assert!(matches!(cli.command, Some(Commands::ListCommands)));
    }
}
