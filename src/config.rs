use anyhow::Result;
use dotenv::dotenv;
use std::env;

/// Configuration for the chat bot
pub struct Config {
    /// The client ID for the application
    pub client_id: String,
    /// OAuth access token for the bot account
    pub oauth_token: String,
    /// The channel name to connect to
    pub channel_name: String,
    /// The bot's username on Twitch
    pub bot_username: String,
    /// The data directory for the grants file and other data
    pub data_dir: String,
    /// Prefix that marks a chat message as a command
    pub command_prefix: String,
    /// Nicknames and accounts whose dispatching commands are reported
    pub blacklist: Vec<String>,
    /// Channel that receives blacklist warnings
    pub moderation_channel: String,
    /// Locale replies are rendered in
    pub locale: String,
    /// Optional directory of extra `<locale>.json` tables
    pub locale_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    /// * `env_file` - A .env file to read first; the default `.env` lookup is used when None
    ///
    /// # Returns
    /// A Result containing the Config if successful, or an error if required variables are missing
    pub fn from_env(env_file: Option<&str>) -> Result<Self> {
        match env_file {
            Some(path) => {
                dotenv::from_filename(path)
                    .map_err(|e| anyhow::anyhow!("cannot read env file {}: {}", path, e))?;
            }
            None => {
                dotenv().ok();
            }
        }

        let client_id = env::var("TWITCH_CLIENT_ID")
            .map_err(|_| anyhow::anyhow!("TWITCH_CLIENT_ID environment variable not set"))?;

        let oauth_token = env::var("TWITCH_OAUTH_TOKEN")
            .map_err(|_| anyhow::anyhow!("TWITCH_OAUTH_TOKEN environment variable not set"))?;

        let channel_name = env::var("TWITCH_CHANNEL")
            .map_err(|_| anyhow::anyhow!("TWITCH_CHANNEL environment variable not set"))?;

        let bot_username = env::var("TWITCH_BOT_USERNAME")
            .map_err(|_| anyhow::anyhow!("TWITCH_BOT_USERNAME environment variable not set"))?;

        let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
        let command_prefix = env::var("COMMAND_PREFIX").unwrap_or_else(|_| "!".to_string());
        let blacklist = env::var("DISPATCH_BLACKLIST")
            .map(|raw| parse_list(&raw))
            .unwrap_or_default();
        let moderation_channel =
            env::var("MODERATION_CHANNEL").unwrap_or_else(|_| channel_name.clone());
        let locale = env::var("LOCALE").unwrap_or_else(|_| "en".to_string());
        let locale_dir = env::var("LOCALE_DIR").ok();

        Ok(Config {
            client_id,
            oauth_token,
            channel_name,
            bot_username,
            data_dir,
            command_prefix,
            blacklist,
            moderation_channel,
            locale,
            locale_dir,
        })
    }

    /// Create a new config directly from values (useful for testing)
    ///
    /// Optional settings take their defaults.
    #[allow(dead_code)]
    pub fn new(
        client_id: String,
        oauth_token: String,
        channel_name: String,
        bot_username: String,
        data_dir: String,
    ) -> Self {
        Config {
            client_id,
            oauth_token,
            moderation_channel: channel_name.clone(),
            channel_name,
            bot_username,
            data_dir,
            command_prefix: "!".to_string(),
            blacklist: Vec::new(),
            locale: "en".to_string(),
            locale_dir: None,
        }
    }

    /// Get the path of the permission grants file
    pub fn get_permissions_path(&self) -> String {
        format!("{}/permissions.txt", self.data_dir)
    }
}

/// Split a comma-separated setting, dropping blank entries
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = Config::new(
            "test_client_id".to_string(),
            "test_token".to_string(),
            "test_channel".to_string(),
            "test_bot".to_string(),
            "./test_data".to_string(),
        );

        assert_eq!(config.client_id, "test_client_id");
        assert_eq!(config.oauth_token, "test_token");
        assert_eq!(config.channel_name, "test_channel");
        assert_eq!(config.bot_username, "test_bot");
        assert_eq!(config.moderation_channel, "test_channel");
        assert_eq!(config.command_prefix, "!");
        assert!(config.blacklist.is_empty());
        assert_eq!(config.get_permissions_path(), "./test_data/permissions.txt");
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" Mallory, trent ,,eve "),
            vec!["Mallory", "trent", "eve"]
        );
        assert!(parse_list("").is_empty());
    }
}
