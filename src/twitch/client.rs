use anyhow::{Result, anyhow};
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info};
use twitch_irc::ClientConfig;
use twitch_irc::TwitchIRCClient;
use twitch_irc::login::StaticLoginCredentials;
use twitch_irc::message::{Badge, IRCTags, ServerMessage, TwitchUserBasics};
use twitch_irc::transport::tcp::{NoTLS, TCPTransport};

use crate::chat::{ChatMessage, ChatUser, Destination, OutboundMessage};
use crate::config::Config;
use crate::twitch::helix::HelixClient;

/// Represents a connection to Twitch chat
#[derive(Clone)]
pub struct TwitchClient {
    inner: TwitchIRCClient<TCPTransport<NoTLS>, StaticLoginCredentials>,
}

impl TwitchClient {
    /// Create a new Twitch client with the given configuration
    ///
    /// # Returns
    /// The stream of inbound server messages and the client
    pub fn new(config: &Config) -> (UnboundedReceiver<ServerMessage>, Self) {
        let token = config.oauth_token.trim_start_matches("oauth:").to_string();
        let client_config = ClientConfig::new_simple(StaticLoginCredentials::new(
            config.bot_username.clone(),
            Some(token),
        ));

        let (incoming_messages, inner) =
            TwitchIRCClient::<TCPTransport<NoTLS>, StaticLoginCredentials>::new(client_config);

        (incoming_messages, TwitchClient { inner })
    }

    /// Join a Twitch channel
    pub fn join_channel(&self, channel: &str) -> Result<()> {
        let channel_name = normalize_channel(channel);
        info!("Attempting to join channel: {}", channel_name);

        self.inner
            .join(channel_name.clone())
            .map_err(|e| anyhow!("Failed to join {}: {}", channel_name, e))
    }

    /// Send a message to a channel
    pub async fn send_message(&self, channel: &str, message: &str) -> Result<()> {
        let channel_name = normalize_channel(channel);
        debug!("Sending message to {}: {}", channel_name, message);

        self.inner
            .say(channel_name.clone(), message.to_string())
            .await
            .map_err(|e| anyhow!("Failed to send message to {}: {}", channel_name, e))
    }
}

/// The Twitch IRC library wants lowercase channel names without the # prefix
fn normalize_channel(channel: &str) -> String {
    channel.trim_start_matches('#').to_lowercase()
}

/// Convert a Twitch server message into a chat message for the dispatcher
///
/// Channel messages and whispers are converted; everything else yields None.
pub fn to_chat_message(message: &ServerMessage) -> Option<ChatMessage> {
    match message {
        ServerMessage::Privmsg(privmsg) => Some(ChatMessage {
            text: privmsg.message_text.clone(),
            sender: chat_user(&privmsg.sender, &privmsg.badges),
            destination: Destination::Channel(privmsg.channel_login.clone()),
            tags: tag_map(&privmsg.source.tags),
            received_at: privmsg.server_timestamp,
        }),
        ServerMessage::Whisper(whisper) => Some(ChatMessage {
            text: whisper.message_text.clone(),
            sender: chat_user(&whisper.sender, &whisper.badges),
            destination: Destination::Private,
            tags: tag_map(&whisper.source.tags),
            received_at: Utc::now(),
        }),
        _ => None,
    }
}

fn chat_user(sender: &TwitchUserBasics, badges: &[Badge]) -> ChatUser {
    ChatUser {
        id: sender.id.clone(),
        nickname: sender.name.clone(),
        account: Some(sender.login.clone()),
        badges: badges.iter().map(|badge| badge.name.clone()).collect(),
    }
}

/// Valueless tags such as a bare `batch` are kept with an empty value
fn tag_map(tags: &IRCTags) -> HashMap<String, String> {
    tags.0
        .iter()
        .map(|(key, value)| (key.clone(), value.clone().unwrap_or_default()))
        .collect()
}

/// Drain the outbound queue, sending channel lines over IRC and private lines as whispers
///
/// Runs until every sender of the queue is dropped.
pub async fn deliver_outbound(
    client: TwitchClient,
    mut helix: HelixClient,
    mut outbound: UnboundedReceiver<OutboundMessage>,
) {
    while let Some(message) = outbound.recv().await {
        let result = match &message {
            OutboundMessage::Channel { channel, text } => client.send_message(channel, text).await,
            OutboundMessage::Private {
                user_id,
                nickname,
                text,
            } => {
                debug!("Whispering {}: {}", nickname, text);
                helix.send_whisper(user_id, text).await
            }
        };

        if let Err(e) = result {
            error!("Error delivering message: {}", e);
        }
    }

    info!("Outbound queue closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::BATCH_TAG;
    use twitch_irc::message::IRCMessage;

    const PRIVMSG: &str = "@badge-info=;badges=broadcaster/1;color=#0000FF;display-name=SpaceDawg;emotes=;flags=;id=e9d998c3-36f1-430f-89ec-6b887c28af36;mod=0;room-id=11148817;subscriber=0;tmi-sent-ts=1594545155039;turbo=0;user-id=29803735;user-type= :spacedawg!spacedawg@spacedawg.tmi.twitch.tv PRIVMSG #fuelrats :!inject 4 hello";

    const WHISPER: &str = "@badges=;color=#19E6E6;display-name=StuffedRat;emotes=;message-id=1;thread-id=40286300_553170741;turbo=0;user-id=40286300;user-type= :stuffedrat!stuffedrat@stuffedrat.tmi.twitch.tv WHISPER ratbot :!shorten https://example.com";

    fn server_message(raw: &str) -> ServerMessage {
        let irc_message = IRCMessage::parse(raw).unwrap();
        ServerMessage::try_from(irc_message).unwrap()
    }

    #[test]
    fn test_privmsg_becomes_channel_message() {
        let message = to_chat_message(&server_message(PRIVMSG)).unwrap();

        assert_eq!(message.text, "!inject 4 hello");
        assert_eq!(message.destination, Destination::Channel("fuelrats".to_string()));
        assert_eq!(message.sender.id, "29803735");
        assert_eq!(message.sender.nickname, "SpaceDawg");
        assert_eq!(message.sender.account.as_deref(), Some("spacedawg"));
        assert!(message.sender.is_broadcaster());
        assert_eq!(message.tags.get("room-id").map(String::as_str), Some("11148817"));
        assert!(!message.is_playback());
    }

    #[test]
    fn test_whisper_becomes_private_message() {
        let message = to_chat_message(&server_message(WHISPER)).unwrap();

        assert_eq!(message.text, "!shorten https://example.com");
        assert_eq!(message.destination, Destination::Private);
        assert_eq!(message.sender.id, "40286300");
        assert_eq!(message.sender.nickname, "StuffedRat");
        assert!(!message.sender.is_broadcaster());
    }

    #[test]
    fn test_batch_tag_survives_conversion() {
        let raw = PRIVMSG.replacen("@badge-info=;", "@badge-info=;batch=history;", 1);
        let message = to_chat_message(&server_message(&raw)).unwrap();
        assert!(message.is_playback());
    }

    #[test]
    fn test_valueless_batch_tag_marks_playback() {
        let raw = PRIVMSG.replacen("@badge-info=;", "@badge-info=;batch;", 1);
        let message = to_chat_message(&server_message(&raw)).unwrap();

        assert_eq!(message.tags.get(BATCH_TAG).map(String::as_str), Some(""));
        assert!(message.is_playback());
    }

    #[test]
    fn test_other_messages_are_skipped() {
        let ping = server_message("PING :tmi.twitch.tv");
        assert!(to_chat_message(&ping).is_none());
    }

    #[test]
    fn test_normalize_channel() {
        assert_eq!(normalize_channel("#FuelRats"), "fuelrats");
        assert_eq!(normalize_channel("fuelrats"), "fuelrats");
    }
}
