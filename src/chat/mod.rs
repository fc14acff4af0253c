//! Transport-neutral chat messages and the outbound reply queue

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::commands::Invocation;
use crate::i18n::Localizer;

/// Protocol tag marking messages replayed from history
pub const BATCH_TAG: &str = "batch";

/// Where an inbound message was sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A public channel, by login name
    Channel(String),
    /// A private conversation with the bot
    Private,
}

impl Destination {
    pub fn is_private(&self) -> bool {
        matches!(self, Destination::Private)
    }
}

/// The person who sent a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    /// Stable platform user ID, used to address private replies
    pub id: String,
    /// Display nickname
    pub nickname: String,
    /// Authenticated account name, if the platform provides one
    pub account: Option<String>,
    /// Badge names shown next to the user in chat
    pub badges: Vec<String>,
}

impl ChatUser {
    pub fn is_broadcaster(&self) -> bool {
        self.badges.iter().any(|badge| badge == "broadcaster")
    }
}

/// An inbound chat message, as delivered by the transport bridge
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub text: String,
    pub sender: ChatUser,
    pub destination: Destination,
    /// Protocol-level message tags
    pub tags: HashMap<String, String>,
    pub received_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Whether this message is playback of old history rather than live chat
    pub fn is_playback(&self) -> bool {
        self.tags.contains_key(BATCH_TAG)
    }

    /// Receive time as `HH:MM:SS` UTC, for log lines
    pub fn timestamp(&self) -> String {
        self.received_at.format("%H:%M:%S").to_string()
    }
}

/// A rendered line waiting to be sent by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Post to a channel
    Channel { channel: String, text: String },
    /// Send privately to one user
    Private {
        user_id: String,
        nickname: String,
        text: String,
    },
}

/// Renders localized replies and queues them for the transport
///
/// Sending never blocks: lines are pushed onto an unbounded queue that the
/// transport drains on its own task.
#[derive(Clone)]
pub struct Outbox {
    localizer: Arc<Localizer>,
    locale: String,
    sender: UnboundedSender<OutboundMessage>,
}

impl Outbox {
    /// Create a new outbox
    ///
    /// # Arguments
    /// * `localizer` - The template tables used to render replies
    /// * `locale` - The locale replies are rendered in
    /// * `sender` - The queue drained by the transport
    pub fn new(
        localizer: Arc<Localizer>,
        locale: &str,
        sender: UnboundedSender<OutboundMessage>,
    ) -> Self {
        Outbox {
            localizer,
            locale: locale.to_string(),
            sender,
        }
    }

    /// Reply to a message where it was sent
    pub fn reply(&self, message: &ChatMessage, key: &str, substitutions: &[(&str, String)]) {
        let text = self.localizer.render(&self.locale, key, substitutions);
        self.deliver_to(message, text);
    }

    /// Reply to an invocation with an error
    ///
    /// The invoked command name is always available to the template as `{command}`.
    pub fn error(&self, invocation: &Invocation, key: &str, substitutions: &[(&str, String)]) {
        let mut substitutions = substitutions.to_vec();
        if !substitutions.iter().any(|(name, _)| *name == "command") {
            substitutions.push(("command", invocation.command.clone()));
        }

        debug!("Error reply {} for {}", key, invocation.command);
        let text = self.localizer.render(&self.locale, key, &substitutions);
        self.deliver_to(&invocation.message, text);
    }

    /// Post a templated line to a channel regardless of where the trigger came from
    pub fn send_to_channel(&self, channel: &str, key: &str, substitutions: &[(&str, String)]) {
        let text = self.localizer.render(&self.locale, key, substitutions);
        self.push(OutboundMessage::Channel {
            channel: channel.to_string(),
            text,
        });
    }

    fn deliver_to(&self, message: &ChatMessage, text: String) {
        let outbound = match &message.destination {
            Destination::Channel(channel) => OutboundMessage::Channel {
                channel: channel.clone(),
                text: format!("{}: {}", message.sender.nickname, text),
            },
            Destination::Private => OutboundMessage::Private {
                user_id: message.sender.id.clone(),
                nickname: message.sender.nickname.clone(),
                text,
            },
        };
        self.push(outbound);
    }

    fn push(&self, outbound: OutboundMessage) {
        if let Err(e) = self.sender.send(outbound) {
            warn!("Outbound queue closed, dropping message: {:?}", e.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{channel_message, create_test_outbox, private_message};
    use chrono::TimeZone;

    #[test]
    fn test_reply_in_channel_addresses_sender() {
        let (outbox, mut rx) = create_test_outbox();
        let msg = channel_message("Alice", "!help");

        outbox.reply(&msg, "help.empty", &[]);

        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundMessage::Channel {
                channel: "fuelrats".to_string(),
                text: "Alice: No commands are registered.".to_string(),
            }
        );
    }

    #[test]
    fn test_reply_to_private_message_stays_private() {
        let (outbox, mut rx) = create_test_outbox();
        let msg = private_message("Alice", "!help");

        outbox.reply(&msg, "help.empty", &[]);

        match rx.try_recv().unwrap() {
            OutboundMessage::Private { user_id, text, .. } => {
                assert_eq!(user_id, "id-alice");
                assert_eq!(text, "No commands are registered.");
            }
            other => panic!("expected private reply, got {:?}", other),
        }
    }

    #[test]
    fn test_send_to_channel() {
        let (outbox, mut rx) = create_test_outbox();

        outbox.send_to_channel(
            "doersofstuff",
            "command.blacklist",
            &[("nick", "Mallory".to_string()), ("command", "go".to_string())],
        );

        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundMessage::Channel {
                channel: "doersofstuff".to_string(),
                text: "Warning: Mallory used the dispatch command go while on the dispatch blacklist."
                    .to_string(),
            }
        );
    }

    #[test]
    fn test_batch_tag_marks_playback() {
        let mut msg = channel_message("Alice", "!help");
        assert!(!msg.is_playback());

        msg.tags.insert(BATCH_TAG.to_string(), "chathistory".to_string());
        assert!(msg.is_playback());
    }

    #[test]
    fn test_timestamp_formats_receive_time() {
        let mut msg = channel_message("Alice", "!help");
        msg.received_at = Utc.with_ymd_and_hms(2020, 7, 12, 9, 12, 35).unwrap();
        assert_eq!(msg.timestamp(), "09:12:35");
    }

    #[test]
    fn test_closed_queue_does_not_panic() {
        let (outbox, rx) = create_test_outbox();
        drop(rx);
        outbox.reply(&channel_message("Alice", "!help"), "help.empty", &[]);
    }
}
