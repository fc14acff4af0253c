#![allow(dead_code)]
/// Test helpers for unit tests
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::chat::{ChatMessage, ChatUser, Destination, OutboundMessage, Outbox};
use crate::config::Config;
use crate::i18n::Localizer;

/// Create a test config for unit tests
pub fn create_test_config() -> Config {
    Config::new(
        "test_client_id".to_string(),
        "test_token".to_string(),
        "fuelrats".to_string(),
        "ratbot".to_string(),
        "./test_data".to_string(),
    )
}

/// Create an English outbox and the receiving end of its queue
pub fn create_test_outbox() -> (Outbox, UnboundedReceiver<OutboundMessage>) {
    let localizer = Localizer::new("en").expect("embedded locale table must parse");
    let (tx, rx) = mpsc::unbounded_channel();
    (Outbox::new(Arc::new(localizer), "en", tx), rx)
}

/// A user whose account is the lowercased nickname
pub fn test_user(nickname: &str) -> ChatUser {
    ChatUser {
        id: format!("id-{}", nickname.to_lowercase()),
        nickname: nickname.to_string(),
        account: Some(nickname.to_lowercase()),
        badges: Vec::new(),
    }
}

/// A message sent to the test channel
pub fn channel_message(nickname: &str, text: &str) -> ChatMessage {
    message(nickname, text, Destination::Channel(create_test_config().channel_name))
}

/// A message sent privately to the bot
pub fn private_message(nickname: &str, text: &str) -> ChatMessage {
    message(nickname, text, Destination::Private)
}

fn message(nickname: &str, text: &str, destination: Destination) -> ChatMessage {
    ChatMessage {
        text: text.to_string(),
        sender: test_user(nickname),
        destination,
        tags: HashMap::new(),
        received_at: Utc::now(),
    }
}
