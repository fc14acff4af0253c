//! Twitch transport: turns server messages into chat messages and delivers replies

mod client;
mod helix;

pub use client::{TwitchClient, deliver_outbound, to_chat_message};
pub use helix::HelixClient;
