use crate::chat::ChatMessage;

/// One command found in a chat message, split into keyword, options and parameters
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Lowercased keyword without the prefix
    pub command: String,
    pub parameters: Vec<String>,
    /// Characters from `-abc` clusters, in first-seen order
    pub short_options: Vec<char>,
    /// Names from `--name` tokens, in first-seen order
    pub named_options: Vec<String>,
    /// The message the command arrived in
    pub message: ChatMessage,
}

impl Invocation {
    /// Parse a chat message into an invocation
    ///
    /// # Arguments
    /// * `message` - The inbound chat message
    /// * `prefix` - The command prefix (e.g., "!")
    ///
    /// # Returns
    /// None if the message doesn't start with a command
    pub fn parse(message: ChatMessage, prefix: &str) -> Option<Self> {
        let mut tokens = message.text.split_whitespace();
        let command = tokens.next()?.strip_prefix(prefix)?.to_lowercase();
        if command.is_empty() {
            return None;
        }

        let mut parameters = Vec::new();
        let mut short_options = Vec::new();
        let mut named_options: Vec<String> = Vec::new();

        for token in tokens {
            if let Some(name) = token.strip_prefix("--") {
                if name.is_empty() {
                    parameters.push(token.to_string());
                } else if !named_options.iter().any(|known| known == name) {
                    named_options.push(name.to_string());
                }
            } else if let Some(cluster) = token.strip_prefix('-') {
                if cluster.is_empty() {
                    parameters.push(token.to_string());
                }
                for option in cluster.chars() {
                    if !short_options.contains(&option) {
                        short_options.push(option);
                    }
                }
            } else {
                parameters.push(token.to_string());
            }
        }

        Some(Invocation {
            command,
            parameters,
            short_options,
            named_options,
            message,
        })
    }

    pub fn has_option(&self, option: char) -> bool {
        self.short_options.contains(&option)
    }

    /// Short options not in the allowed set
    pub fn illegal_options(&self, allowed: &[char]) -> Vec<char> {
        self.short_options
            .iter()
            .filter(|option| !allowed.contains(option))
            .copied()
            .collect()
    }

    /// Named options not in the allowed set
    pub fn illegal_named_options(&self, allowed: &[String]) -> Vec<String> {
        self.named_options
            .iter()
            .filter(|name| !allowed.contains(name))
            .cloned()
            .collect()
    }
}

/// Fold surplus parameters into the last slot, space-joined
///
/// Only applies once there is more than one parameter; a single long
/// parameter is left alone. With `max` of zero nothing is folded.
pub fn collapse_continuation(parameters: Vec<String>, max: usize) -> Vec<String> {
    if max == 0 || parameters.len() <= 1 || parameters.len() <= max {
        return parameters;
    }

    let mut collapsed = parameters;
    let remainder = collapsed.split_off(max - 1).join(" ");
    collapsed.push(remainder);
    collapsed
}
