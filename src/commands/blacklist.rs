use crate::chat::ChatUser;

/// Nicknames and accounts whose use of dispatching commands is reported to moderators
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    /// Lowercased, non-empty entries
    entries: Vec<String>,
}

impl Blacklist {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|entry| entry.as_ref().trim().to_lowercase())
            .filter(|entry| !entry.is_empty())
            .collect();
        Blacklist { entries }
    }

    /// Whether a user is covered by any entry
    ///
    /// A nickname matches if it contains an entry, so `Mallory[PC]` is caught
    /// by `mallory`. An account must equal the entry.
    pub fn matches(&self, user: &ChatUser) -> bool {
        let nickname = user.nickname.to_lowercase();
        let account = user.account.as_ref().map(|account| account.to_lowercase());

        self.entries.iter().any(|entry| {
            nickname.contains(entry.as_str()) || account.as_deref() == Some(entry.as_str())
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
