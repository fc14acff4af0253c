//! Account permissions and the oracle the dispatcher asks about them

use anyhow::{Result, anyhow};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::chat::ChatUser;

/// A named capability an account can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountPermission {
    RescueRead,
    /// Edit any case on the rescue board
    RescueWrite,
    /// Edit cases the account is assigned to
    RescueWriteOwn,
    UserRead,
    UserWrite,
    UserWriteOwn,
    DispatchRead,
    DispatchWrite,
}

impl AccountPermission {
    pub const ALL: [AccountPermission; 8] = [
        AccountPermission::RescueRead,
        AccountPermission::RescueWrite,
        AccountPermission::RescueWriteOwn,
        AccountPermission::UserRead,
        AccountPermission::UserWrite,
        AccountPermission::UserWriteOwn,
        AccountPermission::DispatchRead,
        AccountPermission::DispatchWrite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountPermission::RescueRead => "rescue.read",
            AccountPermission::RescueWrite => "rescue.write",
            AccountPermission::RescueWriteOwn => "rescue.write.own",
            AccountPermission::UserRead => "user.read",
            AccountPermission::UserWrite => "user.write",
            AccountPermission::UserWriteOwn => "user.write.own",
            AccountPermission::DispatchRead => "dispatch.read",
            AccountPermission::DispatchWrite => "dispatch.write",
        }
    }
}

impl fmt::Display for AccountPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountPermission {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        AccountPermission::ALL
            .into_iter()
            .find(|permission| permission.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow!("unknown permission '{}'", s))
    }
}

/// Answers whether a user holds a permission
pub trait PermissionOracle: Send + Sync {
    fn has_permission(&self, user: &ChatUser, permission: AccountPermission) -> bool;
}

impl<F> PermissionOracle for F
where
    F: Fn(&ChatUser, AccountPermission) -> bool + Send + Sync,
{
    fn has_permission(&self, user: &ChatUser, permission: AccountPermission) -> bool {
        self(user, permission)
    }
}

/// Permissions granted per account, read from a grants file at startup
///
/// Each line of the file is `account: permission permission ...`. Blank lines
/// and lines starting with `#` are skipped. Channel broadcasters hold every
/// permission without a grant.
#[derive(Debug, Default)]
pub struct GrantTable {
    grants: HashMap<String, HashSet<AccountPermission>>,
}

impl GrantTable {
    /// Load grants from a file
    ///
    /// A missing file yields an empty table.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Grants file {} doesn't exist, no permissions granted", path.display());
            return Ok(GrantTable::default());
        }

        let content = fs::read_to_string(path).await?;
        let table = GrantTable::parse(&content);
        info!(
            "Loaded permissions for {} accounts from {}",
            table.grants.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse the grants file format
    pub fn parse(content: &str) -> Self {
        let mut table = GrantTable::default();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((account, permissions)) = line.split_once(':') else {
                warn!("Skipping grants line {}: missing ':'", number + 1);
                continue;
            };

            for token in permissions.split_whitespace() {
                match token.parse() {
                    Ok(permission) => table.grant(account.trim(), permission),
                    Err(e) => warn!("Skipping grants line {}: {}", number + 1, e),
                }
            }
        }

        table
    }

    /// Grant a permission to an account
    pub fn grant(&mut self, account: &str, permission: AccountPermission) {
        self.grants
            .entry(account.to_lowercase())
            .or_default()
            .insert(permission);
    }
}

impl PermissionOracle for GrantTable {
    fn has_permission(&self, user: &ChatUser, permission: AccountPermission) -> bool {
        if user.is_broadcaster() {
            return true;
        }

        user.account
            .as_ref()
            .and_then(|account| self.grants.get(&account.to_lowercase()))
            .is_some_and(|granted| granted.contains(&permission))
    }
}
