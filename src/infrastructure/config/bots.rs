//! Bot account configuration.

use serde::Deserialize;

use crate::domain::{ChainAccount, KeyRef, User};

/// One `[[bots]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub id: String,
    pub name: String,
    pub address: String,
    /// Environment variable holding the bot's private key.
    #[serde(default)]
    pub key_env: Option<String>,
}

impl BotConfig {
    /// Build the bot user. A missing key yields an empty one, which only the
    /// dry-run chain accepts.
    #[must_use]
    pub fn to_user(&self) -> User {
        let key = self
            .key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .unwrap_or_default();
        User::new(
            self.id.clone(),
            self.name.clone(),
            ChainAccount::new(&self.address, KeyRef::new(key)),
        )
        .into_bot()
    }
}
