//! Users as seen by the race engine.
//!
//! Registration and authentication live elsewhere; the engine only needs a
//! display name and the chain account used to sign the user's calls.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::{Address, UserId};

/// Signing material reference for a chain account.
///
/// The engine never interprets the secret. It is handed to the chain adapter
/// which derives a signer from it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyRef(String);

impl KeyRef {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyRef(***)")
    }
}

/// An on-chain account owned by a user (or by the backend).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainAccount {
    pub address: Address,
    pub key: KeyRef,
}

impl ChainAccount {
    pub fn new(address: impl AsRef<str>, key: KeyRef) -> Self {
        Self {
            address: Address::new(address),
            key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub account: ChainAccount,
    #[serde(default)]
    pub is_bot: bool,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, account: ChainAccount) -> Self {
        Self {
            id: UserId::new(id),
            name: name.into(),
            account,
            is_bot: false,
        }
    }

    #[must_use]
    pub fn into_bot(mut self) -> Self {
        self.is_bot = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ref_is_redacted_in_debug() {
        let key = KeyRef::new("0xsecret");
        assert_eq!(format!("{key:?}"), "KeyRef(***)");
        assert_eq!(key.expose(), "0xsecret");
    }
}
