//! Per-subject account selection
//!
//! Hosts show one checkbox per account ([`AccountOption`]) and hand the
//! ticked state back as a [`Selection`]. Only keys explicitly set to `true`
//! are dispatched to; an account missing from the selection is not.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::CredentialKey;

/// One selectable account as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountOption {
    pub key: CredentialKey,
    /// `"<Platform label> (<account name>)"`
    pub label: String,
    pub account_name: String,
    pub checked_by_default: bool,
}

impl AccountOption {
    pub fn new(key: CredentialKey, platform_label: &str, account_name: &str) -> Self {
        Self {
            key,
            label: format!("{} ({})", platform_label, account_name),
            account_name: account_name.to_string(),
            checked_by_default: true,
        }
    }
}

/// Which credentials a subject should be published to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    choices: BTreeMap<CredentialKey, bool>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection matching the options' default checkbox state
    pub fn all_checked<'a>(options: impl IntoIterator<Item = &'a AccountOption>) -> Self {
        Self {
            choices: options
                .into_iter()
                .map(|option| (option.key.clone(), option.checked_by_default))
                .collect(),
        }
    }

    pub fn select(&mut self, key: CredentialKey) -> &mut Self {
        self.choices.insert(key, true);
        self
    }

    pub fn deselect(&mut self, key: CredentialKey) -> &mut Self {
        self.choices.insert(key, false);
        self
    }

    pub fn is_selected(&self, key: &CredentialKey) -> bool {
        self.choices.get(key).copied().unwrap_or(false)
    }

    /// Selected keys in key order
    pub fn selected_keys(&self) -> Vec<CredentialKey> {
        self.choices
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        !self.choices.values().any(|selected| *selected)
    }
}

impl FromIterator<CredentialKey> for Selection {
    fn from_iter<I: IntoIterator<Item = CredentialKey>>(keys: I) -> Self {
        Self {
            choices: keys.into_iter().map(|key| (key, true)).collect(),
        }
    }
}
