//! The account registry (`sequence.json`): which accounts are managed, in what
//! order, under which aliases, and which one is materialised in the live
//! Claude session.
//!
//! The document is only ever changed through [`RegistryStore::replace`], which
//! computes the next value in memory, validates it, and swaps it in with an
//! atomic rename. A reader never sees a half-written registry, and a value
//! that fails validation never reaches disk.

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::PathBuf,
};

use crate::{alias, error::SwitchError, files};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountEntry {
    pub email: String,
    #[serde(default)]
    pub uuid: String,
    /// Keychain service holding this account's live credentials when it was
    /// captured. Carried on every platform, only consulted on macOS.
    #[serde(default)]
    pub service_name: String,
    pub added: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    pub active_account_number: Option<u32>,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub sequence: Vec<u32>,
    #[serde(default)]
    pub accounts: BTreeMap<u32, AccountEntry>,
    /// Highest number ever allocated. Survives removal, so numbers are never
    /// handed out twice. Missing in documents from older versions.
    #[serde(default)]
    pub highest_account_number: u32,
}

impl Registry {
    fn highest_key(&self) -> u32 {
        self.accounts.keys().max().copied().unwrap_or(0)
    }

    pub fn next_account_number(&self) -> u32 {
        self.highest_account_number.max(self.highest_key()) + 1
    }

    pub fn get(&self, num: u32) -> Option<&AccountEntry> {
        self.accounts.get(&num)
    }

    pub fn find_by_email(&self, email: &str) -> Option<u32> {
        self.accounts
            .iter()
            .find(|(_, v)| v.email == email)
            .map(|(k, _)| *k)
    }

    pub fn find_by_alias(&self, alias: &str) -> Option<u32> {
        self.accounts
            .iter()
            .find(|(_, v)| v.alias.as_deref() == Some(alias))
            .map(|(k, _)| *k)
    }

    /// Resolve an account identifier to an account number.
    ///
    /// A purely numeric identifier is an account number. Anything else is
    /// matched against emails first, then aliases, so an email that happens
    /// to equal some other account's alias always resolves to its owner.
    pub fn resolve(&self, identifier: &str) -> Option<u32> {
        if let Ok(num) = identifier.parse::<u32>() {
            return self.accounts.contains_key(&num).then_some(num);
        }
        self.find_by_email(identifier)
            .or_else(|| self.find_by_alias(identifier))
    }

    /// Like [`resolve`](Self::resolve), but as an error naming the identifier.
    pub fn require(&self, identifier: &str) -> Result<u32, SwitchError> {
        self.resolve(identifier)
            .ok_or_else(|| SwitchError::AccountNotFound(identifier.to_string()))
    }

    /// The account after `current` in display order, wrapping around.
    pub fn next_in_sequence(&self, current: u32) -> Option<u32> {
        if self.sequence.is_empty() {
            return None;
        }
        let idx = self.sequence.iter().position(|&n| n == current).unwrap_or(0);
        Some(self.sequence[(idx + 1) % self.sequence.len()])
    }

    /// Structural checks run before every commit.
    pub fn validate(&self) -> Result<(), SwitchError> {
        let invalid = |msg: String| Err(SwitchError::InvalidRegistry(msg));

        if self.accounts.contains_key(&0) {
            return invalid("account number 0 is not allowed".into());
        }

        let mut seen = HashSet::new();
        for num in &self.sequence {
            if !seen.insert(*num) {
                return invalid(format!("account {num} appears twice in the sequence"));
            }
            if !self.accounts.contains_key(num) {
                return invalid(format!("sequence lists unknown account {num}"));
            }
        }
        if seen.len() != self.accounts.len() {
            return invalid("sequence does not list every account".into());
        }

        let mut emails = HashSet::new();
        let mut aliases = HashSet::new();
        for (num, entry) in &self.accounts {
            if !emails.insert(entry.email.as_str()) {
                return invalid(format!("email {} is registered twice", entry.email));
            }
            if let Some(a) = &entry.alias {
                alias::validate(a).map_err(|e| SwitchError::InvalidRegistry(e.to_string()))?;
                if !aliases.insert(a.as_str()) {
                    return invalid(format!("alias '{a}' is used twice (account {num})"));
                }
            }
        }

        if let Some(active) = self.active_account_number {
            if !self.accounts.contains_key(&active) {
                return invalid(format!("active account {active} does not exist"));
            }
        }
        Ok(())
    }
}

pub fn now_utc() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// The on-disk home of the registry document.
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: PathBuf) -> Self {
        RegistryStore { path }
    }

    pub fn load(&self) -> Result<Registry> {
        if !self.path.exists() {
            return Ok(Registry::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let mut registry: Registry = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", self.path.display()))?;

        // Older versions left the pointer behind when the active account was removed.
        if let Some(active) = registry.active_account_number {
            if !registry.accounts.contains_key(&active) {
                warn!("active account {active} no longer exists; clearing it");
                registry.active_account_number = None;
            }
        }
        Ok(registry)
    }

    /// Read-modify-write the whole document. `mutate` receives the current
    /// registry by value and returns its successor; nothing is written unless
    /// it succeeds and the successor validates.
    pub fn replace<F>(&self, mutate: F) -> Result<Registry>
    where
        F: FnOnce(Registry) -> Result<Registry>,
    {
        let current = self.load()?;
        let mut next = mutate(current)?;
        next.last_updated = now_utc();
        next.highest_account_number = next.highest_account_number.max(next.highest_key());
        next.validate()?;

        let content = serde_json::to_string_pretty(&next)?;
        files::write_atomic(&self.path, &content)?;
        debug!(
            "registry committed: {} account(s), active {:?}",
            next.accounts.len(),
            next.active_account_number
        );
        Ok(next)
    }
}
