//! In-process backend for exercising account operations without a keychain.

use anyhow::Result;
use std::{cell::RefCell, collections::HashMap};

use super::{SecretBackend, DEFAULT_SERVICE};
use crate::platform::Platform;

pub struct MemoryBackend {
    active: RefCell<Option<String>>,
    service: RefCell<Option<String>>,
    accounts: RefCell<HashMap<(u32, String), String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            active: RefCell::new(None),
            service: RefCell::new(Some(DEFAULT_SERVICE.to_string())),
            accounts: RefCell::new(HashMap::new()),
        }
    }

    /// Simulate a login: the host application writing fresh credentials.
    pub fn set_active(&self, blob: &str) {
        *self.active.borrow_mut() = Some(blob.to_string());
    }

    /// Simulate a keychain with no recognisable live entry.
    pub fn clear_service(&self) {
        *self.service.borrow_mut() = None;
    }

    pub fn active(&self) -> Option<String> {
        self.active.borrow().clone()
    }

    pub fn service(&self) -> Option<String> {
        self.service.borrow().clone()
    }

    pub fn has_account(&self, num: u32, email: &str) -> bool {
        self.accounts
            .borrow()
            .contains_key(&(num, email.to_string()))
    }
}

impl SecretBackend for MemoryBackend {
    fn kind(&self) -> Platform {
        Platform::Linux
    }

    fn active_service_name(&self) -> Result<Option<String>> {
        Ok(self.service())
    }

    fn read_active(&self) -> Result<Option<String>> {
        Ok(self.active().filter(|s| !s.is_empty()))
    }

    fn write_active(&self, blob: &str, service_name: &str) -> Result<()> {
        *self.service.borrow_mut() = Some(service_name.to_string());
        self.set_active(blob);
        Ok(())
    }

    fn read_account(&self, num: u32, email: &str) -> Result<Option<String>> {
        Ok(self
            .accounts
            .borrow()
            .get(&(num, email.to_string()))
            .filter(|s| !s.is_empty())
            .cloned())
    }

    fn write_account(&self, num: u32, email: &str, blob: &str) -> Result<()> {
        self.accounts
            .borrow_mut()
            .insert((num, email.to_string()), blob.to_string());
        Ok(())
    }

    fn delete_account(&self, num: u32, email: &str) -> Result<()> {
        self.accounts.borrow_mut().remove(&(num, email.to_string()));
        Ok(())
    }
}
