//! In-memory secret store for tests and dev profiles.
//!
//! Values are held encrypted, same as the durable backend, so cipher
//! behavior is exercised on every path.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use cap_core::{CapabilityError, CapabilityResult};

use crate::cipher::SecretCipher;
use crate::store::SecretStore;

pub struct MemorySecretStore {
    cipher: SecretCipher,
    entries: RwLock<HashMap<(String, String), String>>,
}

impl MemorySecretStore {
    pub fn new(cipher: SecretCipher) -> Self {
        Self {
            cipher,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, applet: &str, name: &str) -> CapabilityResult<String> {
        let ciphertext = {
            let entries = self.entries.read().unwrap();
            entries
                .get(&(applet.to_string(), name.to_string()))
                .cloned()
        };
        let ciphertext = ciphertext
            .ok_or_else(|| CapabilityError::not_found(format!("secret {applet:?}/{name:?}")))?;
        self.cipher.decrypt(&ciphertext)
    }

    async fn set(&self, applet: &str, name: &str, plaintext: &str) -> CapabilityResult<()> {
        let ciphertext = self.cipher.encrypt(plaintext)?;
        let mut entries = self.entries.write().unwrap();
        entries.insert((applet.to_string(), name.to_string()), ciphertext);
        Ok(())
    }

    async fn list(&self, applet: &str) -> CapabilityResult<Vec<String>> {
        let entries = self.entries.read().unwrap();
        let mut names: Vec<String> = entries
            .keys()
            .filter(|(a, _)| a == applet)
            .map(|(_, n)| n.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn delete(&self, applet: &str, name: &str) -> CapabilityResult<bool> {
        let mut entries = self.entries.write().unwrap();
        Ok(entries
            .remove(&(applet.to_string(), name.to_string()))
            .is_some())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────
