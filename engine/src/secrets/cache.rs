use super::{SecretManager, SecretString};
use sdk::errors::EngineError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory cache in front of [`SecretManager`].
///
/// The chat provider and the embedder share one cache so the user is prompted
/// at most once per process.
#[derive(Clone)]
pub struct SecretCache {
    manager: Arc<SecretManager>,
    cache: Arc<RwLock<HashMap<String, SecretString>>>,
}

impl SecretCache {
    pub fn new(manager: Arc<SecretManager>) -> Self {
        Self {
            manager,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// A cache pre-filled with a fixed secret. Nothing is read from the
    /// environment or the keychain.
    pub fn with_static(key: &str, value: impl Into<String>) -> Self {
        let cache = Self::new(Arc::new(SecretManager::non_interactive("catalog")));
        if let Ok(mut map) = cache.cache.write() {
            map.insert(key.to_string(), SecretString::new(value));
        }
        cache
    }

    /// Returns the cached secret or resolves it through the manager.
    pub fn get_secret(&self, key: &str) -> Result<SecretString, EngineError> {
        {
            let cache = self
                .cache
                .read()
                .map_err(|_| EngineError::KeyringError("secret cache poisoned".to_string()))?;
            if let Some(secret) = cache.get(key) {
                return Ok(secret.clone());
            }
        }

        let secret = SecretString::new(self.manager.get_secret(key)?);

        {
            let mut cache = self
                .cache
                .write()
                .map_err(|_| EngineError::KeyringError("secret cache poisoned".to_string()))?;
            cache.insert(key.to_string(), secret.clone());
        }

        Ok(secret)
    }

    /// Resolves the given keys up front so any prompt happens before the chat loop.
    pub fn preload(&self, keys: &[&str]) -> Result<(), EngineError> {
        for key in keys {
            self.get_secret(key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_secret_is_served_from_cache() {
        let cache = SecretCache::with_static("openai_api_key", "sk-test");
        let secret = cache.get_secret("openai_api_key").unwrap();
        assert_eq!(secret.unsecure(), "sk-test");
        assert!(cache.preload(&["openai_api_key"]).is_ok());
    }
}
