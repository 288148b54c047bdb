//! Explicit cache of model instances.
//!
//! A model owns a session, and sessions are expensive to create, so a
//! provider hands out the same [`BrowserChatModel`] for the same model id and
//! options. The cache is a value owned by the provider; nothing is global.

use browser_ai_models::{BrowserChatModel, SessionOptions};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Identity of a cached model.
///
/// Options are compared by their JSON form, so a progress sink (which does
/// not serialize) does not split entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    model_id: String,
    options: String,
}

impl CacheKey {
    /// Build the key for `model_id` with `options`.
    pub fn new(model_id: impl Into<String>, options: &SessionOptions) -> serde_json::Result<Self> {
        Ok(Self {
            model_id: model_id.into(),
            options: serde_json::to_string(options)?,
        })
    }

    /// The model id.
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Models by `(model id, serialized options)`.
#[derive(Debug, Default)]
pub struct ModelCache {
    models: Mutex<HashMap<CacheKey, Arc<BrowserChatModel>>>,
}

impl ModelCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the model for `key`, creating it with `create` on a miss.
    pub fn get_or_insert_with(
        &self,
        key: CacheKey,
        create: impl FnOnce() -> BrowserChatModel,
    ) -> Arc<BrowserChatModel> {
        let mut models = self.models.lock();
        if let Some(model) = models.get(&key) {
            return Arc::clone(model);
        }
        debug!(model_id = key.model_id(), "Caching new model instance");
        let model = Arc::new(create());
        models.insert(key, Arc::clone(&model));
        model
    }

    /// Get a cached model.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<BrowserChatModel>> {
        self.models.lock().get(key).cloned()
    }

    /// Remove every entry for `model_id` and return the removed models.
    ///
    /// Their sessions stay alive until the caller destroys them or the last
    /// handle is dropped.
    pub fn evict(&self, model_id: &str) -> Vec<Arc<BrowserChatModel>> {
        let mut models = self.models.lock();
        let keys: Vec<CacheKey> = models
            .keys()
            .filter(|k| k.model_id == model_id)
            .cloned()
            .collect();
        keys.iter().filter_map(|k| models.remove(k)).collect()
    }

    /// Remove every entry and return the removed models.
    pub fn clear(&self) -> Vec<Arc<BrowserChatModel>> {
        self.models.lock().drain().map(|(_, model)| model).collect()
    }

    /// Number of cached models.
    pub fn len(&self) -> usize {
        self.models.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.models.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_ai_models::{web_llm_profile, MockPlatform};

    fn create(model_id: &str) -> BrowserChatModel {
        BrowserChatModel::new(model_id, Arc::new(MockPlatform::new()), web_llm_profile())
    }

    #[test]
    fn test_same_key_same_instance() {
        let cache = ModelCache::new();
        let options = SessionOptions::new().temperature(0.5);

        let a = cache.get_or_insert_with(CacheKey::new("m", &options).unwrap(), || create("m"));
        let b = cache.get_or_insert_with(CacheKey::new("m", &options).unwrap(), || create("m"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_options_split_entries() {
        let cache = ModelCache::new();
        let cold = CacheKey::new("m", &SessionOptions::new().temperature(0.1)).unwrap();
        let hot = CacheKey::new("m", &SessionOptions::new().temperature(0.9)).unwrap();

        let a = cache.get_or_insert_with(cold.clone(), || create("m"));
        let b = cache.get_or_insert_with(hot, || create("m"));
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(cache.get(&cold).is_some());
    }

    #[test]
    fn test_evict_and_clear() {
        let cache = ModelCache::new();
        let options = SessionOptions::new();
        cache.get_or_insert_with(CacheKey::new("a", &options).unwrap(), || create("a"));
        cache.get_or_insert_with(
            CacheKey::new("a", &options.clone().top_k(3)).unwrap(),
            || create("a"),
        );
        cache.get_or_insert_with(CacheKey::new("b", &options).unwrap(), || create("b"));

        assert_eq!(cache.evict("a").len(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.evict("missing").is_empty());

        assert_eq!(cache.clear().len(), 1);
        assert!(cache.is_empty());
    }
}
