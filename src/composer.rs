// Copyright 2025 Cowboy AI, LLC.

//! Composition entry point and descriptor cache

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::chain::ChainBuilder;
use crate::collation::Collator;
use crate::composite::CompositeTypeDescriptor;
use crate::config::ComposerConfig;
use crate::descriptor::Catalog;
use crate::errors::{CompositionError, CompositionResult};

/// Normalized composition request
///
/// Role and behaviour names are sorted and de-duplicated, so two requests
/// naming the same sets in a different order share one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompositionKey {
    /// Base type the composite extends
    pub base: Option<String>,
    /// Requested roles
    pub roles: Vec<String>,
    /// Requested behaviours
    pub behaviours: Vec<String>,
}

impl CompositionKey {
    /// Key for a role-set and behaviour-set without a base type
    pub fn new<R, B>(roles: R, behaviours: B) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            base: None,
            roles: normalize(roles),
            behaviours: normalize(behaviours),
        }
    }

    /// Extend a base type
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }
}

impl fmt::Display for CompositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(base) = &self.base {
            write!(f, "{base}: ")?;
        }
        write!(f, "[{}] + [{}]", self.roles.join(", "), self.behaviours.join(", "))
    }
}

fn normalize<I>(names: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
    names.sort();
    names.dedup();
    names
}

/// Synthesizes composite types from a catalog
#[derive(Debug, Clone)]
pub struct Composer {
    catalog: Arc<Catalog>,
    config: ComposerConfig,
}

impl Composer {
    /// Composer with the default configuration
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_config(catalog, ComposerConfig::default())
    }

    /// Composer with an explicit configuration
    pub fn with_config(catalog: Arc<Catalog>, config: ComposerConfig) -> Self {
        Self { catalog, config }
    }

    /// Active configuration
    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Catalog composition reads from
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Compose a descriptor
    ///
    /// Either the whole descriptor is built or an error is returned.
    pub fn compose(&self, key: &CompositionKey) -> CompositionResult<Arc<CompositeTypeDescriptor>> {
        let base = key
            .base
            .as_deref()
            .map(|name| self.catalog.base(name).cloned())
            .transpose()?;

        let collation =
            Collator::new(&self.catalog, &self.config).collate(&key.roles, &key.behaviours)?;
        let plan = ChainBuilder::new(&self.catalog, &self.config).build(&collation, base.as_ref())?;
        let descriptor = CompositeTypeDescriptor::assemble(key.clone(), collation, plan, base)?;

        info!(
            key = %key,
            roles = descriptor.roles().len(),
            slots = descriptor.slots().len(),
            excluded = descriptor.excluded().len(),
            "Composed composite type"
        );
        Ok(Arc::new(descriptor))
    }
}

/// Bounded cache of composed descriptors
///
/// Composition runs outside the lock; when two threads race on the same key
/// the first descriptor stored is the one both receive.
pub struct CompositeCache {
    composer: Composer,
    entries: Mutex<LruCache<CompositionKey, Arc<CompositeTypeDescriptor>>>,
}

impl CompositeCache {
    /// Cache sized by the composer's `cache_capacity`
    pub fn new(composer: Composer) -> Self {
        let capacity = NonZeroUsize::new(composer.config().cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            composer,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The underlying composer
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Cached descriptor for a key, composing it on a miss
    pub fn get_or_compose(
        &self,
        key: &CompositionKey,
    ) -> CompositionResult<Arc<CompositeTypeDescriptor>> {
        if let Some(found) = self.lock()?.get(key) {
            info!(key = %key, "Served composite type from cache");
            return Ok(Arc::clone(found));
        }

        let composed = self.composer.compose(key)?;

        let mut entries = self.lock()?;
        if let Some(existing) = entries.get(key) {
            return Ok(Arc::clone(existing));
        }
        entries.put(key.clone(), Arc::clone(&composed));
        Ok(composed)
    }

    /// Number of cached descriptors
    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached descriptor
    pub fn clear(&self) -> CompositionResult<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn lock(
        &self,
    ) -> CompositionResult<std::sync::MutexGuard<'_, LruCache<CompositionKey, Arc<CompositeTypeDescriptor>>>>
    {
        self.entries
            .lock()
            .map_err(|_| CompositionError::Internal("composite cache lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{BehaviourDescriptor, MethodSignature, RoleDescriptor};
    use crate::shape::Shape;
    use crate::value::Value;

    fn catalog() -> Arc<Catalog> {
        let mut catalog = Catalog::new();
        catalog
            .register_role(
                RoleDescriptor::builder("Named")
                    .method(MethodSignature::new("name", Shape::Text))
                    .build(),
            )
            .unwrap();
        catalog
            .register_behaviour(
                BehaviourDescriptor::builder("Fixed")
                    .stateless()
                    .provides("Named")
                    .plain(MethodSignature::new("name", Shape::Text), |_| Ok(Value::text("fixed")))
                    .build(),
            )
            .unwrap();
        Arc::new(catalog)
    }

    #[test]
    fn test_key_is_normalized() {
        let a = CompositionKey::new(["B", "A", "B"], ["X"]);
        let b = CompositionKey::new(["A", "B"], ["X", "X"]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "[A, B] + [X]");
        assert_eq!(
            CompositionKey::new(["A"], Vec::<String>::new()).with_base("Record").to_string(),
            "Record: [A] + []"
        );
    }

    #[test]
    fn test_unknown_base_type() {
        let composer = Composer::new(catalog());
        let err = composer
            .compose(&CompositionKey::new(["Named"], ["Fixed"]).with_base("Missing"))
            .unwrap_err();
        assert!(matches!(err, CompositionError::UnknownBaseType(ref name) if name == "Missing"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_cache_returns_same_descriptor() {
        let cache = CompositeCache::new(Composer::new(catalog()));
        let key = CompositionKey::new(Vec::<String>::new(), ["Fixed"]);
        let first = cache.get_or_compose(&key).unwrap();
        let second = cache.get_or_compose(&key).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        cache.clear().unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_capacity_evicts_oldest() {
        let config = ComposerConfig {
            cache_capacity: 1,
            ..ComposerConfig::default()
        };
        let cache = CompositeCache::new(Composer::with_config(catalog(), config));
        let a = CompositionKey::new(["Named"], Vec::<String>::new());
        let b = CompositionKey::new(Vec::<String>::new(), ["Fixed"]);
        let first = cache.get_or_compose(&a).unwrap();
        cache.get_or_compose(&b).unwrap();
        let again = cache.get_or_compose(&a).unwrap();
        assert!(!Arc::ptr_eq(&first, &again));
        assert_eq!(cache.len(), 1);
    }
}
