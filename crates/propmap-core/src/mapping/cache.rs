//! Concurrent cache of parsed mapping models
//!
//! Copyright (c) 2025 Propmap Team
//! Licensed under the MIT OR Apache-2.0 license

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::Result;
use crate::types::{TypeInfo, TypeToken};

use super::model::BeanMappingInfo;

/// Maps each target type to its parsed [`BeanMappingInfo`], parsing at most
/// once per type.
///
/// Lookups for runtime-specialized subtypes resolve to the mapped supertype's
/// entry, so specialization never multiplies cache entries. Parsing happens
/// outside any lock; when two threads race to parse the same type, the first
/// insert wins and the loser's result is dropped, which keeps the returned
/// `Arc` identical across callers.
pub struct MappingInfoCache {
    entries: RwLock<HashMap<TypeToken, Arc<BeanMappingInfo>>>,
}

impl MappingInfoCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide cache used by the transformer layer
    pub fn global() -> &'static MappingInfoCache {
        static GLOBAL: OnceLock<MappingInfoCache> = OnceLock::new();
        GLOBAL.get_or_init(MappingInfoCache::new)
    }

    /// Fetch the mapping model for `target`, parsing it on first use.
    ///
    /// A specialized subtype walks up to the nearest non-specialized ancestor
    /// and is served that ancestor's model.
    pub fn get_or_parse(&self, target: &'static TypeInfo) -> Result<Arc<BeanMappingInfo>> {
        let resolved = resolve(target);
        let token = resolved.token();

        if let Some(info) = self.read_lock().get(&token) {
            return Ok(info.clone());
        }

        let parsed = BeanMappingInfo::parse(resolved)?;

        let mut entries = self.write_lock();
        let info = entries
            .entry(token)
            .or_insert_with(|| Arc::new(parsed))
            .clone();
        Ok(info)
    }

    /// Drop the cached model for `target`, if present
    pub fn evict(&self, target: &TypeToken) -> bool {
        self.write_lock().remove(target).is_some()
    }

    pub fn clear(&self) {
        self.write_lock().clear();
    }

    pub fn len(&self) -> usize {
        self.read_lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_lock().is_empty()
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, HashMap<TypeToken, Arc<BeanMappingInfo>>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, HashMap<TypeToken, Arc<BeanMappingInfo>>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MappingInfoCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk past runtime-specialized subtypes to the type that actually carries
/// the mapping declarations.
pub(crate) fn resolve(target: &'static TypeInfo) -> &'static TypeInfo {
    let mut current = target;
    while current.is_specialized() {
        match current.superclass() {
            Some(parent) => current = parent,
            None => break,
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MappingDeclaration, PropertyAccessor, Reflected};

    #[derive(Debug, Default, Clone)]
    struct CachedSource {
        label: String,
    }

    impl Reflected for CachedSource {
        fn type_info() -> &'static TypeInfo {
            static INFO: OnceLock<TypeInfo> = OnceLock::new();
            INFO.get_or_init(|| {
                TypeInfo::of::<CachedSource>()
                    .property(PropertyAccessor::read_write(
                        "label",
                        |s: &CachedSource| s.label.clone(),
                        |s: &mut CachedSource, v: String| s.label = v,
                    ))
                    .build()
            })
        }
    }

    #[derive(Debug, Default, Clone)]
    struct CachedTarget {
        label: String,
    }

    impl Reflected for CachedTarget {
        fn type_info() -> &'static TypeInfo {
            static INFO: OnceLock<TypeInfo> = OnceLock::new();
            INFO.get_or_init(|| {
                TypeInfo::of::<CachedTarget>()
                    .property(PropertyAccessor::read_write(
                        "label",
                        |t: &CachedTarget| t.label.clone(),
                        |t: &mut CachedTarget, v: String| t.label = v,
                    ))
                    .declare(MappingDeclaration::on_field::<CachedSource>(
                        "label", "label",
                    ))
                    .build()
            })
        }
    }

    #[derive(Debug, Default, Clone)]
    struct SpecializedTarget {
        base: CachedTarget,
    }

    impl Reflected for SpecializedTarget {
        fn type_info() -> &'static TypeInfo {
            static INFO: OnceLock<TypeInfo> = OnceLock::new();
            INFO.get_or_init(|| {
                TypeInfo::of::<SpecializedTarget>()
                    .specializes(
                        CachedTarget::type_info,
                        |t: &SpecializedTarget| &t.base,
                        |t: &mut SpecializedTarget| &mut t.base,
                    )
                    .build()
            })
        }
    }

    #[derive(Debug, Default, Clone)]
    struct BrokenTarget;

    impl Reflected for BrokenTarget {
        fn type_info() -> &'static TypeInfo {
            static INFO: OnceLock<TypeInfo> = OnceLock::new();
            INFO.get_or_init(|| {
                TypeInfo::of::<BrokenTarget>()
                    .declare(MappingDeclaration::on_field::<CachedSource>(
                        "missing", "label",
                    ))
                    .build()
            })
        }
    }

    #[test]
    fn test_parse_once_and_share() {
        let cache = MappingInfoCache::new();
        let first = cache.get_or_parse(CachedTarget::type_info()).unwrap();
        let second = cache.get_or_parse(CachedTarget::type_info()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_specialized_lookup_resolves_to_supertype() {
        let cache = MappingInfoCache::new();
        let parent = cache.get_or_parse(CachedTarget::type_info()).unwrap();
        let child = cache.get_or_parse(SpecializedTarget::type_info()).unwrap();
        assert!(Arc::ptr_eq(&parent, &child));
        assert_eq!(child.target(), TypeToken::of::<CachedTarget>());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_parse_failure_leaves_no_entry() {
        let cache = MappingInfoCache::new();
        assert!(cache.get_or_parse(BrokenTarget::type_info()).is_err());
        assert!(cache.is_empty());
        // Still fails on retry; nothing poisoned or half-inserted.
        assert!(cache.get_or_parse(BrokenTarget::type_info()).is_err());
    }

    #[test]
    fn test_evict_and_reparse() {
        let cache = MappingInfoCache::new();
        let first = cache.get_or_parse(CachedTarget::type_info()).unwrap();
        assert!(cache.evict(&TypeToken::of::<CachedTarget>()));
        assert!(!cache.evict(&TypeToken::of::<CachedTarget>()));

        let reparsed = cache.get_or_parse(CachedTarget::type_info()).unwrap();
        assert!(!Arc::ptr_eq(&first, &reparsed));
    }

    #[test]
    fn test_concurrent_lookups_share_one_entry() {
        let cache = Arc::new(MappingInfoCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.get_or_parse(CachedTarget::type_info()).unwrap())
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.len(), 1);
    }
}
