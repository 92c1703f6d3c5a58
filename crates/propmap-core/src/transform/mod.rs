//! Specialized transformers
//!
//! A [`Transformer`] is the executable form of a verified mapping model for
//! one (target, source) pair: every accessor bound, every converter chain
//! constructed, all ahead of the first value copied. Plans are built at most
//! once per pair and shared process-wide, so repeated [`get_transformer`]
//! calls are cheap lookups.
//!
//! Copyright (c) 2025 Propmap Team
//! Licensed under the MIT OR Apache-2.0 license

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock, RwLock};

use crate::converter::{ConverterChain, ConverterType};
use crate::error::{MappingError, Result};
use crate::mapping::{resolve, MappingInfoCache};
use crate::types::{Getter, PropertyAccessor, Reflected, Setter, TypeInfo, TypeToken};

/// One bound property copy: both endpoint accessors plus the materialized
/// chain for each direction. An absent chain means direct assignment.
struct MappingStep {
    property: &'static str,
    source_get: Getter,
    source_set: Setter,
    target_get: Getter,
    target_set: Setter,
    to_target: Option<ConverterChain>,
    to_source: Option<ConverterChain>,
}

/// The shared, immutable execution plan for one (target, source) pair
pub struct TransformerPlan {
    target: &'static TypeInfo,
    source: &'static TypeInfo,
    steps: Vec<MappingStep>,
}

impl TransformerPlan {
    pub fn target(&self) -> TypeToken {
        self.target.token()
    }

    pub fn source(&self) -> TypeToken {
        self.source.token()
    }

    pub fn mapped_properties(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps.iter().map(|step| step.property)
    }
}

type PlanKey = (TypeToken, TypeToken);

fn plan_cache() -> &'static RwLock<HashMap<PlanKey, Arc<TransformerPlan>>> {
    static CACHE: OnceLock<RwLock<HashMap<PlanKey, Arc<TransformerPlan>>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

fn bind(accessor: &PropertyAccessor, half: &str) -> Result<(Getter, Setter)> {
    let getter = accessor
        .getter()
        .cloned()
        .ok_or_else(|| MappingError::Specialization {
            message: format!("{half} property '{}' lost its getter", accessor.name()),
        })?;
    let setter = accessor
        .setter()
        .cloned()
        .ok_or_else(|| MappingError::Specialization {
            message: format!("{half} property '{}' lost its setter", accessor.name()),
        })?;
    Ok((getter, setter))
}

fn materialize(chain: &[ConverterType]) -> Result<Option<ConverterChain>> {
    if chain.is_empty() {
        return Ok(None);
    }
    ConverterChain::materialize(chain).map(Some)
}

fn build_plan(
    target: &'static TypeInfo,
    source: &'static TypeInfo,
) -> Result<Arc<TransformerPlan>> {
    let model = MappingInfoCache::global().get_or_parse(target)?;

    let mut steps = Vec::new();
    if let Some(items) = model.items_for(&source.token()) {
        for item in items {
            let (source_get, source_set) = bind(item.source_property(), "source")?;
            let (target_get, target_set) = bind(item.target_property(), "target")?;
            steps.push(MappingStep {
                property: item.target_property().name(),
                source_get,
                source_set,
                target_get,
                target_set,
                to_target: materialize(item.to_target_chain())?,
                to_source: materialize(item.to_source_chain())?,
            });
        }
    }
    // Model items live in a set; fix the copy order so partial failures are
    // reproducible.
    steps.sort_by_key(|step| step.property);

    log::debug!(
        "specialized transformer {} <- {} with {} step(s)",
        target.name(),
        source.name(),
        steps.len()
    );

    Ok(Arc::new(TransformerPlan {
        target,
        source,
        steps,
    }))
}

/// A bidirectional property copier between target type `T` and source type
/// `S`, backed by a shared [`TransformerPlan`].
///
/// Cloning a transformer clones an `Arc`, never the plan.
pub struct Transformer<T, S> {
    plan: Arc<TransformerPlan>,
    _types: PhantomData<fn() -> (T, S)>,
}

impl<T, S> Clone for Transformer<T, S> {
    fn clone(&self) -> Self {
        Self {
            plan: self.plan.clone(),
            _types: PhantomData,
        }
    }
}

impl<T, S> std::fmt::Debug for Transformer<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer")
            .field("target", &self.plan.target.name())
            .field("source", &self.plan.source.name())
            .field("steps", &self.plan.steps.len())
            .finish()
    }
}

/// Fetch (building on first use) the transformer for target `T` fed from
/// source `S`.
///
/// Runtime-specialized subtypes on either side share the plan of their mapped
/// supertypes. The plan is built outside the cache lock; when two threads
/// race, the first insert wins.
pub fn get_transformer<T: Reflected, S: Reflected>() -> Result<Transformer<T, S>> {
    let target = resolve(T::type_info());
    let source = resolve(S::type_info());
    let key = (target.token(), source.token());

    if let Some(plan) = lock_read(plan_cache()).get(&key) {
        return Ok(Transformer {
            plan: plan.clone(),
            _types: PhantomData,
        });
    }

    let plan = build_plan(target, source)?;

    let mut cache = lock_write(plan_cache());
    let plan = cache.entry(key).or_insert_with(|| plan).clone();
    Ok(Transformer {
        plan,
        _types: PhantomData,
    })
}

/// Drop the cached plan for a (target, source) pair, if present
pub fn evict_transformer(target: &TypeToken, source: &TypeToken) -> bool {
    lock_write(plan_cache()).remove(&(*target, *source)).is_some()
}

fn lock_read<K, V>(lock: &RwLock<HashMap<K, V>>) -> std::sync::RwLockReadGuard<'_, HashMap<K, V>> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn lock_write<K, V>(
    lock: &RwLock<HashMap<K, V>>,
) -> std::sync::RwLockWriteGuard<'_, HashMap<K, V>> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<T: Reflected, S: Reflected> Transformer<T, S> {
    /// Construct a fresh `T` and copy every mapped property from `source`
    /// into it.
    pub fn create_target_from(&self, source: &S) -> Result<T> {
        let mut target = construct::<T>()?;
        self.merge_into(&mut target, source)?;
        Ok(target)
    }

    /// Copy every mapped property from `source` into an existing `target`,
    /// applying each entry's source-to-target chain.
    ///
    /// Steps run in a fixed order; a failing step aborts the merge and leaves
    /// the properties already copied in place.
    pub fn merge_into(&self, target: &mut T, source: &S) -> Result<()> {
        let source = upcast_ref(source, S::type_info())?;
        let target = upcast_mut(target, T::type_info())?;
        for step in &self.plan.steps {
            let mut value = (step.source_get)(source)?;
            if let Some(chain) = &step.to_target {
                value = chain.apply(value)?;
            }
            (step.target_set)(&mut *target, value)?;
        }
        Ok(())
    }

    /// Construct a fresh `S` and copy every mapped property of `target` back
    /// into it.
    pub fn create_source_from(&self, target: &T) -> Result<S> {
        let mut source = construct::<S>()?;
        self.merge_into_source(&mut source, target)?;
        Ok(source)
    }

    /// Copy every mapped property of `target` back into an existing `source`,
    /// applying each entry's target-to-source chain.
    pub fn merge_into_source(&self, source: &mut S, target: &T) -> Result<()> {
        let target = upcast_ref(target, T::type_info())?;
        let source = upcast_mut(source, S::type_info())?;
        for step in &self.plan.steps {
            let mut value = (step.target_get)(target)?;
            if let Some(chain) = &step.to_source {
                value = chain.apply(value)?;
            }
            (step.source_set)(&mut *source, value)?;
        }
        Ok(())
    }

    /// Whether two transformers execute the same shared plan
    pub fn same_specialization(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.plan, &other.plan)
    }

    pub fn plan(&self) -> &TransformerPlan {
        &self.plan
    }
}

/// Project a specialized instance down to the type the plan's accessors are
/// bound to. Non-specialized types pass through untouched.
fn upcast_ref<'a>(object: &'a dyn Any, info: &'static TypeInfo) -> Result<&'a dyn Any> {
    let mut object = object;
    let mut info = info;
    while info.is_specialized() {
        let upcast = info.upcast().ok_or_else(|| MappingError::Specialization {
            message: format!("{} is marked specialized but carries no upcast", info.name()),
        })?;
        object = (upcast.by_ref)(object)?;
        match info.superclass() {
            Some(parent) => info = parent,
            None => break,
        }
    }
    Ok(object)
}

fn upcast_mut<'a>(object: &'a mut dyn Any, info: &'static TypeInfo) -> Result<&'a mut dyn Any> {
    let mut object = object;
    let mut info = info;
    while info.is_specialized() {
        let upcast = info.upcast().ok_or_else(|| MappingError::Specialization {
            message: format!("{} is marked specialized but carries no upcast", info.name()),
        })?;
        object = (upcast.by_mut)(object)?;
        match info.superclass() {
            Some(parent) => info = parent,
            None => break,
        }
    }
    Ok(object)
}

fn construct<H: Reflected>() -> Result<H> {
    let info = H::type_info();
    let constructor = info
        .constructor()
        .ok_or_else(|| MappingError::Specialization {
            message: format!("{} has no registered constructor", info.name()),
        })?;
    let instance =
        constructor()
            .into_any()
            .downcast::<H>()
            .map_err(|_| MappingError::Specialization {
                message: format!("constructor for {} built a different type", info.name()),
            })?;
    Ok(*instance)
}
