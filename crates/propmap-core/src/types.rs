//! Core data structures for the Propmap mapping engine
//!
//! Where the mapping model in a reflective language would be discovered at
//! call time, here every participating type carries an explicit, immutable
//! capability table: a [`TypeInfo`] built once and served through the
//! [`Reflected`] trait. The table holds the type's named properties (erased
//! getter/setter pairs), its mapping declarations, and an optional default
//! constructor, which is everything the parser and the specializer consume.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::converter::ConverterType;
use crate::error::{MappingError, Result};

/// Identity of a Rust type, with its name kept for diagnostics.
///
/// Equality and hashing go through the [`TypeId`] alone; the name is never
/// load-bearing.
#[derive(Clone, Copy, Debug)]
pub struct TypeToken {
    id: TypeId,
    name: &'static str,
}

impl TypeToken {
    /// Token for a concrete (or unsized) type
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The universal top type, to which any value is assignable
    pub fn universal() -> Self {
        Self::of::<dyn Any>()
    }

    pub fn is_universal(&self) -> bool {
        self.id == TypeId::of::<dyn Any>()
    }

    /// Whether a value of type `other` can be assigned to a slot of this type.
    ///
    /// Rust has no subtype widening between concrete types, so assignability
    /// collapses to identity, with the universal top type accepting anything.
    pub fn is_assignable_from(&self, other: &TypeToken) -> bool {
        self.id == other.id || self.is_universal()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeToken {}

impl std::hash::Hash for TypeToken {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A dynamically typed property value moving through the engine.
///
/// Blanket-implemented for every `Any + Debug + Clone + Send` type, so hosts
/// never implement it by hand.
pub trait PropertyValue: Any + fmt::Debug + Send {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn clone_boxed(&self) -> Box<dyn PropertyValue>;
    fn type_token(&self) -> TypeToken;
}

impl<T: Any + fmt::Debug + Clone + Send> PropertyValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_boxed(&self) -> Box<dyn PropertyValue> {
        Box::new(self.clone())
    }

    fn type_token(&self) -> TypeToken {
        TypeToken::of::<T>()
    }
}

/// An owned, erased property value.
///
/// Deliberately not `Clone`: if `Box<dyn PropertyValue>` satisfied the
/// blanket impl, method calls on a `Value` would resolve to the box instead
/// of the boxed value. Use [`PropertyValue::clone_boxed`] instead.
pub type Value = Box<dyn PropertyValue>;

/// Erased read half of a property
pub type Getter = Arc<dyn Fn(&dyn Any) -> Result<Value> + Send + Sync>;

/// Erased write half of a property
pub type Setter = Arc<dyn Fn(&mut dyn Any, Value) -> Result<()> + Send + Sync>;

/// A named, typed slot on a structured type with independent read and write
/// capability. Both halves must be present for the property to serve as a
/// mapping endpoint; partial accessors exist so the verifier can report which
/// half is missing.
#[derive(Clone)]
pub struct PropertyAccessor {
    owner: TypeToken,
    name: &'static str,
    value_type: TypeToken,
    getter: Option<Getter>,
    setter: Option<Setter>,
}

fn erase_getter<O, V>(name: &'static str, get: fn(&O) -> V) -> Getter
where
    O: Any,
    V: Any + fmt::Debug + Clone + Send,
{
    Arc::new(move |object: &dyn Any| -> Result<Value> {
        let object = object
            .downcast_ref::<O>()
            .ok_or_else(|| MappingError::Specialization {
                message: format!(
                    "getter for '{}' bound to {}, got a different runtime type",
                    name,
                    type_name::<O>()
                ),
            })?;
        Ok(Box::new(get(object)))
    })
}

fn erase_setter<O, V>(name: &'static str, set: fn(&mut O, V)) -> Setter
where
    O: Any,
    V: Any + fmt::Debug + Clone + Send,
{
    Arc::new(move |object: &mut dyn Any, value: Value| -> Result<()> {
        let object = object
            .downcast_mut::<O>()
            .ok_or_else(|| MappingError::Specialization {
                message: format!(
                    "setter for '{}' bound to {}, got a different runtime type",
                    name,
                    type_name::<O>()
                ),
            })?;
        // The narrowing cast the verifier already proved sound.
        let value = value
            .into_any()
            .downcast::<V>()
            .map_err(|_| MappingError::Specialization {
                message: format!(
                    "setter for '{}' expects {}, got a different value type",
                    name,
                    type_name::<V>()
                ),
            })?;
        set(object, *value);
        Ok(())
    })
}

impl PropertyAccessor {
    /// A fully readable and writable property
    pub fn read_write<O, V>(name: &'static str, get: fn(&O) -> V, set: fn(&mut O, V)) -> Self
    where
        O: Any,
        V: Any + fmt::Debug + Clone + Send,
    {
        Self {
            owner: TypeToken::of::<O>(),
            name,
            value_type: TypeToken::of::<V>(),
            getter: Some(erase_getter(name, get)),
            setter: Some(erase_setter(name, set)),
        }
    }

    /// A property with a getter but no setter
    pub fn read_only<O, V>(name: &'static str, get: fn(&O) -> V) -> Self
    where
        O: Any,
        V: Any + fmt::Debug + Clone + Send,
    {
        Self {
            owner: TypeToken::of::<O>(),
            name,
            value_type: TypeToken::of::<V>(),
            getter: Some(erase_getter(name, get)),
            setter: None,
        }
    }

    /// A property with a setter but no getter
    pub fn write_only<O, V>(name: &'static str, set: fn(&mut O, V)) -> Self
    where
        O: Any,
        V: Any + fmt::Debug + Clone + Send,
    {
        Self {
            owner: TypeToken::of::<O>(),
            name,
            value_type: TypeToken::of::<V>(),
            getter: None,
            setter: Some(erase_setter(name, set)),
        }
    }

    pub fn owner(&self) -> TypeToken {
        self.owner
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value_type(&self) -> TypeToken {
        self.value_type
    }

    pub fn getter(&self) -> Option<&Getter> {
        self.getter.as_ref()
    }

    pub fn setter(&self) -> Option<&Setter> {
        self.setter.as_ref()
    }
}

impl fmt::Debug for PropertyAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyAccessor")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("readable", &self.getter.is_some())
            .field("writable", &self.setter.is_some())
            .finish()
    }
}

impl PartialEq for PropertyAccessor {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner
            && self.name == other.name
            && self.value_type == other.value_type
            && self.getter.is_some() == other.getter.is_some()
            && self.setter.is_some() == other.setter.is_some()
    }
}

impl Eq for PropertyAccessor {}

impl std::hash::Hash for PropertyAccessor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.owner.hash(state);
        self.name.hash(state);
        self.value_type.hash(state);
        self.getter.is_some().hash(state);
        self.setter.is_some().hash(state);
    }
}

/// Where a mapping declaration is attached on the target type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclarationSite {
    /// Attached to a field; must correspond to a property of the same name
    Field(&'static str),
    /// Attached to the property's getter
    Getter(&'static str),
    /// Attached to the property's setter
    Setter(&'static str),
}

impl DeclarationSite {
    /// The target property name the declaration configures
    pub fn property_name(&self) -> &'static str {
        match self {
            DeclarationSite::Field(name)
            | DeclarationSite::Getter(name)
            | DeclarationSite::Setter(name) => name,
        }
    }
}

/// One per-property mapping declaration, supplied by the host alongside the
/// target type's capability table.
///
/// The source type is referenced through a function pointer rather than a
/// `&'static TypeInfo` so that two types may declare mappings against each
/// other without an initialization cycle.
#[derive(Clone, Debug)]
pub struct MappingDeclaration {
    source_type: fn() -> &'static TypeInfo,
    source_property: &'static str,
    to_target_chain: Vec<ConverterType>,
    to_source_chain: Vec<ConverterType>,
    site: DeclarationSite,
}

impl MappingDeclaration {
    /// Declaration attached to a target field
    pub fn on_field<S: Reflected>(field: &'static str, source_property: &'static str) -> Self {
        Self::at(DeclarationSite::Field(field), S::type_info, source_property)
    }

    /// Declaration attached to a target property's getter
    pub fn on_getter<S: Reflected>(property: &'static str, source_property: &'static str) -> Self {
        Self::at(
            DeclarationSite::Getter(property),
            S::type_info,
            source_property,
        )
    }

    /// Declaration attached to a target property's setter
    pub fn on_setter<S: Reflected>(property: &'static str, source_property: &'static str) -> Self {
        Self::at(
            DeclarationSite::Setter(property),
            S::type_info,
            source_property,
        )
    }

    fn at(
        site: DeclarationSite,
        source_type: fn() -> &'static TypeInfo,
        source_property: &'static str,
    ) -> Self {
        Self {
            source_type,
            source_property,
            to_target_chain: Vec::new(),
            to_source_chain: Vec::new(),
            site,
        }
    }

    /// Converter chain applied when copying source → target
    pub fn to_target(mut self, chain: Vec<ConverterType>) -> Self {
        self.to_target_chain = chain;
        self
    }

    /// Converter chain applied when copying target → source
    pub fn to_source(mut self, chain: Vec<ConverterType>) -> Self {
        self.to_source_chain = chain;
        self
    }

    pub fn source_type(&self) -> &'static TypeInfo {
        (self.source_type)()
    }

    pub fn source_property(&self) -> &'static str {
        self.source_property
    }

    pub fn to_target_chain(&self) -> &[ConverterType] {
        &self.to_target_chain
    }

    pub fn to_source_chain(&self) -> &[ConverterType] {
        &self.to_source_chain
    }

    pub fn site(&self) -> DeclarationSite {
        self.site
    }
}

/// Erased shared-reference projection onto the mapped supertype
pub type UpcastRef = Arc<dyn for<'a> Fn(&'a dyn Any) -> Result<&'a dyn Any> + Send + Sync>;

/// Erased mutable-reference projection onto the mapped supertype
pub type UpcastMut = Arc<dyn for<'a> Fn(&'a mut dyn Any) -> Result<&'a mut dyn Any> + Send + Sync>;

/// How a runtime-specialized subtype exposes its mapped supertype.
///
/// The supertype's accessors are bound to the supertype, so every operation
/// on a specialized instance first projects the instance through this pair.
pub struct Upcast {
    pub(crate) by_ref: UpcastRef,
    pub(crate) by_mut: UpcastMut,
}

impl Upcast {
    fn new<T: Any, P: Any>(as_parent: fn(&T) -> &P, as_parent_mut: fn(&mut T) -> &mut P) -> Self {
        let by_ref: UpcastRef = Arc::new(move |object| {
            let object = object
                .downcast_ref::<T>()
                .ok_or_else(|| MappingError::Specialization {
                    message: format!(
                        "upcast bound to {}, got a different runtime type",
                        type_name::<T>()
                    ),
                })?;
            Ok(as_parent(object))
        });
        let by_mut: UpcastMut = Arc::new(move |object| {
            let object = object
                .downcast_mut::<T>()
                .ok_or_else(|| MappingError::Specialization {
                    message: format!(
                        "upcast bound to {}, got a different runtime type",
                        type_name::<T>()
                    ),
                })?;
            Ok(as_parent_mut(object))
        });
        Self { by_ref, by_mut }
    }
}

impl fmt::Debug for Upcast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Upcast")
    }
}

/// The immutable capability table of one participating type
#[derive(Debug)]
pub struct TypeInfo {
    token: TypeToken,
    properties: Vec<PropertyAccessor>,
    declarations: Vec<MappingDeclaration>,
    constructor: Option<fn() -> Value>,
    superclass: Option<fn() -> &'static TypeInfo>,
    specialized: bool,
    upcast: Option<Upcast>,
}

impl TypeInfo {
    /// Start building the table for `T`
    pub fn of<T: Any>() -> TypeInfoBuilder<T> {
        TypeInfoBuilder {
            info: TypeInfo {
                token: TypeToken::of::<T>(),
                properties: Vec::new(),
                declarations: Vec::new(),
                constructor: None,
                superclass: None,
                specialized: false,
                upcast: None,
            },
            _type: std::marker::PhantomData,
        }
    }

    pub fn token(&self) -> TypeToken {
        self.token
    }

    pub fn name(&self) -> &'static str {
        self.token.name()
    }

    /// Every named property, with whatever read/write capability it has
    pub fn properties(&self) -> &[PropertyAccessor] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyAccessor> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn declarations(&self) -> &[MappingDeclaration] {
        &self.declarations
    }

    pub fn constructor(&self) -> Option<fn() -> Value> {
        self.constructor
    }

    pub fn superclass(&self) -> Option<&'static TypeInfo> {
        self.superclass.map(|f| f())
    }

    /// Whether this table describes a runtime-specialized subtype of another
    /// mapped type
    pub fn is_specialized(&self) -> bool {
        self.specialized
    }

    /// The projection onto the mapped supertype, present on specialized
    /// subtypes
    pub fn upcast(&self) -> Option<&Upcast> {
        self.upcast.as_ref()
    }
}

/// Builder for a [`TypeInfo`] capability table
pub struct TypeInfoBuilder<T> {
    info: TypeInfo,
    _type: std::marker::PhantomData<fn() -> T>,
}

impl<T: Any> TypeInfoBuilder<T> {
    pub fn property(mut self, accessor: PropertyAccessor) -> Self {
        self.info.properties.push(accessor);
        self
    }

    pub fn declare(mut self, declaration: MappingDeclaration) -> Self {
        self.info.declarations.push(declaration);
        self
    }

    /// Register the default constructor, enabling `create_*` operations
    pub fn constructible(mut self) -> Self
    where
        T: Default + fmt::Debug + Clone + Send,
    {
        self.info.constructor = Some(|| Box::new(T::default()));
        self
    }

    /// Declare a plain superclass; inherited field declarations are picked up
    /// by the parser
    pub fn extends(mut self, parent: fn() -> &'static TypeInfo) -> Self {
        self.info.superclass = Some(parent);
        self
    }

    /// Mark this type as a runtime-specialized subtype of `parent`: cache
    /// lookups fall back to the parent instead of re-parsing, and operations
    /// on instances go through the supplied projections to reach the parent's
    /// accessors.
    pub fn specializes<P: Any>(
        mut self,
        parent: fn() -> &'static TypeInfo,
        as_parent: fn(&T) -> &P,
        as_parent_mut: fn(&mut T) -> &mut P,
    ) -> Self {
        self.info.superclass = Some(parent);
        self.info.specialized = true;
        self.info.upcast = Some(Upcast::new(as_parent, as_parent_mut));
        self
    }

    pub fn build(self) -> TypeInfo {
        self.info
    }
}

/// Types that expose a capability table to the mapping engine
pub trait Reflected: Any {
    fn type_info() -> &'static TypeInfo
    where
        Self: Sized;
}
