//! Converter model and introspection
//!
//! A converter is a single-input, single-output conversion step. The engine
//! works with [`ConverterType`] descriptors: enough metadata to verify a
//! chain's type flow before any value moves (the declared conversion method
//! and its input/output types) plus a factory that builds the erased runtime
//! instance. Identity-shaped converters, which pass a value through without
//! fixing its type, are an explicit tagged case rather than something
//! inferred from type parameters.
//!
//! Copyright (c) 2025 Propmap Team
//! Licensed under the MIT OR Apache-2.0 license

pub mod builtin;
mod chain;

pub use chain::ConverterChain;

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;

use crate::error::{MappingError, Result};
use crate::types::{PropertyValue, TypeToken, Value};

/// A typed conversion step
pub trait Converter: Send + Sync + 'static {
    type Input: Any + fmt::Debug + Clone + Send;
    type Output: Any + fmt::Debug + Clone + Send;

    fn convert(&self, input: Self::Input) -> anyhow::Result<Self::Output>;
}

/// A pass-through conversion step whose output type is its input type.
///
/// Identity converters are elided from chain type-flow verification (they
/// carry no fixed concrete type to check) but still run inside the chain.
pub trait IdentityConverter: Send + Sync + 'static {
    fn pass(&self, value: &dyn PropertyValue) -> anyhow::Result<Value> {
        Ok(value.clone_boxed())
    }
}

/// A constructed, type-erased converter instance
pub type DynConverter = Box<dyn Fn(&dyn PropertyValue) -> anyhow::Result<Value> + Send + Sync>;

/// Builds a fresh [`DynConverter`]; the parameterless-constructor analogue
pub type ConverterFactory = Arc<dyn Fn() -> anyhow::Result<DynConverter> + Send + Sync>;

/// One conversion-method candidate exposed by a converter type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConversionMethod {
    /// A method with fixed input and output types. `bridge` marks erased
    /// adapter signatures that lose the overload-resolution tie-break.
    Typed {
        input: TypeToken,
        output: TypeToken,
        bridge: bool,
    },
    /// An identity-shaped method, generic over `bound`
    Identity { bound: TypeToken },
}

impl ConversionMethod {
    fn is_bridge(&self) -> bool {
        matches!(self, ConversionMethod::Typed { bridge: true, .. })
    }
}

/// Descriptor of a converter type: its conversion-method candidates and the
/// factory standing in for its parameterless constructor.
///
/// Equality and hashing are structural over the name and the method list; the
/// factory is never compared.
#[derive(Clone)]
pub struct ConverterType {
    name: &'static str,
    methods: Vec<ConversionMethod>,
    factory: Option<ConverterFactory>,
}

fn erase<C: Converter>(converter: C) -> DynConverter {
    Box::new(move |value: &dyn PropertyValue| {
        let input = value
            .as_any()
            .downcast_ref::<C::Input>()
            .ok_or_else(|| {
                anyhow!(
                    "{} expects {}, got a value of type {}",
                    type_name::<C>(),
                    type_name::<C::Input>(),
                    value.type_token()
                )
            })?
            .clone();
        let output = converter.convert(input)?;
        Ok(Box::new(output) as Value)
    })
}

impl ConverterType {
    /// Descriptor for a typed converter with an infallible constructor
    pub fn of<C: Converter + Default>() -> Self {
        Self {
            name: type_name::<C>(),
            methods: vec![ConversionMethod::Typed {
                input: TypeToken::of::<C::Input>(),
                output: TypeToken::of::<C::Output>(),
                bridge: false,
            }],
            factory: Some(Arc::new(|| Ok(erase(C::default())))),
        }
    }

    /// Descriptor for a typed converter whose construction may fail
    pub fn constructed_by<C: Converter>(constructor: fn() -> anyhow::Result<C>) -> Self {
        Self {
            name: type_name::<C>(),
            methods: vec![ConversionMethod::Typed {
                input: TypeToken::of::<C::Input>(),
                output: TypeToken::of::<C::Output>(),
                bridge: false,
            }],
            factory: Some(Arc::new(move || Ok(erase(constructor()?)))),
        }
    }

    /// Descriptor for an identity-shaped converter bounded by the universal
    /// type
    pub fn identity<C: IdentityConverter + Default>() -> Self {
        Self {
            name: type_name::<C>(),
            methods: vec![ConversionMethod::Identity {
                bound: TypeToken::universal(),
            }],
            factory: Some(Arc::new(|| {
                let converter = C::default();
                Ok(Box::new(move |value: &dyn PropertyValue| converter.pass(value)) as DynConverter)
            })),
        }
    }

    /// Descriptor assembled from raw parts, for adapters around foreign
    /// converter shapes: overloaded method sets, narrowed identity bounds, or
    /// missing constructors.
    pub fn from_parts(
        name: &'static str,
        methods: Vec<ConversionMethod>,
        factory: Option<ConverterFactory>,
    ) -> Self {
        Self {
            name,
            methods,
            factory,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Locate the single conversion method of this converter type.
    ///
    /// A lone candidate wins outright. Among several, bridge signatures are
    /// excluded first; exactly one survivor wins, none falls back to the
    /// first candidate, and several is ambiguous.
    pub fn conversion_method(&self) -> Result<ConversionMethod> {
        match self.methods.len() {
            0 => Err(MappingError::NoConvertMethod {
                converter: self.name.to_string(),
            }),
            1 => Ok(self.methods[0]),
            _ => {
                let mut overrides = self.methods.iter().filter(|m| !m.is_bridge());
                match (overrides.next(), overrides.next()) {
                    (None, _) => Ok(self.methods[0]),
                    (Some(method), None) => Ok(*method),
                    (Some(_), Some(_)) => Err(MappingError::DuplicateConvertMethod {
                        converter: self.name.to_string(),
                    }),
                }
            }
        }
    }

    /// Build a runtime instance through the registered factory
    pub fn construct(&self) -> Result<DynConverter> {
        let factory = self
            .factory
            .as_ref()
            .ok_or_else(|| MappingError::ConverterNotConstructible {
                converter: self.name.to_string(),
            })?;
        factory().map_err(|cause| MappingError::ConverterConstructionFailed {
            converter: self.name.to_string(),
            cause,
        })
    }
}

impl fmt::Debug for ConverterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterType")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .field("constructible", &self.factory.is_some())
            .finish()
    }
}

impl PartialEq for ConverterType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.methods == other.methods
    }
}

impl Eq for ConverterType {}

impl std::hash::Hash for ConverterType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.methods.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[derive(Debug, Default, Clone)]
    struct StringToLen;

    impl Converter for StringToLen {
        type Input = String;
        type Output = usize;

        fn convert(&self, input: String) -> anyhow::Result<usize> {
            Ok(input.len())
        }
    }

    #[derive(Debug, Default, Clone)]
    struct Tracer;

    impl IdentityConverter for Tracer {}

    #[test]
    fn test_typed_descriptor() {
        let descriptor = ConverterType::of::<StringToLen>();
        let method = descriptor.conversion_method().unwrap();
        assert_eq!(
            method,
            ConversionMethod::Typed {
                input: TypeToken::of::<String>(),
                output: TypeToken::of::<usize>(),
                bridge: false,
            }
        );
    }

    #[test]
    fn test_constructed_instance_converts() {
        let descriptor = ConverterType::of::<StringToLen>();
        let instance = descriptor.construct().unwrap();
        let output = instance(&"hello".to_string()).unwrap();
        assert_eq!(*output.into_any().downcast::<usize>().unwrap(), 5);
    }

    #[test]
    fn test_constructed_instance_rejects_wrong_input_type() {
        let descriptor = ConverterType::of::<StringToLen>();
        let instance = descriptor.construct().unwrap();
        let err = instance(&42_i64).unwrap_err();
        assert!(err.to_string().contains("expects"));
    }

    #[test]
    fn test_identity_descriptor_passes_value_through() {
        let descriptor = ConverterType::identity::<Tracer>();
        assert_eq!(
            descriptor.conversion_method().unwrap(),
            ConversionMethod::Identity {
                bound: TypeToken::universal(),
            }
        );
        let instance = descriptor.construct().unwrap();
        let output = instance(&"kept".to_string()).unwrap();
        assert_eq!(
            output.into_any().downcast::<String>().unwrap().as_str(),
            "kept"
        );
    }

    #[test]
    fn test_no_conversion_method() {
        let descriptor = ConverterType::from_parts("Hollow", vec![], None);
        let err = descriptor.conversion_method().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoConvertMethod);
    }

    #[test]
    fn test_bridge_noise_is_excluded() {
        let typed = ConversionMethod::Typed {
            input: TypeToken::of::<String>(),
            output: TypeToken::of::<usize>(),
            bridge: false,
        };
        let bridge = ConversionMethod::Typed {
            input: TypeToken::universal(),
            output: TypeToken::universal(),
            bridge: true,
        };
        let descriptor = ConverterType::from_parts("Bridged", vec![bridge, typed], None);
        assert_eq!(descriptor.conversion_method().unwrap(), typed);

        // Only bridges left: the first candidate wins.
        let descriptor = ConverterType::from_parts("AllBridges", vec![bridge, bridge], None);
        assert_eq!(descriptor.conversion_method().unwrap(), bridge);
    }

    #[test]
    fn test_duplicate_conversion_method() {
        let first = ConversionMethod::Typed {
            input: TypeToken::of::<String>(),
            output: TypeToken::of::<usize>(),
            bridge: false,
        };
        let second = ConversionMethod::Typed {
            input: TypeToken::of::<usize>(),
            output: TypeToken::of::<String>(),
            bridge: false,
        };
        let descriptor = ConverterType::from_parts("Overloaded", vec![first, second], None);
        let err = descriptor.conversion_method().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateConvertMethod);
    }

    #[test]
    fn test_missing_constructor() {
        let method = ConversionMethod::Typed {
            input: TypeToken::of::<String>(),
            output: TypeToken::of::<String>(),
            bridge: false,
        };
        let descriptor = ConverterType::from_parts("NoCtor", vec![method], None);
        let err = descriptor.construct().map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConverterNotConstructible);
    }

    #[test]
    fn test_failing_constructor() {
        let descriptor =
            ConverterType::constructed_by::<StringToLen>(|| Err(anyhow!("refused to start")));
        let err = descriptor.construct().map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConverterConstructionFailed);
    }

    #[test]
    fn test_structural_equality_ignores_factory() {
        let a = ConverterType::of::<StringToLen>();
        let b = ConverterType::constructed_by::<StringToLen>(|| Ok(StringToLen));
        assert_eq!(a, b);
        assert_ne!(a, ConverterType::identity::<Tracer>());
    }
}
