//! Propmap Core - Declarative property mapping between structured types
//!
//! This crate compiles per-property mapping declarations into reusable
//! transformers. Declarations are parsed into a verified model once per
//! target type, converter chains are type-checked before any value moves,
//! and each (target, source) pair is specialized into a shared execution
//! plan that copies properties in both directions.
//!
//! # Main Components
//!
//! - **Error Handling**: Comprehensive error types using `thiserror` and `anyhow`
//! - **Core Types**: Capability tables, property accessors, and mapping declarations
//! - **Converters**: Typed conversion steps, chain verification, and chain execution
//! - **Mapping Model**: The declaration parser and the parsed-model cache
//! - **Transformers**: Specialized, cached property copiers per type pair
//!
//! # Example
//!
//! ```no_run
//! use propmap_core::{get_transformer, Reflected, Result, TypeInfo};
//! # use std::sync::OnceLock;
//!
//! #[derive(Debug, Default, Clone)]
//! struct Source { name: String }
//!
//! #[derive(Debug, Default, Clone)]
//! struct Target { name: String }
//!
//! impl Reflected for Source {
//!     fn type_info() -> &'static TypeInfo {
//!         static INFO: OnceLock<TypeInfo> = OnceLock::new();
//!         INFO.get_or_init(|| {
//!             TypeInfo::of::<Source>()
//!                 .property(propmap_core::PropertyAccessor::read_write(
//!                     "name",
//!                     |s: &Source| s.name.clone(),
//!                     |s: &mut Source, v: String| s.name = v,
//!                 ))
//!                 .constructible()
//!                 .build()
//!         })
//!     }
//! }
//!
//! impl Reflected for Target {
//!     fn type_info() -> &'static TypeInfo {
//!         static INFO: OnceLock<TypeInfo> = OnceLock::new();
//!         INFO.get_or_init(|| {
//!             TypeInfo::of::<Target>()
//!                 .property(propmap_core::PropertyAccessor::read_write(
//!                     "name",
//!                     |t: &Target| t.name.clone(),
//!                     |t: &mut Target, v: String| t.name = v,
//!                 ))
//!                 .declare(propmap_core::MappingDeclaration::on_field::<Source>(
//!                     "name", "name",
//!                 ))
//!                 .constructible()
//!                 .build()
//!         })
//!     }
//! }
//!
//! fn example() -> Result<()> {
//!     let transformer = get_transformer::<Target, Source>()?;
//!     let source = Source { name: "Ann".to_string() };
//!     let target = transformer.create_target_from(&source)?;
//!     assert_eq!(target.name, "Ann");
//!     Ok(())
//! }
//! ```

pub mod converter;
pub mod error;
pub mod mapping;
pub mod transform;
pub mod types;

// Re-export main types for convenience
pub use error::{ErrorKind, MappingError, Result};
pub use types::{
    // Identity and values
    PropertyValue, TypeToken, Value,

    // Capability tables
    Reflected, TypeInfo, TypeInfoBuilder,

    // Accessors and declarations
    DeclarationSite, Getter, MappingDeclaration, PropertyAccessor, Setter,

    // Specialized-subtype projections
    Upcast, UpcastMut, UpcastRef,
};
pub use converter::{
    ConversionMethod, Converter, ConverterChain, ConverterFactory, ConverterType, DynConverter,
    IdentityConverter,
};
pub use mapping::{BeanMappingInfo, MappingInfoCache, MappingInfoItem};
pub use transform::{evict_transformer, get_transformer, Transformer, TransformerPlan};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
