//! Converter chain runtime
//!
//! Copyright (c) 2025 Propmap Team
//! Licensed under the MIT OR Apache-2.0 license

use std::fmt;

use crate::error::{MappingError, Result};
use crate::types::Value;

use super::{ConverterType, DynConverter};

struct Link {
    name: &'static str,
    convert: DynConverter,
}

/// An ordered pipeline of constructed converter instances.
///
/// Chains are materialized once per transformer and reused across calls, so
/// no converter is allocated on the hot path. Identity-shaped converters are
/// part of the runtime pipeline even though the type-flow verifier skips
/// them.
pub struct ConverterChain {
    links: Vec<Link>,
}

impl ConverterChain {
    /// Construct every converter of the chain through its factory
    pub fn materialize(types: &[ConverterType]) -> Result<Self> {
        let mut links = Vec::with_capacity(types.len());
        for converter_type in types {
            links.push(Link {
                name: converter_type.name(),
                convert: converter_type.construct()?,
            });
        }
        Ok(Self { links })
    }

    /// Feed `input` through each converter in order.
    ///
    /// Any converter failure aborts the chain with
    /// [`MappingError::ConversionFailed`] carrying the converter's identity,
    /// the value it was given, and the underlying cause. No partial result is
    /// returned.
    pub fn apply(&self, input: Value) -> Result<Value> {
        let mut value = input;
        for link in &self.links {
            value = match (link.convert)(value.as_ref()) {
                Ok(next) => next,
                Err(cause) => {
                    return Err(MappingError::ConversionFailed {
                        converter: link.name.to_string(),
                        value: format!("{value:?}"),
                        cause,
                    })
                }
            };
        }
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl fmt::Debug for ConverterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.links.iter().map(|link| link.name))
            .finish()
    }
}
