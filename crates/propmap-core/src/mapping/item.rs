//! Verified per-property mapping entries
//!
//! Copyright (c) 2025 Propmap Team
//! Licensed under the MIT OR Apache-2.0 license

use crate::converter::{ConversionMethod, ConverterType};
use crate::error::{MappingError, Result};
use crate::types::{PropertyAccessor, TypeToken};

/// The verified unit of mapping: one source property, one target property,
/// and the converter chains bridging them in each direction.
///
/// Every invariant is enforced at construction, so holding a
/// `MappingInfoItem` is proof the entry is sound: both accessors are present
/// and fully readable plus writable, endpoint types are equal whenever either
/// chain is empty, and each non-empty chain is type-consistent end to end.
/// Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MappingInfoItem {
    source_property: PropertyAccessor,
    target_property: PropertyAccessor,
    to_target_chain: Vec<ConverterType>,
    to_source_chain: Vec<ConverterType>,
}

impl MappingInfoItem {
    /// Build and verify a mapping entry.
    ///
    /// The accessors arrive as options so a missing side reports
    /// `SourceIsNull`/`TargetIsNull` instead of being unrepresentable only in
    /// the parser's happy path.
    pub fn new(
        source_property: Option<PropertyAccessor>,
        target_property: Option<PropertyAccessor>,
        to_target_chain: Vec<ConverterType>,
        to_source_chain: Vec<ConverterType>,
    ) -> Result<Self> {
        let source_property = source_property.ok_or(MappingError::SourceIsNull)?;
        let target_property = target_property.ok_or(MappingError::TargetIsNull)?;

        verify_accessor(&source_property)?;
        verify_accessor(&target_property)?;

        if to_source_chain.is_empty() || to_target_chain.is_empty() {
            let source_type = source_property.value_type();
            let target_type = target_property.value_type();
            if source_type != target_type {
                return Err(MappingError::PropertyTypeIsDifferent {
                    source_type: source_type.name().to_string(),
                    target_type: target_type.name().to_string(),
                });
            }
        }

        verify_chain(&to_source_chain, &target_property, &source_property)?;
        verify_chain(&to_target_chain, &source_property, &target_property)?;

        Ok(Self {
            source_property,
            target_property,
            to_target_chain,
            to_source_chain,
        })
    }

    pub fn source_property(&self) -> &PropertyAccessor {
        &self.source_property
    }

    pub fn target_property(&self) -> &PropertyAccessor {
        &self.target_property
    }

    pub fn to_target_chain(&self) -> &[ConverterType] {
        &self.to_target_chain
    }

    pub fn to_source_chain(&self) -> &[ConverterType] {
        &self.to_source_chain
    }
}

fn verify_accessor(accessor: &PropertyAccessor) -> Result<()> {
    if accessor.getter().is_none() {
        return Err(MappingError::GetMethodIsNull {
            property: accessor.name().to_string(),
        });
    }
    if accessor.setter().is_none() {
        return Err(MappingError::SetMethodIsNull {
            property: accessor.name().to_string(),
        });
    }
    Ok(())
}

/// Type-flow analysis over one converter chain.
///
/// Walks the chain from `from_property` toward `to_property`, requiring each
/// visited converter's input to be assignable from the type provided so far,
/// and finally the chain's output to be assignable to the destination.
/// Identity-shaped converters are constructibility-checked and then skipped:
/// they carry no fixed concrete type, provided their bound is the universal
/// type.
fn verify_chain(
    chain: &[ConverterType],
    from_property: &PropertyAccessor,
    to_property: &PropertyAccessor,
) -> Result<()> {
    if chain.is_empty() {
        // Direct assignment; the endpoint-type check is the caller's.
        return Ok(());
    }

    let mut iter = chain.iter();
    let mut provided = from_property.value_type();

    if let Some((converter, input, output)) = next_type_changing(&mut iter)? {
        if !input.is_assignable_from(&provided) {
            return Err(MappingError::ChainInputMismatch {
                converter: converter.name().to_string(),
                provided: provided.name().to_string(),
                expected: input.name().to_string(),
            });
        }
        provided = output;

        while let Some((converter, input, output)) = next_type_changing(&mut iter)? {
            if !input.is_assignable_from(&provided) {
                return Err(MappingError::ChainNotMatchPrevious {
                    converter: converter.name().to_string(),
                    provided: provided.name().to_string(),
                    expected: input.name().to_string(),
                });
            }
            provided = output;
        }
    }

    let expected = to_property.value_type();
    if !expected.is_assignable_from(&provided) {
        return Err(MappingError::ChainReturnMismatch {
            provided: provided.name().to_string(),
            expected: expected.name().to_string(),
        });
    }
    Ok(())
}

/// Advance to the next converter that fixes its input/output types, eliding
/// identity-shaped converters along the way. Every converter seen, elided or
/// not, has its conversion method resolved and its constructibility checked.
fn next_type_changing<'a>(
    iter: &mut std::slice::Iter<'a, ConverterType>,
) -> Result<Option<(&'a ConverterType, TypeToken, TypeToken)>> {
    for converter in iter {
        match converter.conversion_method()? {
            ConversionMethod::Identity { bound } => {
                if !bound.is_universal() {
                    return Err(MappingError::GenericBoundNotUniversal {
                        converter: converter.name().to_string(),
                        bound: bound.name().to_string(),
                    });
                }
                converter.construct()?;
            }
            ConversionMethod::Typed { input, output, .. } => {
                converter.construct()?;
                return Ok(Some((converter, input, output)));
            }
        }
    }
    Ok(None)
}
