//! Mapping model and declaration parser
//!
//! Turns the scattered per-property declarations of a target type into one
//! normalized, verified mapping table, grouped by source type.
//!
//! Copyright (c) 2025 Propmap Team
//! Licensed under the MIT OR Apache-2.0 license

use std::collections::{HashMap, HashSet};

use crate::error::{MappingError, Result};
use crate::types::{DeclarationSite, MappingDeclaration, TypeInfo, TypeToken};

use super::item::MappingInfoItem;

/// The parsed and verified mapping model of one target type.
///
/// Created once per target type and never mutated after construction
/// (parse-then-freeze); shared by all callers through the mapping info cache.
#[derive(Debug)]
pub struct BeanMappingInfo {
    target: TypeToken,
    mappings_by_source: HashMap<TypeToken, HashSet<MappingInfoItem>>,
}

impl BeanMappingInfo {
    /// Parse every mapping declaration of `target` into a verified model.
    ///
    /// Field-site declarations are collected along the superclass chain and
    /// must name a real property of the target type. Accessor-site
    /// declarations may sit on a property's getter or setter but not both,
    /// and a property configured at both a field site and an accessor site is
    /// rejected: a property is configured exactly once. Each declaration's
    /// source property is then resolved and the resulting entry verified; the
    /// first failure aborts the whole parse.
    pub fn parse(target: &'static TypeInfo) -> Result<Self> {
        let field_declared = collect_field_declarations(target)?;
        let accessor_declared = collect_accessor_declarations(target)?;

        for property in field_declared.keys() {
            if accessor_declared.contains_key(property) {
                return Err(MappingError::DuplicateDeclaration {
                    property: property.to_string(),
                    target: target.name().to_string(),
                });
            }
        }

        let mut mappings_by_source: HashMap<TypeToken, HashSet<MappingInfoItem>> = HashMap::new();
        for (property, declaration) in field_declared.into_iter().chain(accessor_declared) {
            let target_property = target.property(property).cloned();

            let source_info = declaration.source_type();
            let source_property = source_info
                .property(declaration.source_property())
                .cloned()
                .ok_or_else(|| MappingError::SourcePropertyNotFound {
                    property: declaration.source_property().to_string(),
                    source_type: source_info.name().to_string(),
                })?;

            let item = MappingInfoItem::new(
                Some(source_property),
                target_property,
                declaration.to_target_chain().to_vec(),
                declaration.to_source_chain().to_vec(),
            )?;

            mappings_by_source
                .entry(source_info.token())
                .or_default()
                .insert(item);
        }

        log::debug!(
            "parsed mapping model for {}: {} source type(s)",
            target.name(),
            mappings_by_source.len()
        );

        Ok(Self {
            target: target.token(),
            mappings_by_source,
        })
    }

    pub fn target(&self) -> TypeToken {
        self.target
    }

    /// The verified entries mapping from `source`, if any are declared
    pub fn items_for(&self, source: &TypeToken) -> Option<&HashSet<MappingInfoItem>> {
        self.mappings_by_source.get(source)
    }

    pub fn mappings_by_source(&self) -> &HashMap<TypeToken, HashSet<MappingInfoItem>> {
        &self.mappings_by_source
    }
}

/// Field-site declarations along the superclass chain, keyed by target
/// property name. A declared field with no matching property is an error.
fn collect_field_declarations(
    target: &'static TypeInfo,
) -> Result<HashMap<&'static str, MappingDeclaration>> {
    let mut declared: HashMap<&'static str, MappingDeclaration> = HashMap::new();
    let mut current = Some(target);
    while let Some(info) = current {
        for declaration in info.declarations() {
            let DeclarationSite::Field(field) = declaration.site() else {
                continue;
            };
            if target.property(field).is_none() {
                return Err(MappingError::FieldNotAProperty {
                    field: field.to_string(),
                    target: target.name().to_string(),
                });
            }
            if declared.insert(field, declaration.clone()).is_some() {
                return Err(MappingError::DuplicateDeclaration {
                    property: field.to_string(),
                    target: target.name().to_string(),
                });
            }
        }
        current = info.superclass();
    }
    Ok(declared)
}

/// Accessor-site declarations along the superclass chain. Per property, the
/// declaration may sit on the getter or on the setter, never on both.
fn collect_accessor_declarations(
    target: &'static TypeInfo,
) -> Result<HashMap<&'static str, MappingDeclaration>> {
    let mut getter_declared: HashMap<&'static str, MappingDeclaration> = HashMap::new();
    let mut setter_declared: HashMap<&'static str, MappingDeclaration> = HashMap::new();

    let mut current = Some(target);
    while let Some(info) = current {
        for declaration in info.declarations() {
            let slot = match declaration.site() {
                DeclarationSite::Getter(property) => getter_declared.entry(property),
                DeclarationSite::Setter(property) => setter_declared.entry(property),
                DeclarationSite::Field(_) => continue,
            };
            let property = *slot.key();
            if target.property(property).is_none() {
                return Err(MappingError::FieldNotAProperty {
                    field: property.to_string(),
                    target: target.name().to_string(),
                });
            }
            match slot {
                std::collections::hash_map::Entry::Occupied(_) => {
                    return Err(MappingError::DuplicateDeclaration {
                        property: property.to_string(),
                        target: target.name().to_string(),
                    });
                }
                std::collections::hash_map::Entry::Vacant(vacant) => {
                    vacant.insert(declaration.clone());
                }
            }
        }
        current = info.superclass();
    }

    let mut declared = getter_declared;
    for (property, declaration) in setter_declared {
        if declared.insert(property, declaration).is_some() {
            return Err(MappingError::DuplicateDeclaration {
                property: property.to_string(),
                target: target.name().to_string(),
            });
        }
    }
    Ok(declared)
}
