//! Mapping model: parsing, verification, and the parsed-model cache
//!
//! Copyright (c) 2025 Propmap Team
//! Licensed under the MIT OR Apache-2.0 license

mod cache;
mod item;
mod model;

pub(crate) use cache::resolve;
pub use cache::MappingInfoCache;
pub use item::MappingInfoItem;
pub use model::BeanMappingInfo;
