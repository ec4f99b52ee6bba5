//! # lifeboat-model
//!
//! Shared domain and wire types for the lifeboat rescue platform.
//!
//! The ranking and dispatch services exchange ranked-asset lists and rescue
//! outcome reports over HTTP; both sides deserialize into the types defined
//! here so the wire contract lives in exactly one place. The crate is pure
//! data with no I/O and no runtime dependencies.

mod asset;
mod locator;
mod resource_type;

pub use asset::{RankedAsset, ReportedAsset, RescueStatus};
pub use locator::{validate_locator, LocatorError};
pub use resource_type::ResourceType;
