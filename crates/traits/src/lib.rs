//! Trait registry for layered catalog models.
//!
//! A [`TraitsClass`] is the static trait table of one model type. Each
//! stratum of a model stores a [`StratumData`] bag holding values for
//! whichever traits it chooses to set.
//!
//! - [`def`] - Trait definitions, kinds and element identity
//! - [`class`] - Traits classes and their builder
//! - [`value`] - Raw per-stratum values
//! - [`json`] - Default JSON conversion

pub mod class;
pub mod def;
mod error;
pub mod json;
pub mod value;

pub use class::{RemovalFn, TraitsClass, TraitsClassBuilder};
pub use def::{
	ConversionContext, ElementKey, FromJsonFn, IdProperty, MergeStrategy, PrimitiveType, ToJsonFn,
	TraitDef, TraitKind,
};
pub use error::{TraitError, json_type_name};
pub use json::Converted;
pub use value::{StratumData, StratumValue};
