//! Layered model resolution.
//!
//! A [`Model`] stores one [`StratumData`](strata_traits::StratumData) bag per
//! stratum id. Reading a trait scans the strata from highest to lowest
//! priority, as ordered by the process-wide [`StratumOrder`], and returns the
//! first value set, falling back to the trait default.
//!
//! - [`order`] - Stratum priority bands and sorting
//! - [`stratum`] - Plain and loadable strata
//! - [`access`] - Resolution and stratum writes for every view
//! - [`combined`] - Two models read as one
//! - [`json`] - Stratum-by-stratum JSON
//! - [`catalog`] - Model types, live models and share keys
//! - [`capability`] - Group, reference and URL views
//! - [`config`] - Startup registration of stratum ids

pub mod access;
pub mod capability;
pub mod catalog;
pub mod combined;
pub mod config;
mod containers;
mod duplicate;
mod error;
pub mod json;
mod model;
mod nested;
pub mod order;
mod resolve;
mod source;
pub mod stratum;

pub use access::{ModelAccess, ResolvedValue};
pub use capability::{Capability, CapabilitySet, GroupView, ReferenceView, UrlView};
pub use catalog::Catalog;
pub use combined::CombinedModel;
pub use config::{ConfigError, StrataConfig};
pub use error::{DeveloperError, ModelError, Report};
pub use json::{SaveOptions, save_model_to_json, update_model_from_json};
pub use model::{Model, ModelType};
pub use nested::NestedModel;
pub use order::{Band, StratumOrder};
pub use source::{ResolutionCache, StrataSource};
pub use stratum::{LoadableStratum, Stratum};
