//! Strata: the layers a model resolves its traits from.

use std::fmt;
use std::sync::Arc;

use strata_traits::{StratumData, StratumValue, TraitsClass};

use crate::model::Model;

/// A read-only stratum whose trait values are derived on demand, typically
/// from a parsed server response.
///
/// Every getter returns `None` unless the implementation overrides it for a
/// trait. Loadable strata are never written in place; a loader replaces the
/// whole stratum, and local edits go to a higher-priority plain stratum.
pub trait LoadableStratum: Send + Sync + fmt::Debug {
	/// Returns the derived value of one trait.
	fn trait_value(&self, trait_name: &str) -> Option<StratumValue> {
		let _ = trait_name;
		None
	}

	/// Returns a copy bound to `new_owner` that shares the same derived source
	/// data. Implementations must not refetch anything.
	fn duplicate_loadable_stratum(&self, new_owner: &Model) -> anyhow::Result<Arc<dyn LoadableStratum>>;
}

/// One layer of a model.
#[derive(Clone, Debug)]
pub enum Stratum {
	/// Mutable stored values.
	Plain(StratumData),
	/// Computed values; writes are rejected.
	Loadable(Arc<dyn LoadableStratum>),
}

impl Stratum {
	pub fn loadable(stratum: impl LoadableStratum + 'static) -> Self {
		Stratum::Loadable(Arc::new(stratum))
	}

	pub fn is_loadable(&self) -> bool {
		matches!(self, Stratum::Loadable(_))
	}

	/// Reads one trait without materializing the whole stratum.
	pub fn value(&self, trait_name: &str) -> Option<StratumValue> {
		match self {
			Stratum::Plain(data) => data.get(trait_name).cloned(),
			Stratum::Loadable(loadable) => loadable.trait_value(trait_name),
		}
	}

	/// Returns the stored values, evaluating every trait of `class` for
	/// loadable strata.
	pub fn snapshot(&self, class: &TraitsClass) -> StratumData {
		match self {
			Stratum::Plain(data) => data.clone(),
			Stratum::Loadable(loadable) => class
				.trait_names()
				.filter_map(|name| loadable.trait_value(name).map(|v| (name, v)))
				.collect(),
		}
	}
}

impl From<StratumData> for Stratum {
	fn from(data: StratumData) -> Self {
		Stratum::Plain(data)
	}
}
