//! The seam every resolution view reads and writes through.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;
use serde_json::Value;
use strata_traits::{ElementKey, StratumData, StratumValue, TraitsClass};

use crate::error::DeveloperError;
use crate::stratum::Stratum;

/// A stack of strata sharing one traits class.
///
/// Implemented by root models, nested objects (whose strata live inside a
/// parent's strata) and combined views (whose strata merge two models).
/// Resolution is written once against this trait.
pub trait StrataSource: Send + Sync {
	/// The traits class shared by every stratum.
	fn traits(&self) -> &Arc<TraitsClass>;

	/// Ids of the strata present, in no particular order.
	fn stratum_ids(&self) -> Vec<String>;

	/// Snapshot of one stratum's raw values.
	fn stratum(&self, id: &str) -> Option<StratumData>;

	/// Raw value of one trait in one stratum.
	fn stratum_value(&self, id: &str, trait_name: &str) -> Option<StratumValue> {
		self.stratum(id)?.get(trait_name).cloned()
	}

	/// Mutates stratum `id`, creating it if absent.
	fn update_stratum(&self, id: &str, f: &mut dyn FnMut(&mut StratumData)) -> Result<(), DeveloperError>;

	/// Replaces stratum `id` wholesale.
	fn install_stratum(&self, id: &str, stratum: Stratum) -> Result<(), DeveloperError>;

	/// Change counter covering every stratum reachable from this source.
	/// Strictly increases on any mutation.
	fn version(&self) -> u64;

	/// Memoized resolutions, for sources that own their storage.
	fn resolution_cache(&self) -> Option<&ResolutionCache> {
		None
	}
}

#[derive(Debug, Clone)]
pub(crate) enum Cached {
	Primitive(Option<Value>),
	Elements(Vec<ElementKey>),
}

#[derive(Debug, Default)]
struct CacheState {
	version: u64,
	entries: HashMap<String, Cached>,
}

/// Resolved values of one model, valid for a single version.
///
/// Any stratum write bumps the model version, which drops every entry on the
/// next read.
#[derive(Debug, Default)]
pub struct ResolutionCache {
	state: Mutex<CacheState>,
}

impl ResolutionCache {
	pub(crate) fn get_or_insert_with(&self, version: u64, trait_name: &str, compute: impl FnOnce() -> Cached) -> Cached {
		{
			let mut state = self.state.lock();
			if state.version != version {
				tracing::trace!(
					domain = "model",
					from = state.version,
					to = version,
					dropped = state.entries.len(),
					"resolution cache invalidated",
				);
				state.entries.clear();
				state.version = version;
			}
			if let Some(hit) = state.entries.get(trait_name) {
				return hit.clone();
			}
		}

		let value = compute();
		let mut state = self.state.lock();
		if state.version == version {
			state.entries.insert(trait_name.to_string(), value.clone());
		}
		value
	}

	/// Number of memoized traits, for diagnostics.
	pub fn len(&self) -> usize {
		self.state.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
