//! Combined views: two models of the same traits read as one.
//!
//! For every stratum id present on both sides, the combined stratum is the
//! two raw strata merged with `top` winning; nested objects and array
//! elements are merged the same way, recursively. Every write lands in the
//! `top` model only.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;
use strata_traits::{ElementKey, IdProperty, StratumData, StratumValue, TraitKind, TraitsClass};

use crate::error::DeveloperError;
use crate::source::{ResolutionCache, StrataSource};
use crate::stratum::Stratum;


struct MergedStratum {
	top_version: u64,
	bottom_version: u64,
	data: StratumData,
}

struct CombinedInner {
	top: Arc<dyn StrataSource>,
	bottom: Arc<dyn StrataSource>,
	merged: Mutex<HashMap<String, MergedStratum>>,
	cache: ResolutionCache,
}

/// A read/write facade over `top` layered onto `bottom`.
#[derive(Clone)]
pub struct CombinedModel(Arc<CombinedInner>);

impl CombinedModel {
	/// Combines two sources.
	///
	/// # Errors
	///
	/// Fails unless both sides share the same traits class instance.
	pub fn new(top: Arc<dyn StrataSource>, bottom: Arc<dyn StrataSource>) -> Result<Self, DeveloperError> {
		if !Arc::ptr_eq(top.traits(), bottom.traits()) {
			return Err(DeveloperError::TraitsMismatch {
				top: top.traits().name().to_string(),
				bottom: bottom.traits().name().to_string(),
			});
		}
		Ok(Self(Arc::new(CombinedInner {
			top,
			bottom,
			merged: Mutex::new(HashMap::default()),
			cache: ResolutionCache::default(),
		})))
	}

	pub fn top(&self) -> &Arc<dyn StrataSource> {
		&self.0.top
	}

	pub fn bottom(&self) -> &Arc<dyn StrataSource> {
		&self.0.bottom
	}

	fn merged(&self, id: &str, top: StratumData, bottom: StratumData) -> StratumData {
		let top_version = self.0.top.version();
		let bottom_version = self.0.bottom.version();
		let mut merged = self.0.merged.lock();
		if let Some(hit) = merged.get(id)
			&& hit.top_version == top_version
			&& hit.bottom_version == bottom_version
		{
			return hit.data.clone();
		}
		let data = merge_strata(self.traits(), &top, &bottom);
		merged.insert(
			id.to_string(),
			MergedStratum {
				top_version,
				bottom_version,
				data: data.clone(),
			},
		);
		data
	}
}

impl StrataSource for CombinedModel {
	fn traits(&self) -> &Arc<TraitsClass> {
		self.0.top.traits()
	}

	fn stratum_ids(&self) -> Vec<String> {
		let mut ids = self.0.top.stratum_ids();
		for id in self.0.bottom.stratum_ids() {
			if !ids.contains(&id) {
				ids.push(id);
			}
		}
		ids
	}

	fn stratum(&self, id: &str) -> Option<StratumData> {
		match (self.0.top.stratum(id), self.0.bottom.stratum(id)) {
			(Some(top), Some(bottom)) => Some(self.merged(id, top, bottom)),
			(top, bottom) => top.or(bottom),
		}
	}

	fn update_stratum(&self, id: &str, f: &mut dyn FnMut(&mut StratumData)) -> Result<(), DeveloperError> {
		self.0.top.update_stratum(id, f)
	}

	fn install_stratum(&self, id: &str, stratum: Stratum) -> Result<(), DeveloperError> {
		self.0.top.install_stratum(id, stratum)
	}

	fn version(&self) -> u64 {
		self.0.top.version().wrapping_add(self.0.bottom.version())
	}

	fn resolution_cache(&self) -> Option<&ResolutionCache> {
		Some(&self.0.cache)
	}
}

impl fmt::Debug for CombinedModel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CombinedModel")
			.field("traits", &self.traits().name())
			.field("strata", &self.stratum_ids())
			.finish()
	}
}

/// Merges two raw strata of `class`, `top` winning per key.
///
/// Keys keep `bottom`'s order, followed by keys only `top` sets.
pub fn merge_strata(class: &TraitsClass, top: &StratumData, bottom: &StratumData) -> StratumData {
	let mut out = StratumData::new();
	for (name, bottom_value) in bottom.iter() {
		let value = match top.get(name) {
			Some(top_value) => merge_value(class, name, top_value, bottom_value),
			None => bottom_value.clone(),
		};
		out.set(name, value);
	}
	for (name, top_value) in top.iter() {
		if !bottom.contains(name) {
			out.set(name, top_value.clone());
		}
	}
	out
}

fn merge_value(class: &TraitsClass, name: &str, top: &StratumValue, bottom: &StratumValue) -> StratumValue {
	let kind = class.get(name).map(|def| &def.kind);
	match (kind, top, bottom) {
		(Some(TraitKind::Object(nested)), StratumValue::Object(t), StratumValue::Object(b)) => {
			StratumValue::Object(merge_strata(nested, t, b))
		}
		(
			Some(TraitKind::ObjectArray {
				class: nested,
				id_property,
				..
			}),
			StratumValue::ObjectArray(t),
			StratumValue::ObjectArray(b),
		) => StratumValue::ObjectArray(merge_elements(nested, id_property, t, b)),
		_ => top.clone(),
	}
}

fn merge_elements(class: &TraitsClass, id_property: &IdProperty, top: &[StratumData], bottom: &[StratumData]) -> Vec<StratumData> {
	let top_keys: Vec<ElementKey> = top
		.iter()
		.enumerate()
		.map(|(i, e)| ElementKey::of(id_property, e, i))
		.collect();
	let mut used = vec![false; top.len()];
	let mut out = Vec::with_capacity(top.len().max(bottom.len()));
	for (i, element) in bottom.iter().enumerate() {
		let key = ElementKey::of(id_property, element, i);
		match top_keys.iter().position(|k| *k == key) {
			Some(j) => {
				used[j] = true;
				out.push(merge_strata(class, &top[j], element));
			}
			None => out.push(element.clone()),
		}
	}
	out.extend(
		top.iter()
			.zip(used)
			.filter(|(_, used)| !used)
			.map(|(e, _)| e.clone()),
	);
	out
}
