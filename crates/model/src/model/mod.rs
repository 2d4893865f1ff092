//! Root models: typed entities owning their strata.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use strata_traits::{StratumData, StratumValue, TraitsClass};

use crate::capability::CapabilitySet;
use crate::catalog::{Catalog, CatalogInner};
use crate::error::DeveloperError;
use crate::order::StratumOrder;
use crate::source::{ResolutionCache, StrataSource};
use crate::stratum::Stratum;

#[cfg(test)]
mod tests;

/// A concrete model type: a name, its traits and the capabilities its
/// instances expose.
#[derive(Debug, Clone)]
pub struct ModelType {
	name: String,
	traits: Arc<TraitsClass>,
	capabilities: CapabilitySet,
}

impl ModelType {
	pub fn new(name: impl Into<String>, traits: &Arc<TraitsClass>) -> Self {
		Self {
			name: name.into(),
			traits: traits.clone(),
			capabilities: CapabilitySet::empty(),
		}
	}

	pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
		self.capabilities |= capabilities;
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn traits(&self) -> &Arc<TraitsClass> {
		&self.traits
	}

	pub fn capabilities(&self) -> CapabilitySet {
		self.capabilities
	}
}

pub(crate) struct ModelInner {
	id: Option<String>,
	model_type: ModelType,
	catalog: Weak<CatalogInner>,
	strata: RwLock<IndexMap<String, Stratum>>,
	version: AtomicU64,
	cache: ResolutionCache,
	known_containers: RwLock<Vec<String>>,
	source_reference: RwLock<Weak<ModelInner>>,
	target: RwLock<Option<Model>>,
	experiencing_issues: AtomicBool,
}

/// A typed entity and its stack of strata.
///
/// Cloning yields another handle to the same entity. Resolved reads and
/// stratum writes come from [`ModelAccess`](crate::ModelAccess).
#[derive(Clone)]
pub struct Model(Arc<ModelInner>);

impl Model {
	/// Creates an empty model. The model is not added to `catalog`; use
	/// [`Catalog::add_model`] for that.
	pub fn new(model_type: &ModelType, id: Option<&str>, catalog: Option<&Catalog>) -> Self {
		Self(Arc::new(ModelInner {
			id: id.map(str::to_string),
			model_type: model_type.clone(),
			catalog: catalog.map(Catalog::downgrade).unwrap_or_default(),
			strata: RwLock::new(IndexMap::new()),
			version: AtomicU64::new(0),
			cache: ResolutionCache::default(),
			known_containers: RwLock::new(Vec::new()),
			source_reference: RwLock::new(Weak::new()),
			target: RwLock::new(None),
			experiencing_issues: AtomicBool::new(false),
		}))
	}

	pub fn id(&self) -> Option<&str> {
		self.0.id.as_deref()
	}

	pub fn model_type(&self) -> &ModelType {
		&self.0.model_type
	}

	pub fn type_name(&self) -> &str {
		&self.0.model_type.name
	}

	/// The owning catalog, if it is still alive.
	pub fn catalog(&self) -> Option<Catalog> {
		Catalog::upgrade(&self.0.catalog)
	}

	/// Returns true if both handles point at the same entity.
	pub fn ptr_eq(&self, other: &Model) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}

	/// Returns the stored stratum, loadable strata included.
	pub fn raw_stratum(&self, id: &str) -> Option<Stratum> {
		self.0.strata.read().get(id).cloned()
	}

	/// Removes a stratum entirely. Removing an absent stratum is a no-op.
	pub fn remove_stratum(&self, id: &str) -> Option<Stratum> {
		let removed = self.0.strata.write().shift_remove(id);
		if removed.is_some() {
			self.bump();
			tracing::debug!(domain = "model", model = ?self.id(), stratum = id, "removed stratum");
		}
		removed
	}

	/// Ids of containers known to hold this model, nearest first.
	pub fn known_container_ids(&self) -> Vec<String> {
		self.0.known_containers.read().clone()
	}

	/// Records a container; already known ids are ignored.
	pub fn add_known_container_id(&self, id: &str) {
		let mut known = self.0.known_containers.write();
		if !known.iter().any(|k| k == id) {
			known.push(id.to_string());
		}
	}

	pub fn set_known_container_ids(&self, ids: Vec<String>) {
		*self.0.known_containers.write() = ids;
	}

	/// The model this one was duplicated from or is the target of.
	pub fn source_reference(&self) -> Option<Model> {
		self.0.source_reference.read().upgrade().map(Model)
	}

	pub(crate) fn set_source_reference(&self, source: Option<&Model>) {
		*self.0.source_reference.write() = source.map(|m| Arc::downgrade(&m.0)).unwrap_or_default();
	}

	pub(crate) fn target(&self) -> Option<Model> {
		self.0.target.read().clone()
	}

	pub(crate) fn replace_target(&self, target: Option<Model>) -> Option<Model> {
		std::mem::replace(&mut *self.0.target.write(), target)
	}

	/// Returns true for stub models standing in for an unknown type.
	pub fn is_experiencing_issues(&self) -> bool {
		self.0.experiencing_issues.load(Ordering::Acquire)
	}

	pub(crate) fn set_experiencing_issues(&self, value: bool) {
		self.0.experiencing_issues.store(value, Ordering::Release);
	}

	/// Drops every stratum and outgoing link; called when a catalog removes
	/// the model.
	pub(crate) fn dispose(&self) {
		self.0.strata.write().clear();
		*self.0.target.write() = None;
		self.0.known_containers.write().clear();
		self.bump();
	}

	fn bump(&self) {
		self.0.version.fetch_add(1, Ordering::AcqRel);
	}
}

impl StrataSource for Model {
	fn traits(&self) -> &Arc<TraitsClass> {
		&self.0.model_type.traits
	}

	fn stratum_ids(&self) -> Vec<String> {
		self.0.strata.read().keys().cloned().collect()
	}

	fn stratum(&self, id: &str) -> Option<StratumData> {
		let strata = self.0.strata.read();
		strata.get(id).map(|s| s.snapshot(&self.0.model_type.traits))
	}

	fn stratum_value(&self, id: &str, trait_name: &str) -> Option<StratumValue> {
		self.0.strata.read().get(id)?.value(trait_name)
	}

	fn update_stratum(&self, id: &str, f: &mut dyn FnMut(&mut StratumData)) -> Result<(), DeveloperError> {
		StratumOrder::global().ensure_registered(id)?;
		{
			let mut strata = self.0.strata.write();
			let stratum = strata
				.entry(id.to_string())
				.or_insert_with(|| Stratum::Plain(StratumData::new()));
			match stratum {
				Stratum::Plain(data) => f(data),
				Stratum::Loadable(_) => return Err(DeveloperError::ReadOnlyStratum(id.to_string())),
			}
		}
		self.bump();
		Ok(())
	}

	fn install_stratum(&self, id: &str, stratum: Stratum) -> Result<(), DeveloperError> {
		StratumOrder::global().ensure_registered(id)?;
		let loadable = stratum.is_loadable();
		self.0.strata.write().insert(id.to_string(), stratum);
		self.bump();
		tracing::debug!(domain = "model", model = ?self.id(), stratum = id, loadable, "installed stratum");
		Ok(())
	}

	fn version(&self) -> u64 {
		self.0.version.load(Ordering::Acquire)
	}

	fn resolution_cache(&self) -> Option<&ResolutionCache> {
		Some(&self.0.cache)
	}
}

impl fmt::Debug for Model {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Model")
			.field("id", &self.0.id)
			.field("type", &self.0.model_type.name)
			.field("strata", &self.stratum_ids())
			.finish()
	}
}
