//! The owning context: model types, live models and share keys.

use std::sync::{Arc, LazyLock, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap as HashMap;
use serde_json::Value;
use strata_traits::{PrimitiveType, TraitsClass};

use crate::error::{DeveloperError, ModelError, Report};
use crate::json::update_model_from_json;
use crate::model::{Model, ModelType};

/// Traits given to stub models standing in for unknown types.
static STUB_TRAITS: LazyLock<Arc<TraitsClass>> = LazyLock::new(|| {
	TraitsClass::builder("StubTraits")
		.primitive("name", PrimitiveType::String)
		.primitive("description", PrimitiveType::String)
		.build()
});

#[derive(Default)]
pub(crate) struct CatalogInner {
	types: RwLock<HashMap<String, ModelType>>,
	models: RwLock<IndexMap<String, Model>>,
	share_keys: RwLock<HashMap<String, String>>,
}

/// Registry of model types and live models.
///
/// Models keep a weak link back to their catalog, so dropping the last
/// `Catalog` handle detaches them.
#[derive(Clone, Default)]
pub struct Catalog(Arc<CatalogInner>);

impl Catalog {
	pub fn new() -> Self {
		Self::default()
	}

	pub(crate) fn downgrade(&self) -> Weak<CatalogInner> {
		Arc::downgrade(&self.0)
	}

	pub(crate) fn upgrade(weak: &Weak<CatalogInner>) -> Option<Self> {
		weak.upgrade().map(Self)
	}

	/// Registers a model type, replacing any type with the same name.
	pub fn register_type(&self, model_type: ModelType) {
		self.0
			.types
			.write()
			.insert(model_type.name().to_string(), model_type);
	}

	pub fn model_type(&self, name: &str) -> Option<ModelType> {
		self.0.types.read().get(name).cloned()
	}

	/// Creates a model of a registered type without adding it.
	///
	/// Unknown types yield a stub model flagged
	/// [`is_experiencing_issues`](Model::is_experiencing_issues), reported as
	/// [`ModelError::UnknownType`].
	pub fn create_model(&self, type_name: &str, id: Option<&str>) -> Report<Model> {
		if let Some(model_type) = self.model_type(type_name) {
			return Report::new(Model::new(&model_type, id, Some(self)));
		}
		let stub = Model::new(&ModelType::new(type_name, &STUB_TRAITS), id, Some(self));
		stub.set_experiencing_issues(true);
		tracing::debug!(domain = "catalog", model = ?id, type_name, "created stub model");
		let mut report = Report::new(stub);
		report.push(ModelError::UnknownType(type_name.to_string()));
		report
	}

	/// Indexes `model` by its id.
	pub fn add_model(&self, model: &Model) -> Result<(), ModelError> {
		let id = model
			.id()
			.ok_or_else(|| ModelError::MissingId(model.type_name().to_string()))?;
		let mut models = self.0.models.write();
		if models.contains_key(id) {
			return Err(ModelError::DuplicateModelId(id.to_string()));
		}
		models.insert(id.to_string(), model.clone());
		Ok(())
	}

	/// Removes and disposes a model, dropping its share keys.
	pub fn remove_model(&self, id: &str) -> Option<Model> {
		let removed = self.0.models.write().shift_remove(id)?;
		self.0.share_keys.write().retain(|_, target| target != id);
		removed.dispose();
		tracing::debug!(domain = "catalog", model = id, "removed model");
		Some(removed)
	}

	pub fn get_model_by_id(&self, id: &str) -> Option<Model> {
		self.0.models.read().get(id).cloned()
	}

	/// Registers an alternative id for a model. Share keys already pointing
	/// elsewhere are left unchanged and `false` is returned.
	pub fn add_share_key(&self, model_id: &str, share_key: &str) -> bool {
		let mut keys = self.0.share_keys.write();
		match keys.get(share_key) {
			Some(existing) if existing != model_id => {
				tracing::warn!(domain = "catalog", share_key, existing = %existing, model = model_id, "share key already in use");
				false
			}
			Some(_) => true,
			None => {
				keys.insert(share_key.to_string(), model_id.to_string());
				true
			}
		}
	}

	/// Looks up a model by id, falling back to share keys.
	pub fn get_model_by_id_or_share_key(&self, id: &str) -> Option<Model> {
		self.get_model_by_id(id).or_else(|| {
			let target = self.0.share_keys.read().get(id).cloned()?;
			self.get_model_by_id(&target)
		})
	}

	/// Live models in insertion order.
	pub fn models(&self) -> Vec<Model> {
		self.0.models.read().values().cloned().collect()
	}

	/// Creates or updates a model from catalog JSON holding `id` and `type`.
	///
	/// An existing model (found by id or share key) is updated in place;
	/// otherwise a model of `type` is created and added. `shareKeys` entries
	/// are registered for the model.
	///
	/// # Errors
	///
	/// Fails only if `stratum_id` is not registered.
	pub fn upsert_model_from_json(&self, stratum_id: &str, json: &Value) -> Result<Report<Option<Model>>, DeveloperError> {
		let mut report = Report::new(None);
		let Some(map) = json.as_object() else {
			report.push(ModelError::NotAnObject(strata_traits::json_type_name(json)));
			return Ok(report);
		};
		let type_name = map.get("type").and_then(Value::as_str).unwrap_or_default();
		let Some(id) = map.get("id").and_then(Value::as_str) else {
			report.push(ModelError::MissingId(type_name.to_string()));
			return Ok(report);
		};

		let model = match self.get_model_by_id_or_share_key(id) {
			Some(existing) => existing,
			None => {
				let created = self.create_model(type_name, Some(id));
				report.errors.extend(created.errors);
				if let Err(error) = self.add_model(&created.value) {
					report.push(error);
				}
				created.value
			}
		};

		let updated = update_model_from_json(&model, stratum_id, json, false)?;
		report.errors.extend(updated.errors);

		if let (Some(keys), Some(model_id)) = (map.get("shareKeys").and_then(Value::as_array), model.id()) {
			for key in keys.iter().filter_map(Value::as_str) {
				self.add_share_key(model_id, key);
			}
		}

		report.value = Some(model);
		Ok(report)
	}
}

impl std::fmt::Debug for Catalog {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Catalog")
			.field("types", &self.0.types.read().len())
			.field("models", &self.0.models.read().len())
			.finish()
	}
}
