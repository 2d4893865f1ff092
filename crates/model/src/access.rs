//! Trait access shared by every resolution view.

use std::sync::Arc;

use serde_json::Value;
use strata_traits::{ElementKey, IdProperty, StratumData, StratumValue, TraitDef, TraitKind};

use crate::error::DeveloperError;
use crate::nested::NestedModel;
use crate::order::StratumOrder;
use crate::resolve::{element_keys, ids_top_to_bottom, resolve_primitive};
use crate::source::{Cached, StrataSource};

/// The effective value of one trait.
#[derive(Debug, Clone)]
pub enum ResolvedValue {
	/// First value set by any stratum, else the declared default.
	Primitive(Option<Value>),
	/// Nested object, always present.
	Object(NestedModel),
	/// Merged elements of an object-array trait.
	ObjectArray(Vec<NestedModel>),
}

impl ResolvedValue {
	pub fn as_primitive(&self) -> Option<&Value> {
		match self {
			ResolvedValue::Primitive(v) => v.as_ref(),
			_ => None,
		}
	}

	pub fn into_object(self) -> Option<NestedModel> {
		match self {
			ResolvedValue::Object(nested) => Some(nested),
			_ => None,
		}
	}

	pub fn into_objects(self) -> Option<Vec<NestedModel>> {
		match self {
			ResolvedValue::ObjectArray(items) => Some(items),
			_ => None,
		}
	}
}

/// Direct stratum access and resolved reads for any [`StrataSource`].
///
/// Blanket-implemented; import it to use models, nested objects and combined
/// views uniformly.
pub trait ModelAccess: StrataSource + Clone + Sized + 'static {
	/// Shares this view as a parent for nested objects.
	fn to_source(&self) -> Arc<dyn StrataSource> {
		Arc::new(self.clone())
	}

	/// Looks up a trait definition of this view's traits class.
	fn trait_def(&self, trait_name: &str) -> Result<&TraitDef, DeveloperError> {
		self.traits()
			.get(trait_name)
			.ok_or_else(|| DeveloperError::UnknownTrait {
				traits: self.traits().name().to_string(),
				trait_name: trait_name.to_string(),
			})
	}

	/// Strata snapshots, highest priority first.
	fn strata_top_to_bottom(&self) -> Vec<(String, StratumData)> {
		ids_top_to_bottom(self)
			.into_iter()
			.filter_map(|id| self.stratum(&id).map(|data| (id, data)))
			.collect()
	}

	/// Strata snapshots, lowest priority first.
	fn strata_bottom_to_top(&self) -> Vec<(String, StratumData)> {
		let mut strata = self.strata_top_to_bottom();
		strata.reverse();
		strata
	}

	/// Reads exactly one stratum's value, without resolution.
	fn get_trait(&self, stratum_id: &str, trait_name: &str) -> Option<StratumValue> {
		self.stratum_value(stratum_id, trait_name)
	}

	/// Writes exactly one stratum's value, creating the stratum if absent.
	fn set_trait(&self, stratum_id: &str, trait_name: &str, value: impl Into<StratumValue>) -> Result<(), DeveloperError> {
		self.write_trait(stratum_id, trait_name, Some(value.into()))
	}

	/// Unsets one stratum's value. Resolution then behaves as if the stratum
	/// had never set it.
	fn unset_trait(&self, stratum_id: &str, trait_name: &str) -> Result<(), DeveloperError> {
		self.write_trait(stratum_id, trait_name, None)
	}

	/// Sets (`Some`) or unsets (`None`) one stratum's value.
	fn write_trait(&self, stratum_id: &str, trait_name: &str, value: Option<StratumValue>) -> Result<(), DeveloperError> {
		let def = self.trait_def(trait_name)?;
		if let Some(value) = &value
			&& !def.kind.accepts(value)
		{
			return Err(DeveloperError::TraitKindMismatch {
				trait_name: trait_name.to_string(),
				expected: value.kind_name(),
				actual: def.kind.kind_name(),
			});
		}
		let mut value = value;
		self.update_stratum(stratum_id, &mut |data| {
			data.put(trait_name, value.take());
		})
	}

	/// Resolves one trait across all strata.
	fn resolve(&self, trait_name: &str) -> Result<ResolvedValue, DeveloperError> {
		let def = self.trait_def(trait_name)?;
		Ok(match &def.kind {
			TraitKind::Primitive(_) => {
				let value = match cached(self, trait_name, || Cached::Primitive(resolve_primitive(self, def))) {
					Cached::Primitive(value) => value,
					Cached::Elements(_) => resolve_primitive(self, def),
				};
				ResolvedValue::Primitive(value)
			}
			TraitKind::Object(class) => ResolvedValue::Object(NestedModel::object(self.to_source(), class.clone(), trait_name)),
			TraitKind::ObjectArray {
				class,
				id_property,
				merge,
			} => {
				let compute = || element_keys(self, trait_name, class, id_property, *merge);
				let keys = match cached(self, trait_name, || Cached::Elements(compute())) {
					Cached::Elements(keys) => keys,
					Cached::Primitive(_) => compute(),
				};
				let parent = self.to_source();
				ResolvedValue::ObjectArray(
					keys.into_iter()
						.map(|key| {
							NestedModel::element(parent.clone(), class.clone(), trait_name, key, id_property.clone(), *merge)
						})
						.collect(),
				)
			}
		})
	}

	/// Resolved value of a primitive trait. `None` for unknown or
	/// non-primitive traits and for unset traits without a default.
	fn primitive(&self, trait_name: &str) -> Option<Value> {
		match self.resolve(trait_name).ok()? {
			ResolvedValue::Primitive(value) => value,
			_ => None,
		}
	}

	fn string(&self, trait_name: &str) -> Option<String> {
		self.primitive(trait_name)
			.and_then(|v| v.as_str().map(str::to_string))
	}

	fn number(&self, trait_name: &str) -> Option<f64> {
		self.primitive(trait_name).and_then(|v| v.as_f64())
	}

	fn boolean(&self, trait_name: &str) -> Option<bool> {
		self.primitive(trait_name).and_then(|v| v.as_bool())
	}

	/// Resolved string-list trait; empty when unset.
	fn string_list(&self, trait_name: &str) -> Vec<String> {
		self.primitive(trait_name)
			.and_then(|v| {
				v.as_array().map(|items| {
					items
						.iter()
						.filter_map(|s| s.as_str().map(str::to_string))
						.collect()
				})
			})
			.unwrap_or_default()
	}

	/// Nested model of an object trait.
	fn object(&self, trait_name: &str) -> Option<NestedModel> {
		self.resolve(trait_name).ok()?.into_object()
	}

	/// Merged elements of an object-array trait; empty for other traits.
	fn objects(&self, trait_name: &str) -> Vec<NestedModel> {
		self.resolve(trait_name)
			.ok()
			.and_then(ResolvedValue::into_objects)
			.unwrap_or_default()
	}

	/// Adds an element to an object-array trait in one stratum and returns the
	/// resolved (merged) element.
	///
	/// With `object_id`, the element is upserted by id; adding the same id
	/// twice leaves one element. Without it, the element is placed after the
	/// highest index used by any stratum, padding this stratum's array with
	/// blank elements, so it never collides with elements of other strata.
	/// Blank padding under another stratum's element is not an element itself.
	///
	/// Returns `None` if a higher stratum removes the element.
	fn add_object(&self, stratum_id: &str, trait_name: &str, object_id: Option<&str>) -> Result<Option<NestedModel>, DeveloperError> {
		let def = self.trait_def(trait_name)?;
		let TraitKind::ObjectArray { id_property, .. } = &def.kind else {
			return Err(DeveloperError::TraitKindMismatch {
				trait_name: trait_name.to_string(),
				expected: "object array",
				actual: def.kind.kind_name(),
			});
		};
		StratumOrder::global().ensure_registered(stratum_id)?;

		match object_id {
			Some(object_id) => {
				let key = match id_property {
					IdProperty::Field(_) => ElementKey::Id(object_id.to_string()),
					IdProperty::Index => ElementKey::Index(
						object_id
							.parse()
							.map_err(|_| DeveloperError::InvalidIndex(object_id.to_string()))?,
					),
				};
				self.update_stratum(stratum_id, &mut |data| {
					crate::resolve::locate_or_create(data.array_entry(trait_name), id_property, &key);
				})?;
				Ok(self
					.objects(trait_name)
					.into_iter()
					.find(|o| o.key() == Some(&key)))
			}
			None => {
				let max_index = self
					.stratum_ids()
					.iter()
					.filter_map(|id| match self.stratum_value(id, trait_name) {
						Some(StratumValue::ObjectArray(items)) => items.len().checked_sub(1),
						_ => None,
					})
					.max();
				let slot = max_index.map_or(0, |i| i + 1);
				self.update_stratum(stratum_id, &mut |data| {
					let items = data.array_entry(trait_name);
					while items.len() < slot {
						items.push(StratumData::new());
					}
					items.push(StratumData::new());
				})?;
				let key = ElementKey::Index(slot);
				Ok(self
					.objects(trait_name)
					.into_iter()
					.find(|o| o.key() == Some(&key)))
			}
		}
	}
}

impl<T: StrataSource + Clone + 'static> ModelAccess for T {}

fn cached<S: StrataSource + ?Sized>(source: &S, trait_name: &str, compute: impl FnOnce() -> Cached) -> Cached {
	match source.resolution_cache() {
		Some(cache) => cache.get_or_insert_with(source.version(), trait_name, compute),
		None => compute(),
	}
}
