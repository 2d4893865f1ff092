//! Nested objects: views onto values stored inside a parent's strata.

use std::fmt;
use std::sync::Arc;

use strata_traits::{ElementKey, IdProperty, MergeStrategy, StratumData, StratumValue, TraitsClass};

use crate::error::DeveloperError;
use crate::resolve::{element_stratum_ids, find_element, locate_or_create};
use crate::source::StrataSource;
use crate::stratum::Stratum;

#[derive(Clone, Debug)]
enum Slot {
	/// The single nested object of an object trait.
	Object,
	/// One merged element of an object-array trait.
	Element {
		key: ElementKey,
		id_property: IdProperty,
		merge: MergeStrategy,
	},
}

/// A nested object or array element, resolved with the same cascade as a
/// top-level model.
///
/// Its stratum `s` is the matching nested value inside the parent's stratum
/// `s`. Writing to a stratum locates or creates that value in the parent, so
/// edits always land in the parent's storage.
#[derive(Clone)]
pub struct NestedModel {
	parent: Arc<dyn StrataSource>,
	class: Arc<TraitsClass>,
	trait_name: String,
	slot: Slot,
}

impl NestedModel {
	pub(crate) fn object(parent: Arc<dyn StrataSource>, class: Arc<TraitsClass>, trait_name: &str) -> Self {
		Self {
			parent,
			class,
			trait_name: trait_name.to_string(),
			slot: Slot::Object,
		}
	}

	pub(crate) fn element(
		parent: Arc<dyn StrataSource>,
		class: Arc<TraitsClass>,
		trait_name: &str,
		key: ElementKey,
		id_property: IdProperty,
		merge: MergeStrategy,
	) -> Self {
		Self {
			parent,
			class,
			trait_name: trait_name.to_string(),
			slot: Slot::Element {
				key,
				id_property,
				merge,
			},
		}
	}

	/// Name of the parent trait holding this object.
	pub fn trait_name(&self) -> &str {
		&self.trait_name
	}

	/// Element key within the parent array, `None` for object traits.
	pub fn key(&self) -> Option<&ElementKey> {
		match &self.slot {
			Slot::Object => None,
			Slot::Element { key, .. } => Some(key),
		}
	}

	pub fn parent(&self) -> &Arc<dyn StrataSource> {
		&self.parent
	}

	fn extract(&self, value: StratumValue) -> Option<StratumData> {
		match (&self.slot, value) {
			(Slot::Object, StratumValue::Object(data)) => Some(data),
			(Slot::Element { key, id_property, .. }, StratumValue::ObjectArray(items)) => {
				find_element(&items, id_property, key).cloned()
			}
			_ => None,
		}
	}
}

impl StrataSource for NestedModel {
	fn traits(&self) -> &Arc<TraitsClass> {
		&self.class
	}

	fn stratum_ids(&self) -> Vec<String> {
		match &self.slot {
			Slot::Object => self
				.parent
				.stratum_ids()
				.into_iter()
				.filter(|id| matches!(self.parent.stratum_value(id, &self.trait_name), Some(StratumValue::Object(_))))
				.collect(),
			Slot::Element {
				key,
				id_property,
				merge,
			} => element_stratum_ids(
				self.parent.as_ref(),
				&self.trait_name,
				&self.class,
				id_property,
				*merge,
				key,
			),
		}
	}

	fn stratum(&self, id: &str) -> Option<StratumData> {
		if matches!(self.slot, Slot::Element { .. }) && !self.stratum_ids().iter().any(|s| s == id) {
			return None;
		}
		let value = self.parent.stratum_value(id, &self.trait_name)?;
		self.extract(value)
	}

	fn update_stratum(&self, id: &str, f: &mut dyn FnMut(&mut StratumData)) -> Result<(), DeveloperError> {
		let trait_name = self.trait_name.as_str();
		let slot = &self.slot;
		self.parent.update_stratum(id, &mut |data| {
			let target = match slot {
				Slot::Object => data.object_entry(trait_name),
				Slot::Element { key, id_property, .. } => {
					locate_or_create(data.array_entry(trait_name), id_property, key)
				}
			};
			f(target);
		})
	}

	fn install_stratum(&self, id: &str, stratum: Stratum) -> Result<(), DeveloperError> {
		match stratum {
			Stratum::Plain(replacement) => {
				let key_field = match &self.slot {
					Slot::Element {
						key: ElementKey::Id(key),
						id_property: IdProperty::Field(field),
						..
					} => Some((field.clone(), key.clone())),
					_ => None,
				};
				self.update_stratum(id, &mut |target| {
					*target = replacement.clone();
					if let Some((field, key)) = &key_field {
						target.set(field.as_str(), key.as_str());
					}
				})
			}
			Stratum::Loadable(_) => Err(DeveloperError::ReadOnlyStratum(id.to_string())),
		}
	}

	fn version(&self) -> u64 {
		self.parent.version()
	}
}

impl fmt::Debug for NestedModel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NestedModel")
			.field("traits", &self.class.name())
			.field("trait_name", &self.trait_name)
			.field("slot", &self.slot)
			.finish()
	}
}
