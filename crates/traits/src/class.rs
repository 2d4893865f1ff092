//! Traits classes: the static trait table of one model type.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::def::{IdProperty, PrimitiveType, TraitDef};
use crate::value::StratumData;

/// Predicate marking an object-array element as a removal of its id.
pub type RemovalFn = fn(&StratumData) -> bool;

/// Immutable, statically enumerable set of traits shared by every model of a
/// type (and by nested objects of that shape).
#[derive(Debug)]
pub struct TraitsClass {
	name: String,
	traits: IndexMap<String, TraitDef>,
	is_removal: Option<RemovalFn>,
}

impl TraitsClass {
	pub fn builder(name: impl Into<String>) -> TraitsClassBuilder {
		TraitsClassBuilder {
			name: name.into(),
			traits: IndexMap::new(),
			is_removal: None,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Looks up a trait definition by name.
	pub fn get(&self, name: &str) -> Option<&TraitDef> {
		self.traits.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.traits.contains_key(name)
	}

	/// Iterates over trait definitions in declaration order.
	pub fn iter(&self) -> impl Iterator<Item = &TraitDef> {
		self.traits.values()
	}

	pub fn trait_names(&self) -> impl Iterator<Item = &str> {
		self.traits.keys().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.traits.len()
	}

	pub fn is_empty(&self) -> bool {
		self.traits.is_empty()
	}

	/// Returns true if `element` marks its id as removed.
	pub fn is_removal(&self, element: &StratumData) -> bool {
		self.is_removal.is_some_and(|f| f(element))
	}
}

/// Builder for [`TraitsClass`].
pub struct TraitsClassBuilder {
	name: String,
	traits: IndexMap<String, TraitDef>,
	is_removal: Option<RemovalFn>,
}

impl TraitsClassBuilder {
	/// Adds a trait. A later definition with the same name replaces the earlier.
	pub fn add(mut self, def: TraitDef) -> Self {
		self.traits.insert(def.name.clone(), def);
		self
	}

	pub fn primitive(self, name: &str, ty: PrimitiveType) -> Self {
		self.add(TraitDef::primitive(name, ty))
	}

	pub fn object(self, name: &str, class: &Arc<TraitsClass>) -> Self {
		self.add(TraitDef::object(name, class))
	}

	pub fn object_array(self, name: &str, class: &Arc<TraitsClass>, id_property: IdProperty) -> Self {
		self.add(TraitDef::object_array(name, class, id_property))
	}

	pub fn removal(mut self, f: RemovalFn) -> Self {
		self.is_removal = Some(f);
		self
	}

	pub fn build(self) -> Arc<TraitsClass> {
		Arc::new(TraitsClass {
			name: self.name,
			traits: self.traits,
			is_removal: self.is_removal,
		})
	}
}
