//! The cascade: resolving trait values across a stack of strata.

use rustc_hash::FxHashSet as HashSet;
use serde_json::Value;
use strata_traits::{ElementKey, IdProperty, MergeStrategy, StratumData, StratumValue, TraitDef, TraitsClass};

use crate::order::StratumOrder;
use crate::source::StrataSource;

/// Stratum ids of `source`, highest priority first.
pub(crate) fn ids_top_to_bottom(source: &dyn StrataSource) -> Vec<String> {
	StratumOrder::global()
		.sort_top_to_bottom(source.stratum_ids().into_iter().map(|id| (id, ())))
		.into_iter()
		.map(|(id, ())| id)
		.collect()
}

/// First value set by any stratum, scanning top to bottom, else the default.
pub(crate) fn resolve_primitive(source: &dyn StrataSource, def: &TraitDef) -> Option<Value> {
	for id in ids_top_to_bottom(source) {
		match source.stratum_value(&id, &def.name) {
			Some(StratumValue::Primitive(value)) => return Some(value),
			Some(other) => {
				tracing::warn!(
					domain = "model",
					stratum = %id,
					trait_name = %def.name,
					got = other.kind_name(),
					"non-primitive value stored for primitive trait; skipping stratum",
				);
			}
			None => {}
		}
	}
	def.default.clone()
}

/// Object-array elements of `trait_name` in each stratum, top to bottom.
fn arrays_top_to_bottom(source: &dyn StrataSource, trait_name: &str) -> Vec<(String, Vec<StratumData>)> {
	ids_top_to_bottom(source)
		.into_iter()
		.filter_map(|id| match source.stratum_value(&id, trait_name) {
			Some(StratumValue::ObjectArray(items)) => Some((id, items)),
			_ => None,
		})
		.collect()
}

/// True for a blank element padding a field-keyed array past a position
/// another stratum fills with a real element.
fn is_padding(arrays: &[(String, Vec<StratumData>)], stratum: usize, position: usize, item: &StratumData, id_property: &IdProperty) -> bool {
	matches!(id_property, IdProperty::Field(_))
		&& item.is_empty()
		&& arrays
			.iter()
			.enumerate()
			.any(|(i, (_, items))| i != stratum && items.get(position).is_some_and(|other| !other.is_empty()))
}

/// `(key, is_removal)` of every element in each stratum, top to bottom.
fn keyed_arrays(source: &dyn StrataSource, trait_name: &str, class: &TraitsClass, id_property: &IdProperty) -> Vec<Vec<(ElementKey, bool)>> {
	let arrays = arrays_top_to_bottom(source, trait_name);
	arrays
		.iter()
		.enumerate()
		.map(|(stratum, (_, items))| {
			items
				.iter()
				.enumerate()
				.filter(|(position, item)| !is_padding(&arrays, stratum, *position, item, id_property))
				.map(|(position, item)| (ElementKey::of(id_property, item, position), class.is_removal(item)))
				.collect()
		})
		.collect()
}

/// Keys of the merged elements of an object-array trait.
///
/// A removal element drops its key from its own stratum and every stratum
/// below. Surviving keys are ordered by the lowest stratum defining them,
/// removed or not, then by position within that stratum. With
/// [`MergeStrategy::TopStratum`] only keys of the topmost stratum setting the
/// array survive.
pub(crate) fn element_keys(
	source: &dyn StrataSource,
	trait_name: &str,
	class: &TraitsClass,
	id_property: &IdProperty,
	merge: MergeStrategy,
) -> Vec<ElementKey> {
	let strata = keyed_arrays(source, trait_name, class, id_property);

	let mut removed: HashSet<&ElementKey> = HashSet::default();
	let mut live: HashSet<&ElementKey> = HashSet::default();
	for (key, removal) in strata.iter().flatten() {
		if *removal {
			removed.insert(key);
		} else if !removed.contains(key) {
			live.insert(key);
		}
	}

	if merge == MergeStrategy::TopStratum
		&& let Some(top) = strata.first()
	{
		let top: HashSet<&ElementKey> = top
			.iter()
			.filter(|(_, removal)| !removal)
			.map(|(key, _)| key)
			.collect();
		live.retain(|key| top.contains(key));
	}

	let mut seen: HashSet<&ElementKey> = HashSet::default();
	let mut ordered = Vec::new();
	for stratum in strata.iter().rev() {
		for (key, removal) in stratum {
			if !removal && seen.insert(key) && live.contains(key) {
				ordered.push(key.clone());
			}
		}
	}
	ordered
}

/// Strata contributing to one merged element, top to bottom.
///
/// Stops at the topmost removal of the key; with [`MergeStrategy::None`] only
/// the topmost stratum defining the element contributes.
pub(crate) fn element_stratum_ids(
	source: &dyn StrataSource,
	trait_name: &str,
	class: &TraitsClass,
	id_property: &IdProperty,
	merge: MergeStrategy,
	key: &ElementKey,
) -> Vec<String> {
	let mut ids = Vec::new();
	for (id, items) in arrays_top_to_bottom(source, trait_name) {
		let Some(item) = find_element(&items, id_property, key) else {
			continue;
		};
		if class.is_removal(item) {
			break;
		}
		ids.push(id);
		if merge == MergeStrategy::None {
			break;
		}
	}
	ids
}

fn position_of(items: &[StratumData], id_property: &IdProperty, key: &ElementKey) -> Option<usize> {
	match key {
		ElementKey::Index(i) => items
			.get(*i)
			.filter(|item| ElementKey::of(id_property, item, *i) == *key)
			.map(|_| *i),
		ElementKey::Id(_) => items
			.iter()
			.enumerate()
			.position(|(i, item)| ElementKey::of(id_property, item, i) == *key),
	}
}

/// Finds the element with `key` in one stratum's array.
pub(crate) fn find_element<'a>(items: &'a [StratumData], id_property: &IdProperty, key: &ElementKey) -> Option<&'a StratumData> {
	position_of(items, id_property, key).map(|i| &items[i])
}

/// Finds the element with `key`, creating it if absent.
///
/// Id keys append a new element stamped with the id; index keys pad the array
/// with blank elements up to the index.
pub(crate) fn locate_or_create<'a>(items: &'a mut Vec<StratumData>, id_property: &IdProperty, key: &ElementKey) -> &'a mut StratumData {
	let position = match position_of(items, id_property, key) {
		Some(i) => i,
		None => match key {
			ElementKey::Id(id) => {
				let mut element = StratumData::new();
				if let IdProperty::Field(field) = id_property {
					element.set(field.as_str(), id.as_str());
				}
				items.push(element);
				items.len() - 1
			}
			ElementKey::Index(i) => {
				while items.len() <= *i {
					items.push(StratumData::new());
				}
				*i
			}
		},
	};
	&mut items[position]
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use parking_lot::RwLock;
	use pretty_assertions::assert_eq;
	use strata_traits::PrimitiveType;

	use super::*;
	use crate::error::DeveloperError;
	use crate::order::common::{DEFINITION, OVERRIDE, USER};
	use crate::stratum::Stratum;

	/// Minimal in-memory source.
	struct Fixed {
		traits: Arc<TraitsClass>,
		strata: RwLock<Vec<(String, StratumData)>>,
	}

	impl StrataSource for Fixed {
		fn traits(&self) -> &Arc<TraitsClass> {
			&self.traits
		}

		fn stratum_ids(&self) -> Vec<String> {
			self.strata.read().iter().map(|(id, _)| id.clone()).collect()
		}

		fn stratum(&self, id: &str) -> Option<StratumData> {
			self.strata
				.read()
				.iter()
				.find(|(sid, _)| sid == id)
				.map(|(_, d)| d.clone())
		}

		fn update_stratum(&self, _: &str, _: &mut dyn FnMut(&mut StratumData)) -> Result<(), DeveloperError> {
			unimplemented!("read-only fixture")
		}

		fn install_stratum(&self, _: &str, _: Stratum) -> Result<(), DeveloperError> {
			unimplemented!("read-only fixture")
		}

		fn version(&self) -> u64 {
			0
		}
	}

	fn inner() -> Arc<TraitsClass> {
		TraitsClass::builder("Inner")
			.primitive("foo", PrimitiveType::String)
			.primitive("bar", PrimitiveType::Number)
			.removal(|e| e.get_f64("bar") == Some(42.0))
			.build()
	}

	fn elem(foo: &str, bar: f64) -> StratumData {
		StratumData::new().with("foo", foo).with("bar", bar)
	}

	fn layered(strata: Vec<(&str, Vec<StratumData>)>) -> Fixed {
		let inner = inner();
		Fixed {
			traits: TraitsClass::builder("Outer")
				.object_array("inner", &inner, IdProperty::field("foo"))
				.build(),
			strata: RwLock::new(
				strata
					.into_iter()
					.map(|(id, items)| (id.to_string(), StratumData::new().with("inner", items)))
					.collect(),
			),
		}
	}

	fn fixture(definition: Vec<StratumData>, user: Vec<StratumData>) -> Fixed {
		layered(vec![(USER, user), (DEFINITION, definition)])
	}

	fn ids(keys: Vec<ElementKey>) -> Vec<String> {
		keys.into_iter().map(|k| k.to_string()).collect()
	}

	#[test]
	fn removal_in_top_stratum_hides_lower_elements() {
		let source = fixture(
			vec![elem("a", 1.0), elem("b", 2.0)],
			vec![elem("b", 42.0), elem("c", 3.0), elem("a", 11.0)],
		);
		let keys = element_keys(&source, "inner", &inner(), &IdProperty::field("foo"), MergeStrategy::All);
		assert_eq!(ids(keys), vec!["a", "c"]);
	}

	#[test]
	fn removal_in_bottom_stratum_is_overridden_from_above() {
		let inner = inner();
		let idp = IdProperty::field("foo");
		let source = fixture(
			vec![elem("b", 42.0), elem("a", 1.0)],
			vec![elem("b", 100.0), elem("c", 3.0), elem("a", 11.0)],
		);
		assert_eq!(ids(element_keys(&source, "inner", &inner, &idp, MergeStrategy::All)), vec!["a", "b", "c"]);

		let b = ElementKey::Id("b".into());
		assert_eq!(element_stratum_ids(&source, "inner", &inner, &idp, MergeStrategy::All, &b), vec![USER.to_string()]);
		let a = ElementKey::Id("a".into());
		assert_eq!(
			element_stratum_ids(&source, "inner", &inner, &idp, MergeStrategy::All, &a),
			vec![USER.to_string(), DEFINITION.to_string()]
		);
		assert_eq!(element_stratum_ids(&source, "inner", &inner, &idp, MergeStrategy::None, &a), vec![USER.to_string()]);
	}

	#[test]
	fn order_comes_from_lowest_stratum_even_past_a_removal() {
		let source = layered(vec![
			(USER, vec![elem("a", 1.0), elem("b", 2.0)]),
			(OVERRIDE, vec![elem("b", 42.0)]),
			(DEFINITION, vec![elem("b", 3.0), elem("a", 4.0)]),
		]);
		let idp = IdProperty::field("foo");
		assert_eq!(ids(element_keys(&source, "inner", &inner(), &idp, MergeStrategy::All)), vec!["b", "a"]);
		let b = ElementKey::Id("b".into());
		assert_eq!(
			element_stratum_ids(&source, "inner", &inner(), &idp, MergeStrategy::All, &b),
			vec![USER.to_string()]
		);
	}

	#[test]
	fn top_stratum_strategy_keeps_only_top_keys() {
		let inner = inner();
		let idp = IdProperty::field("foo");
		let source = fixture(
			vec![elem("a", 1.0), elem("b", 2.0), elem("c", 3.0)],
			vec![elem("c", 5.0), elem("a", 6.0)],
		);
		assert_eq!(ids(element_keys(&source, "inner", &inner, &idp, MergeStrategy::All)), vec!["a", "b", "c"]);
		assert_eq!(
			ids(element_keys(&source, "inner", &inner, &idp, MergeStrategy::TopStratum)),
			vec!["a", "c"]
		);
		let a = ElementKey::Id("a".into());
		assert_eq!(
			element_stratum_ids(&source, "inner", &inner, &idp, MergeStrategy::TopStratum, &a),
			vec![USER.to_string(), DEFINITION.to_string()]
		);
	}

	#[test]
	fn blank_padding_under_keyed_elements_is_not_an_element() {
		let source = fixture(
			vec![elem("a", 1.0), elem("b", 2.0)],
			vec![StratumData::new(), StratumData::new(), StratumData::new()],
		);
		let idp = IdProperty::field("foo");
		assert_eq!(ids(element_keys(&source, "inner", &inner(), &idp, MergeStrategy::All)), vec!["a", "b", "#2"]);
	}

	#[test]
	fn elements_without_id_match_by_position() {
		let idp = IdProperty::field("foo");
		let source = fixture(
			vec![StratumData::new().with("bar", 1.0), elem("x", 2.0)],
			vec![StratumData::new().with("bar", 5.0)],
		);
		assert_eq!(ids(element_keys(&source, "inner", &inner(), &idp, MergeStrategy::All)), vec!["#0", "x"]);
	}

	#[test]
	fn locate_or_create_pads_indices_and_stamps_ids() {
		let mut items = vec![elem("a", 1.0)];
		locate_or_create(&mut items, &IdProperty::Index, &ElementKey::Index(3)).set("bar", 7.0);
		assert_eq!(items.len(), 4);
		assert_eq!(items[3].get_f64("bar"), Some(7.0));

		let idp = IdProperty::field("foo");
		locate_or_create(&mut items, &idp, &ElementKey::Id("a".into())).set("bar", 2.0);
		assert_eq!(items.len(), 4);
		assert_eq!(items[0].get_f64("bar"), Some(2.0));

		locate_or_create(&mut items, &idp, &ElementKey::Id("z".into()));
		assert_eq!(items.len(), 5);
		assert_eq!(items[4].get_str("foo"), Some("z"));
	}
}
