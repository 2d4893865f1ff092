use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use strata_traits::{IdProperty, PrimitiveType, StratumData, StratumValue, TraitsClass};

use super::*;
use crate::access::ModelAccess;
use crate::capability::{Capability, CapabilitySet};
use crate::catalog::Catalog;
use crate::error::ModelError;
use crate::order::common::{DEFAULTS, DEFINITION, UNDERRIDE, USER};
use crate::stratum::LoadableStratum;

const SERVER: &str = "model-tests-server";

fn layer() -> Arc<TraitsClass> {
	TraitsClass::builder("LayerTraits")
		.primitive("name", PrimitiveType::String)
		.primitive("opacity", PrimitiveType::Number)
		.removal(|e| e.get_bool("hidden") == Some(true))
		.primitive("hidden", PrimitiveType::Boolean)
		.build()
}

fn item_type() -> ModelType {
	let layer = layer();
	let traits = TraitsClass::builder("ItemTraits")
		.add(strata_traits::TraitDef::primitive("name", PrimitiveType::String).default_value(json!("unnamed")))
		.primitive("opacity", PrimitiveType::Number)
		.primitive("members", PrimitiveType::StringList)
		.primitive("url", PrimitiveType::String)
		.object("legend", &layer)
		.object_array("layers", &layer, IdProperty::field("name"))
		.object_array("slots", &layer, IdProperty::Index)
		.build();
	ModelType::new("item", &traits)
}

fn item(id: &str) -> Model {
	Model::new(&item_type(), Some(id), None)
}

#[derive(Debug)]
struct ServerStratum {
	name: Arc<str>,
}

impl LoadableStratum for ServerStratum {
	fn trait_value(&self, trait_name: &str) -> Option<StratumValue> {
		match trait_name {
			"name" => Some(StratumValue::from(self.name.to_string())),
			_ => None,
		}
	}

	fn duplicate_loadable_stratum(&self, _new_owner: &Model) -> anyhow::Result<Arc<dyn LoadableStratum>> {
		Ok(Arc::new(ServerStratum { name: self.name.clone() }))
	}
}

#[derive(Debug)]
struct BrokenStratum;

impl LoadableStratum for BrokenStratum {
	fn duplicate_loadable_stratum(&self, _new_owner: &Model) -> anyhow::Result<Arc<dyn LoadableStratum>> {
		anyhow::bail!("source response was discarded")
	}
}

fn server_stratum(name: &str) -> Stratum {
	StratumOrder::global().register_load(SERVER);
	Stratum::loadable(ServerStratum { name: Arc::from(name) })
}

#[test]
fn resolves_highest_stratum_then_default() {
	let model = item("a");
	assert_eq!(model.string("name").as_deref(), Some("unnamed"));

	model.set_trait(DEFAULTS, "name", "v1").unwrap();
	model.set_trait(DEFINITION, "name", "v2").unwrap();
	model.set_trait(USER, "name", "v3").unwrap();
	assert_eq!(model.string("name").as_deref(), Some("v3"));

	model.unset_trait(USER, "name").unwrap();
	assert_eq!(model.string("name").as_deref(), Some("v2"));
	assert!(model.stratum_ids().contains(&USER.to_string()));

	model.unset_trait(DEFINITION, "name").unwrap();
	model.unset_trait(DEFAULTS, "name").unwrap();
	assert_eq!(model.string("name").as_deref(), Some("unnamed"));
}

#[test]
fn unset_matches_never_set() {
	let model = item("a");
	model.set_trait(DEFINITION, "opacity", 0.3).unwrap();
	model.set_trait(USER, "opacity", 0.9).unwrap();
	model.unset_trait(USER, "opacity").unwrap();

	let fresh = item("b");
	fresh.set_trait(DEFINITION, "opacity", 0.3).unwrap();
	assert_eq!(model.number("opacity"), fresh.number("opacity"));
	assert_eq!(model.get_trait(USER, "opacity"), None);
}

#[test]
fn underride_sits_below_definition() {
	let model = item("a");
	model.set_trait(UNDERRIDE, "opacity", 0.1).unwrap();
	assert_eq!(model.number("opacity"), Some(0.1));
	model.set_trait(DEFINITION, "opacity", 0.2).unwrap();
	assert_eq!(model.number("opacity"), Some(0.2));
}

#[test]
fn writes_are_checked() {
	let model = item("a");
	assert_eq!(
		model.set_trait("model-tests-nowhere", "name", "x"),
		Err(DeveloperError::UnregisteredStratum("model-tests-nowhere".into()))
	);
	assert!(matches!(
		model.set_trait(USER, "nope", "x"),
		Err(DeveloperError::UnknownTrait { trait_name, .. }) if trait_name == "nope"
	));
	assert!(matches!(
		model.set_trait(USER, "layers", "x"),
		Err(DeveloperError::TraitKindMismatch { actual: "object array", .. })
	));
	assert!(model.stratum_ids().is_empty());
}

#[test]
fn loadable_strata_resolve_but_reject_writes() {
	let model = item("a");
	model.install_stratum(SERVER, server_stratum("from server")).unwrap();
	assert_eq!(model.string("name").as_deref(), Some("from server"));
	assert_eq!(model.get_trait(SERVER, "opacity"), None);

	assert_eq!(
		model.set_trait(SERVER, "name", "local"),
		Err(DeveloperError::ReadOnlyStratum(SERVER.into()))
	);
	model.set_trait(DEFINITION, "name", "local").unwrap();
	assert_eq!(model.string("name").as_deref(), Some("local"));
}

#[test]
fn install_and_remove_strata() {
	let model = item("a");
	model
		.install_stratum(USER, Stratum::Plain(StratumData::new().with("opacity", 0.4)))
		.unwrap();
	assert_eq!(model.number("opacity"), Some(0.4));
	assert!(model.remove_stratum(USER).is_some());
	assert_eq!(model.number("opacity"), None);
	assert!(model.remove_stratum(USER).is_none());
}

#[test]
fn cache_invalidates_on_write() {
	let model = item("a");
	model.set_trait(DEFINITION, "name", "one").unwrap();
	assert_eq!(model.string("name").as_deref(), Some("one"));
	assert_eq!(model.string("name").as_deref(), Some("one"));
	let version = model.version();

	model.set_trait(USER, "name", "two").unwrap();
	assert!(model.version() > version);
	assert_eq!(model.string("name").as_deref(), Some("two"));
}

#[test]
fn strata_are_listed_in_priority_order() {
	let model = item("a");
	model.set_trait(USER, "opacity", 1.0).unwrap();
	model.set_trait(DEFAULTS, "opacity", 0.0).unwrap();
	model.set_trait(DEFINITION, "opacity", 0.5).unwrap();
	let ids: Vec<String> = model.strata_top_to_bottom().into_iter().map(|(id, _)| id).collect();
	assert_eq!(ids, vec![USER, DEFINITION, DEFAULTS]);
	let ids: Vec<String> = model.strata_bottom_to_top().into_iter().map(|(id, _)| id).collect();
	assert_eq!(ids, vec![DEFAULTS, DEFINITION, USER]);
}

#[test]
fn object_traits_always_resolve() {
	let model = item("a");
	let legend = model.object("legend").unwrap();
	assert_eq!(legend.string("name"), None);
	assert!(legend.stratum_ids().is_empty());

	legend.set_trait(USER, "name", "Legend").unwrap();
	assert_eq!(model.object("legend").unwrap().string("name").as_deref(), Some("Legend"));
	assert_eq!(
		model.get_trait(USER, "legend"),
		Some(StratumValue::Object(StratumData::new().with("name", "Legend")))
	);
}

#[test]
fn add_object_by_id_is_an_upsert() {
	let model = item("a");
	let first = model.add_object(USER, "layers", Some("x")).unwrap().unwrap();
	first.set_trait(USER, "opacity", 0.5).unwrap();
	let second = model.add_object(USER, "layers", Some("x")).unwrap().unwrap();

	let layers = model.objects("layers");
	assert_eq!(layers.len(), 1);
	assert_eq!(layers[0].string("name").as_deref(), Some("x"));
	assert_eq!(second.number("opacity"), Some(0.5));
}

#[test]
fn add_object_returns_merged_element() {
	let model = item("a");
	model
		.add_object(DEFINITION, "layers", Some("x"))
		.unwrap()
		.unwrap()
		.set_trait(DEFINITION, "opacity", 0.2)
		.unwrap();
	let merged = model.add_object(USER, "layers", Some("x")).unwrap().unwrap();
	assert_eq!(merged.stratum_ids(), vec![USER, DEFINITION]);
	assert_eq!(merged.number("opacity"), Some(0.2));
}

#[test]
fn add_object_without_id_goes_after_every_stratum() {
	let model = item("a");
	model.add_object(DEFINITION, "slots", None).unwrap();
	model.add_object(DEFINITION, "slots", None).unwrap();
	assert_eq!(model.objects("slots").len(), 2);

	let added = model.add_object(USER, "slots", None).unwrap().unwrap();
	added.set_trait(USER, "opacity", 0.7).unwrap();
	let slots = model.objects("slots");
	assert_eq!(slots.len(), 3);
	assert_eq!(slots[2].number("opacity"), Some(0.7));
	assert_eq!(added.stratum_ids(), vec![USER]);

	let Some(StratumValue::ObjectArray(user)) = model.get_trait(USER, "slots") else {
		panic!("user stratum should hold an array");
	};
	assert_eq!(user.len(), 3);
}

#[test]
fn add_object_validates_index_ids() {
	let model = item("a");
	assert_eq!(
		model.add_object(USER, "slots", Some("first")).unwrap_err(),
		DeveloperError::InvalidIndex("first".into())
	);
	let third = model.add_object(USER, "slots", Some("2")).unwrap().unwrap();
	third.set_trait(USER, "name", "third").unwrap();
	assert_eq!(model.objects("slots").len(), 3);
	assert!(matches!(
		model.add_object(USER, "name", None),
		Err(DeveloperError::TraitKindMismatch { expected: "object array", .. })
	));
}

#[test]
fn removal_hides_element_added_below() {
	let model = item("a");
	model.add_object(DEFINITION, "layers", Some("x")).unwrap();
	model.add_object(DEFINITION, "layers", Some("y")).unwrap();
	let hidden = model.add_object(USER, "layers", Some("x")).unwrap().unwrap();
	hidden.set_trait(USER, "hidden", true).unwrap();

	let names: Vec<String> = model
		.objects("layers")
		.iter()
		.filter_map(|l| l.string("name"))
		.collect();
	assert_eq!(names, vec!["y"]);
	assert!(model.add_object(DEFINITION, "layers", Some("x")).unwrap().is_none());
}

#[test]
fn duplicate_copies_every_stratum() {
	let catalog = Catalog::new();
	let ty = item_type();
	catalog.register_type(ty.clone());
	let model = Model::new(&ty, Some("orig"), Some(&catalog));
	catalog.add_model(&model).unwrap();
	model.set_trait(DEFINITION, "opacity", 0.6).unwrap();
	model.add_object(USER, "layers", Some("x")).unwrap();
	model.install_stratum(SERVER, server_stratum("served")).unwrap();

	let report = model.duplicate(Some("copy"), Some(&model)).unwrap();
	assert!(report.is_clean());
	let copy = report.value;
	assert_eq!(copy.id(), Some("copy"));
	assert!(copy.source_reference().unwrap().ptr_eq(&model));
	assert!(catalog.get_model_by_id("copy").unwrap().ptr_eq(&copy));
	for name in ["name", "opacity"] {
		assert_eq!(copy.primitive(name), model.primitive(name));
	}
	assert_eq!(copy.objects("layers").len(), 1);
	assert!(copy.raw_stratum(SERVER).unwrap().is_loadable());

	copy.set_trait(DEFINITION, "opacity", 0.1).unwrap();
	assert_eq!(model.number("opacity"), Some(0.6));
}

#[test]
fn duplicate_reports_failed_strata_and_keeps_the_rest() {
	let model = item("a");
	StratumOrder::global().register_load(SERVER);
	model.install_stratum(SERVER, Stratum::loadable(BrokenStratum)).unwrap();
	model.set_trait(USER, "opacity", 0.3).unwrap();

	let report = model.duplicate(None, None).unwrap();
	assert_eq!(report.errors.len(), 1);
	assert!(matches!(&report.errors[0], ModelError::DuplicateStratum { stratum_id, .. } if stratum_id == SERVER));
	assert_eq!(report.value.stratum_ids(), vec![USER]);
	assert_eq!(report.value.number("opacity"), Some(0.3));
	assert!(report.value.id().is_some_and(|id| id != "a"));
}

#[test]
fn duplicate_refuses_taken_id() {
	let catalog = Catalog::new();
	let model = Model::new(&item_type(), Some("a"), Some(&catalog));
	catalog.add_model(&model).unwrap();
	assert_eq!(model.duplicate(Some("a"), None).unwrap_err(), ModelError::DuplicateModelId("a".into()));
}

#[test]
fn group_members_union_and_removal() {
	let catalog = Catalog::new();
	let ty = item_type().with_capabilities(CapabilitySet::GROUP);
	let group = Model::new(&ty, Some("g"), Some(&catalog));
	let child = Model::new(&item_type(), Some("c"), Some(&catalog));
	catalog.add_model(&group).unwrap();
	catalog.add_model(&child).unwrap();

	let view = group.as_group().unwrap();
	view.add_members(DEFINITION, &["a", "b"]).unwrap();
	view.add_members(DEFINITION, &["b"]).unwrap();
	view.add_member_model(USER, &child).unwrap();
	assert_eq!(view.members(), vec!["c"]);
	assert_eq!(child.known_container_ids(), vec!["g"]);
	assert_eq!(view.member_models().len(), 1);

	group.unset_trait(USER, "members").unwrap();
	assert_eq!(view.members(), vec!["a", "b"]);
	view.remove_member("a").unwrap();
	assert_eq!(view.members(), vec!["b"]);
	assert!(child.as_group().is_none());
}

#[test]
fn reference_target_links_back() {
	let ty = item_type().with_capabilities([Capability::Reference, Capability::Url].into_iter().collect());
	let reference = Model::new(&ty, Some("ref"), None);
	let target = item("target");
	let view = reference.as_reference().unwrap();

	assert!(view.set_target(Some(&target)).is_none());
	assert!(view.target().unwrap().ptr_eq(&target));
	assert!(target.source_reference().unwrap().ptr_eq(&reference));

	let previous = view.set_target(None).unwrap();
	assert!(previous.ptr_eq(&target));
	assert!(target.source_reference().is_none());

	reference.set_trait(DEFINITION, "url", "https://example.com/data.json").unwrap();
	assert_eq!(
		reference.as_url().unwrap().url().as_deref(),
		Some("https://example.com/data.json")
	);
}

#[test]
fn string_lists_resolve_to_empty() {
	let model = item("a");
	assert!(model.string_list("members").is_empty());
	model.set_trait(USER, "members", Value::from(vec!["x", "y"])).unwrap();
	assert_eq!(model.string_list("members"), vec!["x", "y"]);
}
