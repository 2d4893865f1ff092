//! Capability views composed onto model types.
//!
//! A [`ModelType`](crate::ModelType) declares which capabilities its models
//! have; each capability is a thin view over the model's traits.

use serde_json::Value;
use strata_traits::StratumValue;

use crate::access::ModelAccess;
use crate::error::{DeveloperError, ModelError};
use crate::model::Model;
use crate::source::StrataSource;

/// Trait holding a group's member ids.
pub const MEMBERS: &str = "members";
/// Trait holding a model's URL.
pub const URL: &str = "url";

/// A capability a model type can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
	/// Holds an ordered list of member models.
	Group,
	/// Resolves to another model.
	Reference,
	/// Backed by a URL.
	Url,
}

bitflags::bitflags! {
	/// A set of model capabilities.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct CapabilitySet: u8 {
		const GROUP = 1 << 0;
		const REFERENCE = 1 << 1;
		const URL = 1 << 2;
	}
}

impl Capability {
	pub const fn as_set(self) -> CapabilitySet {
		match self {
			Self::Group => CapabilitySet::GROUP,
			Self::Reference => CapabilitySet::REFERENCE,
			Self::Url => CapabilitySet::URL,
		}
	}
}

impl From<Capability> for CapabilitySet {
	fn from(cap: Capability) -> Self {
		cap.as_set()
	}
}

impl FromIterator<Capability> for CapabilitySet {
	fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
		iter.into_iter()
			.fold(CapabilitySet::empty(), |set, cap| set | cap.as_set())
	}
}

impl Model {
	pub fn has_capability(&self, cap: Capability) -> bool {
		self.model_type().capabilities().contains(cap.as_set())
	}

	pub fn as_group(&self) -> Option<GroupView<'_>> {
		self.has_capability(Capability::Group)
			.then_some(GroupView { model: self })
	}

	pub fn as_reference(&self) -> Option<ReferenceView<'_>> {
		self.has_capability(Capability::Reference)
			.then_some(ReferenceView { model: self })
	}

	pub fn as_url(&self) -> Option<UrlView<'_>> {
		self.has_capability(Capability::Url)
			.then_some(UrlView { model: self })
	}
}

fn member_ids(value: Option<StratumValue>) -> Vec<String> {
	match value {
		Some(StratumValue::Primitive(Value::Array(items))) => items
			.into_iter()
			.filter_map(|v| match v {
				Value::String(s) => Some(s),
				_ => None,
			})
			.collect(),
		_ => Vec::new(),
	}
}

fn members_value(ids: Vec<String>) -> StratumValue {
	StratumValue::Primitive(Value::Array(ids.into_iter().map(Value::String).collect()))
}

/// Group access: an ordered member id list.
#[derive(Debug, Clone, Copy)]
pub struct GroupView<'a> {
	model: &'a Model,
}

impl GroupView<'_> {
	/// Resolved member ids.
	pub fn members(&self) -> Vec<String> {
		self.model.string_list(MEMBERS)
	}

	/// Appends ids missing from `stratum_id`'s member list.
	pub fn add_members<S: AsRef<str>>(&self, stratum_id: &str, ids: &[S]) -> Result<(), DeveloperError> {
		let mut members = member_ids(self.model.get_trait(stratum_id, MEMBERS));
		for id in ids {
			let id = id.as_ref();
			if !members.iter().any(|m| m == id) {
				members.push(id.to_string());
			}
		}
		self.model.set_trait(stratum_id, MEMBERS, members_value(members))
	}

	/// Adds `member` and records this group as one of its known containers.
	pub fn add_member_model(&self, stratum_id: &str, member: &Model) -> Result<(), ModelError> {
		let id = member
			.id()
			.ok_or_else(|| ModelError::MissingId(member.type_name().to_string()))?;
		self.add_members(stratum_id, &[id])?;
		if let Some(group_id) = self.model.id() {
			member.add_known_container_id(group_id);
		}
		Ok(())
	}

	/// Removes `id` from every writable stratum's member list.
	///
	/// Loadable strata are left alone; a member they list stays visible.
	pub fn remove_member(&self, id: &str) -> Result<(), DeveloperError> {
		for stratum_id in self.model.stratum_ids() {
			if self
				.model
				.raw_stratum(&stratum_id)
				.is_some_and(|s| s.is_loadable())
			{
				tracing::debug!(domain = "model", stratum = %stratum_id, member = id, "cannot remove member from loadable stratum");
				continue;
			}
			let mut members = member_ids(self.model.get_trait(&stratum_id, MEMBERS));
			let before = members.len();
			members.retain(|m| m != id);
			if members.len() != before {
				self.model
					.set_trait(&stratum_id, MEMBERS, members_value(members))?;
			}
		}
		Ok(())
	}

	/// Live member models; ids not in the catalog yet are skipped.
	pub fn member_models(&self) -> Vec<Model> {
		let Some(catalog) = self.model.catalog() else {
			return Vec::new();
		};
		self.members()
			.iter()
			.filter_map(|id| catalog.get_model_by_id(id))
			.collect()
	}
}

/// Reference access: the model this one resolves to.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceView<'a> {
	model: &'a Model,
}

impl ReferenceView<'_> {
	pub fn target(&self) -> Option<Model> {
		self.model.target()
	}

	/// Replaces the target, pointing the new target's source reference back
	/// at this model. Returns the previous target.
	pub fn set_target(&self, target: Option<&Model>) -> Option<Model> {
		if let Some(target) = target {
			target.set_source_reference(Some(self.model));
		}
		let previous = self.model.replace_target(target.cloned());
		if let Some(previous) = &previous
			&& target.is_none_or(|t| !t.ptr_eq(previous))
			&& previous
				.source_reference()
				.is_some_and(|s| s.ptr_eq(self.model))
		{
			previous.set_source_reference(None);
		}
		previous
	}
}

/// URL access.
#[derive(Debug, Clone, Copy)]
pub struct UrlView<'a> {
	model: &'a Model,
}

impl UrlView<'_> {
	pub fn url(&self) -> Option<String> {
		self.model.string(URL)
	}
}
