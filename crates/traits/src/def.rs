use std::sync::Arc;

use serde_json::Value;

use crate::class::TraitsClass;
use crate::error::TraitError;
use crate::value::{StratumData, StratumValue};

/// Owner information handed to JSON conversion hooks.
///
/// Hooks see who owns the value and which stratum it is written to, never the
/// model itself, so they cannot depend on other strata.
#[derive(Debug, Clone, Copy)]
pub struct ConversionContext<'a> {
	/// Id of the owning model, if it has one.
	pub owner_id: Option<&'a str>,
	/// Type name of the owning model.
	pub owner_type: &'a str,
	/// Stratum the converted value is written to.
	pub stratum_id: &'a str,
}

pub type FromJsonFn = fn(&ConversionContext<'_>, &Value) -> Result<StratumValue, TraitError>;
pub type ToJsonFn = fn(&StratumValue) -> Value;

/// Declared type of a primitive trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
	String,
	Number,
	Integer,
	Boolean,
	StringList,
	/// Any JSON value, stored as-is.
	Json,
}

impl PrimitiveType {
	/// Returns true if `value` is acceptable for this type (ignoring `null`).
	pub fn matches(self, value: &Value) -> bool {
		match self {
			PrimitiveType::String => value.is_string(),
			PrimitiveType::Number => value.is_number(),
			PrimitiveType::Integer => value.is_i64() || value.is_u64(),
			PrimitiveType::Boolean => value.is_boolean(),
			PrimitiveType::StringList => value
				.as_array()
				.is_some_and(|items| items.iter().all(Value::is_string)),
			PrimitiveType::Json => true,
		}
	}

	pub fn type_name(self) -> &'static str {
		match self {
			PrimitiveType::String => "string",
			PrimitiveType::Number => "number",
			PrimitiveType::Integer => "integer",
			PrimitiveType::Boolean => "boolean",
			PrimitiveType::StringList => "string list",
			PrimitiveType::Json => "json",
		}
	}
}

/// How elements of an object-array trait are matched across strata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdProperty {
	/// Match by array position.
	Index,
	/// Match by the value of a nested primitive trait. Elements that do not
	/// set it fall back to matching by position.
	Field(String),
}

impl IdProperty {
	pub fn field(name: impl Into<String>) -> Self {
		IdProperty::Field(name.into())
	}
}

/// Identity of one element of an object-array trait.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementKey {
	Id(String),
	Index(usize),
}

impl ElementKey {
	/// Computes the key of `element` found at `position` in a stratum's array.
	pub fn of(id_property: &IdProperty, element: &StratumData, position: usize) -> Self {
		match id_property {
			IdProperty::Index => ElementKey::Index(position),
			IdProperty::Field(field) => match element.primitive(field) {
				Some(Value::String(s)) => ElementKey::Id(s.clone()),
				Some(Value::Number(n)) => ElementKey::Id(n.to_string()),
				Some(Value::Bool(b)) => ElementKey::Id(b.to_string()),
				_ => ElementKey::Index(position),
			},
		}
	}
}

impl std::fmt::Display for ElementKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ElementKey::Id(id) => f.write_str(id),
			ElementKey::Index(i) => write!(f, "#{i}"),
		}
	}
}

/// How the elements of an object-array trait combine across strata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MergeStrategy {
	/// Elements of every stratum are merged by key.
	#[default]
	All,
	/// Only keys present in the topmost stratum setting the array survive.
	/// Surviving elements still merge with lower strata.
	TopStratum,
	/// An element's values come only from the topmost stratum defining it.
	None,
}

/// The shape of a trait.
#[derive(Debug, Clone)]
pub enum TraitKind {
	Primitive(PrimitiveType),
	/// A single nested object.
	Object(Arc<TraitsClass>),
	/// An array of nested objects merged element-wise across strata.
	ObjectArray {
		class: Arc<TraitsClass>,
		id_property: IdProperty,
		merge: MergeStrategy,
	},
}

impl TraitKind {
	pub fn kind_name(&self) -> &'static str {
		match self {
			TraitKind::Primitive(_) => "primitive",
			TraitKind::Object(_) => "object",
			TraitKind::ObjectArray { .. } => "object array",
		}
	}

	/// Returns true if `value` has the shape this kind stores.
	pub fn accepts(&self, value: &StratumValue) -> bool {
		matches!(
			(self, value),
			(TraitKind::Primitive(_), StratumValue::Primitive(_))
				| (TraitKind::Object(_), StratumValue::Object(_))
				| (TraitKind::ObjectArray { .. }, StratumValue::ObjectArray(_))
		)
	}

	/// Nested traits class of object and object-array traits.
	pub fn nested_class(&self) -> Option<&Arc<TraitsClass>> {
		match self {
			TraitKind::Primitive(_) => None,
			TraitKind::Object(class) | TraitKind::ObjectArray { class, .. } => Some(class),
		}
	}
}

/// Definition of one named property of a traits class.
#[derive(Debug, Clone)]
pub struct TraitDef {
	pub name: String,
	pub description: String,
	pub kind: TraitKind,
	/// Value resolved when no stratum sets the trait. Only meaningful for
	/// primitive traits.
	pub default: Option<Value>,
	pub nullable: bool,
	pub from_json: Option<FromJsonFn>,
	pub to_json: Option<ToJsonFn>,
}

impl TraitDef {
	fn with_kind(name: impl Into<String>, kind: TraitKind) -> Self {
		Self {
			name: name.into(),
			description: String::new(),
			kind,
			default: None,
			nullable: false,
			from_json: None,
			to_json: None,
		}
	}

	pub fn primitive(name: impl Into<String>, ty: PrimitiveType) -> Self {
		Self::with_kind(name, TraitKind::Primitive(ty))
	}

	pub fn object(name: impl Into<String>, class: &Arc<TraitsClass>) -> Self {
		Self::with_kind(name, TraitKind::Object(class.clone()))
	}

	pub fn object_array(name: impl Into<String>, class: &Arc<TraitsClass>, id_property: IdProperty) -> Self {
		Self::with_kind(
			name,
			TraitKind::ObjectArray {
				class: class.clone(),
				id_property,
				merge: MergeStrategy::All,
			},
		)
	}

	pub fn describe(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();
		self
	}

	pub fn default_value(mut self, value: Value) -> Self {
		self.default = Some(value);
		self
	}

	pub fn nullable(mut self) -> Self {
		self.nullable = true;
		self
	}

	/// Sets how an object-array trait merges elements. No effect on other kinds.
	pub fn merge_strategy(mut self, strategy: MergeStrategy) -> Self {
		if let TraitKind::ObjectArray { merge, .. } = &mut self.kind {
			*merge = strategy;
		}
		self
	}

	/// Disables element-wise merging of an object-array trait.
	pub fn no_merge(self) -> Self {
		self.merge_strategy(MergeStrategy::None)
	}

	/// Merge strategy of an object-array trait.
	pub fn merge(&self) -> Option<MergeStrategy> {
		match &self.kind {
			TraitKind::ObjectArray { merge, .. } => Some(*merge),
			_ => None,
		}
	}

	pub fn from_json_with(mut self, f: FromJsonFn) -> Self {
		self.from_json = Some(f);
		self
	}

	pub fn to_json_with(mut self, f: ToJsonFn) -> Self {
		self.to_json = Some(f);
		self
	}

	/// Id property of an object-array trait.
	pub fn id_property(&self) -> Option<&IdProperty> {
		match &self.kind {
			TraitKind::ObjectArray { id_property, .. } => Some(id_property),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn merge_strategy_applies_only_to_object_arrays() {
		let inner = TraitsClass::builder("Inner").build();
		let array = TraitDef::object_array("items", &inner, IdProperty::Index);
		assert_eq!(array.merge(), Some(MergeStrategy::All));
		assert_eq!(
			array.clone().merge_strategy(MergeStrategy::TopStratum).merge(),
			Some(MergeStrategy::TopStratum)
		);
		assert_eq!(array.no_merge().merge(), Some(MergeStrategy::None));

		let name = TraitDef::primitive("name", PrimitiveType::String).no_merge();
		assert_eq!(name.merge(), None);
	}
}
