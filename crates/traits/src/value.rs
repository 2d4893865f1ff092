//! Raw per-stratum trait values.
//!
//! A [`StratumData`] is the plain property bag stored for one `(model, stratum)`
//! pair. Keys are trait names; a key that is absent means "not set here".
//! Nested object and object-array traits store nested bags so that the same
//! resolution rules apply at every depth.

use indexmap::IndexMap;
use serde_json::Value;

/// A value stored for one trait in one stratum.
#[derive(Debug, Clone, PartialEq)]
pub enum StratumValue {
	/// Scalar or free-form JSON value of a primitive trait.
	Primitive(Value),
	/// Nested bag of an object trait.
	Object(StratumData),
	/// Elements of an object-array trait, in stratum-local order.
	ObjectArray(Vec<StratumData>),
}

impl StratumValue {
	/// Returns the primitive JSON value if this is a `Primitive` variant.
	pub fn as_primitive(&self) -> Option<&Value> {
		match self {
			StratumValue::Primitive(v) => Some(v),
			_ => None,
		}
	}

	/// Returns the nested bag if this is an `Object` variant.
	pub fn as_object(&self) -> Option<&StratumData> {
		match self {
			StratumValue::Object(v) => Some(v),
			_ => None,
		}
	}

	/// Returns the elements if this is an `ObjectArray` variant.
	pub fn as_object_array(&self) -> Option<&[StratumData]> {
		match self {
			StratumValue::ObjectArray(v) => Some(v),
			_ => None,
		}
	}

	/// Returns the kind name of this value.
	pub fn kind_name(&self) -> &'static str {
		match self {
			StratumValue::Primitive(_) => "primitive",
			StratumValue::Object(_) => "object",
			StratumValue::ObjectArray(_) => "object array",
		}
	}
}

impl From<Value> for StratumValue {
	fn from(v: Value) -> Self {
		StratumValue::Primitive(v)
	}
}

impl From<&str> for StratumValue {
	fn from(v: &str) -> Self {
		StratumValue::Primitive(Value::String(v.to_string()))
	}
}

impl From<String> for StratumValue {
	fn from(v: String) -> Self {
		StratumValue::Primitive(Value::String(v))
	}
}

impl From<bool> for StratumValue {
	fn from(v: bool) -> Self {
		StratumValue::Primitive(Value::Bool(v))
	}
}

impl From<i64> for StratumValue {
	fn from(v: i64) -> Self {
		StratumValue::Primitive(Value::from(v))
	}
}

impl From<f64> for StratumValue {
	fn from(v: f64) -> Self {
		StratumValue::Primitive(Value::from(v))
	}
}

impl From<StratumData> for StratumValue {
	fn from(v: StratumData) -> Self {
		StratumValue::Object(v)
	}
}

impl From<Vec<StratumData>> for StratumValue {
	fn from(v: Vec<StratumData>) -> Self {
		StratumValue::ObjectArray(v)
	}
}

/// Trait values set by a single stratum.
///
/// Insertion order is preserved so serialized strata are stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StratumData {
	values: IndexMap<String, StratumValue>,
}

impl StratumData {
	/// Creates an empty bag.
	pub fn new() -> Self {
		Self::default()
	}

	/// Gets a trait value, returning `None` if this stratum does not set it.
	pub fn get(&self, name: &str) -> Option<&StratumValue> {
		self.values.get(name)
	}

	/// Gets a mutable trait value.
	pub fn get_mut(&mut self, name: &str) -> Option<&mut StratumValue> {
		self.values.get_mut(name)
	}

	/// Gets a primitive trait value.
	pub fn primitive(&self, name: &str) -> Option<&Value> {
		self.get(name).and_then(StratumValue::as_primitive)
	}

	/// Gets a primitive trait value as a string slice.
	pub fn get_str(&self, name: &str) -> Option<&str> {
		self.primitive(name).and_then(Value::as_str)
	}

	/// Gets a primitive trait value as a float.
	pub fn get_f64(&self, name: &str) -> Option<f64> {
		self.primitive(name).and_then(Value::as_f64)
	}

	/// Gets a primitive trait value as a boolean.
	pub fn get_bool(&self, name: &str) -> Option<bool> {
		self.primitive(name).and_then(Value::as_bool)
	}

	/// Returns `true` if the trait is set in this stratum.
	pub fn contains(&self, name: &str) -> bool {
		self.values.contains_key(name)
	}

	/// Sets a trait value, returning the previous one.
	pub fn set(&mut self, name: impl Into<String>, value: impl Into<StratumValue>) -> Option<StratumValue> {
		self.values.insert(name.into(), value.into())
	}

	/// Sets or unsets a trait value. `None` is identical to never having set it.
	pub fn put(&mut self, name: &str, value: Option<StratumValue>) -> Option<StratumValue> {
		match value {
			Some(value) => self.values.insert(name.to_string(), value),
			None => self.remove(name),
		}
	}

	/// Removes a trait value, preserving the order of the remaining keys.
	pub fn remove(&mut self, name: &str) -> Option<StratumValue> {
		self.values.shift_remove(name)
	}

	/// Builder form of [`StratumData::set`].
	pub fn with(mut self, name: impl Into<String>, value: impl Into<StratumValue>) -> Self {
		self.set(name, value);
		self
	}

	/// Returns the object-array elements of `name`, creating an empty array if unset.
	///
	/// A non-array value under `name` is replaced.
	pub fn array_entry(&mut self, name: &str) -> &mut Vec<StratumData> {
		if !matches!(self.values.get(name), Some(StratumValue::ObjectArray(_))) {
			self.values
				.insert(name.to_string(), StratumValue::ObjectArray(Vec::new()));
		}
		match self.values.get_mut(name) {
			Some(StratumValue::ObjectArray(items)) => items,
			_ => unreachable!("array entry inserted above"),
		}
	}

	/// Returns the nested bag of `name`, creating an empty one if unset.
	///
	/// A non-object value under `name` is replaced.
	pub fn object_entry(&mut self, name: &str) -> &mut StratumData {
		if !matches!(self.values.get(name), Some(StratumValue::Object(_))) {
			self.values
				.insert(name.to_string(), StratumValue::Object(StratumData::new()));
		}
		match self.values.get_mut(name) {
			Some(StratumValue::Object(data)) => data,
			_ => unreachable!("object entry inserted above"),
		}
	}

	/// Returns the number of traits set in this stratum.
	pub fn len(&self) -> usize {
		self.values.len()
	}

	/// Returns `true` if this stratum sets no traits.
	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Removes every value.
	pub fn clear(&mut self) {
		self.values.clear();
	}

	/// Iterates over set traits in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &StratumValue)> {
		self.values.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Iterates over set trait names in insertion order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.values.keys().map(String::as_str)
	}
}

impl<K: Into<String>, V: Into<StratumValue>> FromIterator<(K, V)> for StratumData {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			values: iter
				.into_iter()
				.map(|(k, v)| (k.into(), v.into()))
				.collect(),
		}
	}
}
