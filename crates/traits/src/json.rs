//! Default JSON conversion for trait values.
//!
//! Per-trait `from_json`/`to_json` hooks replace the default for that trait
//! only; nested classes still convert their own traits.

use serde_json::{Map, Value};

use crate::class::TraitsClass;
use crate::def::{ConversionContext, TraitDef, TraitKind};
use crate::error::{TraitError, json_type_name};
use crate::value::{StratumData, StratumValue};

/// A conversion result that carries every per-key failure alongside the value.
#[derive(Debug, Clone, PartialEq)]
pub struct Converted<T> {
	pub value: T,
	pub errors: Vec<TraitError>,
}

impl<T> Converted<T> {
	fn ok(value: T) -> Self {
		Self { value, errors: Vec::new() }
	}
}

/// Converts `json` into a value for the trait `def`.
///
/// `value` is `None` when the whole value was rejected.
pub fn trait_from_json(def: &TraitDef, ctx: &ConversionContext<'_>, json: &Value) -> Converted<Option<StratumValue>> {
	if let Some(hook) = def.from_json {
		return match hook(ctx, json) {
			Ok(value) => Converted::ok(Some(value)),
			Err(error) => Converted {
				value: None,
				errors: vec![error],
			},
		};
	}

	if json.is_null() {
		return if def.nullable {
			Converted::ok(Some(StratumValue::Primitive(Value::Null)))
		} else {
			Converted {
				value: None,
				errors: vec![TraitError::NotNullable(def.name.clone())],
			}
		};
	}

	match &def.kind {
		TraitKind::Primitive(ty) => {
			if ty.matches(json) {
				Converted::ok(Some(StratumValue::Primitive(json.clone())))
			} else {
				Converted {
					value: None,
					errors: vec![mismatch(&def.name, ty.type_name(), json)],
				}
			}
		}
		TraitKind::Object(class) => match json.as_object() {
			Some(map) => {
				let converted = class_from_json(class, ctx, map);
				Converted {
					value: Some(StratumValue::Object(converted.value)),
					errors: converted.errors,
				}
			}
			None => Converted {
				value: None,
				errors: vec![mismatch(&def.name, "object", json)],
			},
		},
		TraitKind::ObjectArray { class, .. } => {
			let Some(items) = json.as_array() else {
				return Converted {
					value: None,
					errors: vec![mismatch(&def.name, "array", json)],
				};
			};
			let mut errors = Vec::new();
			let mut elements = Vec::with_capacity(items.len());
			for item in items {
				match item.as_object() {
					Some(map) => {
						let converted = class_from_json(class, ctx, map);
						errors.extend(converted.errors);
						elements.push(converted.value);
					}
					None => errors.push(mismatch(&def.name, "object", item)),
				}
			}
			Converted {
				value: Some(StratumValue::ObjectArray(elements)),
				errors,
			}
		}
	}
}

/// Converts a JSON object into a stratum bag for `class`, skipping and
/// reporting unknown keys and values that fail conversion.
pub fn class_from_json(class: &TraitsClass, ctx: &ConversionContext<'_>, map: &Map<String, Value>) -> Converted<StratumData> {
	let mut data = StratumData::new();
	let mut errors = Vec::new();
	for (key, json) in map {
		let Some(def) = class.get(key) else {
			errors.push(TraitError::UnknownProperty {
				property: key.clone(),
				traits: class.name().to_string(),
			});
			continue;
		};
		let converted = trait_from_json(def, ctx, json);
		errors.extend(converted.errors);
		if let Some(value) = converted.value {
			data.set(key.as_str(), value);
		}
	}
	Converted { value: data, errors }
}

/// Converts a stored value of the trait `def` to JSON.
pub fn trait_to_json(def: &TraitDef, value: &StratumValue) -> Value {
	if let Some(hook) = def.to_json {
		return hook(value);
	}
	match (&def.kind, value) {
		(TraitKind::Object(class), StratumValue::Object(data)) => Value::Object(class_to_json(class, data)),
		(TraitKind::ObjectArray { class, .. }, StratumValue::ObjectArray(items)) => Value::Array(
			items
				.iter()
				.map(|item| Value::Object(class_to_json(class, item)))
				.collect(),
		),
		_ => raw_to_json(value),
	}
}

/// Converts a stratum bag of `class` to a JSON object.
pub fn class_to_json(class: &TraitsClass, data: &StratumData) -> Map<String, Value> {
	data.iter()
		.map(|(key, value)| {
			let json = match class.get(key) {
				Some(def) => trait_to_json(def, value),
				None => raw_to_json(value),
			};
			(key.to_string(), json)
		})
		.collect()
}

/// Structural conversion without trait definitions.
pub fn raw_to_json(value: &StratumValue) -> Value {
	match value {
		StratumValue::Primitive(v) => v.clone(),
		StratumValue::Object(data) => raw_data_to_json(data),
		StratumValue::ObjectArray(items) => Value::Array(items.iter().map(raw_data_to_json).collect()),
	}
}

fn raw_data_to_json(data: &StratumData) -> Value {
	Value::Object(
		data.iter()
			.map(|(k, v)| (k.to_string(), raw_to_json(v)))
			.collect(),
	)
}

fn mismatch(trait_name: &str, expected: &'static str, got: &Value) -> TraitError {
	TraitError::TypeMismatch {
		trait_name: trait_name.to_string(),
		expected,
		got: json_type_name(got),
	}
}
