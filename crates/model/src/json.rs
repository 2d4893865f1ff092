//! Stratum-by-stratum JSON serialization of models.

use serde_json::{Map, Value};
use strata_traits::json::{class_to_json, trait_from_json};
use strata_traits::{ConversionContext, StratumValue};

use crate::access::ModelAccess;
use crate::capability::MEMBERS;
use crate::error::{DeveloperError, ModelError, Report};
use crate::model::Model;
use crate::order::StratumOrder;
use crate::source::StrataSource;

/// Keys of model JSON that never name a trait.
pub const RESERVED_KEYS: [&str; 4] = ["id", "type", "localId", "shareKeys"];

/// Selects which strata [`save_model_to_json`] writes.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
	/// Only these strata, when set.
	pub include_strata: Option<Vec<String>>,
	/// Never these strata.
	pub exclude_strata: Vec<String>,
}

impl SaveOptions {
	pub fn include<S: AsRef<str>>(ids: &[S]) -> Self {
		Self {
			include_strata: Some(ids.iter().map(|s| s.as_ref().to_string()).collect()),
			..Self::default()
		}
	}

	pub fn exclude<S: AsRef<str>>(ids: &[S]) -> Self {
		Self {
			exclude_strata: ids.iter().map(|s| s.as_ref().to_string()).collect(),
			..Self::default()
		}
	}

	fn selects(&self, id: &str) -> bool {
		self.include_strata
			.as_ref()
			.is_none_or(|inc| inc.iter().any(|s| s == id))
			&& !self.exclude_strata.iter().any(|s| s == id)
	}
}

/// Serializes the raw values of each selected stratum, bottom to top, under
/// its stratum id, with `id` and `type` at the top level.
pub fn save_model_to_json(model: &Model, options: &SaveOptions) -> Value {
	let mut out = Map::new();
	if let Some(id) = model.id() {
		out.insert("id".into(), Value::String(id.to_string()));
	}
	out.insert("type".into(), Value::String(model.type_name().to_string()));
	for (id, data) in model.strata_bottom_to_top() {
		if !options.selects(&id) {
			continue;
		}
		out.insert(id, Value::Object(class_to_json(model.traits(), &data)));
	}
	Value::Object(out)
}

/// Applies a JSON object of trait values to one stratum.
///
/// Unknown keys and values that fail conversion are reported and skipped.
/// A `members` list is merged into the stratum's existing list rather than
/// replacing it. With `replace_stratum`, the stratum is cleared first.
///
/// # Errors
///
/// Fails if `stratum_id` is unregistered or names a loadable stratum.
pub fn update_model_from_json(model: &Model, stratum_id: &str, json: &Value, replace_stratum: bool) -> Result<Report<()>, DeveloperError> {
	StratumOrder::global().ensure_registered(stratum_id)?;
	let mut report = Report::new(());
	let Some(map) = json.as_object() else {
		report.push(ModelError::NotAnObject(strata_traits::json_type_name(json)));
		return Ok(report);
	};

	let ctx = ConversionContext {
		owner_id: model.id(),
		owner_type: model.type_name(),
		stratum_id,
	};
	let mut updates: Vec<(String, StratumValue)> = Vec::with_capacity(map.len());
	for (key, value) in map {
		if RESERVED_KEYS.contains(&key.as_str()) {
			continue;
		}
		let Some(def) = model.traits().get(key) else {
			report.push(ModelError::UnknownProperty {
				property: key.clone(),
				model_type: model.type_name().to_string(),
			});
			continue;
		};
		let converted = trait_from_json(def, &ctx, value);
		for source in converted.errors {
			report.push(ModelError::Conversion {
				trait_name: key.clone(),
				source,
			});
		}
		if let Some(value) = converted.value {
			updates.push((key.clone(), value));
		}
	}

	model.update_stratum(stratum_id, &mut |data| {
		if replace_stratum {
			data.clear();
		}
		for (key, value) in updates.drain(..) {
			let value = match (key.as_str(), data.get(MEMBERS), value) {
				(MEMBERS, Some(StratumValue::Primitive(Value::Array(existing))), StratumValue::Primitive(Value::Array(incoming))) => {
					let mut merged = existing.clone();
					for id in incoming {
						if !merged.contains(&id) {
							merged.push(id);
						}
					}
					StratumValue::Primitive(Value::Array(merged))
				}
				(_, _, value) => value,
			};
			data.set(key, value);
		}
	})?;
	Ok(report)
}
