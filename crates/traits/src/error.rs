/// Failure converting a JSON value into a trait value.
///
/// Conversion failures are per-key: callers collect them and keep going.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TraitError {
	/// The JSON value has the wrong type for the trait.
	#[error("type mismatch for trait '{trait_name}': expected {expected}, got {got}")]
	TypeMismatch {
		/// The trait name.
		trait_name: String,
		/// The expected type name.
		expected: &'static str,
		/// The actual JSON type name.
		got: &'static str,
	},

	/// `null` was given for a trait that does not accept it.
	#[error("trait '{0}' is not nullable")]
	NotNullable(String),

	/// A nested object carried a key that its traits class does not define.
	#[error("the property '{property}' is not valid for '{traits}'")]
	UnknownProperty {
		/// The unrecognized key.
		property: String,
		/// Name of the nested traits class.
		traits: String,
	},

	/// A custom `from_json` hook rejected the value.
	#[error("invalid value for trait '{trait_name}': {reason}")]
	InvalidValue {
		/// The trait name.
		trait_name: String,
		/// Why the hook rejected it.
		reason: String,
	},
}

/// Returns the JSON type name of a value, for error messages.
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
	match value {
		serde_json::Value::Null => "null",
		serde_json::Value::Bool(_) => "boolean",
		serde_json::Value::Number(_) => "number",
		serde_json::Value::String(_) => "string",
		serde_json::Value::Array(_) => "array",
		serde_json::Value::Object(_) => "object",
	}
}
