use strata_traits::TraitError;

/// Programmer errors: misuse of the engine that normal operation never
/// produces. Callers should not try to recover from these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeveloperError {
	/// A stratum id was used before being registered with the stratum order.
	#[error("stratum '{0}' is not registered with the stratum order")]
	UnregisteredStratum(String),

	/// A write targeted a loadable (computed) stratum.
	#[error("stratum '{0}' is loadable and cannot be written; add a higher-priority stratum instead")]
	ReadOnlyStratum(String),

	/// A programmatic access named a trait the traits class does not define.
	#[error("'{traits}' has no trait named '{trait_name}'")]
	UnknownTrait {
		/// Name of the traits class.
		traits: String,
		/// The missing trait.
		trait_name: String,
	},

	/// A value or operation does not fit the trait's kind.
	#[error("trait '{trait_name}' is a {actual} trait, not {expected}")]
	TraitKindMismatch {
		/// The trait name.
		trait_name: String,
		/// What the operation needs.
		expected: &'static str,
		/// What the trait is.
		actual: &'static str,
	},

	/// Two models with different traits classes were combined.
	#[error("cannot combine models with different traits: '{top}' and '{bottom}'")]
	TraitsMismatch {
		/// Traits class of the top model.
		top: String,
		/// Traits class of the bottom model.
		bottom: String,
	},

	/// An index-keyed object array was addressed with a non-numeric id.
	#[error("'{0}' is not a valid element index")]
	InvalidIndex(String),
}

/// Recoverable errors, collected into a [`Report`] by multi-item operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
	#[error(transparent)]
	Developer(#[from] DeveloperError),

	/// A JSON key did not name a trait of the model's type.
	#[error("the property '{property}' is not valid for type '{model_type}'")]
	UnknownProperty {
		/// The unrecognized key.
		property: String,
		/// The model type.
		model_type: String,
	},

	/// One trait's JSON value failed to convert.
	#[error("failed to convert '{trait_name}': {source}")]
	Conversion {
		/// The trait being updated.
		trait_name: String,
		/// The underlying conversion failure.
		#[source]
		source: TraitError,
	},

	/// One stratum could not be duplicated.
	#[error("failed to duplicate stratum '{stratum_id}': {reason}")]
	DuplicateStratum {
		/// The stratum that failed.
		stratum_id: String,
		/// Why it failed.
		reason: String,
	},

	/// The known-container chain loops back on itself.
	#[error("container cycle detected at '{0}'")]
	ContainerCycle(String),

	/// No model type is registered under this name.
	#[error("unknown model type '{0}'")]
	UnknownType(String),

	/// A model without an id cannot be indexed or upserted.
	#[error("model of type '{0}' has no id")]
	MissingId(String),

	/// A model with this id already exists in the catalog.
	#[error("a model with id '{0}' already exists")]
	DuplicateModelId(String),

	/// Model JSON was not an object.
	#[error("expected a JSON object, got {0}")]
	NotAnObject(&'static str),

	/// The operation needs a catalog but the model's catalog was dropped.
	#[error("model '{0}' is not attached to a catalog")]
	Detached(String),
}

/// A value together with every recoverable error met while producing it.
#[derive(Debug, Clone)]
pub struct Report<T> {
	pub value: T,
	pub errors: Vec<ModelError>,
}

impl<T> Report<T> {
	pub fn new(value: T) -> Self {
		Self {
			value,
			errors: Vec::new(),
		}
	}

	/// Returns true if no errors were recorded.
	pub fn is_clean(&self) -> bool {
		self.errors.is_empty()
	}

	/// Records an error and logs it.
	pub(crate) fn push(&mut self, error: ModelError) {
		tracing::warn!(domain = "model", error = %error, "recoverable model error");
		self.errors.push(error);
	}

	pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Report<U> {
		Report {
			value: f(self.value),
			errors: self.errors,
		}
	}

	/// Returns the value, or the first error if any were recorded.
	pub fn into_result(self) -> Result<T, ModelError> {
		match self.errors.into_iter().next() {
			Some(error) => Err(error),
			None => Ok(self.value),
		}
	}
}
