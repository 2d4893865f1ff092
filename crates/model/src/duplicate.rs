//! Model duplication.

use crate::error::{ModelError, Report};
use crate::model::Model;
use crate::source::StrataSource;
use crate::stratum::Stratum;

impl Model {
	/// Creates a model of the same type holding a copy of every stratum.
	///
	/// Plain strata are deep-cloned. Loadable strata rebuild themselves
	/// against the new model through
	/// [`duplicate_loadable_stratum`](crate::LoadableStratum::duplicate_loadable_stratum);
	/// a stratum that fails is left out and reported. The duplicate gets a
	/// random id unless `new_id` is given, and is added to the catalog when
	/// this model has one.
	///
	/// # Errors
	///
	/// Fails if the catalog already holds a model with the new id.
	pub fn duplicate(&self, new_id: Option<&str>, source_reference: Option<&Model>) -> Result<Report<Model>, ModelError> {
		let id = new_id.map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string);
		let catalog = self.catalog();
		if let Some(catalog) = &catalog
			&& catalog.get_model_by_id(&id).is_some()
		{
			return Err(ModelError::DuplicateModelId(id));
		}

		let copy = Model::new(self.model_type(), Some(&id), catalog.as_ref());
		copy.set_source_reference(source_reference);
		let mut report = Report::new(copy);

		for stratum_id in self.stratum_ids() {
			let Some(stratum) = self.raw_stratum(&stratum_id) else {
				continue;
			};
			let duplicated = match stratum {
				Stratum::Plain(data) => Stratum::Plain(data),
				Stratum::Loadable(loadable) => match loadable.duplicate_loadable_stratum(&report.value) {
					Ok(dup) => Stratum::Loadable(dup),
					Err(error) => {
						report.push(ModelError::DuplicateStratum {
							stratum_id,
							reason: format!("{error:#}"),
						});
						continue;
					}
				},
			};
			report.value.install_stratum(&stratum_id, duplicated)?;
		}

		if let Some(catalog) = &catalog {
			catalog.add_model(&report.value)?;
		}
		tracing::debug!(
			domain = "model",
			from = ?self.id(),
			to = %id,
			strata = report.value.stratum_ids().len(),
			failed = report.errors.len(),
			"duplicated model",
		);
		Ok(report)
	}
}
