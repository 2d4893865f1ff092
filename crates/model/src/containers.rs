//! Known-container chains.

use rustc_hash::FxHashSet as HashSet;

use crate::catalog::Catalog;
use crate::error::{ModelError, Report};
use crate::model::Model;

struct Walk<'a> {
	catalog: Option<&'a Catalog>,
	on_path: HashSet<String>,
	done: HashSet<String>,
	report: Report<Vec<String>>,
}

impl Walk<'_> {
	fn visit(&mut self, id: &str) {
		if self.done.contains(id) {
			return;
		}
		if self.on_path.contains(id) {
			self.report.push(ModelError::ContainerCycle(id.to_string()));
			return;
		}
		if let Some(container) = self.catalog.and_then(|c| c.get_model_by_id(id)) {
			self.on_path.insert(id.to_string());
			for parent in container.known_container_ids() {
				self.visit(&parent);
			}
			self.on_path.remove(id);
		}
		self.done.insert(id.to_string());
		self.report.value.push(id.to_string());
	}
}

impl Model {
	/// Every container above this model, outermost first, without duplicates.
	///
	/// Containers not in the catalog yet are listed but not expanded. A chain
	/// that loops back on itself is cut and reported as
	/// [`ModelError::ContainerCycle`].
	pub fn complete_known_container_unique_ids(&self) -> Report<Vec<String>> {
		let catalog = self.catalog();
		let mut walk = Walk {
			catalog: catalog.as_ref(),
			on_path: HashSet::default(),
			done: HashSet::default(),
			report: Report::new(Vec::new()),
		};
		if let Some(id) = self.id() {
			walk.on_path.insert(id.to_string());
		}
		for id in self.known_container_ids() {
			walk.visit(&id);
		}
		walk.report
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use strata_traits::TraitsClass;

	use super::*;
	use crate::model::ModelType;

	fn add(catalog: &Catalog, id: &str, containers: &[&str]) -> Model {
		let traits = TraitsClass::builder("Empty").build();
		let model = Model::new(&ModelType::new("group", &traits), Some(id), Some(catalog));
		model.set_known_container_ids(containers.iter().map(|s| s.to_string()).collect());
		catalog.add_model(&model).unwrap();
		model
	}

	#[test]
	fn ancestors_come_first() {
		let catalog = Catalog::new();
		add(&catalog, "root", &[]);
		add(&catalog, "a", &["root"]);
		add(&catalog, "b", &["a", "root"]);
		let leaf = add(&catalog, "leaf", &["b"]);

		let report = leaf.complete_known_container_unique_ids();
		assert!(report.is_clean());
		assert_eq!(report.value, vec!["root", "a", "b"]);
	}

	#[test]
	fn unresolved_containers_are_kept_but_not_expanded() {
		let catalog = Catalog::new();
		add(&catalog, "a", &["not-loaded"]);
		let leaf = add(&catalog, "leaf", &["a", "also-missing"]);

		let report = leaf.complete_known_container_unique_ids();
		assert!(report.is_clean());
		assert_eq!(report.value, vec!["not-loaded", "a", "also-missing"]);
	}

	#[test]
	fn cycles_are_cut_and_reported() {
		let catalog = Catalog::new();
		add(&catalog, "a", &["b"]);
		add(&catalog, "b", &["a"]);
		let leaf = add(&catalog, "leaf", &["a"]);

		let report = leaf.complete_known_container_unique_ids();
		assert_eq!(report.value, vec!["b", "a"]);
		assert_eq!(report.errors, vec![ModelError::ContainerCycle("a".into())]);
	}

	#[test]
	fn self_reference_is_a_cycle() {
		let catalog = Catalog::new();
		let looped = add(&catalog, "self", &["self"]);
		let report = looped.complete_known_container_unique_ids();
		assert!(report.value.is_empty());
		assert_eq!(report.errors, vec![ModelError::ContainerCycle("self".into())]);
	}
}
