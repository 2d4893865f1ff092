//! Startup configuration of extra stratum ids.
//!
//! ```toml
//! [strata]
//! load = ["sdmxJsonDataflow", "magda-record"]
//! definition = []
//! user = []
//! default = []
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::order::{Band, StratumOrder};

/// Errors loading a strata configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to parse strata config: {0}")]
	Parse(#[from] toml::de::Error),
}

/// Stratum ids to register, per band, in declaration order.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BandIds {
	pub default: Vec<String>,
	pub load: Vec<String>,
	pub definition: Vec<String>,
	pub user: Vec<String>,
}

/// Host configuration for the stratum order.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StrataConfig {
	pub strata: BandIds,
}

impl StrataConfig {
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(input)?)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&input)
	}

	/// Registers every configured id. Returns how many ids were new.
	pub fn apply(&self, order: &StratumOrder) -> usize {
		let bands = [
			(Band::Default, &self.strata.default),
			(Band::Load, &self.strata.load),
			(Band::Definition, &self.strata.definition),
			(Band::User, &self.strata.user),
		];
		let added = bands
			.into_iter()
			.flat_map(|(band, ids)| ids.iter().map(move |id| (band, id)))
			.filter(|(band, id)| order.register(id, *band))
			.count();
		tracing::debug!(domain = "strata", added, "applied strata config");
		added
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use pretty_assertions::assert_eq;

	use super::*;
	use crate::order::common::{DEFINITION, USER};

	const CONFIG: &str = r#"
[strata]
load = ["sdmxJsonDataflow", "magda-record"]
user = ["session"]
"#;

	#[test]
	fn parses_partial_bands() {
		let config = StrataConfig::from_toml_str(CONFIG).unwrap();
		assert_eq!(config.strata.load, vec!["sdmxJsonDataflow", "magda-record"]);
		assert_eq!(config.strata.user, vec!["session"]);
		assert!(config.strata.definition.is_empty());
	}

	#[test]
	fn rejects_unknown_bands() {
		let err = StrataConfig::from_toml_str("[strata]\nserver = [\"x\"]\n").unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}

	#[test]
	fn apply_registers_in_band_order() {
		let order = StratumOrder::new();
		let config = StrataConfig::from_toml_str(CONFIG).unwrap();
		assert_eq!(config.apply(&order), 3);
		assert_eq!(config.apply(&order), 0);

		let sorted: Vec<&str> = order
			.sort_top_to_bottom(["magda-record", USER, "session", DEFINITION, "sdmxJsonDataflow"].map(|id| (id, ())))
			.into_iter()
			.map(|(id, ())| id)
			.collect();
		assert_eq!(sorted, vec!["session", USER, DEFINITION, "magda-record", "sdmxJsonDataflow"]);
	}

	#[test]
	fn load_reads_file_and_reports_missing() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(CONFIG.as_bytes()).unwrap();
		let config = StrataConfig::load(file.path()).unwrap();
		assert_eq!(config.strata.load.len(), 2);

		let missing = file.path().with_extension("missing");
		assert!(matches!(StrataConfig::load(&missing), Err(ConfigError::Io { path, .. }) if path == missing));
	}
}
