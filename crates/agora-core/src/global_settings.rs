//! Global settings layer
//!
//! Values set by the operator outside the database: an `agora.conf` TOML
//! file, overridden by `AGORA_<KEY>` environment variables.
//! Site settings declared `shadowed_by_global` take their value from here
//! whenever it is non-empty.

use std::collections::HashMap;
use std::path::Path;

use crate::prelude::*;
use crate::settings::types::LIST_SEPARATOR;

pub const ENV_PREFIX: &str = "AGORA_";

#[derive(Debug, Clone, Default)]
pub struct GlobalSettings {
	values: HashMap<String, String>,
}

impl GlobalSettings {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
		Self { values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
	}

	/// Load the optional config file, then apply the process environment
	pub fn load(path: Option<&Path>) -> ClResult<Self> {
		let mut globals = Self::new();
		if let Some(path) = path {
			match std::fs::read_to_string(path) {
				Ok(contents) => {
					globals.values = parse_conf(&contents)?;
					info!("Loaded {} global settings from {}", globals.values.len(), path.display());
				}
				Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
					debug!("No global settings file at {}", path.display());
				}
				Err(err) => return Err(err.into()),
			}
		}
		globals.apply_env(std::env::vars());
		Ok(globals)
	}

	/// Apply `AGORA_*` variables; the remainder of the name, lower-cased, is the key
	pub fn apply_env(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
		for (key, value) in vars {
			if let Some(name) = key.strip_prefix(ENV_PREFIX) {
				self.values.insert(name.to_ascii_lowercase(), value);
			}
		}
	}

	/// Non-empty value for `name`
	pub fn get(&self, name: &str) -> Option<&str> {
		self.values.get(name).map(String::as_str).filter(|v| !v.is_empty())
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

/// Parse the TOML config file into flat string values.
///
/// Top-level scalars become settings. Tables are flattened into dotted keys.
pub fn parse_conf(contents: &str) -> ClResult<HashMap<String, String>> {
	let table: toml::Table = toml::from_str(contents)
		.map_err(|err| Error::ConfigError(format!("agora.conf: {}", err.message())))?;
	let mut values = HashMap::new();
	flatten("", table, &mut values)?;
	Ok(values)
}

fn flatten(prefix: &str, table: toml::Table, values: &mut HashMap<String, String>) -> ClResult<()> {
	for (key, value) in table {
		let key = key.to_ascii_lowercase();
		let key = if prefix.is_empty() { key } else { format!("{}.{}", prefix, key) };
		let value = match value {
			toml::Value::String(s) => s,
			toml::Value::Integer(i) => i.to_string(),
			toml::Value::Float(f) => f.to_string(),
			toml::Value::Boolean(b) => b.to_string(),
			toml::Value::Datetime(dt) => dt.to_string(),
			toml::Value::Array(items) => items
				.into_iter()
				.map(|item| match item {
					toml::Value::String(s) => Ok(s),
					other => Err(Error::ConfigError(format!(
						"{}: list items must be strings, got {}",
						key,
						other.type_str()
					))),
				})
				.collect::<ClResult<Vec<_>>>()?
				.join(LIST_SEPARATOR),
			toml::Value::Table(inner) => {
				flatten(&key, inner, values)?;
				continue;
			}
		};
		values.insert(key, value);
	}
	Ok(())
}


// vim: ts=4
