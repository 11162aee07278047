//! Settings types and definitions
//!
//! Core types for the site settings subsystem: the closed set of setting
//! types, the typed value union, setting definitions and the registry.

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use super::enums::EnumProvider;
use crate::prelude::*;

/// Type alias for setting validator function
pub type SettingValidator = Box<dyn Fn(&SettingValue) -> ClResult<()> + Send + Sync>;

/// Validation hook registered for a single setting name, runs after every
/// other check
pub type CustomValidation = Box<dyn Fn(&SettingValue) -> ClResult<()> + Send + Sync>;

/// Separator used for list-typed settings in storage and on the wire
pub const LIST_SEPARATOR: &str = "|";

/// Setting data type
///
/// The numeric codes are persisted alongside every override and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingType {
	String,
	Time,
	Integer,
	Float,
	Bool,
	Null,
	Enum,
	List,
	UrlList,
	HostList,
	CategoryList,
	ValueList,
	Regex,
}

impl SettingType {
	pub const ALL: [SettingType; 13] = [
		SettingType::String,
		SettingType::Time,
		SettingType::Integer,
		SettingType::Float,
		SettingType::Bool,
		SettingType::Null,
		SettingType::Enum,
		SettingType::List,
		SettingType::UrlList,
		SettingType::HostList,
		SettingType::CategoryList,
		SettingType::ValueList,
		SettingType::Regex,
	];

	pub fn code(self) -> i32 {
		match self {
			SettingType::String => 1,
			SettingType::Time => 2,
			SettingType::Integer => 3,
			SettingType::Float => 4,
			SettingType::Bool => 5,
			SettingType::Null => 6,
			SettingType::Enum => 7,
			SettingType::List => 8,
			SettingType::UrlList => 9,
			SettingType::HostList => 10,
			SettingType::CategoryList => 11,
			SettingType::ValueList => 12,
			SettingType::Regex => 13,
		}
	}

	pub fn from_code(code: i32) -> Option<SettingType> {
		Self::ALL.into_iter().find(|t| t.code() == code)
	}

	pub fn name(self) -> &'static str {
		match self {
			SettingType::String => "string",
			SettingType::Time => "time",
			SettingType::Integer => "integer",
			SettingType::Float => "float",
			SettingType::Bool => "bool",
			SettingType::Null => "null",
			SettingType::Enum => "enum",
			SettingType::List => "list",
			SettingType::UrlList => "url_list",
			SettingType::HostList => "host_list",
			SettingType::CategoryList => "category_list",
			SettingType::ValueList => "value_list",
			SettingType::Regex => "regex",
		}
	}

	/// Types whose values are `|`-separated lists
	pub fn is_list(self) -> bool {
		matches!(
			self,
			SettingType::List
				| SettingType::UrlList
				| SettingType::HostList
				| SettingType::CategoryList
				| SettingType::ValueList
		)
	}

	/// Types whose values are plain strings
	pub fn is_text(self) -> bool {
		matches!(self, SettingType::String | SettingType::Time | SettingType::Regex)
	}
}

impl std::fmt::Display for SettingType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

/// Resolved setting value
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
	Null,
	Bool(bool),
	Integer(i64),
	Float(f64),
	String(String),
	List(Vec<String>),
}

impl SettingValue {
	/// Get the type name for error messages
	pub fn type_name(&self) -> &'static str {
		match self {
			SettingValue::Null => "null",
			SettingValue::Bool(_) => "bool",
			SettingValue::Integer(_) => "integer",
			SettingValue::Float(_) => "float",
			SettingValue::String(_) => "string",
			SettingValue::List(_) => "list",
		}
	}

	/// Whether this value belongs to the value space of `data_type`
	pub fn fits(&self, data_type: SettingType) -> bool {
		match data_type {
			SettingType::Null => matches!(self, SettingValue::Null),
			SettingType::Bool => matches!(self, SettingValue::Bool(_)),
			SettingType::Integer => matches!(self, SettingValue::Integer(_)),
			SettingType::Float => matches!(self, SettingValue::Float(_)),
			SettingType::Enum => matches!(self, SettingValue::String(_) | SettingValue::Integer(_)),
			t if t.is_text() => matches!(self, SettingValue::String(_)),
			_ => matches!(self, SettingValue::List(_)),
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			SettingValue::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			SettingValue::Integer(i) => Some(*i),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			SettingValue::Float(f) => Some(*f),
			#[allow(clippy::cast_precision_loss)]
			SettingValue::Integer(i) => Some(*i as f64),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			SettingValue::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[String]> {
		match self {
			SettingValue::List(l) => Some(l),
			_ => None,
		}
	}

	/// Textual form stored in the settings table
	pub fn to_db_value(&self) -> Option<String> {
		match self {
			SettingValue::Null => None,
			SettingValue::Bool(b) => Some(if *b { "t" } else { "f" }.to_string()),
			SettingValue::Integer(i) => Some(i.to_string()),
			SettingValue::Float(f) => Some(f.to_string()),
			SettingValue::String(s) => Some(s.clone()),
			SettingValue::List(l) => Some(l.join(LIST_SEPARATOR)),
		}
	}

	pub fn to_json(&self) -> serde_json::Value {
		match self {
			SettingValue::Null => serde_json::Value::Null,
			SettingValue::Bool(b) => serde_json::Value::Bool(*b),
			SettingValue::Integer(i) => serde_json::Value::from(*i),
			SettingValue::Float(f) => serde_json::Value::from(*f),
			SettingValue::String(s) => serde_json::Value::String(s.clone()),
			SettingValue::List(l) => serde_json::Value::String(l.join(LIST_SEPARATOR)),
		}
	}
}

impl Serialize for SettingValue {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			SettingValue::Null => serializer.serialize_none(),
			SettingValue::Bool(b) => serializer.serialize_bool(*b),
			SettingValue::Integer(i) => serializer.serialize_i64(*i),
			SettingValue::Float(f) => serializer.serialize_f64(*f),
			SettingValue::String(s) => serializer.serialize_str(s),
			SettingValue::List(l) => serializer.serialize_str(&l.join(LIST_SEPARATOR)),
		}
	}
}

/// Setting definition - defines metadata for each setting
pub struct SettingDefinition {
	pub name: String,
	pub data_type: SettingType,
	pub default: SettingValue,

	/// Grouping tag used by the admin UI
	pub category: String,
	pub description: String,

	/// Enum-typed settings take their members from a provider or from `choices`
	pub enum_provider: Option<Arc<dyn EnumProvider>>,
	pub choices: Option<Vec<SettingValue>>,

	pub min: Option<i64>,
	pub max: Option<i64>,
	pub regex: Option<String>,
	pub regex_error: Option<String>,

	/// Not listed in the admin UI
	pub hidden: bool,
	/// Exposed to browsers through the client settings document
	pub client: bool,
	/// Clients must reload after a change
	pub refresh: bool,
	/// A non-empty global value forces this setting and hides it
	pub shadowed_by_global: bool,
	/// Value is masked in the admin UI
	pub secret: bool,

	/// Replaces the built-in validator of the setting's type
	pub validator: Option<SettingValidator>,
}

impl Debug for SettingDefinition {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SettingDefinition")
			.field("name", &self.name)
			.field("data_type", &self.data_type)
			.field("default", &self.default)
			.field("category", &self.category)
			.field("enum_provider", &self.enum_provider.is_some())
			.field("choices", &self.choices)
			.field("min", &self.min)
			.field("max", &self.max)
			.field("regex", &self.regex)
			.field("hidden", &self.hidden)
			.field("client", &self.client)
			.field("refresh", &self.refresh)
			.field("shadowed_by_global", &self.shadowed_by_global)
			.field("secret", &self.secret)
			.field("validator", &self.validator.is_some())
			.finish_non_exhaustive()
	}
}

impl SettingDefinition {
	/// Create a builder for constructing a SettingDefinition
	pub fn builder(name: impl Into<String>) -> SettingDefinitionBuilder {
		SettingDefinitionBuilder::new(name)
	}

	/// Whether `value` is a declared member of this enum setting
	pub fn is_valid_enum_value(&self, value: &SettingValue) -> bool {
		if let Some(provider) = &self.enum_provider {
			return provider.is_valid_value(value);
		}
		self.choices.as_ref().is_some_and(|choices| choices.contains(value))
	}
}

/// Builder for SettingDefinition with fluent API
pub struct SettingDefinitionBuilder {
	name: String,
	data_type: Option<SettingType>,
	default: SettingValue,
	category: String,
	description: String,
	enum_provider: Option<Arc<dyn EnumProvider>>,
	choices: Option<Vec<SettingValue>>,
	min: Option<i64>,
	max: Option<i64>,
	regex: Option<String>,
	regex_error: Option<String>,
	hidden: bool,
	client: bool,
	refresh: bool,
	shadowed_by_global: bool,
	secret: bool,
	validator: Option<SettingValidator>,
}

impl SettingDefinitionBuilder {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			data_type: None,
			default: SettingValue::Null,
			category: "uncategorized".into(),
			description: String::new(),
			enum_provider: None,
			choices: None,
			min: None,
			max: None,
			regex: None,
			regex_error: None,
			hidden: false,
			client: false,
			refresh: false,
			shadowed_by_global: false,
			secret: false,
			validator: None,
		}
	}

	pub fn default(mut self, value: SettingValue) -> Self {
		self.default = value;
		self
	}

	/// Declare the type explicitly. Without it the type is inferred from the
	/// default value.
	pub fn data_type(mut self, data_type: SettingType) -> Self {
		self.data_type = Some(data_type);
		self
	}

	pub fn category(mut self, category: impl Into<String>) -> Self {
		self.category = category.into();
		self
	}

	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = description.into();
		self
	}

	pub fn enum_provider(mut self, provider: Arc<dyn EnumProvider>) -> Self {
		self.enum_provider = Some(provider);
		self.data_type = Some(SettingType::Enum);
		self
	}

	pub fn choices(mut self, choices: impl IntoIterator<Item = SettingValue>) -> Self {
		self.choices = Some(choices.into_iter().collect());
		self
	}

	pub fn min(mut self, min: i64) -> Self {
		self.min = Some(min);
		self
	}

	pub fn max(mut self, max: i64) -> Self {
		self.max = Some(max);
		self
	}

	pub fn regex(mut self, regex: impl Into<String>) -> Self {
		self.regex = Some(regex.into());
		self
	}

	pub fn regex_error(mut self, message: impl Into<String>) -> Self {
		self.regex_error = Some(message.into());
		self
	}

	pub fn hidden(mut self, hidden: bool) -> Self {
		self.hidden = hidden;
		self
	}

	pub fn client(mut self, client: bool) -> Self {
		self.client = client;
		self
	}

	pub fn refresh(mut self, refresh: bool) -> Self {
		self.refresh = refresh;
		self
	}

	pub fn shadowed_by_global(mut self, shadowed: bool) -> Self {
		self.shadowed_by_global = shadowed;
		self
	}

	pub fn secret(mut self, secret: bool) -> Self {
		self.secret = secret;
		self
	}

	/// Set a validation function
	pub fn validator<F>(mut self, f: F) -> Self
	where
		F: Fn(&SettingValue) -> ClResult<()> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(f));
		self
	}

	/// Build the SettingDefinition
	pub fn build(self) -> ClResult<SettingDefinition> {
		let data_type = self.data_type.unwrap_or(match &self.default {
			SettingValue::Null => SettingType::Null,
			SettingValue::Bool(_) => SettingType::Bool,
			SettingValue::Integer(_) => SettingType::Integer,
			SettingValue::Float(_) => SettingType::Float,
			SettingValue::String(_) => SettingType::String,
			SettingValue::List(_) => SettingType::List,
		});

		// A missing default is only meaningful for textual and list types
		let default = match (self.default, data_type) {
			(SettingValue::Null, t) if t.is_text() => SettingValue::String(String::new()),
			(SettingValue::Null, t) if t.is_list() => SettingValue::List(Vec::new()),
			(SettingValue::String(s), t) if t.is_list() => {
				SettingValue::List(super::convert::split_list(&s))
			}
			(default, _) => default,
		};

		if !default.fits(data_type) {
			return Err(Error::ConfigError(format!(
				"Default of setting '{}' is {}, expected {}",
				self.name,
				default.type_name(),
				data_type
			)));
		}

		if data_type == SettingType::Enum && self.enum_provider.is_none() && self.choices.is_none()
		{
			return Err(Error::ConfigError(format!(
				"Enum setting '{}' needs an enum provider or choices",
				self.name
			)));
		}

		if self.shadowed_by_global && self.client {
			tracing::warn!(
				"Setting '{}' is both client-visible and shadowed by global - this is unusual",
				self.name
			);
		}

		Ok(SettingDefinition {
			name: self.name,
			data_type,
			default,
			category: self.category,
			description: self.description,
			enum_provider: self.enum_provider,
			choices: self.choices,
			min: self.min,
			max: self.max,
			regex: self.regex,
			regex_error: self.regex_error,
			hidden: self.hidden,
			client: self.client,
			refresh: self.refresh,
			shadowed_by_global: self.shadowed_by_global,
			secret: self.secret,
			validator: self.validator,
		})
	}
}

/// Mutable registry used during app initialization
pub struct SettingsRegistry {
	definitions: HashMap<String, SettingDefinition>,
	custom_validations: HashMap<String, CustomValidation>,
}

impl SettingsRegistry {
	pub fn new() -> Self {
		Self { definitions: HashMap::new(), custom_validations: HashMap::new() }
	}

	/// Register a new setting definition
	pub fn register(&mut self, def: SettingDefinition) -> ClResult<()> {
		if self.definitions.contains_key(&def.name) {
			return Err(Error::ConfigError(format!("Setting '{}' is already registered", def.name)));
		}

		tracing::debug!("Registering setting: {} ({})", def.name, def.data_type);
		self.definitions.insert(def.name.clone(), def);
		Ok(())
	}

	/// Attach a validation hook that runs after type coercion and validators
	pub fn add_validation<F>(&mut self, name: &str, f: F) -> ClResult<()>
	where
		F: Fn(&SettingValue) -> ClResult<()> + Send + Sync + 'static,
	{
		if !self.definitions.contains_key(name) {
			return Err(Error::ConfigError(format!("Setting '{}' is not registered", name)));
		}
		self.custom_validations.insert(name.to_string(), Box::new(f));
		Ok(())
	}

	/// Freeze the registry (make it immutable)
	pub fn freeze(self) -> FrozenSettingsRegistry {
		tracing::info!("Freezing settings registry with {} definitions", self.definitions.len());
		FrozenSettingsRegistry {
			definitions: self.definitions,
			custom_validations: self.custom_validations,
		}
	}

	pub fn len(&self) -> usize {
		self.definitions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.definitions.is_empty()
	}
}

impl Default for SettingsRegistry {
	fn default() -> Self {
		Self::new()
	}
}

/// Immutable registry stored in AppState
pub struct FrozenSettingsRegistry {
	definitions: HashMap<String, SettingDefinition>,
	custom_validations: HashMap<String, CustomValidation>,
}

impl FrozenSettingsRegistry {
	pub fn get(&self, name: &str) -> Option<&SettingDefinition> {
		self.definitions.get(name)
	}

	pub fn contains(&self, name: &str) -> bool {
		self.definitions.contains_key(name)
	}

	pub fn custom_validation(&self, name: &str) -> Option<&CustomValidation> {
		self.custom_validations.get(name)
	}

	/// List all registered settings, ordered by name
	pub fn list(&self) -> Vec<&SettingDefinition> {
		let mut defs: Vec<_> = self.definitions.values().collect();
		defs.sort_by(|a, b| a.name.cmp(&b.name));
		defs
	}

	/// Declared defaults of every setting
	pub fn defaults(&self) -> HashMap<String, SettingValue> {
		self.definitions.iter().map(|(name, def)| (name.clone(), def.default.clone())).collect()
	}

	pub fn client_names(&self) -> impl Iterator<Item = &str> {
		self.definitions.values().filter(|def| def.client).map(|def| def.name.as_str())
	}

	pub fn len(&self) -> usize {
		self.definitions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.definitions.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_type_codes_roundtrip() {
		for t in SettingType::ALL {
			assert_eq!(SettingType::from_code(t.code()), Some(t));
		}
		assert_eq!(SettingType::from_code(99), None);
		assert_eq!(SettingType::Integer.code(), 3);
		assert_eq!(SettingType::Regex.code(), 13);
	}

	#[test]
	fn test_type_inferred_from_default() {
		let def = SettingDefinition::builder("max_users")
			.default(SettingValue::Integer(10))
			.build()
			.unwrap();
		assert_eq!(def.data_type, SettingType::Integer);

		let def = SettingDefinition::builder("title")
			.default(SettingValue::String("Agora".into()))
			.build()
			.unwrap();
		assert_eq!(def.data_type, SettingType::String);

		let def = SettingDefinition::builder("unset").build().unwrap();
		assert_eq!(def.data_type, SettingType::Null);
	}

	#[test]
	fn test_list_default_from_string() {
		let def = SettingDefinition::builder("allowed_hosts")
			.data_type(SettingType::HostList)
			.default(SettingValue::String("a.com|b.com".into()))
			.build()
			.unwrap();
		assert_eq!(def.default, SettingValue::List(vec!["a.com".into(), "b.com".into()]));
	}

	#[test]
	fn test_mismatched_default_rejected() {
		let res = SettingDefinition::builder("max_users")
			.data_type(SettingType::Integer)
			.default(SettingValue::String("ten".into()))
			.build();
		assert!(matches!(res, Err(Error::ConfigError(_))));
	}

	#[test]
	fn test_enum_requires_members() {
		let res = SettingDefinition::builder("layout")
			.data_type(SettingType::Enum)
			.default(SettingValue::String("wide".into()))
			.build();
		assert!(matches!(res, Err(Error::ConfigError(_))));
	}

	#[test]
	fn test_duplicate_registration() {
		let mut registry = SettingsRegistry::new();
		let def = || SettingDefinition::builder("title").default(SettingValue::String("x".into()));
		registry.register(def().build().unwrap()).unwrap();
		assert!(registry.register(def().build().unwrap()).is_err());
		assert_eq!(registry.len(), 1);
	}

	#[test]
	fn test_list_value_serializes_joined() {
		let value = SettingValue::List(vec!["a".into(), "b".into()]);
		assert_eq!(serde_json::to_string(&value).unwrap(), "\"a|b\"");
		assert_eq!(value.to_db_value().as_deref(), Some("a|b"));
		assert_eq!(SettingValue::List(vec!["solo".into()]).to_db_value().as_deref(), Some("solo"));
		assert_eq!(SettingValue::List(Vec::new()).to_db_value().as_deref(), Some(""));
		assert_eq!(SettingValue::Bool(true).to_db_value().as_deref(), Some("t"));
	}
}

// vim: ts=4
