//! Value coercion between raw input, typed values and the stored text form

use serde_json::Value;

use super::types::{FrozenSettingsRegistry, LIST_SEPARATOR, SettingDefinition, SettingType, SettingValue};
use super::validators;
use crate::prelude::*;

/// Infer a data type from the shape of a raw value
pub fn infer_data_type(raw: &Value) -> ClResult<SettingType> {
	match raw {
		Value::Null => Ok(SettingType::Null),
		Value::String(_) => Ok(SettingType::String),
		Value::Bool(_) => Ok(SettingType::Bool),
		Value::Number(n) if n.is_i64() => Ok(SettingType::Integer),
		Value::Number(_) => Ok(SettingType::Float),
		Value::Array(_) | Value::Object(_) => {
			Err(Error::InvalidParameters("value has no setting type".into()))
		}
	}
}

fn is_blank(raw: &Value) -> bool {
	match raw {
		Value::Null => true,
		Value::String(s) => s.is_empty(),
		_ => false,
	}
}

/// Coerce and validate a raw value for setting `name`.
///
/// Returns the typed value together with the type it is stored as. A setting
/// declared without a type takes its type from the first non-empty value.
/// Nothing is persisted here.
pub fn normalize_and_validate_setting(
	registry: &FrozenSettingsRegistry,
	name: &str,
	raw: &Value,
) -> ClResult<(SettingValue, SettingType)> {
	let def = registry.get(name).ok_or_else(|| Error::UnknownSetting(name.into()))?;

	let mut data_type = def.data_type;
	if data_type == SettingType::Null && !is_blank(raw) {
		data_type = infer_data_type(raw)?;
	}

	let value = coerce(def, data_type, raw)?;

	if data_type == SettingType::Enum && !def.is_valid_enum_value(&value) {
		return Err(Error::InvalidParameters(format!(
			"value '{}' is not a valid choice for {}",
			value.to_db_value().unwrap_or_default(),
			name
		)));
	}

	validators::validate(def, data_type, &value)?;

	if let Some(hook) = registry.custom_validation(name) {
		hook(&value).map_err(validators::into_invalid)?;
	}

	Ok((value, data_type))
}

fn coerce(def: &SettingDefinition, data_type: SettingType, raw: &Value) -> ClResult<SettingValue> {
	match data_type {
		SettingType::Null => Ok(SettingValue::Null),
		SettingType::Bool => Ok(SettingValue::Bool(coerce_bool(raw))),
		SettingType::Integer => coerce_int(raw).map(SettingValue::Integer),
		SettingType::Float => coerce_float(raw).map(SettingValue::Float),
		SettingType::String | SettingType::Time | SettingType::Regex => {
			stringify(raw).map(SettingValue::String)
		}
		SettingType::Enum => {
			if matches!(def.default, SettingValue::Integer(_)) {
				coerce_int(raw).map(SettingValue::Integer)
			} else {
				stringify(raw).map(SettingValue::String)
			}
		}
		SettingType::List
		| SettingType::UrlList
		| SettingType::HostList
		| SettingType::CategoryList
		| SettingType::ValueList => coerce_list(raw).map(SettingValue::List),
	}
}

fn coerce_bool(raw: &Value) -> bool {
	match raw {
		Value::Bool(b) => *b,
		Value::String(s) => s == "t" || s == "true",
		_ => false,
	}
}

fn coerce_int(raw: &Value) -> ClResult<i64> {
	let invalid = || Error::InvalidParameters(format!("'{}' is not a valid integer", raw));
	match raw {
		Value::Number(n) => {
			if let Some(i) = n.as_i64() {
				return Ok(i);
			}
			match n.as_f64() {
				#[allow(clippy::cast_possible_truncation)]
				Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(f as i64),
				_ => Err(invalid()),
			}
		}
		Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid()),
		_ => Err(invalid()),
	}
}

fn coerce_float(raw: &Value) -> ClResult<f64> {
	let invalid = || Error::InvalidParameters(format!("'{}' is not a valid number", raw));
	match raw {
		Value::Number(n) => n.as_f64().ok_or_else(invalid),
		Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).ok_or_else(invalid),
		_ => Err(invalid()),
	}
}

fn stringify(raw: &Value) -> ClResult<String> {
	match raw {
		Value::Null => Ok(String::new()),
		Value::String(s) => Ok(s.clone()),
		Value::Bool(b) => Ok(b.to_string()),
		Value::Number(n) => Ok(n.to_string()),
		Value::Array(_) | Value::Object(_) => {
			Err(Error::InvalidParameters("value must be a string".into()))
		}
	}
}

fn coerce_list(raw: &Value) -> ClResult<Vec<String>> {
	match raw {
		Value::Array(items) => {
			let mut list = Vec::with_capacity(items.len());
			for item in items {
				list.extend(split_list(&stringify(item)?));
			}
			Ok(list)
		}
		other => Ok(split_list(&stringify(other)?)),
	}
}

/// Split a `|`-separated list, dropping blank entries
pub fn split_list(s: &str) -> Vec<String> {
	s.split(LIST_SEPARATOR)
		.map(str::trim)
		.filter(|item| !item.is_empty())
		.map(str::to_string)
		.collect()
}

/// Convert a stored override back into a typed value
pub fn convert(
	db_value: Option<&str>,
	data_type: SettingType,
	def: &SettingDefinition,
) -> ClResult<SettingValue> {
	let Some(s) = db_value else {
		return Ok(match data_type {
			SettingType::Null => SettingValue::Null,
			t if t.is_text() => SettingValue::String(String::new()),
			t if t.is_list() => SettingValue::List(Vec::new()),
			_ => def.default.clone(),
		});
	};

	let invalid = || {
		Error::InvalidParameters(format!("stored value '{}' is not a valid {}", s, data_type))
	};
	match data_type {
		SettingType::Null => Ok(SettingValue::Null),
		SettingType::Bool => Ok(SettingValue::Bool(s == "t" || s == "true")),
		SettingType::Integer => s.trim().parse().map(SettingValue::Integer).map_err(|_| invalid()),
		SettingType::Float => s.trim().parse().map(SettingValue::Float).map_err(|_| invalid()),
		SettingType::Enum => {
			if matches!(def.default, SettingValue::Integer(_)) {
				s.trim().parse().map(SettingValue::Integer).map_err(|_| invalid())
			} else {
				Ok(SettingValue::String(s.to_string()))
			}
		}
		SettingType::String | SettingType::Time | SettingType::Regex => {
			Ok(SettingValue::String(s.to_string()))
		}
		SettingType::List
		| SettingType::UrlList
		| SettingType::HostList
		| SettingType::CategoryList
		| SettingType::ValueList => Ok(SettingValue::List(split_list(s))),
	}
}


// vim: ts=4
