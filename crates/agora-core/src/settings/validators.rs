//! Built-in validators, one per setting type
//!
//! A setting with an explicit validator skips the built-in one of its type.

use super::types::{SettingDefinition, SettingType, SettingValue};
use crate::prelude::*;

pub const DEFAULT_INTEGER_MIN: i64 = 0;
pub const DEFAULT_INTEGER_MAX: i64 = 2_000_000;

/// Run the validator that applies to `def`
pub fn validate(def: &SettingDefinition, data_type: SettingType, value: &SettingValue) -> ClResult<()> {
	if let Some(validator) = &def.validator {
		return validator(value).map_err(into_invalid);
	}
	validate_builtin(def, data_type, value).map_err(Error::InvalidParameters)
}

/// Validator failures always surface as `InvalidParameters`
pub(crate) fn into_invalid(err: Error) -> Error {
	match err {
		Error::InvalidParameters(_) => err,
		other => Error::InvalidParameters(other.to_string()),
	}
}

fn validate_builtin(
	def: &SettingDefinition,
	data_type: SettingType,
	value: &SettingValue,
) -> Result<(), String> {
	match (data_type, value) {
		(SettingType::Integer, SettingValue::Integer(i)) => validate_integer(def, *i),
		(SettingType::String, SettingValue::String(s)) => validate_string(def, s),
		(SettingType::Regex, SettingValue::String(s)) => validate_regex(s),
		(SettingType::UrlList, SettingValue::List(items)) => {
			items.iter().try_for_each(|item| validate_url(item))
		}
		(SettingType::HostList, SettingValue::List(items)) => {
			items.iter().try_for_each(|item| validate_host(item))
		}
		(SettingType::CategoryList, SettingValue::List(items)) => {
			items.iter().try_for_each(|item| validate_category_id(item))
		}
		_ => Ok(()),
	}
}

fn validate_integer(def: &SettingDefinition, value: i64) -> Result<(), String> {
	// Hidden settings are only bounded when bounds are declared
	let (min, max) = if def.hidden {
		(def.min, def.max)
	} else {
		(Some(def.min.unwrap_or(DEFAULT_INTEGER_MIN)), Some(def.max.unwrap_or(DEFAULT_INTEGER_MAX)))
	};

	match (min, max) {
		(Some(min), Some(max)) if value < min || value > max => {
			Err(format!("Value must be between {} and {}.", min, max))
		}
		(Some(min), None) if value < min => Err(format!("Value must be at least {}.", min)),
		(None, Some(max)) if value > max => Err(format!("Value must be at most {}.", max)),
		_ => Ok(()),
	}
}

fn validate_string(def: &SettingDefinition, value: &str) -> Result<(), String> {
	let len = i64::try_from(value.chars().count()).unwrap_or(i64::MAX);
	if let Some(min) = def.min {
		if len < min {
			return Err(format!("Value must be at least {} characters.", min));
		}
	}
	if let Some(max) = def.max {
		if len > max {
			return Err(format!("Value must be at most {} characters.", max));
		}
	}
	if let Some(pattern) = &def.regex {
		if value.is_empty() {
			return Ok(());
		}
		let re = regex::Regex::new(pattern).map_err(|err| format!("Invalid pattern: {}", err))?;
		if !re.is_match(value) {
			return Err(def
				.regex_error
				.clone()
				.unwrap_or_else(|| "Value doesn't match the required format.".into()));
		}
	}
	Ok(())
}

fn validate_regex(value: &str) -> Result<(), String> {
	if value.is_empty() {
		return Ok(());
	}
	let re = regex::Regex::new(value).map_err(|err| format!("Invalid regular expression: {}", err))?;
	if re.is_match("") {
		return Err("Regular expression matches everything.".into());
	}
	Ok(())
}

fn validate_url(value: &str) -> Result<(), String> {
	match url::Url::parse(value) {
		Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => Ok(()),
		_ => Err(format!("'{}' is not a valid URL.", value)),
	}
}

fn validate_host(value: &str) -> Result<(), String> {
	let valid = !value.contains("://")
		&& !value.starts_with('.')
		&& value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '*' | ':' | '_'));
	if valid { Ok(()) } else { Err(format!("'{}' is not a valid host name.", value)) }
}

fn validate_category_id(value: &str) -> Result<(), String> {
	match value.parse::<i64>() {
		Ok(id) if id > 0 => Ok(()),
		_ => Err(format!("'{}' is not a valid category id.", value)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn def(data_type: SettingType) -> SettingDefinition {
		SettingDefinition::builder("test").data_type(data_type).build().unwrap()
	}

	#[test]
	fn test_integer_default_bounds() {
		let d = SettingDefinition::builder("n").default(SettingValue::Integer(1)).build().unwrap();
		assert!(validate(&d, SettingType::Integer, &SettingValue::Integer(0)).is_ok());
		assert!(validate(&d, SettingType::Integer, &SettingValue::Integer(-1)).is_err());
		assert!(validate(&d, SettingType::Integer, &SettingValue::Integer(2_000_001)).is_err());
	}

	#[test]
	fn test_integer_declared_bounds() {
		let d = SettingDefinition::builder("n")
			.default(SettingValue::Integer(5))
			.min(1)
			.max(10)
			.build()
			.unwrap();
		assert!(validate(&d, SettingType::Integer, &SettingValue::Integer(10)).is_ok());
		match validate(&d, SettingType::Integer, &SettingValue::Integer(11)) {
			Err(Error::InvalidParameters(msg)) => assert_eq!(msg, "Value must be between 1 and 10."),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn test_hidden_integer_unbounded() {
		let d = SettingDefinition::builder("n")
			.default(SettingValue::Integer(5))
			.hidden(true)
			.build()
			.unwrap();
		assert!(validate(&d, SettingType::Integer, &SettingValue::Integer(-50)).is_ok());
	}

	#[test]
	fn test_string_regex() {
		let d = SettingDefinition::builder("contact_email")
			.default(SettingValue::String(String::new()))
			.regex(r"^[^@\s]+@[^@\s]+$")
			.regex_error("Not an email address.")
			.build()
			.unwrap();
		assert!(validate(&d, SettingType::String, &SettingValue::String("a@b.c".into())).is_ok());
		assert!(validate(&d, SettingType::String, &SettingValue::String(String::new())).is_ok());
		match validate(&d, SettingType::String, &SettingValue::String("nope".into())) {
			Err(Error::InvalidParameters(msg)) => assert_eq!(msg, "Not an email address."),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn test_regex_setting() {
		let d = def(SettingType::Regex);
		assert!(validate(&d, SettingType::Regex, &SettingValue::String("^foo$".into())).is_ok());
		assert!(validate(&d, SettingType::Regex, &SettingValue::String("(".into())).is_err());
		assert!(validate(&d, SettingType::Regex, &SettingValue::String(".*".into())).is_err());
	}

	#[test]
	fn test_url_and_host_lists() {
		let urls = def(SettingType::UrlList);
		let ok = SettingValue::List(vec!["https://example.com/a".into()]);
		let bad = SettingValue::List(vec!["example.com".into()]);
		assert!(validate(&urls, SettingType::UrlList, &ok).is_ok());
		assert!(validate(&urls, SettingType::UrlList, &bad).is_err());

		let hosts = def(SettingType::HostList);
		let ok = SettingValue::List(vec!["*.example.com".into(), "localhost:3000".into()]);
		let bad = SettingValue::List(vec!["https://example.com".into()]);
		assert!(validate(&hosts, SettingType::HostList, &ok).is_ok());
		assert!(validate(&hosts, SettingType::HostList, &bad).is_err());
	}

	#[test]
	fn test_category_list() {
		let d = def(SettingType::CategoryList);
		assert!(validate(&d, SettingType::CategoryList, &SettingValue::List(vec!["3".into()])).is_ok());
		assert!(validate(&d, SettingType::CategoryList, &SettingValue::List(vec!["x".into()])).is_err());
	}

	#[test]
	fn test_explicit_validator_replaces_builtin() {
		let d = SettingDefinition::builder("n")
			.default(SettingValue::Integer(1))
			.validator(|value| match value.as_i64() {
				Some(i) if i % 2 == 1 => Ok(()),
				_ => Err(Error::ValidationError("must be odd".into())),
			})
			.build()
			.unwrap();
		// Above the default maximum, but the explicit validator decides
		assert!(validate(&d, SettingType::Integer, &SettingValue::Integer(3_000_001)).is_ok());
		assert!(matches!(
			validate(&d, SettingType::Integer, &SettingValue::Integer(2)),
			Err(Error::InvalidParameters(_))
		));
	}
}

// vim: ts=4
