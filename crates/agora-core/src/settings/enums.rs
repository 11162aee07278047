//! Enum providers for enum-typed settings

use serde::Serialize;

use super::types::SettingValue;

/// One selectable member of an enum setting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumChoice {
	pub name: String,
	pub value: SettingValue,
}

impl EnumChoice {
	pub fn new(name: impl Into<String>, value: SettingValue) -> Self {
		Self { name: name.into(), value }
	}
}

/// Supplies the members of an enum setting
pub trait EnumProvider: Send + Sync {
	fn values(&self) -> Vec<EnumChoice>;

	fn is_valid_value(&self, value: &SettingValue) -> bool {
		self.values().iter().any(|choice| &choice.value == value)
	}

	/// Whether the admin UI should look up the names as translation keys
	fn translate_names(&self) -> bool {
		true
	}
}

/// Enum backed by a fixed member list
pub struct StaticEnum {
	choices: Vec<EnumChoice>,
	translate_names: bool,
}

impl StaticEnum {
	pub fn new(choices: impl IntoIterator<Item = EnumChoice>) -> Self {
		Self { choices: choices.into_iter().collect(), translate_names: false }
	}

	/// Members whose name and value are the same string
	pub fn from_strs(values: &[&str]) -> Self {
		Self::new(values.iter().map(|v| EnumChoice::new(*v, SettingValue::String((*v).into()))))
	}

	pub fn translated(mut self) -> Self {
		self.translate_names = true;
		self
	}
}

impl EnumProvider for StaticEnum {
	fn values(&self) -> Vec<EnumChoice> {
		self.choices.clone()
	}

	fn translate_names(&self) -> bool {
		self.translate_names
	}
}

/// User trust levels 0..=4
pub struct TrustLevelEnum;

impl TrustLevelEnum {
	const NAMES: [&'static str; 5] = ["newuser", "basic", "member", "regular", "leader"];
}

impl EnumProvider for TrustLevelEnum {
	fn values(&self) -> Vec<EnumChoice> {
		Self::NAMES
			.iter()
			.zip(0i64..)
			.map(|(name, level)| {
				EnumChoice::new(format!("trust_levels.{}", name), SettingValue::Integer(level))
			})
			.collect()
	}

	fn is_valid_value(&self, value: &SettingValue) -> bool {
		matches!(value, SettingValue::Integer(0..=4))
	}
}

/// Interface locales the forum ships with
pub struct LocaleEnum;

impl LocaleEnum {
	pub const SUPPORTED: [&'static str; 12] =
		["ar", "de", "en", "es", "fr", "hu", "it", "ja", "nl", "pt_BR", "ru", "zh_CN"];
}

impl EnumProvider for LocaleEnum {
	fn values(&self) -> Vec<EnumChoice> {
		Self::SUPPORTED
			.iter()
			.map(|locale| EnumChoice::new(*locale, SettingValue::String((*locale).into())))
			.collect()
	}

	fn translate_names(&self) -> bool {
		false
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_trust_level_values() {
		let provider = TrustLevelEnum;
		assert_eq!(provider.values().len(), 5);
		assert!(provider.is_valid_value(&SettingValue::Integer(0)));
		assert!(provider.is_valid_value(&SettingValue::Integer(4)));
		assert!(!provider.is_valid_value(&SettingValue::Integer(5)));
		assert!(!provider.is_valid_value(&SettingValue::String("1".into())));
	}

	#[test]
	fn test_static_enum() {
		let provider = StaticEnum::from_strs(&["latest", "top", "categories"]);
		assert!(provider.is_valid_value(&SettingValue::String("top".into())));
		assert!(!provider.is_valid_value(&SettingValue::String("hot".into())));
		assert!(!provider.translate_names());
	}

	#[test]
	fn test_locale_enum() {
		assert!(LocaleEnum.is_valid_value(&SettingValue::String("hu".into())));
		assert!(!LocaleEnum.is_valid_value(&SettingValue::String("xx".into())));
	}
}

// vim: ts=4
