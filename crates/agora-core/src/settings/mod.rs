//! Site settings subsystem: definitions, coercion, validation and the service

pub mod convert;
pub mod enums;
pub mod handler;
pub mod service;
pub mod types;
pub mod validators;

pub use convert::normalize_and_validate_setting;
pub use enums::{EnumChoice, EnumProvider, LocaleEnum, StaticEnum, TrustLevelEnum};
pub use service::{SettingChanged, SettingInfo, SettingsDiff, SettingsService, diff_hash};
pub use types::{
	FrozenSettingsRegistry, SettingDefinition, SettingDefinitionBuilder, SettingType,
	SettingValue, SettingsRegistry,
};

// vim: ts=4
