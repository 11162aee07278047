//! Categories and their group permissions.
//!
//! Resolves permission mappings, keeps parent and child permission sets
//! compatible and answers which categories a viewer may read or post in.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod category;
pub mod handler;
pub mod permission;
mod prelude;
pub mod service;

use std::sync::Arc;

use agora_core::settings::{SettingDefinition, SettingValue, SettingsRegistry};

use crate::prelude::*;

pub use category::Category;
pub use permission::{AutoGroup, GroupRef, PermissionRef, PermissionType, resolve_permissions};
pub use service::CategoryService;

/// Register category settings
pub fn register_settings(registry: &mut SettingsRegistry) -> ClResult<()> {
	registry.register(
		SettingDefinition::builder("fixed_category_positions")
			.description("List categories in their configured order instead of by name")
			.category("basic")
			.default(SettingValue::Bool(false))
			.client(true)
			.build()?,
	)?;

	Ok(())
}

/// Start following category changes made by other processes
pub fn init(app: &App) -> ClResult<()> {
	let service = app.ext::<Arc<CategoryService>>()?;
	service.listen_for_changes();
	info!("Category service listening for changes");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use agora_core::settings::convert::convert;

	#[test]
	fn test_every_default_survives_storage() {
		let mut registry = SettingsRegistry::new();
		agora_core::register_settings(&mut registry).unwrap();
		register_settings(&mut registry).unwrap();
		let registry = registry.freeze();

		let defs = registry.list();
		assert!(defs.iter().any(|def| def.name == "fixed_category_positions"));
		for def in defs {
			assert!(
				def.default.fits(def.data_type),
				"default of '{}' does not fit {}",
				def.name,
				def.data_type
			);
			let stored = def.default.to_db_value();
			let loaded = convert(stored.as_deref(), def.data_type, def).unwrap();
			assert_eq!(loaded, def.default, "default of '{}' changed through storage", def.name);
		}
	}
}

// vim: ts=4
