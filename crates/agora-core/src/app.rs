//! App state type

use std::path::Path;
use std::sync::Arc;

use crate::extensions::Extensions;
use crate::global_settings::GlobalSettings;
use crate::prelude::*;
use crate::settings::service::SettingsService;
use crate::settings::types::FrozenSettingsRegistry;
use crate::shared_cache::SharedCache;

use agora_types::message_bus::MessageBus;
use agora_types::meta_adapter::MetaAdapter;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct AppState {
	pub opts: AppBuilderOpts,

	pub meta_adapter: Arc<dyn MetaAdapter>,
	pub bus: Arc<dyn MessageBus>,
	pub cache: Arc<SharedCache>,
	pub globals: Arc<GlobalSettings>,

	// Settings subsystem
	pub settings: Arc<SettingsService>,
	pub settings_registry: Arc<FrozenSettingsRegistry>,

	// Type-erased extension map for feature-specific state
	pub extensions: Extensions,
}

impl AppState {
	/// Get a registered extension by type. Returns error if not found.
	pub fn ext<T: Send + Sync + 'static>(&self) -> ClResult<&T> {
		self.extensions.get::<T>().ok_or_else(|| {
			Error::Internal(format!("Extension {} not registered", std::any::type_name::<T>()))
		})
	}
}

pub type App = Arc<AppState>;

#[derive(Debug)]
pub struct AppBuilderOpts {
	pub listen: Box<str>,
	/// Optional `agora.conf` with global settings
	pub conf_path: Option<Box<Path>>,
	pub cache_capacity: usize,
	pub bus_buffer_size: usize,
}

impl Default for AppBuilderOpts {
	fn default() -> Self {
		Self {
			listen: "127.0.0.1:3000".into(),
			conf_path: None,
			cache_capacity: 100,
			bus_buffer_size: 256,
		}
	}
}

// vim: ts=4
