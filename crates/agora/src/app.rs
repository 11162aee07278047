//! App builder - constructs and runs the Agora application

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use agora_core::extensions::Extensions;
use agora_core::global_settings::GlobalSettings;
use agora_core::mem_meta_adapter::MemMetaAdapter;
use agora_core::message_bus::{BusConfig, LocalMessageBus};
use agora_core::settings::{SettingsRegistry, SettingsService};
use agora_core::shared_cache::SharedCache;
use agora_category::CategoryService;

use crate::message_bus::MessageBus;
use crate::meta_adapter::MetaAdapter;
use crate::prelude::*;
use crate::routes;

pub use agora_core::app::{App, AppBuilderOpts, AppState, VERSION};

pub struct AppBuilder {
	opts: AppBuilderOpts,
	meta_adapter: Option<Arc<dyn MetaAdapter>>,
	bus: Option<Arc<dyn MessageBus>>,
	globals: Option<GlobalSettings>,
}

impl AppBuilder {
	pub fn new() -> Self {
		AppBuilder { opts: AppBuilderOpts::default(), meta_adapter: None, bus: None, globals: None }
	}

	// Opts
	pub fn listen(&mut self, listen: impl Into<Box<str>>) -> &mut Self {
		self.opts.listen = listen.into();
		self
	}
	pub fn conf_path(&mut self, conf_path: impl Into<Box<Path>>) -> &mut Self {
		self.opts.conf_path = Some(conf_path.into());
		self
	}
	pub fn cache_capacity(&mut self, capacity: usize) -> &mut Self {
		self.opts.cache_capacity = capacity;
		self
	}
	pub fn bus_buffer_size(&mut self, size: usize) -> &mut Self {
		self.opts.bus_buffer_size = size;
		self
	}
	/// Use these global settings instead of loading the config file and environment
	pub fn globals(&mut self, globals: GlobalSettings) -> &mut Self {
		self.globals = Some(globals);
		self
	}

	// Adapters
	pub fn meta_adapter(&mut self, meta_adapter: Arc<dyn MetaAdapter>) -> &mut Self {
		self.meta_adapter = Some(meta_adapter);
		self
	}
	pub fn bus(&mut self, bus: Arc<dyn MessageBus>) -> &mut Self {
		self.bus = Some(bus);
		self
	}

	/// Assemble the application state and start the change listeners.
	///
	/// Must be called inside a tokio runtime.
	pub fn build(self) -> ClResult<App> {
		let meta_adapter: Arc<dyn MetaAdapter> = match self.meta_adapter {
			Some(meta_adapter) => meta_adapter,
			None => {
				warn!("No meta adapter configured, data is kept in memory only");
				Arc::new(MemMetaAdapter::new())
			}
		};
		let bus: Arc<dyn MessageBus> = match self.bus {
			Some(bus) => bus,
			None => Arc::new(LocalMessageBus::with_config(BusConfig { buffer_size: self.opts.bus_buffer_size })),
		};
		let globals = match self.globals {
			Some(globals) => globals,
			None => GlobalSettings::load(self.opts.conf_path.as_deref())?,
		};
		let globals = Arc::new(globals);
		let cache = Arc::new(SharedCache::new(self.opts.cache_capacity));

		// Initialize settings registry and service
		let mut settings_registry = SettingsRegistry::new();

		// Register settings from all modules
		agora_core::register_settings(&mut settings_registry)?;
		agora_category::register_settings(&mut settings_registry)?;

		info!("Registered {} settings", settings_registry.len());

		// Freeze the registry
		let frozen_registry = Arc::new(settings_registry.freeze());

		let settings_service = Arc::new(SettingsService::new(
			frozen_registry.clone(),
			meta_adapter.clone(),
			bus.clone(),
			cache.clone(),
			globals.clone(),
			VERSION,
		));

		// Build extensions map for feature-specific state
		let mut extensions = Extensions::new();
		extensions.register(Arc::new(CategoryService::new(meta_adapter.clone(), bus.clone())))?;

		let app: App = Arc::new(AppState {
			opts: self.opts,
			meta_adapter,
			bus,
			cache,
			globals,
			settings: settings_service,
			settings_registry: frozen_registry,
			extensions,
		});

		// Init modules
		app.settings.listen_for_changes();
		agora_category::init(&app)?;

		Ok(app)
	}

	pub async fn run(self) -> ClResult<()> {
		init_tracing();
		info!("    _");
		info!("   /_\\  __ _ ___ _ _ __ _");
		info!("  / _ \\/ _` / _ \\ '_/ _` |");
		info!(" /_/ \\_\\__, \\___/_| \\__,_|");
		info!("       |___/");
		info!("V{}", VERSION);
		info!("");

		let app = self.build()?;
		let router = routes::init(app.clone());

		let listener = tokio::net::TcpListener::bind(app.opts.listen.as_ref()).await.map_err(|e| {
			error!("FATAL: Cannot listen on {}: {}", app.opts.listen, e);
			e
		})?;
		info!("Listening on HTTP {}", app.opts.listen);

		axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;

		info!("Shut down");
		Ok(())
	}
}

impl Default for AppBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Install the `RUST_LOG` controlled subscriber. Later calls are no-ops.
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_target(false)
		.try_init();
}

fn shutdown_signal() -> impl Future<Output = ()> {
	async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			error!("Cannot listen for shutdown signal: {}", err);
			std::future::pending::<()>().await;
		}
	}
}

// vim: ts=4
