//! Site settings service: per-site resolved cache, overrides and propagation
//!
//! Each process keeps the fully resolved settings of every site it has
//! touched. The map is rebuilt from the store by [`SettingsService::refresh`]
//! and patched in place by overrides. Other processes learn about changes
//! through the `/site_settings` bus channel.

use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use agora_types::message_bus::{
	BusMessage, CLIENT_SETTINGS_CHANNEL, MessageBus, SITE_SETTINGS_CHANNEL,
};
use agora_types::meta_adapter::MetaAdapter;

use super::convert::{convert, normalize_and_validate_setting};
use super::enums::EnumChoice;
use super::types::{FrozenSettingsRegistry, SettingDefinition, SettingType, SettingValue};
use crate::global_settings::GlobalSettings;
use crate::prelude::*;
use crate::shared_cache::SharedCache;

type SiteMap = HashMap<String, SettingValue>;

/// Keys added or changed, and keys gone, between two resolved maps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsDiff {
	pub changes: Vec<(String, SettingValue)>,
	pub deletions: Vec<(String, SettingValue)>,
}

impl SettingsDiff {
	pub fn is_empty(&self) -> bool {
		self.changes.is_empty() && self.deletions.is_empty()
	}
}

/// Compute the minimal set of mutations turning `old` into `new`
pub fn diff_hash(new: &SiteMap, old: &SiteMap) -> SettingsDiff {
	let mut diff = SettingsDiff::default();
	for (name, value) in new {
		if old.get(name) != Some(value) {
			diff.changes.push((name.clone(), value.clone()));
		}
	}
	for (name, value) in old {
		if !new.contains_key(name) {
			diff.deletions.push((name.clone(), value.clone()));
		}
	}
	diff.changes.sort_by(|a, b| a.0.cmp(&b.0));
	diff.deletions.sort_by(|a, b| a.0.cmp(&b.0));
	diff
}

/// Emitted after an override is added or removed in this process
#[derive(Debug, Clone, PartialEq)]
pub struct SettingChanged {
	pub site_id: SiteId,
	pub name: String,
	pub old: Option<SettingValue>,
	pub new: SettingValue,
}

/// One row of the admin settings listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingInfo {
	pub setting: String,
	pub description: String,
	pub category: String,
	#[serde(rename = "type")]
	pub data_type: SettingType,
	pub default: SettingValue,
	pub value: SettingValue,
	pub secret: bool,
	pub refresh: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub valid_values: Option<Vec<EnumChoice>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub translate_names: Option<bool>,
}

/// Settings service - main interface for accessing and managing settings
pub struct SettingsService {
	registry: Arc<FrozenSettingsRegistry>,
	meta: Arc<dyn MetaAdapter>,
	bus: Arc<dyn MessageBus>,
	cache: Arc<SharedCache>,
	globals: Arc<GlobalSettings>,
	process_id: Box<str>,
	version: Box<str>,
	current: parking_lot::RwLock<HashMap<SiteId, SiteMap>>,
	refresh_lock: tokio::sync::Mutex<()>,
	events: broadcast::Sender<SettingChanged>,
}

impl SettingsService {
	pub fn new(
		registry: Arc<FrozenSettingsRegistry>,
		meta: Arc<dyn MetaAdapter>,
		bus: Arc<dyn MessageBus>,
		cache: Arc<SharedCache>,
		globals: Arc<GlobalSettings>,
		version: &str,
	) -> Self {
		let (events, _) = broadcast::channel(64);
		Self {
			registry,
			meta,
			bus,
			cache,
			globals,
			process_id: uuid::Uuid::new_v4().to_string().into(),
			version: version.into(),
			current: parking_lot::RwLock::new(HashMap::new()),
			refresh_lock: tokio::sync::Mutex::new(()),
			events,
		}
	}

	/// Identifies this process on the bus
	pub fn process_id(&self) -> &str {
		&self.process_id
	}

	pub fn has_setting(&self, name: &str) -> bool {
		self.registry.contains(name)
	}

	/// Receive a [`SettingChanged`] for every local override change
	pub fn subscribe_changes(&self) -> broadcast::Receiver<SettingChanged> {
		self.events.subscribe()
	}

	/// Sites with a loaded cache
	pub fn cached_sites(&self) -> Vec<SiteId> {
		self.current.read().keys().copied().collect()
	}

	// Shadowing //
	//***********//
	fn shadowed_value(&self, def: &SettingDefinition) -> Option<SettingValue> {
		if !def.shadowed_by_global {
			return None;
		}
		let raw = self.globals.get(&def.name)?;
		let data_type = if def.data_type == SettingType::Null { SettingType::String } else { def.data_type };
		match convert(Some(raw), data_type, def) {
			Ok(value) => Some(value),
			Err(err) => {
				warn!("Ignoring global value for '{}': {}", def.name, err);
				None
			}
		}
	}

	/// Names of settings currently forced by the global layer
	pub fn shadowed_settings(&self) -> Vec<&str> {
		self.registry
			.list()
			.into_iter()
			.filter(|def| self.shadowed_value(def).is_some())
			.map(|def| def.name.as_str())
			.collect()
	}

	// Reading //
	//*********//
	async fn ensure_loaded(&self, site_id: SiteId) -> ClResult<()> {
		if self.current.read().contains_key(&site_id) {
			return Ok(());
		}
		self.refresh(site_id).await.map(|_| ())
	}

	/// Snapshot of every resolved setting of a site
	pub async fn current(&self, site_id: SiteId) -> ClResult<SiteMap> {
		self.ensure_loaded(site_id).await?;
		Ok(self.current.read().get(&site_id).cloned().unwrap_or_default())
	}

	/// Resolved value of one setting
	pub async fn get(&self, site_id: SiteId, name: &str) -> ClResult<SettingValue> {
		if !self.has_setting(name) {
			return Err(Error::UnknownSetting(name.into()));
		}
		self.ensure_loaded(site_id).await?;
		self.current
			.read()
			.get(&site_id)
			.and_then(|site| site.get(name).cloned())
			.ok_or_else(|| Error::Internal(format!("setting '{}' missing from cache", name)))
	}

	pub async fn get_bool(&self, site_id: SiteId, name: &str) -> ClResult<bool> {
		let value = self.get(site_id, name).await?;
		value.as_bool().ok_or_else(|| type_error(name, "bool", &value))
	}

	pub async fn get_int(&self, site_id: SiteId, name: &str) -> ClResult<i64> {
		let value = self.get(site_id, name).await?;
		value.as_i64().ok_or_else(|| type_error(name, "integer", &value))
	}

	pub async fn get_float(&self, site_id: SiteId, name: &str) -> ClResult<f64> {
		let value = self.get(site_id, name).await?;
		value.as_f64().ok_or_else(|| type_error(name, "float", &value))
	}

	pub async fn get_string(&self, site_id: SiteId, name: &str) -> ClResult<String> {
		match self.get(site_id, name).await? {
			SettingValue::String(s) => Ok(s),
			value => Err(type_error(name, "string", &value)),
		}
	}

	pub async fn get_list(&self, site_id: SiteId, name: &str) -> ClResult<Vec<String>> {
		match self.get(site_id, name).await? {
			SettingValue::List(l) => Ok(l),
			value => Err(type_error(name, "list", &value)),
		}
	}

	// Refresh //
	//*********//
	/// Rebuild the cache of a site from the store.
	///
	/// Overrides win over defaults and global values win over both. Only the
	/// difference against the current cache is applied. On a store error the
	/// previous cache stays in place.
	pub async fn refresh(&self, site_id: SiteId) -> ClResult<SettingsDiff> {
		let _guard = self.refresh_lock.lock().await;
		self.refresh_locked(site_id).await
	}

	async fn refresh_locked(&self, site_id: SiteId) -> ClResult<SettingsDiff> {
		let rows = self.meta.list_settings(site_id).await?;

		let mut new_hash = self.registry.defaults();
		for row in rows {
			let Some(def) = self.registry.get(&row.name) else {
				debug!("Skipping override of unregistered setting '{}'", row.name);
				continue;
			};
			let data_type = if def.data_type == SettingType::Null {
				match SettingType::from_code(row.data_type) {
					Some(t) => t,
					None => {
						warn!("Setting '{}' has unknown type code {}", row.name, row.data_type);
						continue;
					}
				}
			} else {
				def.data_type
			};
			match convert(row.value.as_deref(), data_type, def) {
				Ok(value) => {
					new_hash.insert(row.name.into(), value);
				}
				Err(err) => warn!("Skipping override of '{}': {}", row.name, err),
			}
		}

		for def in self.registry.list() {
			if let Some(value) = self.shadowed_value(def) {
				new_hash.insert(def.name.clone(), value);
			}
		}

		let diff = {
			let mut current = self.current.write();
			let site = current.entry(site_id).or_default();
			let diff = diff_hash(&new_hash, site);
			for (name, value) in &diff.changes {
				site.insert(name.clone(), value.clone());
			}
			for (name, _) in &diff.deletions {
				site.remove(name);
			}
			diff
		};

		if !diff.is_empty() {
			debug!(
				site_id = %site_id,
				changes = diff.changes.len(),
				deletions = diff.deletions.len(),
				"Site settings refreshed"
			);
			self.clear_cache(site_id);
		}
		Ok(diff)
	}

	// Overrides //
	//***********//
	/// Set a setting by name. Unknown names are an argument error.
	pub async fn set(&self, site_id: SiteId, name: &str, raw: &Value) -> ClResult<SettingValue> {
		if !self.has_setting(name) {
			return Err(Error::UnknownSetting(name.into()));
		}
		self.add_override(site_id, name, raw).await
	}

	/// Validate, persist and install an override.
	///
	/// Invalid input never reaches the store or the cache.
	pub async fn add_override(
		&self,
		site_id: SiteId,
		name: &str,
		raw: &Value,
	) -> ClResult<SettingValue> {
		let def = self.registry.get(name).ok_or_else(|| Error::UnknownSetting(name.into()))?;
		if self.shadowed_value(def).is_some() {
			return Err(Error::InvalidParameters(format!(
				"setting '{}' is shadowed by a global setting",
				name
			)));
		}

		let (value, data_type) = normalize_and_validate_setting(&self.registry, name, raw)?;

		self.ensure_loaded(site_id).await?;
		let old = {
			let _guard = self.refresh_lock.lock().await;
			self.meta
				.save_setting(site_id, name, data_type.code(), value.to_db_value().as_deref())
				.await?;
			self.install(site_id, name, value.clone())
		};
		info!("Setting '{}' overridden for site {}", name, site_id);

		self.after_change(site_id, def, old, value.clone()).await;
		Ok(value)
	}

	/// Drop an override; the setting reverts to its global value or default
	pub async fn remove_override(&self, site_id: SiteId, name: &str) -> ClResult<SettingValue> {
		let def = self.registry.get(name).ok_or_else(|| Error::UnknownSetting(name.into()))?;

		self.ensure_loaded(site_id).await?;
		let value = self.shadowed_value(def).unwrap_or_else(|| def.default.clone());
		let old = {
			let _guard = self.refresh_lock.lock().await;
			self.meta.delete_setting(site_id, name).await?;
			self.install(site_id, name, value.clone())
		};
		info!("Setting '{}' override removed for site {}", name, site_id);

		self.after_change(site_id, def, old, value.clone()).await;
		Ok(value)
	}

	fn install(&self, site_id: SiteId, name: &str, value: SettingValue) -> Option<SettingValue> {
		self.current.write().entry(site_id).or_default().insert(name.to_string(), value)
	}

	async fn after_change(
		&self,
		site_id: SiteId,
		def: &SettingDefinition,
		old: Option<SettingValue>,
		new: SettingValue,
	) {
		if def.client {
			self.notify_clients(site_id, &def.name, &new).await;
		}
		self.clear_cache(site_id);
		self.notify_changed(site_id).await;
		// No receivers is fine
		let _ = self.events.send(SettingChanged { site_id, name: def.name.clone(), old, new });
	}

	// Propagation //
	//*************//
	/// Tell other processes to refresh the site
	pub async fn notify_changed(&self, site_id: SiteId) {
		let msg =
			BusMessage::new(SITE_SETTINGS_CHANNEL, site_id, json!({ "process": &*self.process_id }));
		if let Err(err) = self.bus.publish(msg).await {
			warn!("Failed to publish site settings change: {}", err);
		}
	}

	/// Push a client-visible value to connected browsers
	pub async fn notify_clients(&self, site_id: SiteId, name: &str, value: &SettingValue) {
		let msg = BusMessage::new(
			CLIENT_SETTINGS_CHANNEL,
			site_id,
			json!({ "name": name, "value": value.to_json() }),
		);
		if let Err(err) = self.bus.publish(msg).await {
			warn!("Failed to publish client setting '{}': {}", name, err);
		}
	}

	/// Handle a `/site_settings` message. Returns whether a refresh happened.
	pub async fn process_message(&self, msg: &BusMessage) -> ClResult<bool> {
		let process = msg.data.get("process").and_then(Value::as_str);
		if process == Some(&*self.process_id) {
			return Ok(false);
		}
		self.refresh(msg.site_id).await?;
		Ok(true)
	}

	/// Consume `/site_settings` messages until the bus closes
	pub fn listen_for_changes(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
		let mut rx = self.bus.subscribe(SITE_SETTINGS_CHANNEL);
		let service = Arc::clone(self);
		tokio::spawn(async move {
			loop {
				match rx.recv().await {
					Ok(msg) => {
						if let Err(err) = service.process_message(&msg).await {
							warn!("Site settings refresh for site {} failed: {}", msg.site_id, err);
						}
					}
					Err(RecvError::Lagged(skipped)) => {
						warn!("Missed {} site settings messages, refreshing all sites", skipped);
						for site_id in service.cached_sites() {
							if let Err(err) = service.refresh(site_id).await {
								warn!("Site settings refresh for site {} failed: {}", site_id, err);
							}
						}
					}
					Err(RecvError::Closed) => break,
				}
			}
			debug!("Site settings listener stopped");
		})
	}

	// Client settings //
	//*****************//
	pub fn client_settings_cache_key(&self, site_id: SiteId) -> String {
		format!("{}:client_settings_json_{}", site_id, self.version)
	}

	/// Drop cached documents derived from the settings of a site
	pub fn clear_cache(&self, site_id: SiteId) {
		self.cache.delete(&self.client_settings_cache_key(site_id));
	}

	/// JSON object of all client-visible settings
	pub async fn client_settings_json(&self, site_id: SiteId) -> ClResult<String> {
		let key = self.client_settings_cache_key(site_id);
		if let Some(json) = self.cache.get(&key) {
			debug!("Client settings cache hit: {}", key);
			return Ok(json);
		}

		let current = self.current(site_id).await?;
		let settings: BTreeMap<&str, &SettingValue> = self
			.registry
			.client_names()
			.filter_map(|name| current.get_key_value(name))
			.map(|(name, value)| (name.as_str(), value))
			.collect();
		let json = serde_json::to_string(&settings)?;
		self.cache.put(key, json.clone());
		Ok(json)
	}

	// Admin listing //
	//***************//
	/// All settings with metadata. Shadowed settings are always hidden.
	pub async fn all_settings(&self, site_id: SiteId, include_hidden: bool) -> ClResult<Vec<SettingInfo>> {
		let current = self.current(site_id).await?;
		let mut result = Vec::new();
		for def in self.registry.list() {
			if self.shadowed_value(def).is_some() || (def.hidden && !include_hidden) {
				continue;
			}
			let value = current.get(&def.name).cloned().unwrap_or_else(|| def.default.clone());
			let (valid_values, translate_names) = match (&def.enum_provider, &def.choices) {
				(Some(provider), _) => (Some(provider.values()), Some(provider.translate_names())),
				(None, Some(choices)) => (
					Some(
						choices
							.iter()
							.map(|c| EnumChoice::new(c.to_db_value().unwrap_or_default(), c.clone()))
							.collect(),
					),
					Some(false),
				),
				(None, None) => (None, None),
			};
			result.push(SettingInfo {
				setting: def.name.clone(),
				description: def.description.clone(),
				category: def.category.clone(),
				data_type: def.data_type,
				default: def.default.clone(),
				value,
				secret: def.secret,
				refresh: def.refresh,
				valid_values,
				translate_names,
			});
		}
		Ok(result)
	}
}

fn type_error(name: &str, expected: &str, value: &SettingValue) -> Error {
	Error::Internal(format!("Setting '{}' is not {}, got {}", name, expected, value.type_name()))
}


// vim: ts=4
