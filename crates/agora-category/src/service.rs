//! Category service: cached category tree, validation and permission scoping

use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast::error::RecvError;

use agora_types::message_bus::{BusMessage, CATEGORIES_CHANNEL, MessageBus};
use agora_types::meta_adapter::{CategoryData, MetaAdapter, SaveCategory};

use crate::category::{Category, MAX_NAME_LENGTH, ValidationErrors};
use crate::permission::{
	EVERYONE, GroupResolver, PermissionType, check_permissions_compatibility,
};
use crate::prelude::*;

type Permissions = Vec<(GroupId, PermissionType)>;

/// Categories of one site with their stored permission rows
#[derive(Debug, Default)]
pub struct CategorySnapshot {
	categories: Vec<CategoryData>,
	permissions: HashMap<CategoryId, Permissions>,
}

impl CategorySnapshot {
	pub fn new(mut categories: Vec<CategoryData>, permissions: HashMap<CategoryId, Permissions>) -> Self {
		categories.sort_by_key(|c| (c.position, c.id));
		Self { categories, permissions }
	}

	pub fn categories(&self) -> &[CategoryData] {
		&self.categories
	}

	pub fn get(&self, id: CategoryId) -> Option<&CategoryData> {
		self.categories.iter().find(|c| c.id == id)
	}

	/// Stored permission rows. Empty means everyone has full access.
	pub fn permissions(&self, id: CategoryId) -> &[(GroupId, PermissionType)] {
		self.permissions.get(&id).map_or(&[], Vec::as_slice)
	}

	pub fn subcategories(&self, id: CategoryId) -> impl Iterator<Item = &CategoryData> {
		self.categories.iter().filter(move |c| c.parent_category_id == Some(id))
	}

	/// Categories the viewer may act on with one of `types`.
	///
	/// Admins see everything. Anonymous viewers see unrestricted categories
	/// when reading, nothing otherwise. Everyone else sees categories without
	/// permission rows, categories granting one of `types` to `everyone` or to
	/// one of the viewer's groups, and, for staged users, categories that
	/// accept email.
	pub fn scoped_to_permissions(&self, viewer: &Viewer, types: &[PermissionType]) -> Vec<&CategoryData> {
		if viewer.is_admin {
			return self.categories.iter().collect();
		}
		if viewer.is_anonymous() {
			if types.contains(&PermissionType::Readonly) {
				return self.categories.iter().filter(|c| !c.read_restricted).collect();
			}
			return Vec::new();
		}
		self.categories
			.iter()
			.filter(|c| {
				let rows = self.permissions(c.id);
				(viewer.is_staged && c.email_in.as_deref().is_some_and(|e| !e.is_empty()))
					|| rows.is_empty()
					|| rows.iter().any(|(group, permission)| {
						types.contains(permission) && (*group == EVERYONE || viewer.in_group(*group))
					})
			})
			.collect()
	}
}

pub struct CategoryService {
	meta: Arc<dyn MetaAdapter>,
	bus: Arc<dyn MessageBus>,
	process_id: Box<str>,
	cache: parking_lot::RwLock<HashMap<SiteId, Arc<CategorySnapshot>>>,
	/// Bumped on every invalidation, under the cache write lock
	generation: AtomicU64,
	/// Serializes validate and write in `save` and `destroy`
	write_lock: tokio::sync::Mutex<()>,
}

impl CategoryService {
	pub fn new(meta: Arc<dyn MetaAdapter>, bus: Arc<dyn MessageBus>) -> Self {
		Self {
			meta,
			bus,
			process_id: uuid::Uuid::new_v4().to_string().into(),
			cache: parking_lot::RwLock::new(HashMap::new()),
			generation: AtomicU64::new(0),
			write_lock: tokio::sync::Mutex::new(()),
		}
	}

	pub fn process_id(&self) -> &str {
		&self.process_id
	}

	// Cache //
	//*******//
	/// Cached categories of a site, loaded on a miss.
	///
	/// A load that overlaps an invalidation is returned to its caller but not
	/// cached, so rows committed during the load are picked up by the next call.
	pub async fn snapshot(&self, site_id: SiteId) -> ClResult<Arc<CategorySnapshot>> {
		let generation = {
			let cache = self.cache.read();
			if let Some(snapshot) = cache.get(&site_id) {
				return Ok(snapshot.clone());
			}
			self.generation.load(Ordering::Acquire)
		};

		let categories = self.meta.list_categories(site_id).await?;
		let mut permissions: HashMap<CategoryId, Permissions> = HashMap::new();
		for row in self.meta.list_category_groups(site_id).await? {
			match PermissionType::from_code(row.permission_type) {
				Some(permission) => {
					permissions.entry(row.category_id).or_default().push((row.group_id, permission));
				}
				None => warn!(
					"Ignoring unknown permission type {} on category {}",
					row.permission_type, row.category_id
				),
			}
		}
		let snapshot = Arc::new(CategorySnapshot::new(categories, permissions));
		debug!("Loaded {} categories for site {}", snapshot.categories.len(), site_id);
		let mut cache = self.cache.write();
		if self.generation.load(Ordering::Acquire) == generation {
			cache.insert(site_id, snapshot.clone());
		} else {
			debug!("Categories of site {} changed while loading, not caching", site_id);
		}
		Ok(snapshot)
	}

	/// Drop the cached categories of a site
	pub fn invalidate(&self, site_id: SiteId) {
		let mut cache = self.cache.write();
		self.generation.fetch_add(1, Ordering::AcqRel);
		cache.remove(&site_id);
	}

	pub fn invalidate_all(&self) {
		let mut cache = self.cache.write();
		self.generation.fetch_add(1, Ordering::AcqRel);
		cache.clear();
	}

	pub async fn group_resolver(&self, site_id: SiteId) -> ClResult<GroupResolver> {
		Ok(GroupResolver::new(&self.meta.list_groups(site_id).await?))
	}

	// Reading //
	//*********//
	pub async fn get(&self, site_id: SiteId, id: CategoryId) -> ClResult<Category> {
		let snapshot = self.snapshot(site_id).await?;
		snapshot.get(id).map(Category::from_data).ok_or(Error::NotFound)
	}

	pub async fn list(&self, site_id: SiteId) -> ClResult<Vec<Category>> {
		let snapshot = self.snapshot(site_id).await?;
		Ok(snapshot.categories().iter().map(Category::from_data).collect())
	}

	/// Group name → permission name of a saved category
	pub async fn permissions_params(
		&self,
		site_id: SiteId,
		id: CategoryId,
	) -> ClResult<BTreeMap<String, PermissionType>> {
		let snapshot = self.snapshot(site_id).await?;
		let groups = self.group_resolver(site_id).await?;
		Ok(snapshot
			.permissions(id)
			.iter()
			.filter_map(|(group, permission)| Some((groups.name(*group)?.to_string(), *permission)))
			.collect())
	}

	pub async fn scoped_to_permissions(
		&self,
		site_id: SiteId,
		viewer: &Viewer,
		types: &[PermissionType],
	) -> ClResult<Vec<Category>> {
		let snapshot = self.snapshot(site_id).await?;
		Ok(snapshot.scoped_to_permissions(viewer, types).into_iter().map(Category::from_data).collect())
	}

	/// Categories the viewer can see
	pub async fn secured(&self, site_id: SiteId, viewer: &Viewer) -> ClResult<Vec<Category>> {
		self.scoped_to_permissions(site_id, viewer, &PermissionType::ALL).await
	}

	pub async fn topic_create_allowed(&self, site_id: SiteId, viewer: &Viewer) -> ClResult<Vec<Category>> {
		self.scoped_to_permissions(site_id, viewer, &[PermissionType::Full]).await
	}

	pub async fn post_create_allowed(&self, site_id: SiteId, viewer: &Viewer) -> ClResult<Vec<Category>> {
		self.scoped_to_permissions(site_id, viewer, &[PermissionType::CreatePost, PermissionType::Full])
			.await
	}

	/// Whether the viewer can see a category. Unknown ids are `NotFound`.
	pub async fn can_see(&self, site_id: SiteId, viewer: &Viewer, id: CategoryId) -> ClResult<bool> {
		let snapshot = self.snapshot(site_id).await?;
		if snapshot.get(id).is_none() {
			return Err(Error::NotFound);
		}
		Ok(snapshot.scoped_to_permissions(viewer, &PermissionType::ALL).iter().any(|c| c.id == id))
	}

	// Writing //
	//*********//
	/// Validate and persist a category together with its staged permissions.
	///
	/// Nothing is written when validation fails.
	pub async fn save(&self, site_id: SiteId, category: &mut Category) -> ClResult<CategoryId> {
		if category.slug.is_empty() {
			category.slug = crate::category::slugify(&category.name);
		}
		let _guard = self.write_lock.lock().await;

		// Validate against fresh rows
		self.invalidate(site_id);
		let snapshot = self.snapshot(site_id).await?;
		if category.id.is_some_and(|id| snapshot.get(id).is_none()) {
			return Err(Error::NotFound);
		}
		validate(category, &snapshot)
			.into_result()
			.inspect_err(|err| info!("Category '{}' rejected: {}", category.name, err))?;
		let created = category.is_new();

		let permissions: Option<Vec<(GroupId, i32)>> = category
			.staged_permissions()
			.map(|tuples| tuples.iter().map(|(group, permission)| (*group, permission.code())).collect());
		let id = self
			.meta
			.save_category(
				site_id,
				&SaveCategory {
					id: category.id,
					name: &category.name,
					slug: &category.slug,
					parent_category_id: category.parent_category_id,
					read_restricted: category.read_restricted,
					position: category.position,
					email_in: category.email_in.as_deref(),
					permissions: permissions.as_deref(),
				},
			)
			.await?;
		category.id = Some(id);
		category.clear_staged_permissions();
		info!(
			"Category {} '{}' {} for site {}",
			id,
			category.name,
			if created { "created" } else { "updated" },
			site_id
		);

		self.changed(site_id).await;
		Ok(id)
	}

	/// Delete a category and its permission rows
	pub async fn destroy(&self, site_id: SiteId, id: CategoryId) -> ClResult<()> {
		let _guard = self.write_lock.lock().await;
		self.invalidate(site_id);
		let snapshot = self.snapshot(site_id).await?;
		if snapshot.get(id).is_none() {
			return Err(Error::NotFound);
		}
		if snapshot.subcategories(id).next().is_some() {
			return Err(Error::ValidationError("base: has_subcategories".into()));
		}
		self.meta.delete_category(site_id, id).await?;
		info!("Category {} deleted from site {}", id, site_id);
		self.changed(site_id).await;
		Ok(())
	}

	async fn changed(&self, site_id: SiteId) {
		self.invalidate(site_id);
		let msg = BusMessage::new(CATEGORIES_CHANNEL, site_id, json!({ "process": &*self.process_id }));
		if let Err(err) = self.bus.publish(msg).await {
			warn!("Failed to publish category change: {}", err);
		}
	}

	// Propagation //
	//*************//
	/// Handle a `/categories` message. Returns whether the cache was dropped.
	pub fn process_message(&self, msg: &BusMessage) -> bool {
		if msg.data.get("process").and_then(Value::as_str) == Some(&*self.process_id) {
			return false;
		}
		self.invalidate(msg.site_id);
		true
	}

	pub fn listen_for_changes(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
		let mut rx = self.bus.subscribe(CATEGORIES_CHANNEL);
		let service = Arc::clone(self);
		tokio::spawn(async move {
			loop {
				match rx.recv().await {
					Ok(msg) => {
						if service.process_message(&msg) {
							debug!("Category cache of site {} invalidated", msg.site_id);
						}
					}
					Err(RecvError::Lagged(skipped)) => {
						warn!("Missed {} category messages, dropping all category caches", skipped);
						service.invalidate_all();
					}
					Err(RecvError::Closed) => break,
				}
			}
		})
	}
}

// Validators //
//************//
/// Check a category against the stored tree
pub fn validate(category: &Category, snapshot: &CategorySnapshot) -> ValidationErrors {
	let mut errors = ValidationErrors::default();
	validate_name(category, snapshot, &mut errors);
	validate_parent(category, snapshot, &mut errors);
	permissions_compatibility_validator(category, snapshot, &mut errors);
	errors
}

fn validate_name(category: &Category, snapshot: &CategorySnapshot, errors: &mut ValidationErrors) {
	let name = category.name.trim();
	if name.is_empty() {
		errors.add("name", "blank");
		return;
	}
	if name.chars().count() > MAX_NAME_LENGTH {
		errors.add("name", "too_long");
	}
	let taken = snapshot.categories().iter().any(|other| {
		Some(other.id) != category.id
			&& other.parent_category_id == category.parent_category_id
			&& other.name.trim().eq_ignore_ascii_case(name)
	});
	if taken {
		errors.add("name", "name_taken");
	}
}

/// One level of nesting only
fn validate_parent(category: &Category, snapshot: &CategorySnapshot, errors: &mut ValidationErrors) {
	let Some(parent_id) = category.parent_category_id else {
		return;
	};
	if Some(parent_id) == category.id {
		errors.add("parent_category_id", "self_parent");
		return;
	}
	let Some(parent) = snapshot.get(parent_id) else {
		errors.add("parent_category_id", "parent_not_found");
		return;
	};
	let has_children = category.id.is_some_and(|id| snapshot.subcategories(id).next().is_some());
	if parent.parent_category_id.is_some() || has_children {
		errors.add("parent_category_id", "depth");
	}
}

/// A subcategory may only grant access to groups its parent grants access to
pub fn permissions_compatibility_validator(
	category: &Category,
	snapshot: &CategorySnapshot,
	errors: &mut ValidationErrors,
) {
	let Some(staged) = category.staged_permissions() else {
		return;
	};
	let everyone_full = [(EVERYONE, PermissionType::Full)];

	let conflicts = if let Some(parent_id) = category.parent_category_id {
		let parent = snapshot.permissions(parent_id);
		if parent.is_empty() {
			return;
		}
		let child = if staged.is_empty() { &everyone_full[..] } else { staged };
		check_permissions_compatibility(parent, child)
	} else {
		let Some(id) = category.id else {
			return;
		};
		if staged.is_empty() {
			return;
		}
		let mut children: Permissions = Vec::new();
		for sub in snapshot.subcategories(id) {
			let rows = snapshot.permissions(sub.id);
			children.extend_from_slice(if rows.is_empty() { &everyone_full[..] } else { rows });
		}
		if children.is_empty() {
			return;
		}
		check_permissions_compatibility(staged, &children)
	};

	if !conflicts.is_empty() {
		debug!("Category '{}' permission conflict on groups {:?}", category.name, conflicts);
		errors.add("base", "permission_conflict");
	}
}


// vim: ts=4
