//! In-memory meta adapter
//!
//! Keeps everything in process memory. Used for ephemeral instances and as
//! the store of engine tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};

use agora_types::meta_adapter::{
	CategoryData, CategoryGroupData, Group, MetaAdapter, SaveCategory, SettingRow,
};

use crate::prelude::*;

#[derive(Debug, Default)]
struct SiteData {
	settings: BTreeMap<Box<str>, SettingRow>,
	groups: Vec<Group>,
	categories: BTreeMap<CategoryId, CategoryData>,
	category_groups: Vec<CategoryGroupData>,
}

#[derive(Debug)]
pub struct MemMetaAdapter {
	sites: parking_lot::Mutex<HashMap<SiteId, SiteData>>,
	next_id: std::sync::atomic::AtomicI64,
	fail: std::sync::atomic::AtomicBool,
}

/// Custom group ids start above the automatic groups
const FIRST_ID: i64 = 100;

impl MemMetaAdapter {
	pub fn new() -> Self {
		Self {
			sites: parking_lot::Mutex::new(HashMap::new()),
			next_id: std::sync::atomic::AtomicI64::new(FIRST_ID),
			fail: std::sync::atomic::AtomicBool::new(false),
		}
	}

	/// Make every subsequent call fail with `DbError`
	pub fn set_failing(&self, fail: bool) {
		self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
	}

	fn check(&self) -> ClResult<()> {
		if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
			warn!("DB: simulated failure");
			return Err(Error::DbError);
		}
		Ok(())
	}

	fn next_id(&self) -> i64 {
		self.next_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
	}
}

impl Default for MemMetaAdapter {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl MetaAdapter for MemMetaAdapter {
	// Settings
	//**********
	async fn list_settings(&self, site_id: SiteId) -> ClResult<Vec<SettingRow>> {
		self.check()?;
		let sites = self.sites.lock();
		Ok(sites.get(&site_id).map(|s| s.settings.values().cloned().collect()).unwrap_or_default())
	}

	async fn read_setting(&self, site_id: SiteId, name: &str) -> ClResult<Option<SettingRow>> {
		self.check()?;
		let sites = self.sites.lock();
		Ok(sites.get(&site_id).and_then(|s| s.settings.get(name).cloned()))
	}

	async fn save_setting(
		&self,
		site_id: SiteId,
		name: &str,
		data_type: i32,
		value: Option<&str>,
	) -> ClResult<()> {
		self.check()?;
		let row = SettingRow { name: name.into(), data_type, value: value.map(Into::into) };
		self.sites.lock().entry(site_id).or_default().settings.insert(name.into(), row);
		Ok(())
	}

	async fn delete_setting(&self, site_id: SiteId, name: &str) -> ClResult<bool> {
		self.check()?;
		let mut sites = self.sites.lock();
		Ok(sites.get_mut(&site_id).is_some_and(|s| s.settings.remove(name).is_some()))
	}

	// Groups
	//********
	async fn list_groups(&self, site_id: SiteId) -> ClResult<Vec<Group>> {
		self.check()?;
		let sites = self.sites.lock();
		Ok(sites.get(&site_id).map(|s| s.groups.clone()).unwrap_or_default())
	}

	async fn create_group(&self, site_id: SiteId, name: &str) -> ClResult<GroupId> {
		self.check()?;
		let mut sites = self.sites.lock();
		let site = sites.entry(site_id).or_default();
		if site.groups.iter().any(|g| g.name.eq_ignore_ascii_case(name)) {
			return Err(Error::InvalidParameters(format!("group '{}' already exists", name)));
		}
		let id = GroupId(self.next_id());
		site.groups.push(Group { id, name: name.into() });
		Ok(id)
	}

	// Categories
	//************
	async fn list_categories(&self, site_id: SiteId) -> ClResult<Vec<CategoryData>> {
		self.check()?;
		let sites = self.sites.lock();
		Ok(sites.get(&site_id).map(|s| s.categories.values().cloned().collect()).unwrap_or_default())
	}

	async fn read_category(&self, site_id: SiteId, id: CategoryId) -> ClResult<CategoryData> {
		self.check()?;
		let sites = self.sites.lock();
		sites.get(&site_id).and_then(|s| s.categories.get(&id).cloned()).ok_or(Error::NotFound)
	}

	async fn list_category_groups(&self, site_id: SiteId) -> ClResult<Vec<CategoryGroupData>> {
		self.check()?;
		let sites = self.sites.lock();
		Ok(sites.get(&site_id).map(|s| s.category_groups.clone()).unwrap_or_default())
	}

	async fn save_category(
		&self,
		site_id: SiteId,
		data: &SaveCategory<'_>,
	) -> ClResult<CategoryId> {
		self.check()?;
		let mut sites = self.sites.lock();
		let site = sites.entry(site_id).or_default();

		let (id, created_at) = match data.id {
			Some(id) => {
				let existing = site.categories.get(&id).ok_or(Error::NotFound)?;
				(id, existing.created_at)
			}
			None => (CategoryId(self.next_id()), Timestamp::now()),
		};
		site.categories.insert(
			id,
			CategoryData {
				id,
				name: data.name.into(),
				slug: data.slug.into(),
				parent_category_id: data.parent_category_id,
				read_restricted: data.read_restricted,
				position: data.position,
				email_in: data.email_in.map(Into::into),
				created_at,
			},
		);
		if let Some(permissions) = data.permissions {
			site.category_groups.retain(|row| row.category_id != id);
			site.category_groups.extend(permissions.iter().map(|(group_id, permission_type)| {
				CategoryGroupData { category_id: id, group_id: *group_id, permission_type: *permission_type }
			}));
		}
		Ok(id)
	}

	async fn delete_category(&self, site_id: SiteId, id: CategoryId) -> ClResult<()> {
		self.check()?;
		let mut sites = self.sites.lock();
		let site = sites.get_mut(&site_id).ok_or(Error::NotFound)?;
		site.categories.remove(&id).ok_or(Error::NotFound)?;
		site.category_groups.retain(|row| row.category_id != id);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_settings_are_site_scoped() {
		let meta = MemMetaAdapter::new();
		meta.save_setting(SiteId(1), "title", 1, Some("One")).await.unwrap();
		meta.save_setting(SiteId(2), "title", 1, Some("Two")).await.unwrap();

		let row = meta.read_setting(SiteId(1), "title").await.unwrap().unwrap();
		assert_eq!(row.value.as_deref(), Some("One"));
		assert!(meta.delete_setting(SiteId(2), "title").await.unwrap());
		assert!(!meta.delete_setting(SiteId(2), "title").await.unwrap());
		assert_eq!(meta.list_settings(SiteId(1)).await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_save_category_replaces_permissions() {
		let meta = MemMetaAdapter::new();
		let perms = [(GroupId(0), 1)];
		let mut save = SaveCategory {
			id: None,
			name: "General",
			slug: "general",
			parent_category_id: None,
			read_restricted: false,
			position: 0,
			email_in: None,
			permissions: Some(&perms),
		};
		let id = meta.save_category(SiteId(1), &save).await.unwrap();

		save.id = Some(id);
		save.permissions = Some(&[]);
		meta.save_category(SiteId(1), &save).await.unwrap();
		assert!(meta.list_category_groups(SiteId(1)).await.unwrap().is_empty());

		meta.delete_category(SiteId(1), id).await.unwrap();
		assert!(matches!(meta.read_category(SiteId(1), id).await, Err(Error::NotFound)));
	}

	#[tokio::test]
	async fn test_failing_store() {
		let meta = MemMetaAdapter::new();
		meta.set_failing(true);
		assert!(matches!(meta.list_settings(SiteId(1)).await, Err(Error::DbError)));
	}
}

// vim: ts=4
