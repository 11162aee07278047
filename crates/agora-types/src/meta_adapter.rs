//! Persistence contract for site settings, groups and categories.
//!
//! Every call is scoped by a [`SiteId`]. Implementations must make
//! [`MetaAdapter::save_category`] atomic: the category row and its permission
//! rows are written together or not at all.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Debug;

use crate::prelude::*;

/// A persisted setting override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingRow {
	pub name: Box<str>,
	/// Numeric type code, see `SettingType::code()`
	pub data_type: i32,
	pub value: Option<Box<str>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
	pub id: GroupId,
	pub name: Box<str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryData {
	pub id: CategoryId,
	pub name: Box<str>,
	pub slug: Box<str>,
	pub parent_category_id: Option<CategoryId>,
	pub read_restricted: bool,
	pub position: i32,
	pub email_in: Option<Box<str>>,
	pub created_at: Timestamp,
}

/// One `(category, group, permission)` row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryGroupData {
	pub category_id: CategoryId,
	pub group_id: GroupId,
	pub permission_type: i32,
}

/// Category write. `id == None` creates a new category.
///
/// `permissions == None` leaves the stored permission rows untouched,
/// `Some(&[])` removes them all.
#[derive(Debug)]
pub struct SaveCategory<'a> {
	pub id: Option<CategoryId>,
	pub name: &'a str,
	pub slug: &'a str,
	pub parent_category_id: Option<CategoryId>,
	pub read_restricted: bool,
	pub position: i32,
	pub email_in: Option<&'a str>,
	pub permissions: Option<&'a [(GroupId, i32)]>,
}

#[async_trait]
pub trait MetaAdapter: Debug + Send + Sync {
	// Settings
	//**********
	async fn list_settings(&self, site_id: SiteId) -> ClResult<Vec<SettingRow>>;
	async fn read_setting(&self, site_id: SiteId, name: &str) -> ClResult<Option<SettingRow>>;
	/// Insert or replace an override
	async fn save_setting(
		&self,
		site_id: SiteId,
		name: &str,
		data_type: i32,
		value: Option<&str>,
	) -> ClResult<()>;
	/// Returns whether a row was removed
	async fn delete_setting(&self, site_id: SiteId, name: &str) -> ClResult<bool>;

	// Groups
	//********
	/// Lists custom groups. Automatic groups are not stored.
	async fn list_groups(&self, site_id: SiteId) -> ClResult<Vec<Group>>;
	async fn create_group(&self, site_id: SiteId, name: &str) -> ClResult<GroupId>;

	// Categories
	//************
	async fn list_categories(&self, site_id: SiteId) -> ClResult<Vec<CategoryData>>;
	async fn read_category(&self, site_id: SiteId, id: CategoryId) -> ClResult<CategoryData>;
	async fn list_category_groups(&self, site_id: SiteId) -> ClResult<Vec<CategoryGroupData>>;
	async fn save_category(&self, site_id: SiteId, data: &SaveCategory<'_>)
	-> ClResult<CategoryId>;
	/// Deletes a category together with its permission rows
	async fn delete_category(&self, site_id: SiteId, id: CategoryId) -> ClResult<()>;
}

// vim: ts=4
