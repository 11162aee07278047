//! Category API handlers

use axum::{
	Json,
	extract::{Path, State},
	http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use agora_core::extract::{Auth, OptionalAuth, Site};

use crate::category::Category;
use crate::permission::{GroupRef, GroupResolver, PermissionRef, PermissionType};
use crate::prelude::*;
use crate::service::CategoryService;

#[derive(Debug, Serialize)]
pub struct CategoryView {
	#[serde(flatten)]
	pub category: Category,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub permissions: Option<BTreeMap<String, PermissionType>>,
}

/// Create or update request. Absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRequest {
	#[serde(default)]
	pub name: Patch<String>,
	#[serde(default)]
	pub slug: Patch<String>,
	#[serde(default)]
	pub parent_category_id: Patch<CategoryId>,
	#[serde(default)]
	pub position: Patch<i32>,
	#[serde(default)]
	pub email_in: Patch<String>,
	/// Group (name or id) → permission (name or code)
	pub permissions: Option<BTreeMap<String, PermissionRef>>,
	/// Grants `full` to each group, used when `permissions` is absent
	pub group_names: Option<Vec<String>>,
}

impl CategoryRequest {
	fn apply(&self, category: &mut Category, groups: &GroupResolver) -> ClResult<()> {
		if let Some(name) = self.name.as_option() {
			category.name = name.cloned().unwrap_or_default();
		}
		if let Some(slug) = self.slug.as_option() {
			category.slug = slug.cloned().unwrap_or_default();
		}
		if let Some(parent) = self.parent_category_id.as_option() {
			category.parent_category_id = parent.copied();
		}
		if let Some(position) = self.position.value() {
			category.position = *position;
		}
		if let Some(email_in) = self.email_in.as_option() {
			category.email_in = email_in.filter(|e| !e.is_empty()).cloned();
		}

		if let Some(permissions) = &self.permissions {
			let entries: Vec<(GroupRef, PermissionRef)> = permissions
				.iter()
				.map(|(group, permission)| (GroupRef::parse(group), permission.clone()))
				.collect();
			category.set_permissions(&entries, groups)?;
		} else if let Some(names) = &self.group_names {
			category.set_group_names(names, groups)?;
		}
		Ok(())
	}
}

fn service(app: &App) -> ClResult<&Arc<CategoryService>> {
	app.ext::<Arc<CategoryService>>()
}

async fn view(
	app: &App,
	site_id: SiteId,
	viewer: &Viewer,
	category: Category,
) -> ClResult<CategoryView> {
	let permissions = match category.id {
		Some(id) if viewer.is_admin => Some(service(app)?.permissions_params(site_id, id).await?),
		_ => None,
	};
	Ok(CategoryView { category, permissions })
}

/// GET /categories - Categories visible to the viewer
pub async fn list_categories(
	State(app): State<App>,
	Site(site_id): Site,
	OptionalAuth(viewer): OptionalAuth,
) -> ClResult<(StatusCode, Json<ApiResponse<Vec<Category>>>)> {
	let mut categories = service(&app)?.secured(site_id, &viewer).await?;
	if !app.settings.get_bool(site_id, "fixed_category_positions").await? {
		categories.sort_by_cached_key(|c| c.name.to_lowercase());
	}
	Ok((StatusCode::OK, Json(ApiResponse::new(categories))))
}

/// GET /categories/{id}
pub async fn get_category(
	State(app): State<App>,
	Site(site_id): Site,
	OptionalAuth(viewer): OptionalAuth,
	Path(id): Path<CategoryId>,
) -> ClResult<(StatusCode, Json<ApiResponse<CategoryView>>)> {
	let service = service(&app)?;
	// Hidden categories look the same as missing ones
	if !service.can_see(site_id, &viewer, id).await? {
		return Err(Error::NotFound);
	}
	let category = service.get(site_id, id).await?;
	let view = view(&app, site_id, &viewer, category).await?;
	Ok((StatusCode::OK, Json(ApiResponse::new(view))))
}

/// POST /categories - Create a category (admin)
pub async fn post_category(
	State(app): State<App>,
	Site(site_id): Site,
	Auth(viewer): Auth,
	Json(req): Json<CategoryRequest>,
) -> ClResult<(StatusCode, Json<ApiResponse<CategoryView>>)> {
	let service = service(&app)?;
	let name = req.name.value().ok_or_else(|| Error::InvalidParameters("name is required".into()))?;
	let mut category = Category::new(name.as_str());
	req.apply(&mut category, &service.group_resolver(site_id).await?)?;
	let id = service.save(site_id, &mut category).await?;

	let view = view(&app, site_id, &viewer, service.get(site_id, id).await?).await?;
	Ok((StatusCode::CREATED, Json(ApiResponse::new(view))))
}

/// PUT /categories/{id} - Update a category (admin)
pub async fn put_category(
	State(app): State<App>,
	Site(site_id): Site,
	Auth(viewer): Auth,
	Path(id): Path<CategoryId>,
	Json(req): Json<CategoryRequest>,
) -> ClResult<(StatusCode, Json<ApiResponse<CategoryView>>)> {
	let service = service(&app)?;
	let mut category = service.get(site_id, id).await?;
	req.apply(&mut category, &service.group_resolver(site_id).await?)?;
	service.save(site_id, &mut category).await?;

	let view = view(&app, site_id, &viewer, service.get(site_id, id).await?).await?;
	Ok((StatusCode::OK, Json(ApiResponse::new(view))))
}

/// DELETE /categories/{id} - Delete a category (admin)
pub async fn delete_category(
	State(app): State<App>,
	Site(site_id): Site,
	Path(id): Path<CategoryId>,
) -> ClResult<StatusCode> {
	service(&app)?.destroy(site_id, id).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_request_apply() {
		let groups = GroupResolver::new(&[]);
		let req: CategoryRequest = serde_json::from_str(
			r#"{"name": "Staff", "parentCategoryId": 4, "emailIn": "", "permissions": {"staff": "full", "0": 3}}"#,
		)
		.unwrap();

		let mut category = Category::new("Old");
		category.email_in = Some("old@example.com".into());
		req.apply(&mut category, &groups).unwrap();

		assert_eq!(category.name, "Staff");
		assert_eq!(category.parent_category_id, Some(CategoryId(4)));
		assert_eq!(category.email_in, None);
		assert!(!category.read_restricted);
		assert_eq!(category.staged_permissions().map(<[_]>::len), Some(2));
	}

	#[test]
	fn test_request_keeps_absent_fields() {
		let groups = GroupResolver::new(&[]);
		let req: CategoryRequest = serde_json::from_str(r#"{"parentCategoryId": null}"#).unwrap();

		let mut category = Category::new("General");
		category.parent_category_id = Some(CategoryId(2));
		category.position = 5;
		req.apply(&mut category, &groups).unwrap();

		assert_eq!(category.name, "General");
		assert_eq!(category.parent_category_id, None);
		assert_eq!(category.position, 5);
		assert!(category.staged_permissions().is_none());
	}

	#[test]
	fn test_request_group_names() {
		let groups = GroupResolver::new(&[]);
		let req: CategoryRequest = serde_json::from_str(r#"{"groupNames": ["staff"]}"#).unwrap();
		let mut category = Category::new("General");
		req.apply(&mut category, &groups).unwrap();
		assert!(category.read_restricted);
	}
}

// vim: ts=4
