//! Group administration
//!
//! Custom groups are referenced by category permissions. Automatic groups
//! are built in and never stored.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use agora_category::AutoGroup;
use agora_core::extract::Site;

use crate::prelude::*;

pub const MAX_GROUP_NAME_LENGTH: usize = 20;

#[skip_serializing_none]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
	pub id: GroupId,
	pub name: Box<str>,
	pub automatic: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
	pub name: String,
}

/// GET /admin/groups - Automatic groups followed by the custom groups of the site
pub async fn list_groups(
	State(app): State<App>,
	Site(site_id): Site,
) -> ClResult<(StatusCode, Json<ApiResponse<Vec<GroupView>>>)> {
	let custom = app.meta_adapter.list_groups(site_id).await?;
	let groups = AutoGroup::ALL
		.into_iter()
		.map(|g| GroupView { id: g.id(), name: g.key().into(), automatic: Some(true) })
		.chain(custom.into_iter().map(|g| GroupView { id: g.id, name: g.name, automatic: None }))
		.collect();
	Ok((StatusCode::OK, Json(ApiResponse::new(groups))))
}

/// POST /admin/groups - Create a custom group
pub async fn create_group(
	State(app): State<App>,
	Site(site_id): Site,
	Json(req): Json<CreateGroupRequest>,
) -> ClResult<(StatusCode, Json<ApiResponse<GroupView>>)> {
	let name = validate_group_name(&req.name)?;
	let id = app.meta_adapter.create_group(site_id, name).await?;
	info!(site_id = %site_id, group_id = %id, "Group {} created", name);
	Ok((StatusCode::CREATED, Json(ApiResponse::new(GroupView { id, name: name.into(), automatic: None }))))
}

/// Group names are short identifiers and may not collide with automatic groups
pub fn validate_group_name(name: &str) -> ClResult<&str> {
	let name = name.trim();
	if name.is_empty() || name.chars().count() > MAX_GROUP_NAME_LENGTH {
		return Err(Error::InvalidParameters(format!(
			"group name must be 1 to {} characters",
			MAX_GROUP_NAME_LENGTH
		)));
	}
	if !name.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.')) {
		return Err(Error::InvalidParameters("group name may only contain letters, digits, '_', '-' and '.'".into()));
	}
	if is_reserved(name) {
		return Err(Error::InvalidParameters(format!("group name '{}' is reserved", name)));
	}
	Ok(name)
}

fn is_reserved(name: &str) -> bool {
	AutoGroup::from_key(name).is_some() || name.to_lowercase().starts_with("trust_level_")
}


// vim: ts=4
