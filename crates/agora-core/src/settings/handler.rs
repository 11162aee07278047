//! Site settings handlers

use axum::{
	Json,
	extract::{Path, State},
	http::{StatusCode, header},
	response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::service::SettingInfo;
use super::types::SettingValue;
use crate::extract::{Auth, Site};
use crate::prelude::*;

/// GET /site_settings - Client-visible settings as one JSON object
pub async fn get_client_settings(State(app): State<App>, Site(site_id): Site) -> ClResult<Response> {
	let json = app.settings.client_settings_json(site_id).await?;
	Ok(([(header::CONTENT_TYPE, "application/json")], json).into_response())
}

/// GET /admin/site_settings - All settings with metadata
pub async fn list_site_settings(
	State(app): State<App>,
	Site(site_id): Site,
) -> ClResult<(StatusCode, Json<ApiResponse<Vec<SettingInfo>>>)> {
	let settings = app.settings.all_settings(site_id, false).await?;
	Ok((StatusCode::OK, Json(ApiResponse::new(settings))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
	pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SettingResponse {
	pub setting: String,
	pub value: SettingValue,
}

/// PUT /admin/site_settings/{name} - Override a setting
pub async fn update_site_setting(
	State(app): State<App>,
	Site(site_id): Site,
	Auth(viewer): Auth,
	Path(name): Path<String>,
	Json(req): Json<UpdateSettingRequest>,
) -> ClResult<(StatusCode, Json<ApiResponse<SettingResponse>>)> {
	let value = app.settings.set(site_id, &name, &req.value).await?;
	info!(user_id = ?viewer.user_id, site_id = %site_id, "Setting {} updated", name);
	Ok((StatusCode::OK, Json(ApiResponse::new(SettingResponse { setting: name, value }))))
}

/// DELETE /admin/site_settings/{name} - Revert a setting to its default
pub async fn delete_site_setting(
	State(app): State<App>,
	Site(site_id): Site,
	Auth(viewer): Auth,
	Path(name): Path<String>,
) -> ClResult<(StatusCode, Json<ApiResponse<SettingResponse>>)> {
	let value = app.settings.remove_override(site_id, &name).await?;
	info!(user_id = ?viewer.user_id, site_id = %site_id, "Setting {} reverted", name);
	Ok((StatusCode::OK, Json(ApiResponse::new(SettingResponse { setting: name, value }))))
}

// vim: ts=4
