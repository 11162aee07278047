//! HTTP routes

use axum::{
	Router, middleware,
	routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use agora_admin::perm::require_admin;
use agora_core::settings::handler as settings;
use agora_category::handler as category;

use crate::auth;
use crate::prelude::*;

fn init_public() -> Router<App> {
	Router::new()
		.route("/site_settings", get(settings::get_client_settings))
		.route("/categories", get(category::list_categories))
		.route("/categories/{id}", get(category::get_category))
}

fn init_admin(app: &App) -> Router<App> {
	Router::new()
		// Site settings
		.route("/admin/site_settings", get(settings::list_site_settings))
		.route(
			"/admin/site_settings/{name}",
			put(settings::update_site_setting).delete(settings::delete_site_setting),
		)
		// Groups
		.route(
			"/admin/groups",
			get(agora_admin::group::list_groups).post(agora_admin::group::create_group),
		)
		// Categories
		.route("/categories", post(category::post_category))
		.route("/categories/{id}", put(category::put_category).delete(category::delete_category))
		.route_layer(middleware::from_fn_with_state(app.clone(), require_admin))
}

pub fn init(app: App) -> Router {
	Router::new()
		.merge(init_public())
		.merge(init_admin(&app))
		.layer(middleware::from_fn(auth::identify))
		.layer(TraceLayer::new_for_http())
		.with_state(app)
}

// vim: ts=4
